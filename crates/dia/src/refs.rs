//! Address bookkeeping for shared and cyclic composites.
//!
//! Both codecs number composites in the order they are first met during a
//! pre-order walk, starting at 0. The serializer side maps node identity to
//! an address ([`ReferenceTracker`]); the deserializer side maps addresses
//! back to nodes as they are built ([`AddressTable`]).

use rustc_hash::FxHashMap;

use crate::error::GraphError;
use crate::model::NodeId;

/// Serialization-side map from node identity to address.
///
/// Only composites can be registered: the tracker takes a [`NodeId`], so a
/// scalar can never be offered to it.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTracker {
    addresses: FxHashMap<NodeId, usize>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node, returning its address and whether this was the
    /// first time the node was seen.
    ///
    /// The first call for a node allocates the next sequential address;
    /// later calls return the same address with `false`.
    pub fn try_register(&mut self, node: NodeId) -> (usize, bool) {
        let next = self.addresses.len();
        match self.addresses.entry(node) {
            std::collections::hash_map::Entry::Occupied(e) => (*e.get(), false),
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(next);
                (next, true)
            }
        }
    }

    /// Returns the address of an already registered node.
    pub fn address_of(&self, node: NodeId) -> Option<usize> {
        self.addresses.get(&node).copied()
    }

    /// Number of distinct nodes registered.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressState {
    /// Shell allocated, children still being parsed.
    Open(NodeId),
    /// Node fully constructed.
    Bound(NodeId),
}

/// Deserialization-side map from address to node.
#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    entries: FxHashMap<usize, AddressState>,
    next: usize,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next sequential address for a node whose body has not
    /// been read yet.
    ///
    /// Fails if an explicit address already claimed the next slot, which
    /// only happens once `usize::MAX` has been used.
    pub fn allocate(&mut self, node: NodeId) -> Result<usize, GraphError> {
        let address = self.next;
        if self.entries.contains_key(&address) {
            return Err(GraphError::DuplicateAddress { address });
        }
        self.next = address
            .checked_add(1)
            .ok_or(GraphError::AddressOverflow { address })?;
        self.entries.insert(address, AddressState::Open(node));
        Ok(address)
    }

    /// Reserves an explicit address, as written in the input.
    pub fn allocate_at(&mut self, address: usize, node: NodeId) -> Result<(), GraphError> {
        if self.entries.contains_key(&address) {
            return Err(GraphError::DuplicateAddress { address });
        }
        self.entries.insert(address, AddressState::Open(node));
        self.next = self.next.max(address.saturating_add(1));
        Ok(())
    }

    /// Marks an address's node as fully constructed.
    ///
    /// Returns the node, or `None` if the address was never allocated.
    pub fn bind(&mut self, address: usize) -> Option<NodeId> {
        let entry = self.entries.get_mut(&address)?;
        let node = match *entry {
            AddressState::Open(node) | AddressState::Bound(node) => node,
        };
        *entry = AddressState::Bound(node);
        Some(node)
    }

    /// Returns the node for an address only if it is fully constructed.
    pub fn lookup(&self, address: usize) -> Option<NodeId> {
        match self.entries.get(&address) {
            Some(AddressState::Bound(node)) => Some(*node),
            _ => None,
        }
    }

    /// Returns the node for an address, failing if it was never bound.
    ///
    /// Only called once the whole input has been parsed, when every
    /// allocated address is bound.
    pub fn resolve(&self, address: usize) -> Result<NodeId, GraphError> {
        self.lookup(address)
            .ok_or_else(|| GraphError::UnresolvedReferences {
                addresses: vec![address],
            })
    }

    pub fn is_allocated(&self, address: usize) -> bool {
        self.entries.contains_key(&address)
    }

    /// Number of allocated addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_first_occurrence() {
        let mut tracker = ReferenceTracker::new();
        let a = NodeId(10);
        let b = NodeId(3);

        assert_eq!(tracker.try_register(a), (0, true));
        assert_eq!(tracker.try_register(b), (1, true));
        assert_eq!(tracker.try_register(a), (0, false));
        assert_eq!(tracker.try_register(b), (1, false));
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.address_of(b), Some(1));
        assert_eq!(tracker.address_of(NodeId(99)), None);
    }

    #[test]
    fn test_table_bind_and_resolve() {
        let mut table = AddressTable::new();
        let addr = table.allocate(NodeId(0)).unwrap();
        assert_eq!(addr, 0);

        // Open but not bound: not usable yet.
        assert_eq!(table.lookup(0), None);
        assert!(table.resolve(0).is_err());

        assert_eq!(table.bind(0), Some(NodeId(0)));
        assert_eq!(table.lookup(0), Some(NodeId(0)));
        assert_eq!(table.resolve(0), Ok(NodeId(0)));
    }

    #[test]
    fn test_table_explicit_addresses() {
        let mut table = AddressTable::new();
        table.allocate_at(5, NodeId(0)).unwrap();
        assert_eq!(
            table.allocate_at(5, NodeId(1)),
            Err(GraphError::DuplicateAddress { address: 5 })
        );
        // Sequential allocation continues after the highest explicit one.
        assert_eq!(table.allocate(NodeId(2)), Ok(6));
        assert!(table.is_allocated(5));
        assert!(!table.is_allocated(0));
        assert_eq!(table.bind(3), None);
    }

    #[test]
    fn test_table_last_address() {
        let mut table = AddressTable::new();
        table.allocate_at(usize::MAX, NodeId(0)).unwrap();
        assert_eq!(
            table.allocate(NodeId(1)),
            Err(GraphError::DuplicateAddress { address: usize::MAX })
        );
        // The explicit entry is untouched and nothing wrapped around to 0.
        assert_eq!(table.bind(usize::MAX), Some(NodeId(0)));
        assert!(!table.is_allocated(0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_unallocated() {
        let table = AddressTable::new();
        assert_eq!(
            table.resolve(7),
            Err(GraphError::UnresolvedReferences { addresses: vec![7] })
        );
    }
}
