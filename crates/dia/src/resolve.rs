//! Deferred resolution of forward references.
//!
//! A reference may name an address whose composite is still open (a cycle
//! back to an ancestor) or has not been read yet. The deserializer leaves a
//! typed null placeholder in the slot and registers a [`DeferredResolver`].
//! Once the whole input has been consumed, [`ResolverQueue::execute`]
//! patches every placeholder with the composite it names.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::GraphError;
use crate::model::{Graph, Kind, NodeId, Value};
use crate::refs::AddressTable;

/// A child position inside a composite: field index or sequence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub node: NodeId,
    pub index: usize,
}

impl Slot {
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// A pending patch: write the composite at `address` into `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredResolver {
    pub slot: Slot,
    pub address: usize,
    /// Kind named by the reference; the target must match it.
    pub kind: Kind,
}

/// Ordered queue of deferred resolvers, at most one per slot.
#[derive(Debug, Clone, Default)]
pub struct ResolverQueue {
    entries: Vec<Option<DeferredResolver>>,
    by_slot: FxHashMap<Slot, usize>,
}

impl ResolverQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a resolver. Returns false, leaving the queue unchanged, if
    /// the slot already has one pending.
    pub fn register(&mut self, resolver: DeferredResolver) -> bool {
        if self.by_slot.contains_key(&resolver.slot) {
            return false;
        }
        trace!(
            node = %resolver.slot.node,
            index = resolver.slot.index,
            address = resolver.address,
            "deferring reference"
        );
        self.by_slot.insert(resolver.slot, self.entries.len());
        self.entries.push(Some(resolver));
        true
    }

    /// Drops the resolver for a slot whose value was overwritten.
    ///
    /// Returns true if a resolver was pending.
    pub fn cancel(&mut self, slot: Slot) -> bool {
        match self.by_slot.remove(&slot) {
            Some(pos) => {
                self.entries[pos] = None;
                true
            }
            None => false,
        }
    }

    /// Number of live resolvers.
    pub fn len(&self) -> usize {
        self.by_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }

    /// Iterates live resolvers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DeferredResolver> {
        self.entries.iter().flatten()
    }

    /// Patches every queued slot and consumes the queue.
    ///
    /// All addresses are checked before any slot is written. Every address
    /// that was never bound is reported together, sorted and without
    /// duplicates. Returns the number of patched slots.
    pub fn execute(self, graph: &mut Graph, table: &AddressTable) -> Result<usize, GraphError> {
        let mut missing: Vec<usize> = self
            .iter()
            .filter(|r| table.lookup(r.address).is_none())
            .map(|r| r.address)
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            missing.dedup();
            return Err(GraphError::UnresolvedReferences { addresses: missing });
        }

        let mut patches = Vec::with_capacity(self.len());
        for resolver in self.iter() {
            let target = table.resolve(resolver.address)?;
            let found = graph.get(target)?.kind();
            if found != resolver.kind {
                return Err(GraphError::ReferenceKindMismatch {
                    address: resolver.address,
                    expected: resolver.kind,
                    found,
                });
            }
            patches.push((resolver.slot, target));
        }

        for (slot, target) in &patches {
            let value = graph
                .node_mut(slot.node)
                .and_then(|node| node.slot_mut(slot.index))
                .ok_or(GraphError::DanglingNode { node: slot.node })?;
            *value = Value::Composite(*target);
        }

        trace!(patched = patches.len(), "resolved deferred references");
        Ok(patches.len())
    }
}
