//! Per-call state threaded through the recursive codecs.
//!
//! A context is created fresh for every top-level serialize or deserialize
//! call and borrowed exclusively by each nested step. [`next`] hands the
//! same shared state to a child one level deeper, so the whole walk sees a
//! single tracker (or a single decode state) without any global.
//!
//! [`next`]: SerializerContext::next

use tracing::trace;

use crate::error::GraphError;
use crate::model::{Body, Document, Graph, Kind, Node, NodeId, Value};
use crate::refs::{AddressTable, ReferenceTracker};
use crate::resolve::{DeferredResolver, ResolverQueue, Slot};

fn deeper(depth: usize, max_depth: usize) -> Result<usize, GraphError> {
    if depth >= max_depth {
        return Err(GraphError::DepthExceeded { max: max_depth });
    }
    Ok(depth + 1)
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Serialization context: nesting depth plus the shared reference tracker.
#[derive(Debug)]
pub struct SerializerContext<'s> {
    depth: usize,
    max_depth: usize,
    tracker: &'s mut ReferenceTracker,
}

impl<'s> SerializerContext<'s> {
    pub fn new(tracker: &'s mut ReferenceTracker, max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
            tracker,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns a child context one level deeper over the same tracker.
    pub fn next(&mut self) -> Result<SerializerContext<'_>, GraphError> {
        Ok(SerializerContext {
            depth: deeper(self.depth, self.max_depth)?,
            max_depth: self.max_depth,
            tracker: &mut *self.tracker,
        })
    }

    /// Registers a composite, see [`ReferenceTracker::try_register`].
    pub fn register(&mut self, node: NodeId) -> (usize, bool) {
        self.tracker.try_register(node)
    }
}

// =============================================================================
// DESERIALIZATION
// =============================================================================

/// A child value that may still be waiting for its target.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending {
    Ready(Value),
    /// Reference to a composite that is not bound yet.
    Deferred { address: usize, kind: Kind },
}

impl From<Value> for Pending {
    fn from(value: Value) -> Self {
        Pending::Ready(value)
    }
}

/// Everything a deserialization builds: the graph, its address table and
/// the deferred resolvers.
#[derive(Debug, Default)]
pub struct DecodeState {
    graph: Graph,
    addresses: AddressTable,
    resolvers: ResolverQueue,
}

impl DecodeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record shell and allocates its address.
    ///
    /// `address` is the index written in the input, or `None` to take the
    /// next sequential one.
    pub fn open_record(&mut self, address: Option<usize>) -> Result<(NodeId, usize), GraphError> {
        let node = self.graph.record();
        self.allocate(node, address)
    }

    /// Creates an empty sequence shell and allocates its address.
    pub fn open_sequence(
        &mut self,
        address: Option<usize>,
    ) -> Result<(NodeId, usize), GraphError> {
        let node = self.graph.sequence();
        self.allocate(node, address)
    }

    fn allocate(
        &mut self,
        node: NodeId,
        address: Option<usize>,
    ) -> Result<(NodeId, usize), GraphError> {
        let address = match address {
            Some(address) => {
                self.addresses.allocate_at(address, node)?;
                address
            }
            None => self.addresses.allocate(node)?,
        };
        Ok((node, address))
    }

    /// Marks a composite as fully built; later references bind directly.
    pub fn close(&mut self, address: usize) {
        self.addresses.bind(address);
    }

    /// Looks up a reference target.
    ///
    /// A bound target is returned as a ready value after checking its kind.
    /// Anything else (still open, or not seen yet) is deferred.
    pub fn reference(&self, address: usize, kind: Kind) -> Result<Pending, GraphError> {
        let Some(node) = self.addresses.lookup(address) else {
            return Ok(Pending::Deferred { address, kind });
        };
        let found = self.graph.get(node)?.kind();
        if found != kind {
            return Err(GraphError::ReferenceKindMismatch {
                address,
                expected: kind,
                found,
            });
        }
        Ok(Pending::Ready(Value::Composite(node)))
    }

    /// Mutable access to a shell, for annotations and flags.
    pub fn node_mut(&mut self, node: NodeId) -> Result<&mut Node, GraphError> {
        self.graph
            .node_mut(node)
            .ok_or(GraphError::DanglingNode { node })
    }

    /// Appends a child to a sequence shell.
    pub fn push_element(&mut self, sequence: NodeId, value: Pending) -> Result<(), GraphError> {
        let index = self.graph.get(sequence)?.len();
        match value {
            Pending::Ready(value) => self.graph.push(sequence, value),
            Pending::Deferred { address, kind } => {
                self.graph.push(sequence, Value::null(kind))?;
                self.resolvers.register(DeferredResolver {
                    slot: Slot::new(sequence, index),
                    address,
                    kind,
                });
                Ok(())
            }
        }
    }

    /// Sets a field of a record shell (last write wins).
    ///
    /// Overwriting a field drops any resolver still pending for it.
    pub fn insert_field(
        &mut self,
        record: NodeId,
        name: impl Into<String>,
        value: Pending,
    ) -> Result<(), GraphError> {
        let name = name.into();
        let (placeholder, deferred) = match value {
            Pending::Ready(value) => (value, None),
            Pending::Deferred { address, kind } => (Value::null(kind), Some((address, kind))),
        };

        let node = self
            .graph
            .node_mut(record)
            .ok_or(GraphError::DanglingNode { node: record })?;
        let found = node.kind();
        let Body::Record(fields) = &mut node.body else {
            return Err(GraphError::WrongNodeKind {
                node: record,
                expected: Kind::Record,
                found,
            });
        };
        let (index, replaced) = fields.insert(name, placeholder);

        let slot = Slot::new(record, index);
        if replaced.is_some() && self.resolvers.cancel(slot) {
            trace!(node = %record, index, "cancelled resolver for overwritten field");
        }
        if let Some((address, kind)) = deferred {
            self.resolvers.register(DeferredResolver {
                slot,
                address,
                kind,
            });
        }
        Ok(())
    }

    /// Number of resolvers waiting for [`finish`](Self::finish).
    pub fn pending(&self) -> usize {
        self.resolvers.len()
    }

    /// Executes the deferred resolvers and returns the finished document.
    ///
    /// Consumes the state, so resolvers run exactly once.
    pub fn finish(self, root: Pending) -> Result<Document, GraphError> {
        let DecodeState {
            mut graph,
            addresses,
            resolvers,
        } = self;

        let root = match root {
            Pending::Ready(value) => value,
            // A root reference can only point at something after it.
            Pending::Deferred { address, .. } => {
                return Err(GraphError::UnresolvedReferences {
                    addresses: vec![address],
                });
            }
        };

        resolvers.execute(&mut graph, &addresses)?;
        Ok(Document::new(graph, root))
    }
}

/// Deserialization context: nesting depth plus the shared decode state.
#[derive(Debug)]
pub struct DeserializerContext<'s> {
    depth: usize,
    max_depth: usize,
    state: &'s mut DecodeState,
}

impl<'s> DeserializerContext<'s> {
    pub fn new(state: &'s mut DecodeState, max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
            state,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns a child context one level deeper over the same state.
    pub fn next(&mut self) -> Result<DeserializerContext<'_>, GraphError> {
        Ok(DeserializerContext {
            depth: deeper(self.depth, self.max_depth)?,
            max_depth: self.max_depth,
            state: &mut *self.state,
        })
    }

    pub fn state(&mut self) -> &mut DecodeState {
        self.state
    }
}
