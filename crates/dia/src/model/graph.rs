//! The composite-node arena.
//!
//! Records and sequences are stored in a [`Graph`] and referred to by
//! [`NodeId`]. The id is the node's identity: two nodes with identical
//! contents are still different nodes, and a node may be referenced from
//! any number of places, including from inside itself.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::GraphError;
use crate::model::{Kind, Value};

/// Identity of a composite node within one [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An ordered set of named fields.
///
/// Names are unique. Inserting an existing name replaces its value in
/// place, so the field keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
    /// Field name to position in `fields`.
    index: FxHashMap<String, usize>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a field, returning its position and the
    /// replaced value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> (usize, Option<Value>) {
        let name = name.into();
        if let Some(&pos) = self.index.get(&name) {
            let old = std::mem::replace(&mut self.fields[pos].1, value);
            return (pos, Some(old));
        }
        let pos = self.fields.len();
        self.index.insert(name.clone(), pos);
        self.fields.push((name, value));
        (pos, None)
    }

    /// Returns the value of a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&pos| &self.fields[pos].1)
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.fields.get_mut(index).map(|(_, v)| v)
    }
}

/// The children of a composite node.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Record(Record),
    Sequence(Vec<Value>),
}

/// A composite node: a record or a sequence with its annotations and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Insertion-ordered annotations; duplicates are allowed.
    pub annotations: Vec<String>,
    flags: Vec<String>,
    pub body: Body,
}

impl Node {
    pub fn record() -> Self {
        Self::with_body(Body::Record(Record::new()))
    }

    pub fn sequence() -> Self {
        Self::with_body(Body::Sequence(Vec::new()))
    }

    fn with_body(body: Body) -> Self {
        Self {
            annotations: Vec::new(),
            flags: Vec::new(),
            body,
        }
    }

    pub fn kind(&self) -> Kind {
        match self.body {
            Body::Record(_) => Kind::Record,
            Body::Sequence(_) => Kind::Sequence,
        }
    }

    /// Free-standing markers (`@flag;` in Axon), in insertion order.
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Adds a flag; returns false if it was already present.
    pub fn add_flag(&mut self, flag: impl Into<String>) -> bool {
        let flag = flag.into();
        if self.flags.contains(&flag) {
            return false;
        }
        self.flags.push(flag);
        true
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match &self.body {
            Body::Record(r) => Some(r),
            Body::Sequence(_) => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match &self.body {
            Body::Sequence(items) => Some(items),
            Body::Record(_) => None,
        }
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        match &self.body {
            Body::Record(r) => r.len(),
            Body::Sequence(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child values in order (record field values, or sequence items).
    pub fn children(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match &self.body {
            Body::Record(r) => Box::new(r.fields().iter().map(|(_, v)| v)),
            Body::Sequence(items) => Box::new(items.iter()),
        }
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Value> {
        match &mut self.body {
            Body::Record(r) => r.slot_mut(index),
            Body::Sequence(items) => items.get_mut(index),
        }
    }
}

/// Arena holding every composite node of one value graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Adds a node and returns its identity.
    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Adds an empty record.
    pub fn record(&mut self) -> NodeId {
        self.add(Node::record())
    }

    /// Adds an empty sequence.
    pub fn sequence(&mut self) -> NodeId {
        self.add(Node::sequence())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Returns a node or a `DanglingNode` error.
    pub fn get(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.node(id).ok_or(GraphError::DanglingNode { node: id })
    }

    /// Inserts a field into a record node (last write wins).
    pub fn insert(
        &mut self,
        record: NodeId,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, GraphError> {
        let node = self
            .node_mut(record)
            .ok_or(GraphError::DanglingNode { node: record })?;
        match &mut node.body {
            Body::Record(r) => Ok(r.insert(name, value.into()).1),
            Body::Sequence(_) => Err(GraphError::WrongNodeKind {
                node: record,
                expected: Kind::Record,
                found: Kind::Sequence,
            }),
        }
    }

    /// Appends an item to a sequence node.
    pub fn push(&mut self, sequence: NodeId, value: impl Into<Value>) -> Result<(), GraphError> {
        let node = self
            .node_mut(sequence)
            .ok_or(GraphError::DanglingNode { node: sequence })?;
        match &mut node.body {
            Body::Sequence(items) => {
                items.push(value.into());
                Ok(())
            }
            Body::Record(_) => Err(GraphError::WrongNodeKind {
                node: sequence,
                expected: Kind::Sequence,
                found: Kind::Record,
            }),
        }
    }

    /// Number of nodes in the arena (reachable or not).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Distinct composites reachable from `root`, in pre-order.
    ///
    /// This is the order in which both codecs assign addresses.
    pub fn reachable(&self, root: &Value) -> Result<Vec<NodeId>, GraphError> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack: Vec<&Value> = vec![root];

        while let Some(value) = stack.pop() {
            let Value::Composite(id) = value else {
                continue;
            };
            if !seen.insert(*id) {
                continue;
            }
            let node = self.get(*id)?;
            order.push(*id);
            let children: Vec<&Value> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }

        Ok(order)
    }
}

/// One value graph: the arena plus its root value.
#[derive(Debug, Clone)]
pub struct Document {
    pub graph: Graph,
    pub root: Value,
}

impl Document {
    pub fn new(graph: Graph, root: impl Into<Value>) -> Self {
        Self {
            graph,
            root: root.into(),
        }
    }

    /// A document whose root is a scalar (no composites).
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::new(Graph::new(), value)
    }

    /// The root node, if the root is a composite.
    pub fn root_node(&self) -> Option<&Node> {
        self.root.as_node().and_then(|id| self.graph.node(id))
    }

    /// Returns the node a composite value points at.
    pub fn resolve(&self, value: &Value) -> Option<&Node> {
        value.as_node().and_then(|id| self.graph.node(id))
    }

    /// Compares two documents by value while preserving sharing shape.
    ///
    /// Node ids are ignored, but the node correspondence must be a
    /// bijection: a self-referencing record only equals a self-referencing
    /// record, and a node shared by two fields only equals a node shared
    /// the same way.
    pub fn shape_eq(&self, other: &Document) -> bool {
        let mut forward: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut backward: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut pending: Vec<(&Value, &Value)> = vec![(&self.root, &other.root)];

        while let Some((a, b)) = pending.pop() {
            let (a_id, b_id) = match (a, b) {
                (Value::Scalar(x), Value::Scalar(y)) => {
                    if x != y {
                        return false;
                    }
                    continue;
                }
                (Value::Composite(x), Value::Composite(y)) => (*x, *y),
                _ => return false,
            };

            match (forward.get(&a_id), backward.get(&b_id)) {
                (Some(mapped), _) if *mapped != b_id => return false,
                (_, Some(mapped)) if *mapped != a_id => return false,
                (Some(_), Some(_)) => continue,
                _ => {}
            }
            forward.insert(a_id, b_id);
            backward.insert(b_id, a_id);

            let (Some(x), Some(y)) = (self.graph.node(a_id), other.graph.node(b_id)) else {
                return false;
            };
            if x.annotations != y.annotations || x.flags != y.flags {
                return false;
            }
            match (&x.body, &y.body) {
                (Body::Record(rx), Body::Record(ry)) => {
                    if rx.len() != ry.len() {
                        return false;
                    }
                    for ((nx, vx), (ny, vy)) in rx.fields().iter().zip(ry.fields()) {
                        if nx != ny {
                            return false;
                        }
                        pending.push((vx, vy));
                    }
                }
                (Body::Sequence(sx), Body::Sequence(sy)) => {
                    if sx.len() != sy.len() {
                        return false;
                    }
                    pending.extend(sx.iter().zip(sy));
                }
                _ => return false,
            }
        }

        true
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.shape_eq(other)
    }
}

/// Checks graph integrity: every composite reachable from the root exists.
///
/// Returns the number of distinct reachable composites.
pub fn validate_document(doc: &Document) -> Result<usize, GraphError> {
    doc.graph.reachable(&doc.root).map(|nodes| nodes.len())
}
