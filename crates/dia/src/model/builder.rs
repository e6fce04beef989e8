//! Builder API for ergonomic graph construction.
//!
//! # Example
//!
//! ```rust
//! use dia::model::Graph;
//!
//! let mut graph = Graph::new();
//! let root = graph.build_record(|r| {
//!     r.field("a", 5)
//!         .sequence_field("b", |s| s.item(true).item("x"))
//!         .self_field("me")
//! });
//! assert_eq!(graph.node(root).unwrap().len(), 3);
//! ```

use crate::model::{Body, Graph, NodeId, Value};

impl Graph {
    /// Adds a record and fills it with a builder function.
    pub fn build_record<F>(&mut self, f: F) -> NodeId
    where
        F: FnOnce(RecordBuilder<'_>) -> RecordBuilder<'_>,
    {
        let id = self.record();
        f(RecordBuilder { graph: self, id });
        id
    }

    /// Adds a sequence and fills it with a builder function.
    pub fn build_sequence<F>(&mut self, f: F) -> NodeId
    where
        F: FnOnce(SequenceBuilder<'_>) -> SequenceBuilder<'_>,
    {
        let id = self.sequence();
        f(SequenceBuilder { graph: self, id });
        id
    }
}

/// Builder filling one record node.
#[derive(Debug)]
pub struct RecordBuilder<'g> {
    graph: &'g mut Graph,
    id: NodeId,
}

impl RecordBuilder<'_> {
    /// Identity of the record being built, for references back to it.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Sets a field (last write wins).
    pub fn field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(node) = self.graph.node_mut(self.id) {
            if let Body::Record(r) = &mut node.body {
                r.insert(name, value.into());
            }
        }
        self
    }

    /// Sets a field to a new nested record.
    pub fn record_field<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(RecordBuilder<'_>) -> RecordBuilder<'_>,
    {
        let child = self.graph.build_record(f);
        self.field(name, child)
    }

    /// Sets a field to a new nested sequence.
    pub fn sequence_field<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(SequenceBuilder<'_>) -> SequenceBuilder<'_>,
    {
        let child = self.graph.build_sequence(f);
        self.field(name, child)
    }

    /// Sets a field to an existing node, sharing it.
    pub fn reference_field(self, name: impl Into<String>, target: NodeId) -> Self {
        self.field(name, target)
    }

    /// Sets a field pointing back at this record.
    pub fn self_field(self, name: impl Into<String>) -> Self {
        let id = self.id;
        self.field(name, id)
    }

    /// Appends an annotation to the record.
    pub fn annotate(self, annotation: impl Into<String>) -> Self {
        if let Some(node) = self.graph.node_mut(self.id) {
            node.annotations.push(annotation.into());
        }
        self
    }

    /// Adds a flag to the record.
    pub fn flag(self, flag: impl Into<String>) -> Self {
        if let Some(node) = self.graph.node_mut(self.id) {
            node.add_flag(flag);
        }
        self
    }
}

/// Builder filling one sequence node.
#[derive(Debug)]
pub struct SequenceBuilder<'g> {
    graph: &'g mut Graph,
    id: NodeId,
}

impl SequenceBuilder<'_> {
    /// Identity of the sequence being built, for references back to it.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Appends an item.
    pub fn item(self, value: impl Into<Value>) -> Self {
        if let Some(node) = self.graph.node_mut(self.id) {
            if let Body::Sequence(items) = &mut node.body {
                items.push(value.into());
            }
        }
        self
    }

    /// Appends a new nested record.
    pub fn record_item<F>(self, f: F) -> Self
    where
        F: FnOnce(RecordBuilder<'_>) -> RecordBuilder<'_>,
    {
        let child = self.graph.build_record(f);
        self.item(child)
    }

    /// Appends a new nested sequence.
    pub fn sequence_item<F>(self, f: F) -> Self
    where
        F: FnOnce(SequenceBuilder<'_>) -> SequenceBuilder<'_>,
    {
        let child = self.graph.build_sequence(f);
        self.item(child)
    }

    /// Appends an existing node, sharing it.
    pub fn reference_item(self, target: NodeId) -> Self {
        self.item(target)
    }

    /// Appends an annotation to the sequence.
    pub fn annotate(self, annotation: impl Into<String>) -> Self {
        if let Some(node) = self.graph.node_mut(self.id) {
            node.annotations.push(annotation.into());
        }
        self
    }

    /// Adds a flag to the sequence.
    pub fn flag(self, flag: impl Into<String>) -> Self {
        if let Some(node) = self.graph.node_mut(self.id) {
            node.add_flag(flag);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Kind};

    #[test]
    fn test_build_nested() {
        let mut graph = Graph::new();
        let root = graph.build_record(|r| {
            r.annotate("point")
                .flag("flag.abc")
                .field("a", 5)
                .sequence_field("b", |s| s.item(true).item("x"))
        });

        let node = graph.node(root).unwrap();
        assert_eq!(node.kind(), Kind::Record);
        assert_eq!(node.annotations, ["point"]);
        assert_eq!(node.flags(), ["flag.abc"]);

        let record = node.as_record().unwrap();
        assert_eq!(record.get("a"), Some(&Value::from(5)));
        let b = record.get("b").and_then(Value::as_node).unwrap();
        assert_eq!(graph.node(b).unwrap().as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn test_build_shared_and_cyclic() {
        let mut graph = Graph::new();
        let shared = graph.build_sequence(|s| s.item(1).item(2));
        let root = graph.build_record(|r| {
            r.reference_field("a", shared)
                .reference_field("b", shared)
                .self_field("self")
        });

        let doc = Document::new(graph, root);
        let record = doc.root_node().unwrap().as_record().unwrap();
        assert_eq!(record.get("a"), record.get("b"));
        assert_eq!(record.get("self"), Some(&Value::Composite(root)));
        assert_eq!(doc.graph.reachable(&doc.root).unwrap().len(), 2);
    }
}
