//! Data model types for Dia.
//!
//! This module contains the in-memory value graph:
//! - Kinds and scalar payloads (booleans, big integers, decimals, ...)
//! - The composite-node arena (records and sequences with identity)
//! - Documents (an arena plus its root value)
//! - Builders (ergonomic construction)

pub mod builder;
pub mod graph;
pub mod value;

pub use builder::{RecordBuilder, SequenceBuilder};
pub use graph::{validate_document, Body, Document, Graph, Node, NodeId, Record};
pub use value::{Decimal, Duration, Kind, Payload, Scalar, Timestamp, Value};
