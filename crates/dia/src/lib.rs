//! Dia: a self-describing data format for value graphs.
//!
//! Values are scalars (booleans, big integers, decimals, timestamps,
//! durations, strings, symbols, blobs) or composites (records and
//! sequences). Composites have identity: one composite can be referenced
//! from many places, including from inside itself, and both encodings
//! preserve that sharing.
//!
//! # Quick Start
//!
//! ```rust
//! use dia::codec::{AxonOptions, bion, deserialize, serialize};
//! use dia::{Document, Graph};
//!
//! let mut graph = Graph::new();
//! let root = graph.build_record(|r| {
//!     r.field("a", 5)
//!         .sequence_field("b", |s| s.item(true).item("x"))
//! });
//! let doc = Document::new(graph, root);
//!
//! let text = serialize(&doc, &AxonOptions::compact()).unwrap();
//! assert_eq!(text, r#"#0; {a: 5, b: #1; [true, "x"]}"#);
//! assert_eq!(deserialize(&text).unwrap(), doc);
//!
//! let bytes = bion::encode(&doc).unwrap();
//! assert_eq!(bion::decode(&bytes).unwrap(), doc);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Kinds, scalar payloads, the composite arena, builders
//! - [`codec`]: Axon text and Bion binary encodings
//! - [`refs`]: Reference tracking (serialize) and address tables (deserialize)
//! - [`resolve`]: Deferred resolution of forward and cyclic references
//! - [`context`]: Per-call serializer and deserializer contexts
//! - [`error`]: Error types
//! - [`limits`]: Security limits for decoding
//!
//! # Security
//!
//! The decoders are designed to safely handle untrusted input:
//! - All allocations are bounded by limits
//! - Nesting depth is capped, so deep input fails instead of overflowing the stack
//! - Varints are limited to prevent overflow
//! - Invalid data is rejected with descriptive errors carrying an offset or position
//!
//! # Wire Format
//!
//! Bion documents use a binary format with optional zstd compression:
//! - Uncompressed: `BION` magic + version + root value
//! - Compressed: `BIONZ` magic + uncompressed size + zstd data
//!
//! The decoder automatically detects and handles both formats.

pub mod codec;
pub mod context;
pub mod error;
pub mod limits;
pub mod model;
pub mod refs;
pub mod resolve;
pub mod util;

// Re-export commonly used types at crate root
pub use codec::{AxonOptions, BionOptions, Indent};
pub use error::{DecodeError, EncodeError, ErrorCode, GraphError, ParseError, Position};
pub use model::{
    Body, Decimal, Document, Duration, Graph, Kind, Node, NodeId, Payload, Record,
    RecordBuilder, Scalar, SequenceBuilder, Timestamp, Value, validate_document,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
