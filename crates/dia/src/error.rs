//! Error types for Dia serialization and deserialization.

use std::fmt;

use thiserror::Error;

use crate::model::{Kind, NodeId};

/// Stable error codes shared by both codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Malformed text or binary encoding
    MalformedEncoding,
    /// E002: Reference to an address that was never defined
    UnresolvedReference,
    /// E003: Reference target is not a valid composite
    InvalidReferenceTarget,
    /// E004: Invalid UTF-8 encoding
    InvalidUtf8,
    /// E005: Depth, length or size limit exceeded
    LimitExceeded,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::MalformedEncoding => "E001",
            ErrorCode::UnresolvedReference => "E002",
            ErrorCode::InvalidReferenceTarget => "E003",
            ErrorCode::InvalidUtf8 => "E004",
            ErrorCode::LimitExceeded => "E005",
        }
    }
}

/// A location in Axon source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the start of the input.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors raised by the graph engine, independent of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("[E002] unresolved reference to address(es) {addresses:?}")]
    UnresolvedReferences { addresses: Vec<usize> },

    #[error("[E001] address {address} is defined more than once")]
    DuplicateAddress { address: usize },

    #[error("[E005] no address left after {address}")]
    AddressOverflow { address: usize },

    #[error("[E003] reference to address {address} expects a {expected}, found a {found}")]
    ReferenceKindMismatch {
        address: usize,
        expected: Kind,
        found: Kind,
    },

    #[error("[E005] nesting depth exceeds maximum {max}")]
    DepthExceeded { max: usize },

    #[error("[E003] node {node} does not exist in the graph")]
    DanglingNode { node: NodeId },

    #[error("[E003] node {node} is a {found}, expected a {expected}")]
    WrongNodeKind {
        node: NodeId,
        expected: Kind,
        found: Kind,
    },
}

impl GraphError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            GraphError::UnresolvedReferences { .. } => ErrorCode::UnresolvedReference,
            GraphError::DuplicateAddress { .. } => ErrorCode::MalformedEncoding,
            GraphError::ReferenceKindMismatch { .. }
            | GraphError::DanglingNode { .. }
            | GraphError::WrongNodeKind { .. } => ErrorCode::InvalidReferenceTarget,
            GraphError::DepthExceeded { .. } | GraphError::AddressOverflow { .. } => {
                ErrorCode::LimitExceeded
            }
        }
    }
}

/// Error during Axon text deserialization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("[E001] at {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: Position,
        expected: &'static str,
        found: String,
    },

    #[error("[E001] unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("[E001] at {position}: invalid {kind} literal: {reason}")]
    InvalidLiteral {
        position: Position,
        kind: &'static str,
        reason: String,
    },

    #[error("[E003] at {position}: invalid reference: {reason}")]
    InvalidReference { position: Position, reason: String },

    #[error("[E001] at {position}: unterminated literal")]
    UnterminatedLiteral { position: Position },

    #[error("[E001] at {position}: unexpected character {found:?}")]
    UnexpectedChar { position: Position, found: char },

    #[error("[E001] at {position}: trailing input after the root value")]
    TrailingInput { position: Position },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ParseError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ParseError::InvalidReference { .. } => ErrorCode::InvalidReferenceTarget,
            ParseError::Graph(e) => e.code(),
            _ => ErrorCode::MalformedEncoding,
        }
    }

    /// Returns the source position of the error, when it has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::InvalidLiteral { position, .. }
            | ParseError::InvalidReference { position, .. }
            | ParseError::UnterminatedLiteral { position }
            | ParseError::UnexpectedChar { position, .. }
            | ParseError::TrailingInput { position } => Some(*position),
            ParseError::UnexpectedEnd { .. } | ParseError::Graph(_) => None,
        }
    }
}

/// Error during Bion binary decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === E001: Malformed encoding ===
    #[error("[E001] invalid magic bytes: expected BION or BIONZ, found {found:?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("[E001] unsupported version: {version}")]
    UnsupportedVersion { version: u8 },

    #[error("[E001] unexpected end of input at offset {offset} while reading {context}")]
    UnexpectedEof { offset: usize, context: &'static str },

    #[error("[E001] varint at offset {offset} exceeds maximum length (10 bytes)")]
    VarintTooLong { offset: usize },

    #[error("[E001] varint at offset {offset} overflows u64")]
    VarintOverflow { offset: usize },

    #[error("[E001] invalid kind tag {tag:#x} at offset {offset}")]
    InvalidKind { offset: usize, tag: u8 },

    #[error("[E001] flags {flags:#04x} are not valid for {kind} at offset {offset}")]
    InvalidFlags { offset: usize, kind: &'static str, flags: u8 },

    #[error("[E001] {trailing} trailing byte(s) after the root value at offset {offset}")]
    TrailingBytes { offset: usize, trailing: usize },

    #[error("[E001] {field} at offset {offset} is out of range")]
    OutOfRange { offset: usize, field: &'static str },

    // === E004: Invalid UTF-8 ===
    #[error("[E004] invalid UTF-8 in {field} at offset {offset}")]
    InvalidUtf8 { offset: usize, field: &'static str },

    // === E005: Limits ===
    #[error("[E005] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    // === Compression errors ===
    #[error("[E001] zstd decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("[E001] decompressed size {actual} doesn't match declared {declared}")]
    UncompressedSizeMismatch { declared: usize, actual: usize },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::InvalidUtf8 { .. } => ErrorCode::InvalidUtf8,
            DecodeError::LengthExceedsLimit { .. } => ErrorCode::LimitExceeded,
            DecodeError::Graph(e) => e.code(),
            _ => ErrorCode::MalformedEncoding,
        }
    }
}

/// Error during serialization to either format.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("timestamp {epoch_us}us with offset {offset_min}min is outside years 0000-9999")]
    InvalidTimestamp { epoch_us: i64, offset_min: i16 },

    #[error("duration nanos {nanos} is not below one second")]
    InvalidDuration { nanos: u32 },

    #[error("zstd compression failed: {0}")]
    CompressionFailed(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
