//! Text and binary encodings of a Dia document.
//!
//! - [`axon`]: human-readable text
//! - [`bion`]: compact binary with optional zstd compression
//!
//! Both codecs write every composite once and refer back to it by address.

pub mod axon;
pub mod bion;
pub mod chunk;
pub mod metadata;
pub mod primitives;

pub use axon::{AxonOptions, Indent, deserialize, deserialize_with, serialize};
pub use bion::{
    BionOptions, decode, decode_with_options, decompress, encode, encode_compressed,
    encode_compressed_with_options, encode_with_options,
};
pub use chunk::ChunkedBuffer;
pub use primitives::{Reader, Writer, zigzag_decode, zigzag_encode};
