//! Security limits and format constants.
//!
//! The decoders are designed to handle untrusted input; every allocation
//! driven by a length read from the input is checked against these bounds.

/// Magic bytes of an uncompressed Bion document.
pub const MAGIC_UNCOMPRESSED: &[u8; 4] = b"BION";

/// Magic bytes of a zstd-compressed Bion document.
pub const MAGIC_COMPRESSED: &[u8; 5] = b"BIONZ";

/// Current Bion format version.
pub const FORMAT_VERSION: u8 = 1;

/// Oldest Bion format version the decoder accepts.
pub const MIN_FORMAT_VERSION: u8 = 1;

/// Maximum bytes in an encoded LEB128 varint (64-bit payload).
pub const MAX_VARINT_BYTES: usize = 10;

/// Default ceiling on composite nesting for both codecs.
pub const MAX_DEPTH: usize = 512;

/// Maximum byte length of a string, symbol, field name or annotation.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Maximum byte length of a blob.
pub const MAX_BLOB_LEN: usize = 64 * 1024 * 1024;

/// Maximum byte length of a big integer mantissa.
pub const MAX_BIG_INT_BYTES: usize = 4096;

/// Maximum number of elements in a sequence or fields in a record.
pub const MAX_COLLECTION_LEN: usize = 16 * 1024 * 1024;

/// Maximum number of annotations or flags on one value.
pub const MAX_ANNOTATIONS: usize = 1024;

/// Maximum size of a decoded (decompressed) document.
pub const MAX_DOCUMENT_SIZE: usize = 256 * 1024 * 1024;

/// Default capacity of one segment of a chunked output buffer.
pub const DEFAULT_CHUNK_CAPACITY: usize = 64 * 1024;
