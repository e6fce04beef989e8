//! Primitive encoding/decoding for the Bion binary format.
//!
//! Implements varint, signed varint (zigzag), strings and big integers.

use num_bigint::BigInt;

use crate::codec::chunk::ChunkedBuffer;
use crate::error::DecodeError;
use crate::limits::MAX_VARINT_BYTES;

// =============================================================================
// DECODING
// =============================================================================

/// Reader for decoding binary data.
///
/// Wraps a byte slice and provides methods for reading primitives
/// with bounds checking. Every error carries the offset it occurred at.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let Some(&byte) = self.data.get(self.pos) else {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                context,
            });
        };
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                context,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads an unsigned varint (LEB128).
    #[inline]
    pub fn read_varint(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        let start = self.pos;
        let mut result: u64 = 0;
        let mut shift = 0;

        for _ in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte(context)?;
            let value = (byte & 0x7F) as u64;

            if shift == 63 && value > 1 {
                return Err(DecodeError::VarintOverflow { offset: start });
            }

            result |= value << shift;

            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }

        Err(DecodeError::VarintTooLong { offset: start })
    }

    /// Reads a signed varint (zigzag encoded).
    pub fn read_signed_varint(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        let unsigned = self.read_varint(context)?;
        Ok(zigzag_decode(unsigned))
    }

    /// Reads a varint that must fit a `usize` length or count, checked
    /// against `max`.
    pub fn read_length(&mut self, max: usize, field: &'static str) -> Result<usize, DecodeError> {
        let len = self.read_varint(field)?;
        Self::check_length(len, max, field)
    }

    /// Checks a length already read from metadata against `max`.
    pub fn check_length(len: u64, max: usize, field: &'static str) -> Result<usize, DecodeError> {
        match usize::try_from(len) {
            Ok(len) if len <= max => Ok(len),
            _ => Err(DecodeError::LengthExceedsLimit {
                field,
                len: usize::try_from(len).unwrap_or(usize::MAX),
                max,
            }),
        }
    }

    /// Reads `len` bytes as UTF-8.
    pub fn read_str(&mut self, len: usize, field: &'static str) -> Result<String, DecodeError> {
        let offset = self.pos;
        let bytes = self.read_bytes(len, field)?;
        std::str::from_utf8(bytes)
            .map(|s| s.to_string())
            .map_err(|_| DecodeError::InvalidUtf8 { offset, field })
    }

    /// Reads a length-prefixed UTF-8 string.
    #[inline]
    pub fn read_string(&mut self, max_len: usize, field: &'static str) -> Result<String, DecodeError> {
        let len = self.read_length(max_len, field)?;
        self.read_str(len, field)
    }

    /// Reads `len` bytes of little-endian two's complement integer.
    pub fn read_big_int(&mut self, len: usize, context: &'static str) -> Result<BigInt, DecodeError> {
        let bytes = self.read_bytes(len, context)?;
        Ok(BigInt::from_signed_bytes_le(bytes))
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data into a [`ChunkedBuffer`].
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: ChunkedBuffer,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new writer with the given chunk capacity.
    pub fn with_chunk_capacity(chunk_capacity: usize) -> Self {
        Self {
            buf: ChunkedBuffer::new(chunk_capacity),
        }
    }

    /// Returns the written bytes as one contiguous buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_vec()
    }

    /// Returns the underlying chunked buffer.
    pub fn into_buffer(self) -> ChunkedBuffer {
        self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes an unsigned varint (LEB128).
    #[inline]
    pub fn write_varint(&mut self, mut value: u64) {
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf[len] = byte;
            len += 1;
            if value == 0 {
                break;
            }
        }
        self.buf.extend_from_slice(&buf[..len]);
    }

    /// Writes a signed varint (zigzag encoded).
    pub fn write_signed_varint(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, s: &str) {
        self.write_varint(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }
}

// =============================================================================
// ZIGZAG ENCODING
// =============================================================================

/// Encodes a signed integer using zigzag encoding.
///
/// Maps negative numbers to odd positive numbers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Decodes a zigzag-encoded unsigned integer back to signed.
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}
