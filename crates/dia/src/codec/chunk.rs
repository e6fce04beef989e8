//! Segmented output buffer for binary encoding.
//!
//! Output is appended to fixed-capacity chunks so that a large document
//! never forces one big buffer to be reallocated and copied while it
//! grows. The chunks are joined once, when the encoding is complete.

use std::io;

use crate::limits::DEFAULT_CHUNK_CAPACITY;

/// Append-only byte buffer made of fixed-capacity chunks.
#[derive(Debug, Clone)]
pub struct ChunkedBuffer {
    chunks: Vec<Vec<u8>>,
    chunk_capacity: usize,
    len: usize,
}

impl Default for ChunkedBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_CAPACITY)
    }
}

impl ChunkedBuffer {
    /// Creates an empty buffer; a capacity of 0 is treated as 1.
    pub fn new(chunk_capacity: usize) -> Self {
        Self {
            chunks: Vec::new(),
            chunk_capacity: chunk_capacity.max(1),
            len: 0,
        }
    }

    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    /// Total number of bytes written.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chunks allocated so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the chunk with room left, allocating a new one if the last
    /// is full.
    fn tail(&mut self) -> &mut Vec<u8> {
        let full = self
            .chunks
            .last()
            .is_none_or(|chunk| chunk.len() == self.chunk_capacity);
        if full {
            self.chunks.push(Vec::with_capacity(self.chunk_capacity));
        }
        let last = self.chunks.len() - 1;
        &mut self.chunks[last]
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.tail().push(byte);
        self.len += 1;
    }

    /// Appends bytes, splitting them across chunk boundaries.
    pub fn extend_from_slice(&mut self, mut bytes: &[u8]) {
        self.len += bytes.len();
        while !bytes.is_empty() {
            let capacity = self.chunk_capacity;
            let tail = self.tail();
            let room = capacity - tail.len();
            let (head, rest) = bytes.split_at(room.min(bytes.len()));
            tail.extend_from_slice(head);
            bytes = rest;
        }
    }

    /// Iterates the filled chunks in order.
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.chunks.iter().map(Vec::as_slice)
    }

    /// Joins the chunks into one contiguous buffer.
    pub fn into_vec(self) -> Vec<u8> {
        if self.chunks.len() == 1 {
            return self.chunks.into_iter().next().unwrap_or_default();
        }
        let mut out = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Writes every chunk to `sink` in order.
    pub fn write_to<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        for chunk in &self.chunks {
            sink.write_all(chunk)?;
        }
        Ok(())
    }
}

impl io::Write for ChunkedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_boundary_lengths() {
        let cap = 16;
        for len in [0, 1, cap - 1, cap, cap + 1, 3 * cap + 5] {
            let data = pattern(len);
            let mut buf = ChunkedBuffer::new(cap);
            buf.extend_from_slice(&data);
            assert_eq!(buf.len(), len);
            assert_eq!(buf.chunk_count(), len.div_ceil(cap), "len {len}");
            assert!(buf.chunks().all(|c| c.len() <= cap));
            assert_eq!(buf.into_vec(), data, "len {len}");
        }
    }

    #[test]
    fn test_mixed_writes() {
        let data = pattern(100);
        let mut buf = ChunkedBuffer::new(7);
        let (a, b) = data.split_at(40);
        for byte in a {
            buf.push(*byte);
        }
        buf.extend_from_slice(b);

        let mut sink = Vec::new();
        buf.write_to(&mut sink).unwrap();
        assert_eq!(sink, data);
        assert_eq!(buf.into_vec(), data);
    }

    #[test]
    fn test_io_write() {
        use std::io::Write;

        let mut buf = ChunkedBuffer::new(4);
        write!(buf, "hello, chunks").unwrap();
        assert_eq!(buf.into_vec(), b"hello, chunks");
    }

    #[test]
    fn test_zero_capacity() {
        let mut buf = ChunkedBuffer::new(0);
        buf.extend_from_slice(b"abc");
        assert_eq!(buf.chunk_capacity(), 1);
        assert_eq!(buf.chunk_count(), 3);
        assert_eq!(buf.into_vec(), b"abc");
    }
}
