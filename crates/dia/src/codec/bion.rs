//! Bion: the binary encoding of a Dia value graph.
//!
//! Document envelope:
//!
//! ```text
//!   "BION"  version:u8  value            uncompressed
//!   "BIONZ" size:varint zstd-frame       compressed
//! ```
//!
//! Each value is `type-byte [metadata varint] [annotation block] [payload]`
//! (see [`metadata`](crate::codec::metadata) for the type byte). Composites
//! are numbered in the order they are first written, starting at 0; a
//! later occurrence is written as a reference carrying that number.

use std::io::Read;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use tracing::debug;

use crate::codec::metadata::{
    FLAG_ANNOTATED, FLAG_CUSTOM, FLAG_NULL, FLAG_OVERFLOW, Tag, TypeByte,
};
use crate::codec::primitives::{Reader, Writer, zigzag_decode, zigzag_encode};
use crate::context::{DecodeState, DeserializerContext, Pending, SerializerContext};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{
    DEFAULT_CHUNK_CAPACITY, FORMAT_VERSION, MAGIC_COMPRESSED, MAGIC_UNCOMPRESSED, MAX_ANNOTATIONS,
    MAX_BIG_INT_BYTES, MAX_BLOB_LEN, MAX_COLLECTION_LEN, MAX_DEPTH, MAX_DOCUMENT_SIZE,
    MAX_STRING_LEN, MIN_FORMAT_VERSION,
};
use crate::model::{
    Body, Decimal, Document, Duration, Graph, Kind, NodeId, Payload, Scalar, Timestamp, Value,
};
use crate::refs::ReferenceTracker;

/// Options for encoding and decoding Bion documents.
#[derive(Debug, Clone, Copy)]
pub struct BionOptions {
    /// Maximum composite nesting depth.
    pub max_depth: usize,
    /// Capacity of each segment of the output buffer.
    pub chunk_capacity: usize,
}

impl Default for BionOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }
}

impl BionOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Decompresses a BIONZ document, returning the uncompressed BION bytes.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if input.len() < MAGIC_COMPRESSED.len() {
        return Err(DecodeError::UnexpectedEof {
            offset: input.len(),
            context: "magic",
        });
    }
    if !input.starts_with(MAGIC_COMPRESSED) {
        return Err(invalid_magic(input));
    }
    decompress_zstd(&input[MAGIC_COMPRESSED.len()..])
}

/// Decodes a document, compressed or not.
pub fn decode(input: &[u8]) -> Result<Document, DecodeError> {
    decode_with_options(input, &BionOptions::default())
}

/// Decodes a document with explicit options.
pub fn decode_with_options(input: &[u8], options: &BionOptions) -> Result<Document, DecodeError> {
    if input.len() < MAGIC_UNCOMPRESSED.len() {
        return Err(DecodeError::UnexpectedEof {
            offset: input.len(),
            context: "magic",
        });
    }

    if input.starts_with(MAGIC_COMPRESSED) {
        let decompressed = decompress_zstd(&input[MAGIC_COMPRESSED.len()..])?;
        decode_uncompressed(&decompressed, options)
    } else if input.starts_with(MAGIC_UNCOMPRESSED) {
        if input.len() > MAX_DOCUMENT_SIZE {
            return Err(DecodeError::LengthExceedsLimit {
                field: "document",
                len: input.len(),
                max: MAX_DOCUMENT_SIZE,
            });
        }
        decode_uncompressed(input, options)
    } else {
        Err(invalid_magic(input))
    }
}

fn invalid_magic(input: &[u8]) -> DecodeError {
    let mut found = [0u8; 4];
    found.copy_from_slice(&input[..4]);
    DecodeError::InvalidMagic { found }
}

fn decode_uncompressed(input: &[u8], options: &BionOptions) -> Result<Document, DecodeError> {
    let mut reader = Reader::new(input);
    reader.read_bytes(MAGIC_UNCOMPRESSED.len(), "magic")?;

    let version = reader.read_byte("version")?;
    if !(MIN_FORMAT_VERSION..=FORMAT_VERSION).contains(&version) {
        return Err(DecodeError::UnsupportedVersion { version });
    }

    let mut state = DecodeState::new();
    let root = {
        let mut ctx = DeserializerContext::new(&mut state, options.max_depth);
        decode_value(&mut reader, &mut ctx)?
    };

    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes {
            offset: reader.position(),
            trailing: reader.remaining_len(),
        });
    }

    let doc = state.finish(root)?;
    debug!(
        format = "bion",
        bytes = input.len(),
        nodes = doc.graph.len(),
        "decoded document"
    );
    Ok(doc)
}

fn decompress_zstd(compressed: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut reader = Reader::new(compressed);
    let declared_size = reader.read_length(MAX_DOCUMENT_SIZE, "uncompressed_size")?;

    let mut decoder = zstd::Decoder::new(reader.remaining())
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    // One byte past the declared size is enough to detect a lying header.
    let mut decompressed = Vec::with_capacity(declared_size);
    (&mut decoder)
        .take(declared_size as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    if decompressed.len() != declared_size {
        return Err(DecodeError::UncompressedSizeMismatch {
            declared: declared_size,
            actual: decompressed.len(),
        });
    }

    Ok(decompressed)
}

/// Decodes one value at the reader's position.
fn decode_value(
    reader: &mut Reader<'_>,
    ctx: &mut DeserializerContext<'_>,
) -> Result<Pending, DecodeError> {
    let offset = reader.position();
    let type_byte = TypeByte::from_byte(reader.read_byte("type")?, offset)?;
    let meta = if type_byte.has(FLAG_OVERFLOW) {
        reader.read_varint("metadata")?
    } else {
        0
    };

    match type_byte.tag {
        Tag::Reference => {
            let address = usize::try_from(meta).map_err(|_| DecodeError::OutOfRange {
                offset,
                field: "address",
            })?;
            let kind = if type_byte.has(FLAG_CUSTOM) {
                Kind::Sequence
            } else {
                Kind::Record
            };
            Ok(ctx.state().reference(address, kind)?)
        }
        Tag::Kind(kind) if kind.is_composite() && !type_byte.has(FLAG_NULL) => {
            let instance = decode_instance(reader, ctx, kind, type_byte, meta)?;
            decode_items(reader, ctx, &instance)?;
            Ok(Pending::Ready(Value::Composite(instance.node)))
        }
        Tag::Kind(kind) => {
            let scalar = decode_scalar(reader, kind, type_byte, meta, offset)?;
            Ok(Pending::Ready(Value::Scalar(scalar)))
        }
    }
}

/// A composite shell whose children are still to be read.
#[derive(Debug, Clone, Copy)]
struct Instance {
    node: NodeId,
    address: usize,
    kind: Kind,
    count: usize,
}

/// Reads a composite's annotations and flags and allocates its shell.
fn decode_instance(
    reader: &mut Reader<'_>,
    ctx: &mut DeserializerContext<'_>,
    kind: Kind,
    type_byte: TypeByte,
    meta: u64,
) -> Result<Instance, DecodeError> {
    let count = Reader::check_length(meta, MAX_COLLECTION_LEN, "collection")?;

    let state = ctx.state();
    let (node, address) = match kind {
        Kind::Record => state.open_record(None)?,
        _ => state.open_sequence(None)?,
    };

    if type_byte.has(FLAG_ANNOTATED) {
        let annotations = read_strings(reader, "annotation")?;
        let flags = read_strings(reader, "flag")?;
        let shell = state.node_mut(node)?;
        shell.annotations = annotations;
        for flag in flags {
            shell.add_flag(flag);
        }
    }

    Ok(Instance {
        node,
        address,
        kind,
        count,
    })
}

/// Reads a composite's children, then marks it bound.
fn decode_items(
    reader: &mut Reader<'_>,
    ctx: &mut DeserializerContext<'_>,
    instance: &Instance,
) -> Result<(), DecodeError> {
    {
        let mut child = ctx.next()?;
        for _ in 0..instance.count {
            match instance.kind {
                Kind::Record => {
                    let name = reader.read_string(MAX_STRING_LEN, "field name")?;
                    let value = decode_value(reader, &mut child)?;
                    child.state().insert_field(instance.node, name, value)?;
                }
                _ => {
                    let value = decode_value(reader, &mut child)?;
                    child.state().push_element(instance.node, value)?;
                }
            }
        }
    }
    ctx.state().close(instance.address);
    Ok(())
}

fn decode_scalar(
    reader: &mut Reader<'_>,
    kind: Kind,
    type_byte: TypeByte,
    meta: u64,
    offset: usize,
) -> Result<Scalar, DecodeError> {
    let annotations = if type_byte.has(FLAG_ANNOTATED) {
        read_strings(reader, "annotation")?
    } else {
        Vec::new()
    };
    let custom = type_byte.has(FLAG_CUSTOM);

    let payload = if type_byte.has(FLAG_NULL) {
        Payload::Null(kind)
    } else {
        match kind {
            Kind::Boolean => Payload::Bool(custom),
            Kind::Integer => Payload::Integer(read_mantissa(reader, custom, meta)?),
            Kind::Decimal => {
                let exponent = reader.read_signed_varint("decimal exponent")?;
                let exponent = i32::try_from(exponent).map_err(|_| DecodeError::OutOfRange {
                    offset,
                    field: "decimal exponent",
                })?;
                let mantissa = read_mantissa(reader, custom, meta)?;
                Payload::Decimal(Decimal { mantissa, exponent })
            }
            Kind::Timestamp => {
                let epoch_us = reader.read_signed_varint("timestamp")?;
                let offset_min = reader.read_signed_varint("timestamp offset")?;
                let offset_min =
                    i16::try_from(offset_min).map_err(|_| DecodeError::OutOfRange {
                        offset,
                        field: "timestamp offset",
                    })?;
                Payload::Timestamp(Timestamp::new(epoch_us, offset_min))
            }
            Kind::Duration => {
                let seconds = reader.read_signed_varint("duration")?;
                let nanos = reader.read_varint("duration nanos")?;
                let nanos = u32::try_from(nanos)
                    .ok()
                    .filter(|n| *n < Duration::NANOS_PER_SECOND)
                    .ok_or(DecodeError::OutOfRange {
                        offset,
                        field: "duration nanos",
                    })?;
                Payload::Duration(Duration::new(seconds, nanos))
            }
            Kind::String => {
                let len = Reader::check_length(meta, MAX_STRING_LEN, "string")?;
                Payload::String(reader.read_str(len, "string")?)
            }
            Kind::Symbol => {
                let len = Reader::check_length(meta, MAX_STRING_LEN, "symbol")?;
                Payload::Symbol(reader.read_str(len, "symbol")?)
            }
            Kind::Blob => {
                let len = Reader::check_length(meta, MAX_BLOB_LEN, "blob")?;
                Payload::Blob(reader.read_bytes(len, "blob")?.to_vec())
            }
            Kind::Sequence | Kind::Record => {
                return Err(DecodeError::InvalidFlags {
                    offset,
                    kind: kind.name(),
                    flags: type_byte.flags(),
                });
            }
        }
    };

    Ok(Scalar {
        annotations,
        payload,
    })
}

fn read_mantissa(reader: &mut Reader<'_>, custom: bool, meta: u64) -> Result<BigInt, DecodeError> {
    if custom {
        let len = Reader::check_length(meta, MAX_BIG_INT_BYTES, "big integer")?;
        reader.read_big_int(len, "big integer")
    } else {
        Ok(BigInt::from(zigzag_decode(meta)))
    }
}

fn read_strings(reader: &mut Reader<'_>, field: &'static str) -> Result<Vec<String>, DecodeError> {
    let count = reader.read_length(MAX_ANNOTATIONS, field)?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(reader.read_string(MAX_STRING_LEN, field)?);
    }
    Ok(out)
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a document to uncompressed Bion.
pub fn encode(doc: &Document) -> Result<Vec<u8>, EncodeError> {
    encode_with_options(doc, &BionOptions::default())
}

/// Encodes a document to uncompressed Bion with explicit options.
pub fn encode_with_options(doc: &Document, options: &BionOptions) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::with_chunk_capacity(options.chunk_capacity);
    writer.write_bytes(MAGIC_UNCOMPRESSED);
    writer.write_byte(FORMAT_VERSION);

    let mut tracker = ReferenceTracker::new();
    {
        let mut ctx = SerializerContext::new(&mut tracker, options.max_depth);
        encode_value(&mut writer, &doc.graph, &doc.root, &mut ctx)?;
    }

    debug!(
        format = "bion",
        nodes = tracker.len(),
        bytes = writer.len(),
        "encoded document"
    );
    Ok(writer.into_bytes())
}

/// Encodes a document to zstd-compressed Bion.
pub fn encode_compressed(doc: &Document, level: i32) -> Result<Vec<u8>, EncodeError> {
    encode_compressed_with_options(doc, level, &BionOptions::default())
}

/// Encodes a document to zstd-compressed Bion with explicit options.
pub fn encode_compressed_with_options(
    doc: &Document,
    level: i32,
    options: &BionOptions,
) -> Result<Vec<u8>, EncodeError> {
    let uncompressed = encode_with_options(doc, options)?;

    let compressed = zstd::encode_all(uncompressed.as_slice(), level)
        .map_err(|e| EncodeError::CompressionFailed(e.to_string()))?;

    let mut writer = Writer::new();
    writer.write_bytes(MAGIC_COMPRESSED);
    writer.write_varint(uncompressed.len() as u64);
    writer.write_bytes(&compressed);

    Ok(writer.into_bytes())
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), EncodeError> {
    if len > max {
        return Err(EncodeError::LengthExceedsLimit { field, len, max });
    }
    Ok(())
}

/// Writes the type byte, the metadata varint when non-zero, and the
/// annotation list when the byte says so.
fn write_head(writer: &mut Writer, type_byte: TypeByte, meta: u64, annotations: &[String]) {
    let type_byte = type_byte.with(FLAG_OVERFLOW, meta != 0);
    writer.write_byte(type_byte.to_byte());
    if meta != 0 {
        writer.write_varint(meta);
    }
    if type_byte.has(FLAG_ANNOTATED) {
        write_strings(writer, annotations);
    }
}

fn write_strings(writer: &mut Writer, strings: &[String]) {
    writer.write_varint(strings.len() as u64);
    for s in strings {
        writer.write_string(s);
    }
}

fn check_strings(field: &'static str, strings: &[String]) -> Result<(), EncodeError> {
    check_len(field, strings.len(), MAX_ANNOTATIONS)?;
    for s in strings {
        check_len(field, s.len(), MAX_STRING_LEN)?;
    }
    Ok(())
}

fn encode_value(
    writer: &mut Writer,
    graph: &Graph,
    value: &Value,
    ctx: &mut SerializerContext<'_>,
) -> Result<(), EncodeError> {
    let id = match value {
        Value::Scalar(scalar) => return encode_scalar(writer, scalar),
        Value::Composite(id) => *id,
    };

    let node = graph.get(id)?;
    let (address, first) = ctx.register(id);
    if !first {
        let type_byte = TypeByte::reference().with(FLAG_CUSTOM, node.kind() == Kind::Sequence);
        write_head(writer, type_byte, address as u64, &[]);
        return Ok(());
    }

    check_strings("annotation", &node.annotations)?;
    check_strings("flag", node.flags())?;
    check_len("collection", node.len(), MAX_COLLECTION_LEN)?;

    let annotated = !node.annotations.is_empty() || !node.flags().is_empty();
    let type_byte = TypeByte::kind(node.kind()).with(FLAG_ANNOTATED, annotated);
    write_head(writer, type_byte, node.len() as u64, &node.annotations);
    if annotated {
        write_strings(writer, node.flags());
    }

    let mut child = ctx.next()?;
    match &node.body {
        Body::Record(record) => {
            for (name, value) in record.iter() {
                check_len("field name", name.len(), MAX_STRING_LEN)?;
                writer.write_string(name);
                encode_value(writer, graph, value, &mut child)?;
            }
        }
        Body::Sequence(items) => {
            for value in items {
                encode_value(writer, graph, value, &mut child)?;
            }
        }
    }
    Ok(())
}

/// Mantissa metadata: zigzag value when it fits an i64, else the byte
/// length of its two's complement form (with CUSTOM set).
fn mantissa_meta(n: &BigInt) -> Result<(u64, Option<Vec<u8>>), EncodeError> {
    match n.to_i64() {
        Some(v) => Ok((zigzag_encode(v), None)),
        None => {
            let bytes = n.to_signed_bytes_le();
            check_len("big integer", bytes.len(), MAX_BIG_INT_BYTES)?;
            Ok((bytes.len() as u64, Some(bytes)))
        }
    }
}

fn encode_scalar(writer: &mut Writer, scalar: &Scalar) -> Result<(), EncodeError> {
    check_strings("annotation", &scalar.annotations)?;
    let annotations = &scalar.annotations;
    let type_byte = TypeByte::kind(scalar.payload.kind())
        .with(FLAG_ANNOTATED, !annotations.is_empty());

    match &scalar.payload {
        Payload::Null(_) => write_head(writer, type_byte.with(FLAG_NULL, true), 0, annotations),
        Payload::Bool(b) => write_head(writer, type_byte.with(FLAG_CUSTOM, *b), 0, annotations),
        Payload::Integer(n) => {
            let (meta, big) = mantissa_meta(n)?;
            write_head(writer, type_byte.with(FLAG_CUSTOM, big.is_some()), meta, annotations);
            if let Some(bytes) = big {
                writer.write_bytes(&bytes);
            }
        }
        Payload::Decimal(d) => {
            let (meta, big) = mantissa_meta(&d.mantissa)?;
            write_head(writer, type_byte.with(FLAG_CUSTOM, big.is_some()), meta, annotations);
            writer.write_signed_varint(d.exponent as i64);
            if let Some(bytes) = big {
                writer.write_bytes(&bytes);
            }
        }
        Payload::Timestamp(ts) => {
            write_head(writer, type_byte, 0, annotations);
            writer.write_signed_varint(ts.epoch_us);
            writer.write_signed_varint(ts.offset_min as i64);
        }
        Payload::Duration(d) => {
            if d.nanos >= Duration::NANOS_PER_SECOND {
                return Err(EncodeError::InvalidDuration { nanos: d.nanos });
            }
            write_head(writer, type_byte, 0, annotations);
            writer.write_signed_varint(d.seconds);
            writer.write_varint(d.nanos as u64);
        }
        Payload::String(s) | Payload::Symbol(s) => {
            check_len("string", s.len(), MAX_STRING_LEN)?;
            write_head(writer, type_byte, s.len() as u64, annotations);
            writer.write_bytes(s.as_bytes());
        }
        Payload::Blob(bytes) => {
            check_len("blob", bytes.len(), MAX_BLOB_LEN)?;
            write_head(writer, type_byte, bytes.len() as u64, annotations);
            writer.write_bytes(bytes);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    fn example() -> Document {
        let mut graph = Graph::new();
        let root = graph.build_record(|r| {
            r.field("a", 5)
                .sequence_field("b", |s| s.item(true).item("x"))
        });
        Document::new(graph, root)
    }

    fn roundtrip(doc: &Document) -> Document {
        let bytes = encode(doc).unwrap();
        decode(&bytes).unwrap()
    }

    #[test]
    fn test_example_layout() {
        let bytes = encode(&example()).unwrap();
        let expected: &[u8] = &[
            b'B', b'I', b'O', b'N', 1, // envelope
            0x8A, 2, // record, 2 fields
            1, b'a', 0x82, 10, // a: 5 (zigzag)
            1, b'b', 0x89, 2, // b: sequence, 2 items
            0x41, // true
            0x86, 1, b'x', // "x"
        ];
        assert_eq!(bytes, expected);
        assert_eq!(roundtrip(&example()), example());
    }

    #[test]
    fn test_scalars_roundtrip() {
        let big: BigInt = "123456789012345678901234567890".parse().unwrap();
        let mut graph = Graph::new();
        let root = graph.build_sequence(|s| {
            s.item(false)
                .item(true)
                .item(0)
                .item(-1)
                .item(i64::MIN)
                .item(big.clone())
                .item(-big.clone())
                .item(Value::decimal(1234, -2))
                .item(Value::decimal(5, 0))
                .item(Value::decimal(big.clone(), 7))
                .item(Value::timestamp(1_710_513_000_000_000, 330))
                .item(Value::duration(-2, 750_000_000))
                .item("")
                .item("unicode: \u{1F600}")
                .item(Value::symbol("sym"))
                .item(Value::blob(vec![0u8, 1, 2, 255]))
                .item(Value::blob(Vec::new()))
        });
        let doc = Document::new(graph, root);
        assert_eq!(roundtrip(&doc), doc);
    }

    #[test]
    fn test_nulls_and_annotations() {
        let mut graph = Graph::new();
        let root = graph.build_record(|r| {
            let mut r = r.annotate("point").annotate("point").flag("flag.abc");
            for kind in Kind::ALL {
                r = r.field(kind.keyword(), Value::null(kind));
            }
            r.field(
                "tagged",
                Scalar::new(Payload::Integer(BigInt::from(7)))
                    .with_annotation("unit")
                    .with_annotation("m"),
            )
            .field("tagged_null", Scalar::null(Kind::Record).with_annotation("x"))
        });
        let doc = Document::new(graph, root);
        let decoded = roundtrip(&doc);
        assert_eq!(decoded, doc);
        let node = decoded.root_node().unwrap();
        assert_eq!(node.annotations, ["point", "point"]);
        assert_eq!(node.flags(), ["flag.abc"]);
        // A null record is a scalar without identity.
        assert_eq!(decoded.graph.len(), 1);
    }

    #[test]
    fn test_shared_subgraph_written_once() {
        let mut graph = Graph::new();
        let shared = graph.build_record(|r| r.field("payload", "x".repeat(100)));
        let root = graph.build_sequence(|s| s.reference_item(shared).reference_item(shared));
        let doc = Document::new(graph, root);

        let bytes = encode(&doc).unwrap();
        assert!(bytes.len() < 150, "shared record was written twice");

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, doc);
        let items = decoded.root_node().unwrap().as_sequence().unwrap();
        assert_eq!(items[0].as_node(), items[1].as_node());
        assert_eq!(decoded.graph.len(), 2);
    }

    #[test]
    fn test_self_reference() {
        let mut graph = Graph::new();
        let root = graph.build_record(|r| r.field("name", "loop").self_field("self"));
        let doc = Document::new(graph, root);

        let decoded = roundtrip(&doc);
        assert_eq!(decoded, doc);
        let root = decoded.root.as_node().unwrap();
        let record = decoded.root_node().unwrap().as_record().unwrap();
        assert_eq!(record.get("self"), Some(&Value::Composite(root)));
    }

    #[test]
    fn test_scalar_root() {
        let doc = Document::scalar("just a string");
        assert_eq!(roundtrip(&doc), doc);
    }

    #[test]
    fn test_compressed_roundtrip() {
        let doc = example();
        let compressed = encode_compressed(&doc, 3).unwrap();
        assert_eq!(&compressed[..5], MAGIC_COMPRESSED);
        assert_eq!(decode(&compressed).unwrap(), doc);
        assert_eq!(decompress(&compressed).unwrap(), encode(&doc).unwrap());
    }

    #[test]
    fn test_chunk_capacity_does_not_change_output() {
        let doc = example();
        let options = BionOptions {
            chunk_capacity: 3,
            ..BionOptions::default()
        };
        assert_eq!(encode_with_options(&doc, &options).unwrap(), encode(&doc).unwrap());
    }

    #[test]
    fn test_invalid_magic() {
        assert!(matches!(
            decode(b"XXXX\x01"),
            Err(DecodeError::InvalidMagic { found }) if &found == b"XXXX"
        ));
        assert!(matches!(decode(b"BI"), Err(DecodeError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_unsupported_version() {
        let result = decode(b"BION\x63\x01");
        assert!(matches!(result, Err(DecodeError::UnsupportedVersion { version: 99 })));
    }

    #[test]
    fn test_truncated_input_rejected() {
        let bytes = encode(&example()).unwrap();
        for len in 0..bytes.len() {
            assert!(decode(&bytes[..len]).is_err(), "prefix of {len} bytes decoded");
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = encode(&example()).unwrap();
        bytes.push(0x01);
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::TrailingBytes { trailing: 1, .. })
        ));
    }

    #[test]
    fn test_unresolved_reference() {
        // sequence [ref 5]
        let bytes = [b'B', b'I', b'O', b'N', 1, 0x89, 1, 0x8F, 5];
        let err = decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Graph(GraphError::UnresolvedReferences { addresses: vec![5] })
        );
        assert_eq!(err.code().code(), "E002");
    }

    #[test]
    fn test_reference_kind_mismatch() {
        // record {a: sequence-ref 0}, but address 0 is the record itself
        let bytes = [b'B', b'I', b'O', b'N', 1, 0x8A, 1, 1, b'a', 0x4F];
        assert_eq!(
            decode(&bytes).unwrap_err(),
            DecodeError::Graph(GraphError::ReferenceKindMismatch {
                address: 0,
                expected: Kind::Sequence,
                found: Kind::Record,
            })
        );
    }

    #[test]
    fn test_invalid_utf8_reports_offset() {
        let bytes = [b'B', b'I', b'O', b'N', 1, 0x86, 2, 0xC3, 0x28];
        assert_eq!(
            decode(&bytes).unwrap_err(),
            DecodeError::InvalidUtf8 {
                offset: 7,
                field: "string"
            }
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut graph = Graph::new();
        let mut inner = graph.sequence();
        for _ in 0..9 {
            let outer = graph.sequence();
            graph.push(outer, inner).unwrap();
            inner = outer;
        }
        let doc = Document::new(graph, inner);
        let shallow = BionOptions {
            max_depth: 3,
            ..BionOptions::default()
        };

        assert_eq!(
            encode_with_options(&doc, &shallow).unwrap_err(),
            EncodeError::Graph(GraphError::DepthExceeded { max: 3 })
        );
        let bytes = encode(&doc).unwrap();
        assert_eq!(
            decode_with_options(&bytes, &shallow).unwrap_err(),
            DecodeError::Graph(GraphError::DepthExceeded { max: 3 })
        );
        assert_eq!(decode(&bytes).unwrap(), doc);
    }

    #[test]
    fn test_dangling_node_rejected() {
        let mut graph = Graph::new();
        let root = graph.sequence();
        graph.push(root, NodeId(9)).unwrap();
        let doc = Document::new(graph, root);
        assert_eq!(
            encode(&doc).unwrap_err(),
            EncodeError::Graph(GraphError::DanglingNode { node: NodeId(9) })
        );
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let doc = Document::scalar(Value::duration(1, 1_000_000_000));
        assert!(matches!(encode(&doc), Err(EncodeError::InvalidDuration { .. })));
    }
}
