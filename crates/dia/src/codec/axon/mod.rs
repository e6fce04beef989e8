//! Axon: the text encoding of a Dia value graph.
//!
//! ```text
//!   #0; {a: 5, b: #1; [true, "x"], c: 'Ref:Sequence 0x1'}
//! ```
//!
//! Every composite is prefixed with its address. A composite met again is
//! written as a quoted reference token naming the target's kind and
//! address in hex. Layout options only change whitespace.

mod cursor;
mod literal;
mod parse;
mod print;

use tracing::debug;

use crate::context::{DecodeState, DeserializerContext, SerializerContext};
use crate::error::{EncodeError, ParseError};
use crate::limits::MAX_DEPTH;
use crate::model::Document;
use crate::refs::ReferenceTracker;

pub use cursor::{Spanned, Token, TokenCursor, tokenize};

/// Spaces per nesting level with [`Indent::Spaces`].
pub const INDENT_WIDTH: usize = 4;

/// Indentation of multiline output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indent {
    /// Line breaks without indentation.
    #[default]
    None,
    /// [`INDENT_WIDTH`] spaces per level.
    Spaces,
    /// One tab per level.
    Tabs,
}

/// Options for Axon serialization and deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxonOptions {
    pub indent: Indent,
    /// Put each record field on its own line.
    pub multiline_records: bool,
    /// Put each sequence element on its own line.
    pub multiline_sequences: bool,
    /// Maximum composite nesting depth.
    pub max_depth: usize,
}

impl Default for AxonOptions {
    fn default() -> Self {
        Self::compact()
    }
}

impl AxonOptions {
    /// Everything on one line.
    pub fn compact() -> Self {
        Self {
            indent: Indent::None,
            multiline_records: false,
            multiline_sequences: false,
            max_depth: MAX_DEPTH,
        }
    }

    /// One entry per line, indented with spaces.
    pub fn pretty() -> Self {
        Self {
            indent: Indent::Spaces,
            multiline_records: true,
            multiline_sequences: true,
            max_depth: MAX_DEPTH,
        }
    }
}

/// Serializes a document to Axon text.
pub fn serialize(doc: &Document, options: &AxonOptions) -> Result<String, EncodeError> {
    let mut out = String::new();
    let mut tracker = ReferenceTracker::new();
    {
        let mut ctx = SerializerContext::new(&mut tracker, options.max_depth);
        print::write_value(&mut out, &doc.graph, &doc.root, options, &mut ctx)?;
    }

    debug!(
        format = "axon",
        nodes = tracker.len(),
        bytes = out.len(),
        "encoded document"
    );
    Ok(out)
}

/// Deserializes Axon text with default options.
pub fn deserialize(input: &str) -> Result<Document, ParseError> {
    deserialize_with(input, &AxonOptions::default())
}

/// Deserializes Axon text; only `max_depth` of the options applies.
pub fn deserialize_with(input: &str, options: &AxonOptions) -> Result<Document, ParseError> {
    let (tokens, end) = tokenize(input)?;
    let mut cursor = TokenCursor::new(&tokens, end);

    let mut state = DecodeState::new();
    let root = {
        let mut ctx = DeserializerContext::new(&mut state, options.max_depth);
        parse::parse_value(&mut cursor, &mut ctx)?
    };

    if !cursor.at_end() {
        return Err(ParseError::TrailingInput {
            position: cursor.position(),
        });
    }

    let doc = state.finish(root)?;
    debug!(
        format = "axon",
        bytes = input.len(),
        tokens = tokens.len(),
        nodes = doc.graph.len(),
        "decoded document"
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::*;
    use crate::error::{ErrorCode, GraphError, Position};
    use crate::model::{Graph, Kind, NodeId, Payload, Scalar, Value};

    fn example() -> Document {
        let mut graph = Graph::new();
        let root = graph.build_record(|r| {
            r.field("a", 5)
                .sequence_field("b", |s| s.item(true).item("x"))
        });
        Document::new(graph, root)
    }

    fn compact(doc: &Document) -> String {
        serialize(doc, &AxonOptions::compact()).unwrap()
    }

    fn roundtrip(doc: &Document) -> Document {
        deserialize(&compact(doc)).unwrap()
    }

    fn without_whitespace(s: &str) -> String {
        s.split_whitespace().collect()
    }

    #[test]
    fn test_example_text() {
        let doc = example();
        assert_eq!(compact(&doc), r#"#0; {a: 5, b: #1; [true, "x"]}"#);
        assert_eq!(roundtrip(&doc), doc);
    }

    #[test]
    fn test_pretty_layout() {
        let text = serialize(&example(), &AxonOptions::pretty()).unwrap();
        let expected = "#0; {\n    a: 5,\n    b: #1; [\n        true,\n        \"x\"\n    ]\n}";
        assert_eq!(text, expected);

        let tabs = AxonOptions {
            indent: Indent::Tabs,
            multiline_sequences: false,
            ..AxonOptions::pretty()
        };
        let text = serialize(&example(), &tabs).unwrap();
        assert_eq!(text, "#0; {\n\ta: 5,\n\tb: #1; [true, \"x\"]\n}");
    }

    #[test]
    fn test_multiline_only_adds_whitespace() {
        let mut graph = Graph::new();
        let shared = graph.build_sequence(|s| s.item(1).item(2));
        let root = graph.build_record(|r| {
            r.reference_field("left", shared)
                .reference_field("right", shared)
                .record_field("empty", |r| r)
                .sequence_field("nested", |s| s.sequence_item(|s| s.item(Value::symbol("deep"))))
                .self_field("me")
        });
        let doc = Document::new(graph, root);
        let flat = compact(&doc);

        for indent in [Indent::None, Indent::Spaces, Indent::Tabs] {
            for (records, sequences) in [(true, false), (false, true), (true, true)] {
                let options = AxonOptions {
                    indent,
                    multiline_records: records,
                    multiline_sequences: sequences,
                    ..AxonOptions::default()
                };
                let text = serialize(&doc, &options).unwrap();
                assert_eq!(without_whitespace(&text), without_whitespace(&flat));
                assert_eq!(deserialize(&text).unwrap(), doc);
            }
        }
    }

    #[test]
    fn test_scalars_roundtrip() {
        let big: BigInt = "123456789012345678901234567890".parse().unwrap();
        let mut graph = Graph::new();
        let root = graph.build_sequence(|s| {
            s.item(false)
                .item(true)
                .item(0)
                .item(i64::MIN)
                .item(-big.clone())
                .item(Value::decimal(1234, -2))
                .item(Value::decimal(-5, -3))
                .item(Value::decimal(big.clone(), 7))
                .item(Value::timestamp(1_710_513_000_000_000, 330))
                .item(Value::timestamp(-1_000, 0))
                .item(Value::duration(-2, 750_000_000))
                .item("")
                .item("tab\tquote\" backslash\\ \u{1F600}")
                .item(Value::symbol("sym"))
                .item(Value::symbol("true"))
                .item(Value::symbol("with space"))
                .item(Value::symbol("Ref:Record 0x0"))
                .item(Value::blob(vec![0u8, 1, 2, 255]))
                .item(Value::blob(Vec::new()))
        });
        let doc = Document::new(graph, root);
        assert_eq!(roundtrip(&doc), doc);
    }

    #[test]
    fn test_literal_forms() {
        let mut graph = Graph::new();
        let root = graph.build_sequence(|s| {
            s.item(Value::decimal(1234, -2))
                .item(Value::timestamp(1_710_513_000_000_000, 330))
                .item(Value::duration(1, 500_000_000))
                .item(Value::symbol("sym"))
                .item(Value::symbol("null"))
                .item(Value::blob(vec![0u8, 1, 2, 255]))
                .item(Value::null(Kind::Integer))
        });
        assert_eq!(
            compact(&Document::new(graph, root)),
            "#0; [12.34, 2024-03-15T20:00:00+05:30, 1.5s, sym, 'null', {{AAEC/w==}}, null.int]"
        );
    }

    #[test]
    fn test_tiny_decimal_stays_short() {
        let doc = deserialize("1E-50000000").unwrap();
        let text = compact(&doc);
        assert_eq!(text, "1E-50000000");
        assert_eq!(deserialize(&text).unwrap(), doc);

        let doc = Document::new(Graph::new(), Value::decimal(-3, i32::MIN));
        let text = compact(&doc);
        assert_eq!(text, "-3E-2147483648");
        assert_eq!(deserialize(&text).unwrap(), doc);
    }

    #[test]
    fn test_nulls_annotations_and_flags() {
        let mut graph = Graph::new();
        let root = graph.build_record(|r| {
            let mut r = r.annotate("point").annotate("two words").flag("flag.abc").flag("odd-flag");
            for kind in Kind::ALL {
                r = r.field(kind.keyword(), Value::null(kind));
            }
            r.field(
                "tagged",
                Scalar::new(Payload::Integer(BigInt::from(7)))
                    .with_annotation("unit")
                    .with_annotation("m"),
            )
            .field("null", Scalar::null(Kind::Record).with_annotation("x"))
            .field("quoted name", 1)
        });
        let doc = Document::new(graph, root);
        let text = compact(&doc);
        assert!(text.starts_with("point; 'two words'; #0; @flag.abc; @'odd-flag'; {"), "{text}");
        assert!(text.contains("tagged: unit; m; 7"), "{text}");

        let decoded = deserialize(&text).unwrap();
        assert_eq!(decoded, doc);
        let node = decoded.root_node().unwrap();
        assert_eq!(node.annotations, ["point", "two words"]);
        assert_eq!(node.flags(), ["flag.abc", "odd-flag"]);
        assert_eq!(decoded.graph.len(), 1);
    }

    #[test]
    fn test_shared_subgraph_identity() {
        let mut graph = Graph::new();
        let shared = graph.build_record(|r| r.field("v", 1));
        let root = graph.build_sequence(|s| s.reference_item(shared).reference_item(shared));
        let doc = Document::new(graph, root);

        let text = compact(&doc);
        assert_eq!(text, "#0; [#1; {v: 1}, 'Ref:Record 0x1']");

        let decoded = deserialize(&text).unwrap();
        let items = decoded.root_node().unwrap().as_sequence().unwrap();
        assert_eq!(items[0].as_node(), items[1].as_node());
        assert_eq!(decoded.graph.len(), 2);
    }

    #[test]
    fn test_self_reference_identity() {
        let mut graph = Graph::new();
        let root = graph.build_record(|r| r.field("name", "loop").self_field("self"));
        let doc = Document::new(graph, root);
        assert_eq!(compact(&doc), r#"#0; {name: "loop", self: 'Ref:Record 0x0'}"#);

        let decoded = roundtrip(&doc);
        let root = decoded.root.as_node().unwrap();
        let record = decoded.root_node().unwrap().as_record().unwrap();
        assert_eq!(record.get("self"), Some(&Value::Composite(root)));
    }

    #[test]
    fn test_forward_reference_resolves() {
        let doc = deserialize("#0; [#1; ['Ref:Record 0x2'], #2; {x: 'Ref:Sequence 0x1'}]").unwrap();
        let items = doc.root_node().unwrap().as_sequence().unwrap();
        let inner = doc.resolve(&items[0]).unwrap().as_sequence().unwrap();
        assert_eq!(inner[0].as_node(), items[1].as_node());
        let record = doc.resolve(&items[1]).unwrap().as_record().unwrap();
        assert_eq!(record.get("x").and_then(Value::as_node), items[0].as_node());
    }

    #[test]
    fn test_anonymous_composites_and_trailing_commas() {
        let doc = deserialize("{a: [1, 2,], b: null, 'c d': \"e\",}").unwrap();
        let record = doc.root_node().unwrap().as_record().unwrap();
        assert_eq!(doc.resolve(record.get("a").unwrap()).unwrap().len(), 2);
        assert_eq!(record.get("b"), Some(&Value::null(Kind::Record)));
        assert_eq!(record.get("c d"), Some(&Value::string("e")));
        assert_eq!(compact(&doc), r#"#0; {a: #1; [1, 2], b: null.record, 'c d': "e"}"#);
    }

    #[test]
    fn test_duplicate_field_keeps_last() {
        let doc = deserialize("#0; {a: 'Ref:Record 0x9', a: 1}").unwrap();
        let record = doc.root_node().unwrap().as_record().unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("a"), Some(&Value::from(1)));
    }

    #[test]
    fn test_unresolved_reference() {
        let err = deserialize("#0; [1, 'Ref:Record 0x5', 'Ref:Sequence 0x3']").unwrap_err();
        assert_eq!(
            err,
            ParseError::Graph(GraphError::UnresolvedReferences {
                addresses: vec![3, 5]
            })
        );
        assert_eq!(err.code(), ErrorCode::UnresolvedReference);
    }

    #[test]
    fn test_duplicate_address() {
        assert_eq!(
            deserialize("#0; [#1; [], #1; []]").unwrap_err(),
            ParseError::Graph(GraphError::DuplicateAddress { address: 1 })
        );
    }

    #[test]
    fn test_last_address_then_anonymous() {
        assert_eq!(
            deserialize("#18446744073709551615; [{}]").unwrap_err(),
            ParseError::Graph(GraphError::DuplicateAddress { address: usize::MAX })
        );
    }

    #[test]
    fn test_reference_kind_mismatch() {
        assert_eq!(
            deserialize("#0; [#1; {}, 'Ref:Sequence 0x1']").unwrap_err(),
            ParseError::Graph(GraphError::ReferenceKindMismatch {
                address: 1,
                expected: Kind::Sequence,
                found: Kind::Record,
            })
        );
        // Deferred references are checked when the resolvers run.
        assert!(matches!(
            deserialize("#0; ['Ref:Sequence 0x1', #1; {}]"),
            Err(ParseError::Graph(GraphError::ReferenceKindMismatch { .. }))
        ));
    }

    #[test]
    fn test_invalid_references() {
        assert!(matches!(
            deserialize("#0; [a; 'Ref:Record 0x0']"),
            Err(ParseError::InvalidReference { .. })
        ));
        let err = deserialize("#0; ['Ref:Int 0x0']").unwrap_err();
        assert!(matches!(err, ParseError::InvalidReference { .. }));
        assert_eq!(err.code(), ErrorCode::InvalidReferenceTarget);
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
        let shallow = AxonOptions {
            max_depth: 3,
            ..AxonOptions::default()
        };

        assert_eq!(
            serialize(&doc, &shallow).unwrap_err(),
            EncodeError::Graph(GraphError::DepthExceeded { max: 3 })
        );
        let text = compact(&doc);
        assert_eq!(
            deserialize_with(&text, &shallow).unwrap_err(),
            ParseError::Graph(GraphError::DepthExceeded { max: 3 })
        );
        assert_eq!(deserialize(&text).unwrap(), doc);
    }

    #[test]
    fn test_trailing_input() {
        assert_eq!(
            deserialize("#0; []\n 5").unwrap_err(),
            ParseError::TrailingInput {
                position: Position {
                    offset: 8,
                    line: 2,
                    column: 2
                }
            }
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            deserialize("").unwrap_err(),
            ParseError::UnexpectedEnd { expected: "value" }
        );
        assert!(matches!(
            deserialize("#0; {a 1}"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            deserialize("#0; [1 2]"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            deserialize("#0; @flag; 5"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            deserialize("#0; [1, "),
            Err(ParseError::UnexpectedEnd { .. })
        ));
        let err = deserialize("[\n  \"open").unwrap_err();
        assert_eq!(err.position().map(|p| (p.line, p.column)), Some((2, 3)));
    }

    #[test]
    fn test_unencodable_values() {
        let far_future = Document::scalar(Value::timestamp(i64::MAX / 2, 0));
        assert!(matches!(
            serialize(&far_future, &AxonOptions::default()),
            Err(EncodeError::InvalidTimestamp { .. })
        ));
        let bad_duration = Document::scalar(Value::duration(0, 1_000_000_000));
        assert_eq!(
            serialize(&bad_duration, &AxonOptions::default()).unwrap_err(),
            EncodeError::InvalidDuration {
                nanos: 1_000_000_000
            }
        );
        let mut graph = Graph::new();
        let root = graph.sequence();
        graph.push(root, NodeId(4)).unwrap();
        assert_eq!(
            serialize(&Document::new(graph, root), &AxonOptions::default()).unwrap_err(),
            EncodeError::Graph(GraphError::DanglingNode { node: NodeId(4) })
        );
    }
}
