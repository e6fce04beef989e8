//! Axon serializer.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::literal::{
    format_decimal, format_duration, is_plain_flag, write_name, write_quoted, write_reference,
    write_symbol,
};
use super::{AxonOptions, INDENT_WIDTH, Indent};
use crate::context::SerializerContext;
use crate::error::EncodeError;
use crate::model::{Body, Duration, Graph, Payload, Scalar, Value};
use crate::util::format_timestamp;

/// Writes one value, recursing into composites not yet written.
pub(super) fn write_value(
    out: &mut String,
    graph: &Graph,
    value: &Value,
    options: &AxonOptions,
    ctx: &mut SerializerContext<'_>,
) -> Result<(), EncodeError> {
    let id = match value {
        Value::Scalar(scalar) => return write_scalar(out, scalar),
        Value::Composite(id) => *id,
    };

    let node = graph.get(id)?;
    let (address, first) = ctx.register(id);
    if !first {
        write_reference(out, node.kind(), address);
        return Ok(());
    }

    write_annotations(out, &node.annotations);
    out.push('#');
    out.push_str(&address.to_string());
    out.push_str("; ");
    for flag in node.flags() {
        out.push('@');
        if is_plain_flag(flag) {
            out.push_str(flag);
        } else {
            write_quoted(out, flag, '\'');
        }
        out.push_str("; ");
    }

    let level = ctx.depth();
    let mut child = ctx.next()?;
    match &node.body {
        Body::Record(record) => {
            let layout = Layout::new(options.indent, options.multiline_records, level);
            out.push('{');
            layout.entries(out, record.iter(), |out, (name, value)| {
                write_name(out, name);
                out.push_str(": ");
                write_value(out, graph, value, options, &mut child)
            })?;
            out.push('}');
        }
        Body::Sequence(items) => {
            let layout = Layout::new(options.indent, options.multiline_sequences, level);
            out.push('[');
            layout.entries(out, items.iter(), |out, value| {
                write_value(out, graph, value, options, &mut child)
            })?;
            out.push(']');
        }
    }
    Ok(())
}

fn write_annotations(out: &mut String, annotations: &[String]) {
    for annotation in annotations {
        write_name(out, annotation);
        out.push_str("; ");
    }
}

fn write_scalar(out: &mut String, scalar: &Scalar) -> Result<(), EncodeError> {
    write_annotations(out, &scalar.annotations);
    match &scalar.payload {
        Payload::Null(kind) => {
            out.push_str("null.");
            out.push_str(kind.keyword());
        }
        Payload::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Payload::Integer(n) => out.push_str(&n.to_string()),
        Payload::Decimal(d) => out.push_str(&format_decimal(d)),
        Payload::Timestamp(ts) => {
            let text = format_timestamp(*ts).ok_or(EncodeError::InvalidTimestamp {
                epoch_us: ts.epoch_us,
                offset_min: ts.offset_min,
            })?;
            out.push_str(&text);
        }
        Payload::Duration(d) => {
            if d.nanos >= Duration::NANOS_PER_SECOND {
                return Err(EncodeError::InvalidDuration { nanos: d.nanos });
            }
            out.push_str(&format_duration(*d));
        }
        Payload::String(s) => write_quoted(out, s, '"'),
        Payload::Symbol(s) => write_symbol(out, s),
        Payload::Blob(bytes) => {
            out.push_str("{{");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("}}");
        }
    }
    Ok(())
}

/// Placement of the entries of one composite.
#[derive(Debug, Clone, Copy)]
struct Layout {
    indent: Indent,
    multiline: bool,
    level: usize,
}

impl Layout {
    fn new(indent: Indent, multiline: bool, level: usize) -> Self {
        Self {
            indent,
            multiline,
            level,
        }
    }

    fn break_line(&self, out: &mut String, level: usize) {
        out.push('\n');
        match self.indent {
            Indent::None => {}
            Indent::Spaces => out.extend(std::iter::repeat_n(' ', level * INDENT_WIDTH)),
            Indent::Tabs => out.extend(std::iter::repeat_n('\t', level)),
        }
    }

    /// Writes comma-separated entries between the already written opener
    /// and the closer the caller writes next.
    fn entries<T>(
        &self,
        out: &mut String,
        items: impl Iterator<Item = T>,
        mut write_item: impl FnMut(&mut String, T) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        let mut any = false;
        for item in items {
            if any {
                out.push(',');
                if !self.multiline {
                    out.push(' ');
                }
            }
            if self.multiline {
                self.break_line(out, self.level + 1);
            }
            write_item(out, item)?;
            any = true;
        }
        if any && self.multiline {
            self.break_line(out, self.level);
        }
        Ok(())
    }
}
