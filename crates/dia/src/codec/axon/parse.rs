//! Recursive-descent Axon parser over a [`TokenCursor`].

use super::cursor::{Token, TokenCursor};
use super::literal::{
    is_plain_identifier, parse_decimal, parse_duration, parse_integer, parse_reference,
};
use crate::context::{DeserializerContext, Pending};
use crate::error::{ParseError, Position};
use crate::model::{Kind, Payload, Scalar, Value};
use crate::util::parse_timestamp;

fn unexpected(cursor: &mut TokenCursor<'_>, expected: &'static str) -> ParseError {
    match cursor.advance() {
        Some(s) => ParseError::UnexpectedToken {
            position: s.position,
            expected,
            found: s.token.describe(),
        },
        None => ParseError::UnexpectedEnd { expected },
    }
}

fn invalid(position: Position, kind: &'static str, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidLiteral {
        position,
        kind,
        reason: reason.into(),
    }
}

fn is_ident_word(word: &str) -> bool {
    word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

/// Parses one value: annotations, then a composite, reference or scalar.
///
/// On failure the cursor is put back where the value started. Shells
/// already opened in the decode state stay allocated, so the error still
/// ends the decode.
pub(super) fn parse_value(
    cursor: &mut TokenCursor<'_>,
    ctx: &mut DeserializerContext<'_>,
) -> Result<Pending, ParseError> {
    let mark = cursor.mark();
    let parsed = parse_entry(cursor, ctx);
    if parsed.is_err() {
        cursor.reset(mark);
    }
    parsed
}

fn parse_entry(
    cursor: &mut TokenCursor<'_>,
    ctx: &mut DeserializerContext<'_>,
) -> Result<Pending, ParseError> {
    let annotations = parse_annotations(cursor);
    let position = cursor.position();

    if let Some(Token::Quoted { raw, .. }) = cursor.peek() {
        if let Some(parsed) = parse_reference(raw) {
            cursor.advance();
            let invalid_reference =
                |reason: String| ParseError::InvalidReference { position, reason };
            if !annotations.is_empty() {
                return Err(invalid_reference("a reference cannot be annotated".to_string()));
            }
            let (kind, address) = parsed.map_err(invalid_reference)?;
            return Ok(ctx.state().reference(address, kind)?);
        }
    }

    match cursor.peek() {
        Some(Token::Address(digits)) => {
            let address = digits
                .parse::<usize>()
                .map_err(|_| invalid(position, "address", format!("#{digits} is out of range")))?;
            cursor.advance();
            cursor.expect(&Token::Semicolon, "';' after address")?;
            parse_composite(cursor, ctx, Some(address), annotations)
        }
        Some(Token::Flag(_) | Token::LBrace | Token::LBracket) => {
            parse_composite(cursor, ctx, None, annotations)
        }
        _ => {
            let payload = parse_scalar(cursor)?;
            Ok(Pending::Ready(Value::Scalar(Scalar {
                annotations,
                payload,
            })))
        }
    }
}

/// Consumes `name;` pairs. A reference token is never an annotation.
fn parse_annotations(cursor: &mut TokenCursor<'_>) -> Vec<String> {
    let mut annotations = Vec::new();
    loop {
        let mark = cursor.mark();
        let name = match cursor.advance().map(|s| &s.token) {
            Some(Token::Word(word)) if is_ident_word(word) => word.clone(),
            Some(Token::Quoted { raw, text }) if parse_reference(raw).is_none() => text.clone(),
            _ => {
                cursor.reset(mark);
                break;
            }
        };
        if !cursor.eat(&Token::Semicolon) {
            cursor.reset(mark);
            break;
        }
        annotations.push(name);
    }
    annotations
}

fn parse_composite(
    cursor: &mut TokenCursor<'_>,
    ctx: &mut DeserializerContext<'_>,
    address: Option<usize>,
    annotations: Vec<String>,
) -> Result<Pending, ParseError> {
    let mut flags = Vec::new();
    while let Some(Token::Flag(flag)) = cursor.peek() {
        cursor.advance();
        cursor.expect(&Token::Semicolon, "';' after flag")?;
        flags.push(flag.clone());
    }

    let (node, address, closer) = match cursor.peek() {
        Some(Token::LBrace) => {
            let (node, address) = ctx.state().open_record(address)?;
            (node, address, Token::RBrace)
        }
        Some(Token::LBracket) => {
            let (node, address) = ctx.state().open_sequence(address)?;
            (node, address, Token::RBracket)
        }
        _ => return Err(unexpected(cursor, "'{' or '['")),
    };
    cursor.advance();

    {
        let target = ctx.state().node_mut(node)?;
        target.annotations = annotations;
        for flag in flags {
            target.add_flag(flag);
        }
    }

    let mut child = ctx.next()?;
    loop {
        if cursor.eat(&closer) {
            break;
        }
        if closer == Token::RBrace {
            let name = parse_name(cursor)?;
            cursor.expect(&Token::Colon, "':' after field name")?;
            let value = parse_value(cursor, &mut child)?;
            child.state().insert_field(node, name, value)?;
        } else {
            let value = parse_value(cursor, &mut child)?;
            child.state().push_element(node, value)?;
        }
        if !cursor.eat(&Token::Comma) {
            let what = if closer == Token::RBrace { "',' or '}'" } else { "',' or ']'" };
            cursor.expect(&closer, what)?;
            break;
        }
    }

    child.state().close(address);
    Ok(Pending::Ready(Value::Composite(node)))
}

fn parse_name(cursor: &mut TokenCursor<'_>) -> Result<String, ParseError> {
    match cursor.peek() {
        Some(Token::Word(word)) if is_ident_word(word) => {
            cursor.advance();
            Ok(word.clone())
        }
        Some(Token::Quoted { text, .. } | Token::Str(text)) => {
            cursor.advance();
            Ok(text.clone())
        }
        _ => Err(unexpected(cursor, "field name")),
    }
}

fn parse_scalar(cursor: &mut TokenCursor<'_>) -> Result<Payload, ParseError> {
    let position = cursor.position();
    match cursor.peek() {
        Some(Token::Str(s)) => {
            cursor.advance();
            Ok(Payload::String(s.clone()))
        }
        Some(Token::Quoted { text, .. }) => {
            cursor.advance();
            Ok(Payload::Symbol(text.clone()))
        }
        Some(Token::Blob(bytes)) => {
            cursor.advance();
            Ok(Payload::Blob(bytes.clone()))
        }
        Some(Token::Word(word)) => {
            cursor.advance();
            parse_word(word, position)
        }
        _ => Err(unexpected(cursor, "value")),
    }
}

/// True if `word` starts with `YYYY-MM-DD`.
fn has_date_prefix(word: &str) -> bool {
    let b = word.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

fn parse_word(word: &str, position: Position) -> Result<Payload, ParseError> {
    match word {
        "true" => return Ok(Payload::Bool(true)),
        "false" => return Ok(Payload::Bool(false)),
        "null" => return Ok(Payload::Null(Kind::Record)),
        _ => {}
    }
    if let Some(keyword) = word.strip_prefix("null.") {
        return Kind::from_keyword(keyword)
            .map(Payload::Null)
            .ok_or_else(|| invalid(position, "null", format!("unknown kind '{keyword}'")));
    }
    if is_ident_word(word) {
        return if is_plain_identifier(word) {
            Ok(Payload::Symbol(word.to_string()))
        } else {
            Err(invalid(position, "symbol", format!("'{word}' must be quoted")))
        };
    }

    if word.ends_with('s') {
        parse_duration(word)
            .map(Payload::Duration)
            .map_err(|reason| invalid(position, "duration", reason))
    } else if has_date_prefix(word) {
        parse_timestamp(word)
            .map(Payload::Timestamp)
            .map_err(|e| invalid(position, "timestamp", e.message))
    } else if word.contains(['.', 'e', 'E']) {
        parse_decimal(word)
            .map(Payload::Decimal)
            .map_err(|reason| invalid(position, "decimal", reason))
    } else {
        parse_integer(word)
            .map(Payload::Integer)
            .ok_or_else(|| invalid(position, "integer", format!("malformed integer {word}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::axon::cursor::tokenize;
    use crate::context::DecodeState;
    use crate::limits::MAX_DEPTH;
    use crate::model::{Decimal, Duration, Timestamp};

    fn word(text: &str) -> Result<Payload, ParseError> {
        parse_word(text, Position::default())
    }

    #[test]
    fn test_word_classification() {
        assert_eq!(word("42").unwrap(), Payload::Integer(42.into()));
        assert_eq!(word("-7").unwrap(), Payload::Integer((-7).into()));
        assert_eq!(word("12.34").unwrap(), Payload::Decimal(Decimal::new(1234, -2)));
        assert_eq!(word("5E0").unwrap(), Payload::Decimal(Decimal::new(5, 0)));
        assert_eq!(word("-1.25s").unwrap(), Payload::Duration(Duration::new(-2, 750_000_000)));
        assert_eq!(
            word("1970-01-01T00:00:01Z").unwrap(),
            Payload::Timestamp(Timestamp::new(1_000_000, 0))
        );
        assert_eq!(word("1970-01-02").unwrap(), Payload::Timestamp(Timestamp::new(86_400_000_000, 0)));
        assert_eq!(word("null.int").unwrap(), Payload::Null(Kind::Integer));
        assert_eq!(word("null").unwrap(), Payload::Null(Kind::Record));
        assert_eq!(word("ok_sym").unwrap(), Payload::Symbol("ok_sym".into()));
    }

    #[test]
    fn test_word_errors() {
        assert!(matches!(word("null.nothing"), Err(ParseError::InvalidLiteral { kind: "null", .. })));
        assert!(matches!(word("a.b"), Err(ParseError::InvalidLiteral { kind: "symbol", .. })));
        assert!(matches!(word("12x"), Err(ParseError::InvalidLiteral { kind: "integer", .. })));
        assert!(matches!(word("1.2.3"), Err(ParseError::InvalidLiteral { kind: "decimal", .. })));
        assert!(matches!(word("2024-13-01"), Err(ParseError::InvalidLiteral { kind: "timestamp", .. })));
        assert!(matches!(word("-"), Err(ParseError::InvalidLiteral { kind: "integer", .. })));
    }

    #[test]
    fn test_failed_value_restores_cursor() {
        let (tokens, end) = tokenize("x; #0; [1, {a: 2x}]").unwrap();
        let mut cursor = TokenCursor::new(&tokens, end);
        let start = cursor.position();
        let mut state = DecodeState::new();
        let mut ctx = DeserializerContext::new(&mut state, MAX_DEPTH);

        let err = parse_value(&mut cursor, &mut ctx).unwrap_err();
        assert!(matches!(err, ParseError::InvalidLiteral { kind: "integer", .. }));
        assert_eq!(cursor.position(), start);
        assert!(matches!(cursor.peek(), Some(Token::Word(w)) if w == "x"));
    }

    #[test]
    fn test_successful_value_advances_cursor() {
        let (tokens, end) = tokenize("[1], 2").unwrap();
        let mut cursor = TokenCursor::new(&tokens, end);
        let mut state = DecodeState::new();
        let mut ctx = DeserializerContext::new(&mut state, MAX_DEPTH);

        assert!(parse_value(&mut cursor, &mut ctx).is_ok());
        assert_eq!(cursor.peek(), Some(&Token::Comma));
    }
}
