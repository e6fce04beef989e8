//! Tokenizer and token cursor for Axon text.
//!
//! The tokenizer is a plain value built per call; the parser walks its
//! output through a [`TokenCursor`] that can be marked and reset.

use std::iter::Peekable;
use std::str::CharIndices;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::codec::axon::literal::unescape;
use crate::error::{ParseError, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Semicolon,
    Comma,
    /// `#` followed by decimal digits.
    Address(String),
    /// `@` followed by a dotted identifier or a quoted symbol.
    Flag(String),
    /// Decoded `{{base64}}`.
    Blob(Vec<u8>),
    /// Unescaped `"..."`.
    Str(String),
    /// `'...'`: the body as written and its unescaped text.
    Quoted { raw: String, text: String },
    /// Bare identifier, keyword, number, timestamp or duration.
    Word(String),
}

impl Token {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Address(digits) => format!("'#{digits}'"),
            Token::Flag(flag) => format!("flag '@{flag}'"),
            Token::Blob(_) => "blob".to_string(),
            Token::Str(_) => "string".to_string(),
            Token::Quoted { raw, .. } => format!("'{raw}'"),
            Token::Word(word) => format!("'{word}'"),
        }
    }
}

/// A token with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: Position,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Numbers, timestamps and durations may also carry signs and colons.
fn is_number_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '+' | '-')
}

struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn position(&mut self) -> Position {
        let offset = self
            .chars
            .peek()
            .map_or(self.input.len(), |(offset, _)| *offset);
        Position {
            offset,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consumes characters while `pred` holds and returns them.
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.position().offset;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.position().offset]
    }

    /// Reads the body of a quoted literal after its opening quote,
    /// returning the raw text between the quotes.
    fn quoted_body(&mut self, quote: char, start: Position) -> Result<&'a str, ParseError> {
        let body_start = self.position().offset;
        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedLiteral { position: start }),
                Some('\\') => {
                    if self.bump().is_none() {
                        return Err(ParseError::UnterminatedLiteral { position: start });
                    }
                }
                Some(c) if c == quote => break,
                Some(_) => {}
            }
        }
        let body_end = self.position().offset - quote.len_utf8();
        Ok(&self.input[body_start..body_end])
    }

    fn unescaped(raw: &str, kind: &'static str, position: Position) -> Result<String, ParseError> {
        unescape(raw).map_err(|reason| ParseError::InvalidLiteral {
            position,
            kind,
            reason,
        })
    }

    fn blob(&mut self, start: Position) -> Result<Token, ParseError> {
        let rest = &self.input[self.position().offset..];
        let Some(end) = rest.find("}}") else {
            return Err(ParseError::UnterminatedLiteral { position: start });
        };
        let encoded: String = rest[..end].chars().filter(|c| !c.is_whitespace()).collect();
        for _ in rest[..end + 2].chars() {
            self.bump();
        }
        STANDARD
            .decode(encoded.as_bytes())
            .map(Token::Blob)
            .map_err(|e| ParseError::InvalidLiteral {
                position: start,
                kind: "blob",
                reason: e.to_string(),
            })
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, ParseError> {
        self.skip_whitespace();
        let position = self.position();
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let simple = match c {
            '}' => Some(Token::RBrace),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ':' => Some(Token::Colon),
            ';' => Some(Token::Semicolon),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = simple {
            self.bump();
            return Ok(Some(Spanned { token, position }));
        }

        let token = match c {
            '{' => {
                self.bump();
                if self.peek() == Some('{') {
                    self.bump();
                    self.blob(position)?
                } else {
                    Token::LBrace
                }
            }
            '#' => {
                self.bump();
                let digits = self.take_while(|c| c.is_ascii_digit());
                if digits.is_empty() {
                    return Err(ParseError::InvalidLiteral {
                        position,
                        kind: "address",
                        reason: "expected digits after '#'".to_string(),
                    });
                }
                Token::Address(digits.to_string())
            }
            '@' => {
                self.bump();
                let flag = if self.peek() == Some('\'') {
                    self.bump();
                    let raw = self.quoted_body('\'', position)?;
                    Self::unescaped(raw, "flag", position)?
                } else {
                    let flag = self.take_while(is_ident_char);
                    if !flag.starts_with(is_ident_start) {
                        return Err(ParseError::InvalidLiteral {
                            position,
                            kind: "flag",
                            reason: "expected an identifier after '@'".to_string(),
                        });
                    }
                    flag.to_string()
                };
                Token::Flag(flag)
            }
            '"' => {
                self.bump();
                let raw = self.quoted_body('"', position)?;
                Token::Str(Self::unescaped(raw, "string", position)?)
            }
            '\'' => {
                self.bump();
                let raw = self.quoted_body('\'', position)?;
                Token::Quoted {
                    raw: raw.to_string(),
                    text: Self::unescaped(raw, "symbol", position)?,
                }
            }
            c if is_ident_start(c) => Token::Word(self.take_while(is_ident_char).to_string()),
            c if c.is_ascii_digit() || c == '-' => {
                Token::Word(self.take_while(is_number_char).to_string())
            }
            found => return Err(ParseError::UnexpectedChar { position, found }),
        };
        Ok(Some(Spanned { token, position }))
    }
}

/// Splits Axon text into tokens.
///
/// Returns the tokens and the position just past the last character.
pub fn tokenize(input: &str) -> Result<(Vec<Spanned>, Position), ParseError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok((tokens, lexer.position()))
}

/// Cursor over a token list with backtracking marks.
#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    tokens: &'t [Spanned],
    pos: usize,
    end: Position,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Spanned], end: Position) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    pub fn advance(&mut self) -> Option<&'t Spanned> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Position of the next token, or of the end of input.
    pub fn position(&self) -> Position {
        self.tokens.get(self.pos).map_or(self.end, |s| s.position)
    }

    pub fn mark(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Consumes the next token if it equals `expected`.
    pub fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            return true;
        }
        false
    }

    /// Consumes `expected` or fails with a positioned error.
    pub fn expect(&mut self, expected: &Token, what: &'static str) -> Result<(), ParseError> {
        match self.advance() {
            Some(s) if s.token == *expected => Ok(()),
            Some(s) => Err(ParseError::UnexpectedToken {
                position: s.position,
                expected: what,
                found: s.token.describe(),
            }),
            None => Err(ParseError::UnexpectedEnd { expected: what }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .0
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_example_tokens() {
        assert_eq!(
            tokens(r#"#0; {a: 5, b: #1; [true, "x"]}"#),
            vec![
                Token::Address("0".into()),
                Token::Semicolon,
                Token::LBrace,
                word("a"),
                Token::Colon,
                word("5"),
                Token::Comma,
                word("b"),
                Token::Colon,
                Token::Address("1".into()),
                Token::Semicolon,
                Token::LBracket,
                word("true"),
                Token::Comma,
                Token::Str("x".into()),
                Token::RBracket,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_literal_words() {
        assert_eq!(
            tokens("[2024-03-15T14:30:00+05:30, -1.25s, 12.34, null.int]"),
            vec![
                Token::LBracket,
                word("2024-03-15T14:30:00+05:30"),
                Token::Comma,
                word("-1.25s"),
                Token::Comma,
                word("12.34"),
                Token::Comma,
                word("null.int"),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn test_quoted_and_flags() {
        assert_eq!(
            tokens(r"@flag.abc; @'odd flag'; 'it\'s'"),
            vec![
                Token::Flag("flag.abc".into()),
                Token::Semicolon,
                Token::Flag("odd flag".into()),
                Token::Semicolon,
                Token::Quoted {
                    raw: r"it\'s".into(),
                    text: "it's".into()
                },
            ]
        );
    }

    #[test]
    fn test_blob() {
        assert_eq!(
            tokens("{{AAEC/w==}} {{}} {}"),
            vec![
                Token::Blob(vec![0, 1, 2, 255]),
                Token::Blob(Vec::new()),
                Token::LBrace,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let (spanned, end) = tokenize("[\n  x,\n  \"é\" ]").unwrap();
        let positions: Vec<(usize, usize)> =
            spanned.iter().map(|s| (s.position.line, s.position.column)).collect();
        assert_eq!(positions, vec![(1, 1), (2, 3), (2, 4), (3, 3), (3, 7)]);
        assert_eq!(end.line, 3);
        assert_eq!(end.offset, 15);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            tokenize("\"open"),
            Err(ParseError::UnterminatedLiteral { .. })
        ));
        assert!(matches!(
            tokenize("{{AAE"),
            Err(ParseError::UnterminatedLiteral { .. })
        ));
        assert!(matches!(
            tokenize("{{!!}}"),
            Err(ParseError::InvalidLiteral { kind: "blob", .. })
        ));
        assert!(matches!(
            tokenize("[1, $]"),
            Err(ParseError::UnexpectedChar { found: '$', .. })
        ));
        assert!(matches!(
            tokenize("#x"),
            Err(ParseError::InvalidLiteral { kind: "address", .. })
        ));
    }

    #[test]
    fn test_cursor_mark_reset() {
        let (spanned, end) = tokenize("a; b").unwrap();
        let mut cursor = TokenCursor::new(&spanned, end);
        let mark = cursor.mark();
        assert_eq!(cursor.advance().map(|s| &s.token), Some(&word("a")));
        assert!(cursor.eat(&Token::Semicolon));
        cursor.reset(mark);
        assert_eq!(cursor.peek(), Some(&word("a")));
        cursor.reset(3);
        assert!(cursor.at_end());
        assert_eq!(cursor.position(), end);
        assert_eq!(
            cursor.expect(&Token::Colon, "':'"),
            Err(ParseError::UnexpectedEnd { expected: "':'" })
        );
    }
}
