//! Scalar literal forms of the Axon text format.

use std::fmt::Write;

use num_bigint::BigInt;

use crate::model::{Decimal, Duration, Kind};

/// Prefix that marks a quoted token as a back-reference.
pub const REFERENCE_PREFIX: &str = "Ref:";

const KEYWORDS: [&str; 3] = ["true", "false", "null"];

/// Returns true if `s` can be written without quotes: an ASCII letter or
/// underscore followed by letters, digits or underscores.
pub fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns true if `s` can be written as a bare flag: identifiers joined
/// by dots.
pub fn is_plain_flag(s: &str) -> bool {
    s.split('.').all(is_plain_identifier)
}

// =============================================================================
// STRINGS AND SYMBOLS
// =============================================================================

/// Appends `text` between `quote` characters, escaping as needed.
///
/// A text starting with the reference prefix has its first character
/// escaped, so a quoted symbol never reads back as a reference.
pub fn write_quoted(out: &mut String, text: &str, quote: char) {
    out.push(quote);
    for (i, c) in text.char_indices() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            'R' if i == 0 && text.starts_with(REFERENCE_PREFIX) => out.push_str("\\u0052"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

/// Appends a symbol (or name, annotation) bare when possible, else quoted.
pub fn write_symbol(out: &mut String, text: &str) {
    if is_plain_identifier(text) && !KEYWORDS.contains(&text) {
        out.push_str(text);
    } else {
        write_quoted(out, text, '\'');
    }
}

/// Appends a field name or annotation; keywords need no quotes in these
/// positions.
pub fn write_name(out: &mut String, text: &str) {
    if is_plain_identifier(text) {
        out.push_str(text);
    } else {
        write_quoted(out, text, '\'');
    }
}

/// Resolves backslash escapes in the body of a quoted literal.
pub fn unescape(raw: &str) -> Result<String, String> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('/') => '/',
            Some('b') => '\u{08}',
            Some('f') => '\u{0c}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err("truncated \\u escape".to_string());
                }
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid \\u escape: {hex}"))?
            }
            Some(other) => return Err(format!("invalid escape: \\{other}")),
            None => return Err("dangling backslash".to_string()),
        };
        out.push(escaped);
    }
    Ok(out)
}

// =============================================================================
// REFERENCES
// =============================================================================

/// Appends `'Ref:<Kind> 0x<address>'`.
pub fn write_reference(out: &mut String, kind: Kind, address: usize) {
    let _ = write!(out, "'{}{} 0x{:x}'", REFERENCE_PREFIX, kind.name(), address);
}

/// Parses the raw body of a quoted token as a reference.
///
/// Returns `None` if the body does not start with the reference prefix,
/// so the token is an ordinary symbol.
pub fn parse_reference(raw: &str) -> Option<Result<(Kind, usize), String>> {
    let rest = raw.strip_prefix(REFERENCE_PREFIX)?;
    Some(parse_reference_body(raw, rest))
}

fn parse_reference_body(raw: &str, rest: &str) -> Result<(Kind, usize), String> {
    let (kind_name, address) = rest
        .split_once(' ')
        .ok_or_else(|| format!("malformed reference '{raw}'"))?;
    let kind =
        Kind::from_name(kind_name).ok_or_else(|| format!("unknown kind '{kind_name}'"))?;
    if !kind.is_composite() {
        return Err(format!("a {kind} cannot be a reference target"));
    }
    let hex = address
        .strip_prefix("0x")
        .filter(|h| !h.is_empty() && h.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| format!("malformed address '{address}'"))?;
    let address =
        usize::from_str_radix(hex, 16).map_err(|_| format!("address {hex} out of range"))?;
    Ok((kind, address))
}

// =============================================================================
// NUMBERS
// =============================================================================

/// Parses `-?digits` into an integer.
pub fn parse_integer(text: &str) -> Option<BigInt> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Zeros written after `0.` before falling back to exponent form.
const MAX_LEADING_ZEROS: usize = 6;

/// Formats a decimal so that it reads back with the same mantissa and
/// exponent.
///
/// A small negative exponent places the point inside the digits (`1234, -2`
/// is `12.34`); any other exponent is written explicitly (`5, 0` is `5E0`,
/// `1, -50` is `1E-50`), so output length never grows with the exponent.
pub fn format_decimal(d: &Decimal) -> String {
    if d.exponent >= 0 {
        return format!("{}E{}", d.mantissa, d.exponent);
    }

    let negative = d.mantissa.sign() == num_bigint::Sign::Minus;
    let digits = d.mantissa.magnitude().to_string();
    let scale = d.exponent.unsigned_abs() as usize;
    if scale > digits.len() + MAX_LEADING_ZEROS {
        return format!("{}E{}", d.mantissa, d.exponent);
    }

    let mut out = String::with_capacity(digits.len() + scale + 3);
    if negative {
        out.push('-');
    }
    if digits.len() > scale {
        let (int, frac) = digits.split_at(digits.len() - scale);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', scale - digits.len()));
        out.push_str(&digits);
    }
    out
}

/// Parses `-?digits(.digits)?([eE][+-]?digits)?`.
///
/// Every written digit becomes part of the mantissa; the exponent is the
/// written exponent minus the number of fraction digits.
pub fn parse_decimal(text: &str) -> Result<Decimal, String> {
    let (number, exponent) = match text.find(['e', 'E']) {
        Some(pos) => {
            let exp = &text[pos + 1..];
            let exp_digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            if exp_digits.is_empty() || !exp_digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("malformed exponent in {text}"));
            }
            let exp: i64 = exp
                .strip_prefix('+')
                .unwrap_or(exp)
                .parse()
                .map_err(|_| format!("exponent out of range in {text}"))?;
            (&text[..pos], exp)
        }
        None => (text, 0),
    };

    let (int, frac) = number.split_once('.').unwrap_or((number, ""));
    let int_digits = int.strip_prefix('-').unwrap_or(int);
    if int_digits.is_empty()
        || !int_digits.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
        || (number.contains('.') && frac.is_empty())
    {
        return Err(format!("malformed decimal {text}"));
    }

    let mantissa: BigInt = format!("{int}{frac}")
        .parse()
        .map_err(|_| format!("malformed decimal {text}"))?;
    let exponent = i32::try_from(exponent - frac.len() as i64)
        .map_err(|_| format!("exponent out of range in {text}"))?;
    Ok(Decimal { mantissa, exponent })
}

// =============================================================================
// DURATIONS
// =============================================================================

/// Formats a duration as signed seconds with up to nine fraction digits,
/// e.g. `-1.25s`.
pub fn format_duration(d: Duration) -> String {
    let total = d.total_nanos();
    let per = Duration::NANOS_PER_SECOND as i128;
    let sign = if total < 0 { "-" } else { "" };
    let abs = total.unsigned_abs();
    let seconds = abs / per as u128;
    let nanos = abs % per as u128;
    if nanos == 0 {
        format!("{sign}{seconds}s")
    } else {
        let frac = format!("{nanos:09}");
        format!("{sign}{seconds}.{}s", frac.trim_end_matches('0'))
    }
}

/// Parses `-?digits(.digits{1,9})?s`.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let body = text
        .strip_suffix('s')
        .ok_or_else(|| format!("malformed duration {text}"))?;
    let (negative, body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (int, frac) = body.split_once('.').unwrap_or((body, ""));
    if int.is_empty()
        || !int.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
        || frac.len() > 9
        || (body.contains('.') && frac.is_empty())
    {
        return Err(format!("malformed duration {text}"));
    }

    let out_of_range = || format!("duration {text} out of range");
    let seconds: i128 = int.parse().map_err(|_| out_of_range())?;
    let nanos: i128 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}").parse().map_err(|_| out_of_range())?
    };
    let total = seconds
        .checked_mul(Duration::NANOS_PER_SECOND as i128)
        .and_then(|s| s.checked_add(nanos))
        .ok_or_else(out_of_range)?;
    Duration::from_total_nanos(if negative { -total } else { total }).ok_or_else(out_of_range)
}
