//! Line grammar for properties files.
//!
//! Follows the classic `.properties` rules: `#`/`!` comments, `=`, `:` or
//! whitespace separators, backslash line continuations and `\uXXXX` escapes.

use camino::Utf8Path;
use std::sync::Arc;

use super::RawProperties;
use crate::{KrauseningError, KrauseningResult};

const FORM_FEED: char = '\u{000c}';

const fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | FORM_FEED)
}

/// Parse `data`, read from `path`, into key/value pairs.
///
/// # Errors
///
/// Returns [`KrauseningError::Parse`] when an escape sequence is malformed.
pub(crate) fn parse_properties(path: &Utf8Path, data: &str) -> KrauseningResult<RawProperties> {
    let mut properties = RawProperties::new();
    let mut lines = natural_lines(data).into_iter().enumerate();
    while let Some((index, line)) = lines.next() {
        let first = line.trim_start_matches(is_blank);
        if first.is_empty() || first.starts_with(['#', '!']) {
            continue;
        }
        let mut logical = String::new();
        let mut current = first;
        loop {
            let Some(body) = continued(current) else {
                logical.push_str(current);
                break;
            };
            logical.push_str(body);
            match lines.next() {
                Some((_, next)) => current = next.trim_start_matches(is_blank),
                None => break,
            }
        }
        let (raw_key, raw_value) = split_entry(&logical);
        let line_number = index + 1;
        let bad = |message: String| Arc::new(KrauseningError::parse(path, line_number, message));
        let key = unescape(raw_key).map_err(bad)?;
        let value = unescape(raw_value).map_err(bad)?;
        properties.insert(key, value);
    }
    Ok(properties)
}

/// Split on `\n`, `\r` or `\r\n`.
fn natural_lines(data: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let Some(end) = rest.find(['\n', '\r']) else {
            lines.push(rest);
            break;
        };
        let (line, tail) = rest.split_at(end);
        lines.push(line);
        let terminator = if tail.starts_with("\r\n") { 2 } else { 1 };
        rest = tail.get(terminator..).unwrap_or_default();
    }
    lines
}

/// Returns the line without its continuation marker when it ends in an odd
/// number of backslashes.
fn continued(line: &str) -> Option<&str> {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    if !trailing.is_multiple_of(2) {
        line.strip_suffix('\\')
    } else {
        None
    }
}

/// Split a logical line into its still-escaped key and value.
fn split_entry(logical: &str) -> (&str, &str) {
    let mut key_end = logical.len();
    let mut value_start = logical.len();
    let mut has_separator = false;
    let mut escaped = false;
    for (i, c) in logical.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                value_start = i + 1;
                has_separator = true;
                break;
            }
            c if is_blank(c) => {
                key_end = i;
                value_start = i + 1;
                break;
            }
            _ => {}
        }
    }
    let key = logical.get(..key_end).unwrap_or_default();
    let rest = logical.get(value_start..).unwrap_or_default();
    let mut value = "";
    for (i, c) in rest.char_indices() {
        if is_blank(c) {
            continue;
        }
        if !has_separator && matches!(c, '=' | ':') {
            has_separator = true;
            continue;
        }
        value = rest.get(i..).unwrap_or_default();
        break;
    }
    (key, value)
}

/// Decode backslash escapes.
fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push(FORM_FEED),
            Some('u') => out.push(decode_unicode(&mut chars)?),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

/// Decode the hex digits following `\u`, pairing UTF-16 surrogates.
fn decode_unicode(chars: &mut std::str::Chars<'_>) -> Result<char, String> {
    let unit = hex_unit(chars)?;
    if let Some(c) = char::from_u32(unit) {
        return Ok(c);
    }
    if (0xD800..=0xDBFF).contains(&unit) {
        let mut lookahead = chars.clone();
        if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
            let low = hex_unit(&mut lookahead)?;
            if (0xDC00..=0xDFFF).contains(&low) {
                let combined = 0x1_0000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                if let Some(c) = char::from_u32(combined) {
                    *chars = lookahead;
                    return Ok(c);
                }
            }
        }
    }
    Err(format!("unpaired surrogate \\u{unit:04X}"))
}

fn hex_unit(chars: &mut std::str::Chars<'_>) -> Result<u32, String> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("malformed \\uxxxx encoding: \\u{digits}"));
    }
    u32::from_str_radix(&digits, 16).map_err(|err| err.to_string())
}
