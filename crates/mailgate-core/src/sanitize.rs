//! Text-encoding sanitation for mail-derived strings
//!
//! The gateway reflects text pulled out of the mail store over an HTTP
//! writer that assumes one byte per character. Two passes, in this order:
//! first drop the control characters that would corrupt JSON, then expand
//! every remaining non-ASCII code point into its UTF-8 bytes with one
//! output `char` per byte. Skipping the first pass corrupts JSON; skipping
//! the second corrupts any non-ASCII text on the wire.

use serde_json::Value;

/// Drop C0 control characters (except tab, LF and CR) and DEL.
pub fn strip_forbidden_controls(text: &str) -> String {
    text.chars()
        .filter(|&c| !is_forbidden_control(c))
        .collect()
}

fn is_forbidden_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}')
}

/// Expand every code point above U+007F into its UTF-8 byte sequence,
/// one output `char` per byte. ASCII passes through untouched, so the
/// result contains only chars in U+0000..=U+00FF.
pub fn expand_non_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for &b in c.encode_utf8(&mut buf).as_bytes() {
                out.push(b as char);
            }
        }
    }
    out
}

/// Full pipeline: strip forbidden controls, then expand non-ASCII.
pub fn encode(text: &str) -> String {
    expand_non_ascii(&strip_forbidden_controls(text))
}

/// Apply [`encode`] to every string in a JSON value, in place.
/// Object keys are left alone; the wire field names are all ASCII.
pub fn encode_value(value: &mut Value) {
    match value {
        Value::String(s) => *s = encode(s),
        Value::Array(items) => items.iter_mut().for_each(encode_value),
        Value::Object(map) => map.values_mut().for_each(encode_value),
        _ => {}
    }
}

/// Serialize an already-sanitized string one byte per char.
///
/// After [`encode`] every char fits in a single byte, and the byte
/// sequence is exactly the UTF-8 of the original text. Chars that somehow
/// exceed U+00FF are written as their UTF-8 bytes so the output is never
/// silently truncated.
pub fn transport_bytes(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if (c as u32) <= 0xff {
            out.push(c as u32 as u8);
        } else {
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    out
}

/// Second-pass repair for JSON bodies containing raw control characters.
///
/// The gateway pre-encodes non-ASCII, but message bodies can still leak
/// raw CR/LF/TAB into a response. Strips the forbidden controls, then
/// escapes any remaining literal CR, LF or TAB that is not already part
/// of an escape sequence.
pub fn repair_json(text: &str) -> String {
    let stripped = strip_forbidden_controls(text);
    let mut out = String::with_capacity(stripped.len());
    let mut prev_backslash = false;
    for c in stripped.chars() {
        match c {
            '\r' if !prev_backslash => out.push_str("\\r"),
            '\n' if !prev_backslash => out.push_str("\\n"),
            '\t' if !prev_backslash => out.push_str("\\t"),
            _ => out.push(c),
        }
        prev_backslash = c == '\\' && !prev_backslash;
    }
    out
}
