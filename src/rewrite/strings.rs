//! String escape decoding.
//!
//! Obfuscators hide string contents behind `\xNN`, `\uNNNN` and octal
//! escapes. The parser cooks literal values eagerly; what this rewriter
//! does is drop the obfuscated raw form so the generator prints the
//! decoded value, and rewrite template quasis in place. Legitimate
//! escapes (`\n`, `\t`, quotes, backslash) are untouched.

use crate::ast::{Node, NodeKind, ParentChain, VisitAction};
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::rewrite::Rewriter;

/// Decode every JavaScript escape sequence in the inner text of a string
/// literal (quotes already stripped).
pub fn decode_string_escapes(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('\n') => {} // line continuation
            Some('x') => {
                let hex: String = take_while_hex(&mut chars, 2);
                match u32::from_str_radix(&hex, 16).ok().filter(|_| hex.len() == 2) {
                    Some(v) => push_code_unit(&mut out, v, &mut chars),
                    None => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            Some('u') => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut hex = String::new();
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        hex.push(c);
                    }
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(ch) => out.push(ch),
                        None => out.push('\u{FFFD}'),
                    }
                } else {
                    let hex: String = take_while_hex(&mut chars, 4);
                    match u32::from_str_radix(&hex, 16).ok().filter(|_| hex.len() == 4) {
                        Some(v) => push_code_unit(&mut out, v, &mut chars),
                        None => {
                            out.push_str("\\u");
                            out.push_str(&hex);
                        }
                    }
                }
            }
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) if value * 8 + next <= 255 => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        _ => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{FFFD}'));
            }
            // `\q` is just `q`; this also covers quotes and backslash.
            Some(other) => out.push(other),
        }
    }
    out
}

fn take_while_hex(chars: &mut std::iter::Peekable<std::str::Chars>, max: usize) -> String {
    let mut hex = String::new();
    while hex.len() < max {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                hex.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    hex
}

/// Push a UTF-16 code unit, combining a high surrogate with a following
/// `\uDCxx` escape when present.
fn push_code_unit(out: &mut String, unit: u32, chars: &mut std::iter::Peekable<std::str::Chars>) {
    if (0xD800..0xDC00).contains(&unit) {
        // Look ahead for the matching low surrogate escape.
        let rest: String = chars.clone().take(6).collect();
        if let Some(hex) = rest.strip_prefix("\\u") {
            if let Ok(low) = u32::from_str_radix(&hex[..4.min(hex.len())], 16) {
                if (0xDC00..0xE000).contains(&low) {
                    for _ in 0..6 {
                        chars.next();
                    }
                    let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                    out.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
                    return;
                }
            }
        }
        out.push('\u{FFFD}');
        return;
    }
    out.push(char::from_u32(unit).unwrap_or('\u{FFFD}'));
}

/// True when the raw text hides characters behind hex, unicode or octal
/// escapes.
pub fn has_obfuscated_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'\\' {
            match bytes[i + 1] {
                b'x' | b'u' => return true,
                b'0'..=b'7' => {
                    // `\0` alone is a legitimate NUL spelling; longer
                    // octal runs are the obfuscated form.
                    if bytes[i + 1] != b'0'
                        || (i + 2 < bytes.len() && bytes[i + 2].is_ascii_digit())
                    {
                        return true;
                    }
                    i += 2;
                    continue;
                }
                _ => {
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    false
}

#[derive(Default)]
pub struct StringDecode;

impl StringDecode {
    pub fn new() -> Self {
        Self
    }
}

impl Rewriter for StringDecode {
    fn name(&self) -> &'static str {
        "decode-strings"
    }

    fn rewrite(
        &self,
        node: &mut Node,
        _ctx: &mut ProcessingContext,
        _chain: &ParentChain,
    ) -> Result<VisitAction> {
        match &mut node.kind {
            NodeKind::String { raw: raw @ Some(_), .. } => {
                let obfuscated = raw
                    .as_deref()
                    .map(strip_quotes)
                    .is_some_and(has_obfuscated_escapes);
                if obfuscated {
                    // The cooked value already holds the decoded text;
                    // dropping the raw form makes the generator print it.
                    *raw = None;
                    return Ok(VisitAction::changed());
                }
                Ok(VisitAction::unchanged())
            }
            NodeKind::TemplateElement { raw, cooked, .. } => {
                if has_obfuscated_escapes(raw) {
                    let decoded = decode_string_escapes(raw);
                    *cooked = Some(decoded.clone());
                    *raw = escape_for_template(&decoded);
                    return Ok(VisitAction::changed());
                }
                Ok(VisitAction::unchanged())
            }
            _ => Ok(VisitAction::unchanged()),
        }
    }
}

fn strip_quotes(raw: &str) -> &str {
    raw.strip_prefix(['"', '\''])
        .and_then(|r| r.strip_suffix(['"', '\'']))
        .unwrap_or(raw)
}

/// Re-escape only what a template quasi cannot hold verbatim.
fn escape_for_template(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Options;

    #[test]
    fn test_decode_hex_escapes() {
        assert_eq!(decode_string_escapes("\\x48\\x65\\x6c\\x6c\\x6f"), "Hello");
    }

    #[test]
    fn test_decode_unicode_escapes() {
        assert_eq!(decode_string_escapes("\\u0041\\u0042"), "AB");
        assert_eq!(decode_string_escapes("\\u{1F600}"), "\u{1F600}");
    }

    #[test]
    fn test_decode_surrogate_pair() {
        assert_eq!(decode_string_escapes("\\uD83D\\uDE00"), "\u{1F600}");
    }

    #[test]
    fn test_decode_octal() {
        assert_eq!(decode_string_escapes("\\110\\151"), "Hi");
    }

    #[test]
    fn test_legitimate_escapes_cook_normally() {
        assert_eq!(decode_string_escapes("a\\nb\\tc"), "a\nb\tc");
        assert_eq!(decode_string_escapes("\\\"quoted\\\""), "\"quoted\"");
    }

    #[test]
    fn test_has_obfuscated_escapes() {
        assert!(has_obfuscated_escapes("\\x41"));
        assert!(has_obfuscated_escapes("\\u0041"));
        assert!(has_obfuscated_escapes("\\101"));
        assert!(!has_obfuscated_escapes("line\\nbreak"));
        assert!(!has_obfuscated_escapes("plain"));
        assert!(!has_obfuscated_escapes("nul\\0end"));
    }

    #[test]
    fn test_rewriter_drops_obfuscated_raw() {
        let mut node = Node::new(NodeKind::String {
            value: "Hello".to_string(),
            raw: Some("\"\\x48\\x65\\x6c\\x6c\\x6f\"".to_string()),
        });
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        let action = StringDecode::new()
            .rewrite(&mut node, &mut ctx, &ParentChain::empty())
            .unwrap();
        assert!(action.changed);
        assert!(matches!(node.kind, NodeKind::String { raw: None, .. }));
    }

    #[test]
    fn test_rewriter_keeps_legitimate_raw() {
        let mut node = Node::new(NodeKind::String {
            value: "a\nb".to_string(),
            raw: Some("\"a\\nb\"".to_string()),
        });
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        let action = StringDecode::new()
            .rewrite(&mut node, &mut ctx, &ParentChain::empty())
            .unwrap();
        assert!(!action.changed);
    }

    #[test]
    fn test_template_quasi_rewritten_in_place() {
        let mut node = Node::new(NodeKind::TemplateElement {
            cooked: None,
            raw: "\\x68\\x69".to_string(),
            tail: true,
        });
        let mut ctx = ProcessingContext::new("test.js", Options::default());
        let action = StringDecode::new()
            .rewrite(&mut node, &mut ctx, &ParentChain::empty())
            .unwrap();
        assert!(action.changed);
        match &node.kind {
            NodeKind::TemplateElement { raw, cooked, .. } => {
                assert_eq!(raw, "hi");
                assert_eq!(cooked.as_deref(), Some("hi"));
            }
            _ => unreachable!(),
        }
    }
}
