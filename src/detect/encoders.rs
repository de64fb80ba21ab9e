//! Exotic encoder detection (JSFuck, Dean-Edwards Packer, AAEncode,
//! JJEncode, URL-encoding) and best-effort decoding.
//!
//! Signatures run over the raw source text. Decoding either rewrites the
//! text directly (URL-encoding) or evaluates the payload in the sandbox
//! hook with a five-second bound, treating a string result as the
//! decoded source.

use regex::Regex;

use crate::detect::{Finding, Severity};
use crate::hooks::{Sandbox, SandboxValue};
use crate::scope::Confidence;

/// Wall-clock bound for sandboxed decode attempts.
pub const DECODE_TIMEOUT_MS: u64 = 5_000;

/// The recognised exotic encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    JsFuck,
    Packer,
    AaEncode,
    JjEncode,
    UrlEncode,
}

impl Encoder {
    pub fn name(&self) -> &'static str {
        match self {
            Encoder::JsFuck => "JSFuck",
            Encoder::Packer => "Dean Edwards Packer",
            Encoder::AaEncode => "AAEncode",
            Encoder::JjEncode => "JJEncode",
            Encoder::UrlEncode => "URL Encoding",
        }
    }

    pub fn tool(&self) -> &'static str {
        match self {
            Encoder::JsFuck => "jsfuck",
            Encoder::Packer => "packer",
            Encoder::AaEncode => "aaencode",
            Encoder::JjEncode => "jjencode",
            Encoder::UrlEncode => "url-encode",
        }
    }
}

/// Identify encoders present in the source text.
pub fn identify(source: &str) -> Vec<Encoder> {
    let mut hits = Vec::new();
    if looks_like_jsfuck(source) {
        hits.push(Encoder::JsFuck);
    }
    if packer_signature().is_match(source) {
        hits.push(Encoder::Packer);
    }
    if source.contains("ﾟωﾟ") || source.contains("ﾟДﾟ") || source.contains("ﾟΘﾟ") {
        hits.push(Encoder::AaEncode);
    }
    if jjencode_signature().is_match(source) {
        hits.push(Encoder::JjEncode);
    }
    if url_encode_signature().is_match(source) {
        hits.push(Encoder::UrlEncode);
    }
    hits
}

/// Produce findings for every identified encoder.
pub fn detect_encoders(source: &str) -> Vec<Finding> {
    identify(source)
        .into_iter()
        .map(|enc| {
            Finding::new(
                enc.name(),
                Confidence::High,
                Severity::High,
                format!("source appears to be {}-encoded", enc.name()),
                enc.tool(),
            )
        })
        .collect()
}

/// JSFuck programs are almost entirely `[ ] ( ) ! +`.
fn looks_like_jsfuck(source: &str) -> bool {
    let significant: Vec<char> = source.chars().filter(|c| !c.is_whitespace()).collect();
    if significant.len() < 50 {
        return false;
    }
    let jsfuck_chars = significant
        .iter()
        .filter(|c| matches!(c, '[' | ']' | '(' | ')' | '!' | '+'))
        .count();
    (jsfuck_chars as f64) / (significant.len() as f64) > 0.9
}

fn packer_signature() -> Regex {
    Regex::new(r"eval\(function\(p,a,c,k,e,[dr]\)").expect("static pattern")
}

fn jjencode_signature() -> Regex {
    Regex::new(r#"\$=~\[\];\s*\$=\{"#).expect("static pattern")
}

fn url_encode_signature() -> Regex {
    Regex::new(r"(?:%[0-9A-Fa-f]{2}){10,}").expect("static pattern")
}

/// Outcome of a decode attempt.
#[derive(Debug)]
pub struct DecodeResult {
    pub success: bool,
    pub decoded: Option<String>,
    pub error: Option<String>,
}

impl DecodeResult {
    fn ok(decoded: String) -> Self {
        Self {
            success: true,
            decoded: Some(decoded),
            error: None,
        }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            decoded: None,
            error: Some(error.into()),
        }
    }
}

/// Attempt to decode `source` for one encoder. URL-encoding decodes
/// textually; everything else needs the sandbox hook.
pub fn try_decode(encoder: Encoder, source: &str, sandbox: Option<&dyn Sandbox>) -> DecodeResult {
    match encoder {
        Encoder::UrlEncode => DecodeResult::ok(percent_decode(source)),
        _ => {
            let Some(sandbox) = sandbox else {
                return DecodeResult::fail("no sandbox available");
            };
            match sandbox.eval(source, DECODE_TIMEOUT_MS) {
                Ok(SandboxValue::String(decoded)) => DecodeResult::ok(decoded),
                Ok(SandboxValue::Other(kind)) => {
                    DecodeResult::fail(format!("payload evaluated to non-string: {kind}"))
                }
                Err(e) => DecodeResult::fail(e.to_string()),
            }
        }
    }
}

fn percent_decode(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(v) = u8::from_str_radix(
                std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or(""),
                16,
            ) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn test_jsfuck_identified() {
        let source = "[![]+[]][+[]]".repeat(10);
        assert_eq!(identify(&source), vec![Encoder::JsFuck]);
    }

    #[test]
    fn test_packer_identified() {
        let source = "eval(function(p,a,c,k,e,d){return p})('x',1,1,'y'.split('|'),0,{})";
        assert!(identify(source).contains(&Encoder::Packer));
    }

    #[test]
    fn test_aaencode_identified() {
        let source = "ﾟωﾟﾉ= /｀ｍ´）ﾉ ~┻━┻   //*´∇｀*/ ['_']; o=(ﾟДﾟ)";
        assert!(identify(source).contains(&Encoder::AaEncode));
    }

    #[test]
    fn test_jjencode_identified() {
        let source = "$=~[];$={___:++$,$$$$:(![]+\"\")[$]};";
        assert!(identify(source).contains(&Encoder::JjEncode));
    }

    #[test]
    fn test_url_encoding_identified_and_decoded() {
        let encoded = "%61%6c%65%72%74%28%31%29%3b%66%6f%6f";
        assert!(identify(encoded).contains(&Encoder::UrlEncode));
        let result = try_decode(Encoder::UrlEncode, encoded, None);
        assert!(result.success);
        assert_eq!(result.decoded.as_deref(), Some("alert(1);foo"));
    }

    #[test]
    fn test_plain_source_matches_nothing() {
        let source = "function add(a, b) { return a + b; }";
        assert!(identify(source).is_empty());
    }

    #[test]
    fn test_sandbox_decode_uses_string_result() {
        struct Fake;
        impl Sandbox for Fake {
            fn eval(&self, _source: &str, _timeout_ms: u64) -> Result<SandboxValue> {
                Ok(SandboxValue::String("alert(1)".to_string()))
            }
        }
        let result = try_decode(Encoder::JsFuck, "[][[]]", Some(&Fake));
        assert!(result.success);
        assert_eq!(result.decoded.as_deref(), Some("alert(1)"));
    }

    #[test]
    fn test_decode_without_sandbox_fails_cleanly() {
        let result = try_decode(Encoder::Packer, "eval(...)", None);
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
