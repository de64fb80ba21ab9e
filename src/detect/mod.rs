//! Obfuscation detectors.
//!
//! Detectors read the tree (and the raw source, for the exotic text
//! encoders) and produce findings; they never rewrite anything. The
//! finding list is written to `<input>.malware.json` when the report
//! option is on.

mod encoders;
mod obfuscator;

pub use encoders::{detect_encoders, try_decode, DecodeResult, Encoder};
pub use obfuscator::detect_obfuscator_patterns;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::Node;
use crate::context::ProcessingContext;
use crate::error::Result;
use crate::scope::Confidence;

/// How serious a finding is for a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

/// One detector result.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Human name of the recognised pattern.
    pub pattern: String,
    pub confidence: Confidence,
    pub severity: Severity,
    pub description: String,
    /// Free-form evidence (counts, offsets, sample names).
    pub details: BTreeMap<String, String>,
    /// The obfuscation tool the pattern is attributed to.
    pub tool: String,
}

impl Finding {
    pub fn new(
        pattern: impl Into<String>,
        confidence: Confidence,
        severity: Severity,
        description: impl Into<String>,
        tool: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            confidence,
            severity,
            description: description.into(),
            details: BTreeMap::new(),
            tool: tool.into(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Run every detector over one file.
pub fn detect_all(tree: &Node, source: &str, ctx: &ProcessingContext) -> Vec<Finding> {
    let mut findings = detect_obfuscator_patterns(tree, ctx);
    findings.extend(detect_encoders(source));
    findings
}

/// Write the findings report next to the input file.
pub fn write_report(path: &Path, findings: &[Finding]) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(findings)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_serializes_with_lowercase_enums() {
        let finding = Finding::new(
            "Control Flow Flattening",
            Confidence::High,
            Severity::Medium,
            "flattened state machine",
            "javascript-obfuscator",
        )
        .with_detail("cases", "7");
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["confidence"], "high");
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["details"]["cases"], "7");
    }
}
