//! Writing extracted modules and their index files.
//!
//! Each module lands in `<input>.unpacked/<name>.js` with a header
//! comment; `README.md` is the human index and `mapping.json` the
//! machine-readable one. Collision names get `_1`, `_2`, … suffixes.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::context::ProcessingContext;
use crate::error::Result;
use crate::scope::Confidence;
use crate::unpack::naming::ModuleName;

/// One module ready to be written.
pub struct ExtractedModule {
    pub id: String,
    pub code: String,
    pub naming: ModuleName,
}

#[derive(Serialize)]
struct ModuleRecord {
    id: String,
    filename: String,
    pattern_name: String,
    confidence: Confidence,
    reason: String,
    malware: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    renamer_suggested_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    renamer_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    renamer_confidence: Option<Confidence>,
}

#[derive(Serialize)]
struct MappingFile {
    source: String,
    generated_at: String,
    total_modules: usize,
    suspicious_count: usize,
    modules: Vec<ModuleRecord>,
}

/// What one unpack emitted, reported back to the caller.
pub struct UnpackSummary {
    pub directory: PathBuf,
    pub module_count: usize,
    pub suspicious_count: usize,
}

/// Write all module files plus `README.md` and `mapping.json`.
pub fn write_unpacked(
    ctx: &ProcessingContext,
    modules: Vec<ExtractedModule>,
) -> Result<UnpackSummary> {
    let dir = ctx.unpack_dir();
    fs::create_dir_all(&dir)?;

    let source_name = ctx
        .source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ctx.source_path.display().to_string());

    let mut used: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(modules.len());
    let mut suspicious_count = 0;

    for module in &modules {
        let base = &module.naming.name;
        let mut candidate = base.clone();
        let mut n = 0;
        while !used.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{base}_{n}");
        }
        let filename = format!("{candidate}.js");

        let mut header = String::new();
        let _ = writeln!(header, "// Module {} extracted from {}", module.id, source_name);
        let _ = writeln!(
            header,
            "// Pattern: {} (confidence: {})",
            module.naming.pattern,
            module.naming.confidence.name()
        );
        let _ = writeln!(header, "// Reason: {}", module.naming.reason);
        if module.naming.suspicious {
            suspicious_count += 1;
            let _ = writeln!(
                header,
                "// WARNING: this module matched a malware-suspicious pattern; review before running"
            );
        }
        header.push('\n');

        fs::write(dir.join(&filename), format!("{header}{}", module.code))?;

        records.push(ModuleRecord {
            id: module.id.clone(),
            filename,
            pattern_name: module.naming.pattern.clone(),
            confidence: module.naming.confidence,
            reason: module.naming.reason.clone(),
            malware: module.naming.suspicious,
            renamer_suggested_name: None,
            renamer_reason: None,
            renamer_confidence: None,
        });
    }

    let readme = render_readme(&source_name, &records, suspicious_count);
    fs::write(dir.join("README.md"), readme)?;

    let mapping = MappingFile {
        source: source_name,
        generated_at: chrono::Utc::now().to_rfc3339(),
        total_modules: records.len(),
        suspicious_count,
        modules: records,
    };
    fs::write(
        dir.join("mapping.json"),
        serde_json::to_string_pretty(&mapping)?,
    )?;

    Ok(UnpackSummary {
        directory: dir,
        module_count: mapping.total_modules,
        suspicious_count,
    })
}

fn render_readme(source: &str, records: &[ModuleRecord], suspicious_count: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Unpacked modules from `{source}`");
    let _ = writeln!(out);
    let _ = writeln!(out, "{} module(s) extracted.", records.len());
    if suspicious_count > 0 {
        let _ = writeln!(
            out,
            "**{suspicious_count} module(s) matched malware-suspicious patterns.**"
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "| Id | File | Pattern | Confidence | Reason |");
    let _ = writeln!(out, "|----|------|---------|------------|--------|");
    for r in records {
        let _ = writeln!(
            out,
            "| {} | `{}` | {} | {} | {} |",
            r.id,
            r.filename,
            r.pattern_name,
            r.confidence.name(),
            r.reason
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Options;
    use tempfile::TempDir;

    fn module(id: &str, name: &str, suspicious: bool) -> ExtractedModule {
        ExtractedModule {
            id: id.to_string(),
            code: "exports.x = 1;\n".to_string(),
            naming: ModuleName {
                name: name.to_string(),
                pattern: if suspicious {
                    "SUSPICIOUS_executor".to_string()
                } else {
                    "utils".to_string()
                },
                confidence: Confidence::Medium,
                reason: "test".to_string(),
                suspicious,
            },
        }
    }

    #[test]
    fn test_writes_files_and_indexes() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bundle.js");
        std::fs::write(&input, "").unwrap();
        let ctx = ProcessingContext::new(&input, Options::default());

        let summary = write_unpacked(
            &ctx,
            vec![module("0", "getUser", false), module("1", "SUSPICIOUS_executor", true)],
        )
        .unwrap();

        assert_eq!(summary.module_count, 2);
        assert_eq!(summary.suspicious_count, 1);

        let unpacked = dir.path().join("bundle.js.unpacked");
        assert!(unpacked.join("getUser.js").exists());
        assert!(unpacked.join("SUSPICIOUS_executor.js").exists());
        assert!(unpacked.join("README.md").exists());

        let mapping: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(unpacked.join("mapping.json")).unwrap())
                .unwrap();
        assert_eq!(mapping["total_modules"], 2);
        assert_eq!(mapping["suspicious_count"], 1);
        assert_eq!(mapping["modules"][1]["malware"], true);
        assert_eq!(mapping["modules"][0]["confidence"], "medium");
    }

    #[test]
    fn test_name_collisions_get_suffixes() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bundle.js");
        std::fs::write(&input, "").unwrap();
        let ctx = ProcessingContext::new(&input, Options::default());

        write_unpacked(
            &ctx,
            vec![
                module("0", "helper", false),
                module("1", "helper", false),
                module("2", "helper", false),
            ],
        )
        .unwrap();

        let unpacked = dir.path().join("bundle.js.unpacked");
        assert!(unpacked.join("helper.js").exists());
        assert!(unpacked.join("helper_1.js").exists());
        assert!(unpacked.join("helper_2.js").exists());
    }

    #[test]
    fn test_module_header_mentions_warning() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bundle.js");
        std::fs::write(&input, "").unwrap();
        let ctx = ProcessingContext::new(&input, Options::default());

        write_unpacked(&ctx, vec![module("1", "SUSPICIOUS_executor", true)]).unwrap();

        let content = std::fs::read_to_string(
            dir.path()
                .join("bundle.js.unpacked")
                .join("SUSPICIOUS_executor.js"),
        )
        .unwrap();
        assert!(content.contains("// Module 1 extracted from bundle.js"));
        assert!(content.contains("WARNING"));
    }
}
