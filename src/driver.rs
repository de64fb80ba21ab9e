//! One-file processing driver: parse → detect → fixpoint → emit.
//!
//! Batch callers run this once per file; every run owns its context, so
//! files can be processed concurrently as long as they write distinct
//! output paths (which `<input>.out` and `<input>.unpacked/` guarantee).

use std::fs;
use std::path::{Path, PathBuf};

use crate::codegen;
use crate::context::{Options, ProcessingContext};
use crate::detect::{self, Finding};
use crate::error::Result;
use crate::parse;
use crate::rewrite::{Pipeline, PipelineReport};

/// What one run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Path of the rewritten source.
    pub output_path: PathBuf,
    pub pipeline: PipelineReport,
    pub findings: Vec<Finding>,
    /// Path of the findings report, when one was written.
    pub report_path: Option<PathBuf>,
}

/// Process a single file end to end.
pub fn process_file(path: &Path, options: Options) -> Result<RunSummary> {
    let (source, mut tree) = parse::parse_file(path)?;
    let mut ctx = ProcessingContext::new(path, options);

    let pipeline = Pipeline::standard(ctx.options.unpack);
    // Detectors see the prepared tree before any rewriting: the string
    // array and flattened switch signatures must still be intact.
    pipeline.prepare(&mut tree, &mut ctx)?;
    let findings = detect::detect_all(&tree, &source, &ctx);

    let report = pipeline.run(&mut tree, &mut ctx)?;
    if !report.converged && !report.timed_out {
        log::warn!(
            "{}: stopped after {} iterations without quiescing",
            path.display(),
            report.iterations
        );
    }

    let output_path = out_path(path);
    fs::write(&output_path, codegen::generate(&tree).code)?;

    let report_path = if ctx.options.emit_report {
        let report_path = malware_report_path(path);
        detect::write_report(&report_path, &findings)?;
        Some(report_path)
    } else {
        None
    };

    Ok(RunSummary {
        output_path,
        pipeline: report,
        findings,
        report_path,
    })
}

/// `<input>.out`
pub fn out_path(input: &Path) -> PathBuf {
    append_suffix(input, ".out")
}

/// `<input>.malware.json`
pub fn malware_report_path(input: &Path) -> PathBuf {
    append_suffix(input, ".malware.json")
}

fn append_suffix(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    name.push_str(suffix);
    input.with_file_name(name)
}
