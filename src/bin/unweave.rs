//! CLI for the unweave deobfuscator.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use std::path::{Path, PathBuf};
use unweave::prelude::*;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "unweave")]
#[command(author, version, about = "JavaScript deobfuscation and bundle unpacking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct RunFlags {
    /// Print per-pass activity
    #[arg(short, long)]
    verbose: bool,

    /// Skip bundle unpacking
    #[arg(long)]
    no_unpack: bool,

    /// Apply rename suggestions from an attached renamer
    #[arg(long)]
    rename: bool,

    /// Write <input>.malware.json with detector findings
    #[arg(long)]
    report: bool,

    /// Fixpoint iteration cap
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Fixpoint timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Start from a named preset (see `unweave presets`)
    #[arg(long)]
    preset: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Deobfuscate a single file
    Run {
        /// Input JavaScript file
        path: PathBuf,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Deobfuscate every matching file under a directory
    Batch {
        /// Directory to scan
        dir: PathBuf,

        /// Recurse into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Glob pattern for files to include
        #[arg(short, long, default_value = "*.js")]
        glob: String,

        /// Glob patterns to exclude
        #[arg(long)]
        exclude: Vec<String>,

        /// Stop after this many files
        #[arg(long)]
        max_files: Option<usize>,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Run the detectors only and print findings
    Detect {
        /// Input JavaScript file
        path: PathBuf,
    },

    /// List configuration presets
    Presets,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { path, flags } => cmd_run(&path, &flags),
        Commands::Batch {
            dir,
            recursive,
            glob,
            exclude,
            max_files,
            flags,
        } => cmd_batch(&dir, recursive, &glob, &exclude, max_files, &flags),
        Commands::Detect { path } => cmd_detect(&path),
        Commands::Presets => cmd_presets(),
    };

    if let Err(e) = result {
        eprintln!("ERROR {e:#}");
        std::process::exit(1);
    }
}

/// Resolve options from config discovery plus command-line flags.
fn resolve_options(start: &Path, flags: &RunFlags) -> Result<Options> {
    let file = unweave::config::discover(start)
        .context("config discovery failed")?
        .map(|(path, config)| {
            log::debug!("using config from {}", path.display());
            config
        });

    let cli = ConfigFile {
        preset: flags.preset.clone(),
        verbose: flags.verbose.then_some(true),
        unpack: flags.no_unpack.then_some(false),
        rename: flags.rename.then_some(true),
        report: flags.report.then_some(true),
        max_iterations: flags.max_iterations,
        timeout_secs: flags.timeout,
    };

    let effective = unweave::config::resolve(file.as_ref(), &cli)?;
    Ok(effective.into_options())
}

fn cmd_run(path: &Path, flags: &RunFlags) -> Result<()> {
    let start = path.parent().unwrap_or(Path::new("."));
    let options = resolve_options(start, flags)?;
    let summary = process_file(path, options)
        .with_context(|| format!("failed to process {}", path.display()))?;
    print_summary(path, &summary);
    Ok(())
}

fn cmd_batch(
    dir: &Path,
    recursive: bool,
    glob: &str,
    exclude: &[String],
    max_files: Option<usize>,
    flags: &RunFlags,
) -> Result<()> {
    let options = resolve_options(dir, flags)?;

    let include = Glob::new(glob)
        .with_context(|| format!("invalid glob '{glob}'"))?
        .compile_matcher();
    let mut exclude_builder = GlobSetBuilder::new();
    for pattern in exclude {
        exclude_builder.add(Glob::new(pattern).with_context(|| format!("invalid glob '{pattern}'"))?);
    }
    let exclude_set = exclude_builder.build()?;

    let max_depth = if recursive { usize::MAX } else { 1 };
    let cap = max_files.unwrap_or(usize::MAX);

    let mut processed = 0usize;
    let mut failed = 0usize;
    for entry in WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if !include.is_match(name.as_ref()) || exclude_set.is_match(path) {
            continue;
        }
        if processed + failed >= cap {
            break;
        }

        match process_file(path, options.clone()) {
            Ok(summary) => {
                processed += 1;
                println!(
                    "OK   {} -> {}",
                    path.display(),
                    summary.output_path.display()
                );
            }
            Err(e) => {
                failed += 1;
                println!("FAIL {}: {e}", path.display());
            }
        }
    }

    println!("{processed} file(s) processed, {failed} failed");
    if processed == 0 && failed == 0 {
        anyhow::bail!("no files matched under {}", dir.display());
    }
    Ok(())
}

fn cmd_detect(path: &Path) -> Result<()> {
    let (source, mut tree) =
        parse_file(path).with_context(|| format!("failed to parse {}", path.display()))?;
    let mut ctx = ProcessingContext::new(path, Options::default());
    let pipeline = Pipeline::standard(false);
    pipeline.prepare(&mut tree, &mut ctx)?;

    let findings = detect_all(&tree, &source, &ctx);
    if findings.is_empty() {
        println!("no obfuscation patterns detected");
        return Ok(());
    }
    for finding in &findings {
        println!(
            "{} [{} confidence, {:?} severity] - {}",
            finding.pattern,
            finding.confidence.name(),
            finding.severity,
            finding.description
        );
    }
    Ok(())
}

fn cmd_presets() -> Result<()> {
    for name in PRESET_NAMES {
        println!("{name}");
    }
    Ok(())
}

fn print_summary(path: &Path, summary: &RunSummary) {
    println!(
        "{} -> {} ({} iteration(s), {} rewrites)",
        path.display(),
        summary.output_path.display(),
        summary.pipeline.iterations,
        summary.pipeline.total_changes()
    );
    for finding in &summary.findings {
        println!(
            "  finding: {} ({} confidence)",
            finding.pattern,
            finding.confidence.name()
        );
    }
    if let Some(report) = &summary.report_path {
        println!("  report: {}", report.display());
    }
}
