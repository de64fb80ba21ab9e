//! The per-run processing context.
//!
//! One context is created per input file and owns everything a run
//! mutates: the scope table, the functions table, configuration and the
//! optional collaborator hooks. Nothing here is process-global; parallel
//! runs over different files each own an independent context.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hooks::{Renamer, Sandbox};
use crate::scope::{FunctionInfo, ScopeTable};

/// Flags controlling one run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Emit `INFO` lines for per-node rewrite activity.
    pub verbose: bool,
    /// Run the bundle unpackers and write module files.
    pub unpack: bool,
    /// Invoke the renamer hook when one is attached.
    pub rename: bool,
    /// Write `<input>.malware.json` with detector findings.
    pub emit_report: bool,
    /// Fixpoint sweep cap.
    pub max_iterations: usize,
    /// Wall-clock bound for the fixpoint, checked between passes.
    pub timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            verbose: false,
            unpack: true,
            rename: false,
            emit_report: false,
            max_iterations: 100,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Progress of a run through its phases; the pipeline consults this
/// instead of per-pass re-entry flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Tree freshly parsed; symbols not yet registered.
    Initial,
    /// Pre-passes done: scopes exist, call counts seeded.
    Prepared,
    /// Fixpoint finished (quiesced or capped).
    Rewritten,
    /// Post-passes applied; tree ready for the generator.
    Finalized,
}

/// Everything owned by a single deobfuscation run.
pub struct ProcessingContext {
    /// All scopes, keyed by id.
    pub scopes: ScopeTable,
    /// Functions visible across nodes, keyed by declared name.
    pub functions: HashMap<String, FunctionInfo>,
    pub options: Options,
    /// Input path; side files derive their locations from it.
    pub source_path: PathBuf,
    pub phase: Phase,
    pub renamer: Option<Box<dyn Renamer>>,
    pub sandbox: Option<Box<dyn Sandbox>>,
}

impl ProcessingContext {
    pub fn new(source_path: impl Into<PathBuf>, options: Options) -> Self {
        Self {
            scopes: ScopeTable::new(),
            functions: HashMap::new(),
            options,
            source_path: source_path.into(),
            phase: Phase::Initial,
            renamer: None,
            sandbox: None,
        }
    }

    pub fn with_renamer(mut self, renamer: Box<dyn Renamer>) -> Self {
        self.renamer = Some(renamer);
        self
    }

    pub fn with_sandbox(mut self, sandbox: Box<dyn Sandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Directory that unpacked modules are written to.
    pub fn unpack_dir(&self) -> PathBuf {
        let mut name = self
            .source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        name.push_str(".unpacked");
        self.source_path.with_file_name(name)
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut FunctionInfo> {
        self.functions.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_dir_is_sibling_of_input() {
        let ctx = ProcessingContext::new("/tmp/bundle.js", Options::default());
        assert_eq!(
            ctx.unpack_dir(),
            PathBuf::from("/tmp/bundle.js.unpacked")
        );
    }

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(opts.max_iterations, 100);
        assert_eq!(opts.timeout, Duration::from_secs(300));
        assert!(!opts.verbose);
    }
}
