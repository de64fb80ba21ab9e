//! # unweave
//!
//! A JavaScript deobfuscation and bundle-unpacking toolkit.
//!
//! The core is a fixpoint pipeline of tree rewriters over an owned
//! syntax tree, backed by a lexical scope and symbol model:
//!
//! - constant folding, boolean recovery, dead-code elimination
//! - sequence lifting, control-flow normalisation, string decoding
//! - string-array accessor inlining, empty-function pruning
//! - bundle unpacking (webpack chunk/modern/classical, UMD, plain IIFEs)
//!   with per-module file extraction and heuristic naming
//! - obfuscator-pattern and exotic-encoder detection
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use unweave::prelude::*;
//! use std::path::Path;
//!
//! let summary = process_file(Path::new("payload.js"), Options::default())?;
//! println!(
//!     "rewrote into {} ({} passes changed something)",
//!     summary.output_path.display(),
//!     summary.pipeline.total_changes()
//! );
//! for finding in &summary.findings {
//!     println!("{}: {}", finding.pattern, finding.description);
//! }
//! # Ok::<(), unweave::error::UnweaveError>(())
//! ```
//!
//! Parsing and code generation are pluggable at the edges: the core
//! consumes and produces [`ast::Node`] trees, with tree-sitter and the
//! built-in emitter as the default implementations. Optional renamer
//! and sandbox collaborators attach through [`hooks`].

pub mod ast;
pub mod codegen;
pub mod config;
pub mod context;
pub mod detect;
pub mod driver;
pub mod error;
pub mod hooks;
pub mod parse;
pub mod rewrite;
pub mod scope;
pub mod unpack;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::ast::{
        walk_bottom_up, walk_top_down, Node, NodeKind, ParentChain, VisitAction,
    };
    pub use crate::codegen::{generate, Output};
    pub use crate::config::{discover as discover_config, preset, ConfigFile, PRESET_NAMES};
    pub use crate::context::{Options, Phase, ProcessingContext};
    pub use crate::detect::{detect_all, Finding, Severity};
    pub use crate::driver::{process_file, RunSummary};
    pub use crate::error::{Result, UnweaveError};
    pub use crate::hooks::{Renamer, Sandbox, SandboxValue};
    pub use crate::parse::{parse_file, parse_source};
    pub use crate::rewrite::{Pipeline, PipelineReport, Rewriter};
    pub use crate::scope::{Confidence, FunctionInfo, ScopeId, ScopeTable, Variable};
    pub use crate::unpack::{BundleUnpack, UnpackSummary};
}

pub use prelude::*;
