//! Error types for the unweave crate.

use std::path::PathBuf;
use thiserror::Error;

use crate::scope::ScopeId;

/// The main error type for deobfuscation runs.
#[derive(Error, Debug)]
pub enum UnweaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error for {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Circular scope chain at scope {0:?}")]
    CircularScope(ScopeId),

    #[error("Unknown scope id {0:?}")]
    UnknownScope(ScopeId),

    #[error("Rewrite failed in pass '{pass}' on {kind} node: {message}")]
    RewriteFailed {
        pass: &'static str,
        kind: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sandbox evaluation failed: {message}")]
    Sandbox { message: String },

    #[error("Renamer failed: {message}")]
    Renamer { message: String },

    #[error("Code generation failed: {message}")]
    Codegen { message: String },
}

/// A specialized Result type for deobfuscation operations.
pub type Result<T> = std::result::Result<T, UnweaveError>;
