//! Configuration discovery and presets.
//!
//! A JSON document named `unweave.json` is searched for in the working
//! directory, its ancestors, and the user's home directory. Presets are
//! named bundles of flag overrides; explicit command-line flags beat
//! both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::Options;
use crate::error::{Result, UnweaveError};

pub const CONFIG_FILE_NAME: &str = "unweave.json";

/// On-disk configuration; every field optional so files can stay small.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Name of a preset to start from.
    pub preset: Option<String>,
    pub verbose: Option<bool>,
    pub unpack: Option<bool>,
    pub rename: Option<bool>,
    pub report: Option<bool>,
    pub max_iterations: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Overlay `other` on top of `self`: set fields in `other` win.
    pub fn overlay(mut self, other: &ConfigFile) -> Self {
        if other.preset.is_some() {
            self.preset = other.preset.clone();
        }
        self.verbose = other.verbose.or(self.verbose);
        self.unpack = other.unpack.or(self.unpack);
        self.rename = other.rename.or(self.rename);
        self.report = other.report.or(self.report);
        self.max_iterations = other.max_iterations.or(self.max_iterations);
        self.timeout_secs = other.timeout_secs.or(self.timeout_secs);
        self
    }

    /// Fill run options from this config, defaulting unset fields.
    pub fn into_options(self) -> Options {
        let defaults = Options::default();
        Options {
            verbose: self.verbose.unwrap_or(defaults.verbose),
            unpack: self.unpack.unwrap_or(defaults.unpack),
            rename: self.rename.unwrap_or(defaults.rename),
            emit_report: self.report.unwrap_or(defaults.emit_report),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            timeout: self
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
        }
    }
}

/// Named bundles of flag overrides.
pub fn preset(name: &str) -> Option<ConfigFile> {
    let config = match name {
        "malware-analysis" => ConfigFile {
            verbose: Some(true),
            unpack: Some(true),
            rename: Some(false),
            report: Some(true),
            ..ConfigFile::default()
        },
        "minified-code" => ConfigFile {
            unpack: Some(false),
            rename: Some(true),
            ..ConfigFile::default()
        },
        "webpack-bundle" => ConfigFile {
            unpack: Some(true),
            report: Some(false),
            ..ConfigFile::default()
        },
        "fast" => ConfigFile {
            unpack: Some(false),
            rename: Some(false),
            max_iterations: Some(10),
            timeout_secs: Some(30),
            ..ConfigFile::default()
        },
        _ => return None,
    };
    Some(config)
}

pub const PRESET_NAMES: &[&str] = &["malware-analysis", "minified-code", "webpack-bundle", "fast"];

/// Search for a config file in `start`, its ancestors, then the home
/// directory. The nearest file wins.
pub fn discover(start: &Path) -> Result<Option<(PathBuf, ConfigFile)>> {
    for dir in start.ancestors() {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(Some((candidate.clone(), load(&candidate)?)));
        }
    }
    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(Some((candidate.clone(), load(&candidate)?)));
        }
    }
    Ok(None)
}

pub fn load(path: &Path) -> Result<ConfigFile> {
    let text = std::fs::read_to_string(path)?;
    let config: ConfigFile = serde_json::from_str(&text)?;
    if let Some(name) = &config.preset {
        if preset(name).is_none() {
            return Err(UnweaveError::InvalidConfig(format!(
                "unknown preset '{name}' in {}",
                path.display()
            )));
        }
    }
    Ok(config)
}

/// Resolve the effective config: defaults ← preset ← file ← CLI
/// overrides.
pub fn resolve(file: Option<&ConfigFile>, cli: &ConfigFile) -> Result<ConfigFile> {
    let mut effective = ConfigFile::default();

    let preset_name = cli
        .preset
        .clone()
        .or_else(|| file.and_then(|f| f.preset.clone()));
    if let Some(name) = preset_name {
        let bundle = preset(&name)
            .ok_or_else(|| UnweaveError::InvalidConfig(format!("unknown preset '{name}'")))?;
        effective = effective.overlay(&bundle);
    }
    if let Some(file) = file {
        effective = effective.overlay(file);
    }
    effective = effective.overlay(cli);
    Ok(effective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_preset_names_all_resolve() {
        for name in PRESET_NAMES {
            assert!(preset(name).is_some(), "missing preset {name}");
        }
        assert!(preset("nonsense").is_none());
    }

    #[test]
    fn test_cli_overrides_file_and_preset() {
        let file = ConfigFile {
            preset: Some("fast".to_string()),
            max_iterations: Some(20),
            ..ConfigFile::default()
        };
        let cli = ConfigFile {
            max_iterations: Some(50),
            ..ConfigFile::default()
        };
        let effective = resolve(Some(&file), &cli).unwrap();
        // CLI beats the file, which beats the preset's 10.
        assert_eq!(effective.max_iterations, Some(50));
        // Preset fields without overrides survive.
        assert_eq!(effective.unpack, Some(false));
    }

    #[test]
    fn test_discover_walks_ancestors() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "verbose": true }"#,
        )
        .unwrap();

        let found = discover(&nested).unwrap();
        let (path, config) = found.expect("config found in ancestor");
        assert_eq!(path, dir.path().join(CONFIG_FILE_NAME));
        assert_eq!(config.verbose, Some(true));
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "preset": "turbo" }"#).unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "verbsoe": true }"#).unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_into_options_defaults() {
        let options = ConfigFile::default().into_options();
        assert_eq!(options.max_iterations, 100);
        assert!(options.unpack);
        assert!(!options.rename);
    }
}
