//! Check configuration
//!
//! The sink denylist and the set of recognized unsafe-construction patterns
//! are data, not control flow: tests and deployments can swap them without
//! touching the traversal engine. Configuration loads from an optional
//! `sqlsift.toml` next to the checked files.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "sqlsift.toml";

/// An unsafe query-construction pattern the classifier can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPattern {
    /// `"... %s" % params`
    Interpolation,
    /// `"..." + params`
    Concatenation,
    /// `"...{}".format(params)`
    StrFormat,
}

/// Configuration for one check run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Call targets treated as database-execution sinks, matched
    /// case-insensitively against canonical call names.
    pub sinks: Vec<String>,
    /// Enabled unsafe-construction patterns.
    pub patterns: Vec<QueryPattern>,
    /// Whether any call to `eval` is flagged unconditionally.
    pub flag_eval: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            sinks: vec!["session.execute".to_string(), "cursor.execute".to_string()],
            patterns: vec![
                QueryPattern::Interpolation,
                QueryPattern::Concatenation,
                QueryPattern::StrFormat,
            ],
            flag_eval: true,
        }
    }
}

impl CheckConfig {
    /// Load config from an explicit file. Unlike [`CheckConfig::discover`],
    /// a broken file here is a hard error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: CheckConfig =
            toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load `sqlsift.toml` from `dir` if present, falling back to defaults.
    /// A malformed file is logged and ignored rather than aborting the run.
    pub fn discover(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            match Self::from_file(&path) {
                Ok(config) => {
                    debug!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load {}: {:#}", path.display(), e);
                }
            }
        }
        Self::default()
    }

    /// Append a sink name to the denylist.
    pub fn add_sink(&mut self, name: &str) {
        self.sinks.push(name.to_string());
    }

    /// Whether a canonical call target is a configured sink.
    pub fn is_sink(&self, canonical: &str) -> bool {
        let lowered = canonical.to_lowercase();
        self.sinks.iter().any(|s| s.eq_ignore_ascii_case(&lowered))
    }

    /// Whether a pattern is enabled.
    pub fn has_pattern(&self, pattern: QueryPattern) -> bool {
        self.patterns.contains(&pattern)
    }
}
