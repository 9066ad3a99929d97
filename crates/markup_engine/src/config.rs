//! # Engine configuration
//!
//! Serializable settings for an [`Engine`](crate::Engine), normally read
//! from a TOML file. Every field has a default, so an empty file is a valid
//! configuration.
//!
//! ```toml
//! delimiter = ":"
//! compact = true
//! on_filter_error = "propagate"
//! max_depth = 32
//!
//! [globals]
//! site = "example.com"
//!
//! [includes]
//! header = "<h1>{{title}}</h1>"
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ConfigError;
use crate::pipeline::FilterErrorPolicy;
use crate::value::Map;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Default separator between a filter name and its arguments.
pub const DEFAULT_DELIMITER: &str = ">";

/// Default limit on nested renders.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default limit on template size, 1 MiB.
pub const DEFAULT_MAX_TEMPLATE_SIZE: usize = 1024 * 1024;

/// Settings and initial registries for an engine.
///
/// # Examples
///
/// ```rust
/// use markup_engine::{Engine, EngineConfig};
///
/// let config = EngineConfig::from_toml_str(r#"
///     delimiter = ":"
///
///     [globals]
///     site = "example.com"
/// "#).unwrap();
///
/// let mut engine = Engine::from_config(config).unwrap();
/// let out = engine.render("{{site|chop:3}}", &serde_json::json!({}).into()).unwrap();
/// assert_eq!(out, "exa...");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Separator between a filter name and its arguments
    pub delimiter: String,

    /// Collapse whitespace between `>` and `<` in the final output
    pub compact: bool,

    /// What a failing filter step does to the render
    pub on_filter_error: FilterErrorPolicy,

    /// Maximum nesting of blocks, loops and includes
    pub max_depth: usize,

    /// Largest accepted template, in bytes
    pub max_template_size: usize,

    /// Values reachable from every scope as a fallback root
    pub globals: Map,

    /// Named sub-templates
    pub includes: IndexMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            compact: false,
            on_filter_error: FilterErrorPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_template_size: DEFAULT_MAX_TEMPLATE_SIZE,
            globals: Map::new(),
            includes: IndexMap::new(),
        }
    }
}

impl EngineConfig {
    /// Reads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            globals = config.globals.len(),
            includes = config.includes.len(),
            "Loaded engine configuration"
        );
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delimiter.is_empty() {
            return Err(ConfigError::Invalid {
                field: "delimiter".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.max_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_depth".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
