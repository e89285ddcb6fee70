//! TOML configuration for rowscope deployments.
//!
//! This crate only parses and validates; it knows nothing about the engine.
//! The facade turns a validated `RowscopeConfig` into policy tables and
//! paging defaults.


use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fs, io, path::Path};
use thiserror::Error as ThisError;

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const DEFAULT_MAX_PAGE_LIMIT: u32 = 500;
pub const DEFAULT_BATCH_SIZE: usize = 500;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("workflow.batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("pagination.max_limit must be greater than zero")]
    ZeroMaxLimit,

    #[error("pagination.default_limit ({default_limit}) exceeds max_limit ({max_limit})")]
    DefaultAboveMax { default_limit: u32, max_limit: u32 },

    #[error("source tag '{0}' is configured more than once")]
    DuplicateSource(String),

    #[error("source '{tag}' must name a field and at least one value")]
    EmptySource { tag: String },
}

///
/// PipelineModeConfig
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineModeConfig {
    Flat,
    #[default]
    Staged,
}

///
/// EngineConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub mode: PipelineModeConfig,
}

///
/// PaginationConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: DEFAULT_MAX_PAGE_LIMIT,
        }
    }
}

impl PaginationConfig {
    /// Effective limit for a request: the default when absent, never above
    /// `max_limit`.
    #[must_use]
    pub fn clamp(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }
}

///
/// WorkflowConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    pub batch_size: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

///
/// ConfigValue
/// Literal allowed in a source bucket's value list.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

///
/// SourceConfig
/// One `[[sources]]` entry: `field IN (values)` for the named tag.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub tag: String,
    pub field: String,
    pub values: Vec<ConfigValue>,
}

///
/// RowscopeConfig
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RowscopeConfig {
    pub engine: EngineConfig,
    pub pagination: PaginationConfig,
    pub workflow: WorkflowConfig,
    pub sources: Vec<SourceConfig>,
}

impl RowscopeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workflow.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.pagination.max_limit == 0 {
            return Err(ConfigError::ZeroMaxLimit);
        }
        if self.pagination.default_limit > self.pagination.max_limit {
            return Err(ConfigError::DefaultAboveMax {
                default_limit: self.pagination.default_limit,
                max_limit: self.pagination.max_limit,
            });
        }

        let mut seen = BTreeSet::new();
        for source in &self.sources {
            if source.field.is_empty() || source.values.is_empty() {
                return Err(ConfigError::EmptySource {
                    tag: source.tag.clone(),
                });
            }
            if !seen.insert(source.tag.as_str()) {
                return Err(ConfigError::DuplicateSource(source.tag.clone()));
            }
        }

        Ok(())
    }
}
