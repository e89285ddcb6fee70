//! Module: settings
//! Responsibility: turn a validated `RowscopeConfig` into runtime engine
//! settings (policy tables, pipeline mode, paging, batch size).
//! Does not own: TOML parsing or validation; see `rowscope_config`.

use crate::Error;
use rowscope_config::{ConfigValue, PaginationConfig, PipelineModeConfig, RowscopeConfig};
use rowscope_core::{
    db::{
        filter::SourceTag,
        plan::PipelineMode,
        policy::{PolicySet, RolePolicyTable, SourcePolicyTable, SourceRule},
    },
    value::Value,
};

///
/// EngineSettings
///
/// Shared read-only runtime settings. Built once at startup.
///

#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub policies: PolicySet,
    pub mode: PipelineMode,
    pub pagination: PaginationConfig,
    pub batch_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            policies: PolicySet::standard(),
            mode: PipelineMode::default(),
            pagination: PaginationConfig::default(),
            batch_size: rowscope_config::DEFAULT_BATCH_SIZE,
        }
    }
}

impl EngineSettings {
    /// Build settings from a config document.
    ///
    /// An empty `[[sources]]` list keeps the standard buckets; any configured
    /// source replaces them entirely.
    pub fn from_config(config: &RowscopeConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            policies: PolicySet::new(RolePolicyTable::standard(), source_table(config)?),
            mode: pipeline_mode(config.engine.mode),
            pagination: config.pagination.clone(),
            batch_size: config.workflow.batch_size,
        })
    }

    #[must_use]
    pub fn with_policies(mut self, policies: PolicySet) -> Self {
        self.policies = policies;
        self
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: PipelineMode) -> Self {
        self.mode = mode;
        self
    }
}

///
/// PageRequest
/// Caller-requested window; the limit is clamped by `PaginationConfig`.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl PageRequest {
    #[must_use]
    pub const fn new(limit: Option<u32>, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Effective `(limit, offset)` after clamping.
    #[must_use]
    pub fn resolve(&self, pagination: &PaginationConfig) -> (u32, u32) {
        (pagination.clamp(self.limit), self.offset)
    }
}

const fn pipeline_mode(mode: PipelineModeConfig) -> PipelineMode {
    match mode {
        PipelineModeConfig::Flat => PipelineMode::Flat,
        PipelineModeConfig::Staged => PipelineMode::Staged,
    }
}

fn source_table(config: &RowscopeConfig) -> Result<SourcePolicyTable, Error> {
    if config.sources.is_empty() {
        return Ok(SourcePolicyTable::standard());
    }

    let mut table = SourcePolicyTable::new();
    for source in &config.sources {
        let tag: SourceTag = source.tag.parse()?;
        let values = source
            .values
            .iter()
            .map(|value| config_value(&source.tag, value))
            .collect::<Result<Vec<_>, _>>()?;

        table = table.with_rule(tag, SourceRule::new(source.field.clone(), values));
    }

    Ok(table)
}

fn config_value(tag: &str, value: &ConfigValue) -> Result<Value, Error> {
    match value {
        ConfigValue::Bool(b) => Ok(Value::Bool(*b)),
        ConfigValue::Int(n) => Ok(Value::Int(*n)),
        ConfigValue::Float(v) => Value::float(*v).ok_or_else(|| {
            Error::new(
                crate::ErrorKind::Config,
                crate::ErrorOrigin::Config,
                format!("source '{tag}' has a non-finite float value"),
            )
        }),
        ConfigValue::Text(s) => Ok(Value::text(s.clone())),
    }
}
