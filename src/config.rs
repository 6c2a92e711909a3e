//! Pipeline-level settings shared by every stage added while they are in force.

use crate::error::Result;
use crate::event::field::get_path;
use crate::event::{AnyEvent, TimedEvent};
use crate::windowing::{EmitPolicy, WindowSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Whether the pipeline is fed incrementally or from a bounded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Stream,
    #[default]
    Batch,
}

type GroupByFn = dyn Fn(&AnyEvent) -> Option<String> + Send + Sync;

/// Secondary partition key derived from event content.
#[derive(Clone)]
pub struct GroupBy {
    label: String,
    func: Arc<GroupByFn>,
}

impl GroupBy {
    /// Group on the value at a dot-path. Events without it share the
    /// ungrouped partition.
    pub fn field(path: impl Into<String>) -> Self {
        let path = path.into();
        let lookup = path.clone();
        Self {
            label: path,
            func: Arc::new(move |event: &AnyEvent| match get_path(event.data(), &lookup) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            }),
        }
    }

    pub fn custom<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&AnyEvent) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    pub fn key(&self, event: &AnyEvent) -> Option<String> {
        (self.func)(event)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBy").field("label", &self.label).finish()
    }
}

/// Settings a stage picks up from the pipeline it is added to.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: Mode,
    pub window: WindowSpec,
    pub group_by: Option<GroupBy>,
    pub emit: EmitPolicy,
    pub utc: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            window: WindowSpec::default(),
            group_by: None,
            emit: EmitPolicy::default(),
            utc: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPipelineConfig {
    mode: Mode,
    window: WindowSpec,
    group_by: Option<String>,
    emit: EmitPolicy,
    utc: bool,
}

impl Default for RawPipelineConfig {
    fn default() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            mode: defaults.mode,
            window: defaults.window,
            group_by: None,
            emit: defaults.emit,
            utc: defaults.utc,
        }
    }
}

impl From<RawPipelineConfig> for PipelineConfig {
    fn from(raw: RawPipelineConfig) -> Self {
        Self {
            mode: raw.mode,
            window: raw.window,
            group_by: raw.group_by.map(GroupBy::field),
            emit: raw.emit,
            utc: raw.utc,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML document:
    ///
    /// ```toml
    /// mode = "stream"
    /// window = "5m"
    /// group_by = "host"
    /// emit = "on_window_boundary"
    /// utc = true
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: RawPipelineConfig = toml::from_str(s)?;
        let config = PipelineConfig::from(raw);
        tracing::debug!(?config, "loaded pipeline config");
        Ok(config)
    }

    /// Load from a JSON object with the same keys as the TOML form.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: RawPipelineConfig = serde_json::from_str(s)?;
        Ok(PipelineConfig::from(raw))
    }

    /// Group key of an event, None when ungrouped.
    pub fn group_key(&self, event: &AnyEvent) -> Option<String> {
        self.group_by.as_ref().and_then(|g| g.key(event))
    }
}
