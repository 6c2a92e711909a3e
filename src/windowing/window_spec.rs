use crate::error::{PondError, Result};
use crate::index::{
    daily_index_string, get_index_string, monthly_index_string, window_duration,
    yearly_index_string,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Key used for every event when no windowing is configured.
pub const GLOBAL_WINDOW: &str = "global";

/// How events are assigned to time windows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WindowSpec {
    /// One window for the whole stream.
    #[default]
    Global,
    /// Fixed-size buckets counted from the epoch, e.g. "5m".
    Fixed { spec: String, duration: i64 },
    Daily,
    Monthly,
    Yearly,
}

impl WindowSpec {
    pub fn fixed(spec: &str) -> Result<Self> {
        let duration = window_duration(spec)?;
        if duration <= 0 {
            return Err(PondError::construction(format!(
                "Window duration must be positive: {}",
                spec
            )));
        }
        Ok(WindowSpec::Fixed {
            spec: spec.to_string(),
            duration,
        })
    }

    pub fn is_global(&self) -> bool {
        matches!(self, WindowSpec::Global)
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, WindowSpec::Fixed { .. })
    }

    /// The window type name: "global", "fixed", "daily", "monthly" or "yearly".
    pub fn window_type(&self) -> &'static str {
        match self {
            WindowSpec::Global => GLOBAL_WINDOW,
            WindowSpec::Fixed { .. } => "fixed",
            WindowSpec::Daily => "daily",
            WindowSpec::Monthly => "monthly",
            WindowSpec::Yearly => "yearly",
        }
    }

    /// Window key for an event at `timestamp`: the index string of its
    /// window, or "global" when unwindowed.
    pub fn window_key(&self, timestamp: i64, utc: bool) -> Result<String> {
        match self {
            WindowSpec::Global => Ok(GLOBAL_WINDOW.to_string()),
            WindowSpec::Fixed { spec, .. } => get_index_string(spec, timestamp),
            WindowSpec::Daily => daily_index_string(timestamp, utc),
            WindowSpec::Monthly => monthly_index_string(timestamp, utc),
            WindowSpec::Yearly => yearly_index_string(timestamp, utc),
        }
    }
}

impl FromStr for WindowSpec {
    type Err = PondError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | GLOBAL_WINDOW => Ok(WindowSpec::Global),
            "daily" => Ok(WindowSpec::Daily),
            "monthly" => Ok(WindowSpec::Monthly),
            "yearly" => Ok(WindowSpec::Yearly),
            other => {
                let spec = match other.strip_prefix("fixed:") {
                    Some(spec) => {
                        tracing::warn!(
                            window = other,
                            "the 'fixed:' window prefix is deprecated, use the duration alone"
                        );
                        spec
                    }
                    None => other,
                };
                WindowSpec::fixed(spec).map_err(|_| {
                    PondError::construction(format!("Unknown window type: {}", other))
                })
            }
        }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowSpec::Fixed { spec, .. } => f.write_str(spec),
            other => f.write_str(other.window_type()),
        }
    }
}

impl Serialize for WindowSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WindowSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// When the Collector considers a group ready to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitPolicy {
    /// Emit the group that just received an event, after every event. Other
    /// open groups are not re-emitted, so a consumer sees one collection per
    /// input event rather than every open collection each time. The group
    /// stays open.
    #[default]
    EachEvent,
    /// Hold everything until flush.
    Discard,
    /// Emit a group once a different window key arrives for the same group.
    OnWindowBoundary,
}

impl FromStr for EmitPolicy {
    type Err = PondError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "each_event" | "eachEvent" => Ok(EmitPolicy::EachEvent),
            "discard" => Ok(EmitPolicy::Discard),
            "on_window_boundary" | "onWindowBoundary" => Ok(EmitPolicy::OnWindowBoundary),
            "flush" => {
                tracing::warn!("emit policy 'flush' is deprecated, use 'discard'");
                Ok(EmitPolicy::Discard)
            }
            other => Err(PondError::construction(format!(
                "Unknown emit type supplied to Collector: {}",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for EmitPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
