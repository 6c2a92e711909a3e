use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Built-in reduction over an ordered sequence of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    First,
    Last,
    Difference,
    Median,
    Stdev,
}

impl AggregateFunction {
    /// Apply the reduction. Empty input yields None for every function except
    /// Sum and Count, which fold from zero.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Sum => Some(values.iter().sum()),
            Self::Count => Some(values.len() as f64),
            _ if values.is_empty() => None,
            Self::Avg => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Min => Some(values.iter().copied().fold(f64::INFINITY, f64::min)),
            Self::Max => Some(values.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            Self::First => values.first().copied(),
            Self::Last => values.last().copied(),
            Self::Difference => Some(Self::Max.apply(values)? - Self::Min.apply(values)?),
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
            Self::Stdev => {
                let mean = Self::Avg.apply(values)?;
                let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                Some((sum_sq / values.len() as f64).sqrt())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
            Self::First => "first",
            Self::Last => "last",
            Self::Difference => "difference",
            Self::Median => "median",
            Self::Stdev => "stdev",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sum" => Self::Sum,
            "avg" | "mean" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            "count" => Self::Count,
            "first" => Self::First,
            "last" => Self::Last,
            "difference" => Self::Difference,
            "median" => Self::Median,
            "stdev" => Self::Stdev,
            _ => return None,
        })
    }
}

type ReducerFn = dyn Fn(&[f64]) -> Option<f64> + Send + Sync;

/// A reducer: built-in or a user supplied closure. Cheap to clone.
#[derive(Clone)]
pub struct Reducer {
    name: String,
    func: Arc<ReducerFn>,
}

impl Reducer {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[f64]) -> Option<f64> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Look up a built-in reducer by name ("sum", "avg", ...).
    pub fn by_name(name: &str) -> Option<Self> {
        AggregateFunction::from_name(name).map(Self::from)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        (self.func)(values)
    }

    pub fn sum() -> Self {
        AggregateFunction::Sum.into()
    }

    pub fn avg() -> Self {
        AggregateFunction::Avg.into()
    }

    pub fn min() -> Self {
        AggregateFunction::Min.into()
    }

    pub fn max() -> Self {
        AggregateFunction::Max.into()
    }

    pub fn count() -> Self {
        AggregateFunction::Count.into()
    }

    pub fn first() -> Self {
        AggregateFunction::First.into()
    }

    pub fn last() -> Self {
        AggregateFunction::Last.into()
    }

    pub fn difference() -> Self {
        AggregateFunction::Difference.into()
    }

    pub fn median() -> Self {
        AggregateFunction::Median.into()
    }

    pub fn stdev() -> Self {
        AggregateFunction::Stdev.into()
    }
}

impl From<AggregateFunction> for Reducer {
    fn from(function: AggregateFunction) -> Self {
        Self::new(function.name(), move |values| function.apply(values))
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer").field("name", &self.name).finish()
    }
}
