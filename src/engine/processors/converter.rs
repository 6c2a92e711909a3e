use super::required;
use crate::config::PipelineConfig;
use crate::engine::chain::{ChainLink, Processor, ProcessorKind, impl_processor, unique_id};
use crate::engine::observable::{Observable, Observer};
use crate::error::{PondError, Result};
use crate::event::{AnyEvent, Event, EventVariant, IndexedEvent, TimeRangeEvent, TimedEvent};
use crate::index::{get_index_string, window_duration};
use crate::time_range::TimeRange;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which extent to build (front, center, behind) when widening an instant,
/// or which instant to pick (lag, center, lead) when narrowing a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Front,
    #[default]
    Center,
    Behind,
    Lag,
    Lead,
}

#[derive(Debug, Clone, Default)]
pub struct ConverterOptions {
    pub target: Option<EventVariant>,
    /// Duration spec such as "1h"; needed when converting an Event to a
    /// ranged variant.
    pub duration: Option<String>,
    pub alignment: Option<Alignment>,
}

#[derive(Debug, Clone)]
struct Duration {
    spec: String,
    ms: i64,
}

/// Converts events between the three variants.
#[derive(Debug)]
pub struct Converter {
    id: String,
    prev: ChainLink,
    observable: Observable,
    target: EventVariant,
    duration: Option<Duration>,
    alignment: Alignment,
}

impl Converter {
    pub fn new(
        _pipeline: &PipelineConfig,
        prev: ChainLink,
        options: ConverterOptions,
    ) -> Result<Self> {
        let target = required(options.target, "Converter", "target")?;
        let duration = match options.duration {
            Some(spec) => {
                let ms = window_duration(&spec)?;
                Some(Duration { spec, ms })
            }
            None => None,
        };
        Ok(Self {
            id: unique_id("processor-"),
            prev,
            observable: Observable::new(),
            target,
            duration,
            alignment: options.alignment.unwrap_or_default(),
        })
    }

    fn fresh_copy(&self) -> Self {
        Self {
            id: unique_id("processor-"),
            prev: self.prev.clone(),
            observable: Observable::new(),
            target: self.target,
            duration: self.duration.clone(),
            alignment: self.alignment,
        }
    }

    fn positive_duration(&self) -> Result<&Duration> {
        match &self.duration {
            Some(duration) if duration.ms > 0 => Ok(duration),
            Some(duration) => Err(PondError::conversion(format!(
                "Duration must be positive, got {}",
                duration.spec
            ))),
            None => Err(PondError::conversion("Duration expected in converter")),
        }
    }

    fn duration_spec(&self) -> &str {
        self.duration.as_ref().map_or("", |d| d.spec.as_str())
    }

    /// Convert one event to the target variant.
    pub fn convert(&self, event: &AnyEvent) -> Result<AnyEvent> {
        match (event, self.target) {
            (AnyEvent::Event(_), EventVariant::Event)
            | (AnyEvent::Indexed(_), EventVariant::Indexed)
            | (AnyEvent::TimeRange(_), EventVariant::TimeRange) => Ok(event.clone()),

            (AnyEvent::Event(e), EventVariant::TimeRange) => {
                let d = self.positive_duration()?.ms;
                let ts = e.timestamp();
                let out_of_range = || {
                    PondError::conversion(format!(
                        "Widening {} by {} leaves the time range",
                        ts, self.duration_spec()
                    ))
                };
                let (begin, end) = match self.alignment {
                    Alignment::Front => (ts, ts.checked_add(d).ok_or_else(out_of_range)?),
                    // halves computed in floating point, truncated toward zero
                    Alignment::Center => (
                        (ts as f64 - d as f64 / 2.0) as i64,
                        (ts as f64 + d as f64 / 2.0) as i64,
                    ),
                    Alignment::Behind => (ts.checked_sub(d).ok_or_else(out_of_range)?, ts),
                    other => {
                        return Err(PondError::conversion(format!(
                            "Alignment {:?} cannot widen an Event",
                            other
                        )));
                    }
                };
                let range = TimeRange::new(begin, end)?;
                Ok(TimeRangeEvent::new(range, Value::Object(e.data().clone())).into())
            }

            (AnyEvent::Event(e), EventVariant::Indexed) => {
                let duration = self.positive_duration()?;
                let index = get_index_string(&duration.spec, e.timestamp())?;
                Ok(IndexedEvent::new(&index, Value::Object(e.data().clone()), true)?.into())
            }

            (AnyEvent::TimeRange(_), EventVariant::Indexed) => Err(PondError::conversion(
                "Can not convert TimeRangeEvent to an IndexedEvent",
            )),

            (AnyEvent::Indexed(e), EventVariant::TimeRange) => {
                Ok(TimeRangeEvent::new(e.timerange(), Value::Object(e.data().clone())).into())
            }

            (AnyEvent::TimeRange(_) | AnyEvent::Indexed(_), EventVariant::Event) => {
                let ts = match self.alignment {
                    Alignment::Lag => event.begin(),
                    Alignment::Lead => event.end(),
                    Alignment::Center => midpoint(event.begin(), event.end()),
                    other => {
                        return Err(PondError::conversion(format!(
                            "Alignment {:?} cannot narrow a {}",
                            other,
                            event.variant()
                        )));
                    }
                };
                Ok(Event::new(ts, Value::Object(event.data().clone())).into())
            }
        }
    }
}

// Floor of the mean, computed wide so extreme extents cannot overflow.
fn midpoint(begin: i64, end: i64) -> i64 {
    let mid = (i128::from(begin) + i128::from(end)).div_euclid(2);
    i64::try_from(mid).unwrap_or(if mid < 0 { i64::MIN } else { i64::MAX })
}

impl Observer for Converter {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        if !self.has_observers() {
            return Ok(());
        }
        let converted = self.convert(event)?;
        self.emit(&converted)
    }

    fn flush(&mut self) -> Result<()> {
        self.observable.flush()
    }
}

impl_processor!(Converter, ProcessorKind::Converter);
