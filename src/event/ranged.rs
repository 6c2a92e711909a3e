use super::field::{into_data, Data};
use super::{EventKey, EventVariant, TimedEvent};
use crate::time_range::TimeRange;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

/// A data point covering an arbitrary time range.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRangeEvent {
    range: TimeRange,
    data: Data,
}

impl TimeRangeEvent {
    pub fn new(range: TimeRange, data: impl Into<Value>) -> Self {
        Self {
            range,
            data: into_data(data.into()),
        }
    }

    pub fn timerange(&self) -> TimeRange {
        self.range
    }

    pub fn duration(&self) -> i64 {
        self.range.duration()
    }
}

impl TimedEvent for TimeRangeEvent {
    fn timestamp(&self) -> i64 {
        self.range.begin()
    }

    fn begin(&self) -> i64 {
        self.range.begin()
    }

    fn end(&self) -> i64 {
        self.range.end()
    }

    fn data(&self) -> &Data {
        &self.data
    }

    fn key(&self) -> EventKey {
        EventKey::Range(self.range)
    }

    fn variant(&self) -> EventVariant {
        EventVariant::TimeRange
    }

    fn set_data(&self, data: Data) -> Self {
        Self {
            range: self.range,
            data,
        }
    }

    fn to_json(&self) -> Value {
        json!({ "timerange": self.range.to_json(), "data": self.data })
    }

    fn point_key(&self) -> Value {
        json!(self.range.to_json())
    }
}

impl Serialize for TimeRangeEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (self.range, &self.data).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeRangeEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (range, data) = <(TimeRange, Value)>::deserialize(deserializer)?;
        Ok(TimeRangeEvent::new(range, data))
    }
}
