use super::field::{into_data, Data};
use super::{EventKey, EventVariant, TimedEvent};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

/// A data point at a single instant, in epoch milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    timestamp: i64,
    data: Data,
}

impl Event {
    pub fn new(timestamp: i64, data: impl Into<Value>) -> Self {
        Self {
            timestamp,
            data: into_data(data.into()),
        }
    }

    pub fn from_datetime(time: DateTime<Utc>, data: impl Into<Value>) -> Self {
        Self::new(time.timestamp_millis(), data)
    }

    /// The timestamp as a UTC date-time, if representable.
    pub fn timestamp_as_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

impl TimedEvent for Event {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn begin(&self) -> i64 {
        self.timestamp
    }

    fn end(&self) -> i64 {
        self.timestamp
    }

    fn data(&self) -> &Data {
        &self.data
    }

    fn key(&self) -> EventKey {
        EventKey::Time(self.timestamp)
    }

    fn variant(&self) -> EventVariant {
        EventVariant::Event
    }

    fn set_data(&self, data: Data) -> Self {
        Self {
            timestamp: self.timestamp,
            data,
        }
    }

    fn to_json(&self) -> Value {
        json!({ "time": self.timestamp, "data": self.data })
    }

    fn point_key(&self) -> Value {
        json!(self.timestamp)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (self.timestamp, &self.data).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (timestamp, data) = <(i64, Value)>::deserialize(deserializer)?;
        Ok(Event::new(timestamp, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event = Event::new(1_429_673_400_000, json!({"in": 3, "out": {"avg": 2.5}}));
        assert_eq!(event.timestamp(), 1_429_673_400_000);
        assert_eq!(event.begin(), event.end());
        assert_eq!(event.get("out.avg"), Some(&json!(2.5)));
        assert_eq!(event.value("in"), Some(3.0));
        assert_eq!(event.key(), EventKey::Time(1_429_673_400_000));
    }

    #[test]
    fn test_bare_value() {
        let event = Event::new(1000, 18);
        assert_eq!(event.value("value"), Some(18.0));
    }

    #[test]
    fn test_wire_format() {
        let event = Event::new(1000, json!({"a": 1}));
        assert_eq!(serde_json::to_string(&event).unwrap(), r#"[1000,{"a":1}]"#);
        let parsed: Event = serde_json::from_str(r#"[1000,{"a":1}]"#).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_to_json_and_point() {
        let event = Event::new(1000, json!({"a": 1, "b": 2}));
        assert_eq!(event.to_json(), json!({"time": 1000, "data": {"a": 1, "b": 2}}));
        assert_eq!(event.to_point(&["b", "c"]), vec![json!(1000), json!(2), Value::Null]);
        assert_eq!(event.to_point(&[]), vec![json!(1000), json!(1), json!(2)]);
    }

    #[test]
    fn test_set_data_keeps_timestamp() {
        let event = Event::new(1000, json!({"a": 1}));
        let other = event.set_data(into_data(json!({"b": 2})));
        assert_eq!(other.timestamp(), 1000);
        assert_eq!(other.get("a"), None);
        assert_eq!(event.get("a"), Some(&json!(1)));
    }
}
