use super::field::{into_data, Data};
use super::{EventKey, EventVariant, TimedEvent};
use crate::error::Result;
use crate::index::Index;
use crate::time_range::TimeRange;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

/// A data point covering one time bucket, named by its index string.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEvent {
    index: Index,
    data: Data,
}

impl IndexedEvent {
    /// Build from an index string such as "1h-396199" or "2014-09-17".
    pub fn new(index: &str, data: impl Into<Value>, utc: bool) -> Result<Self> {
        Ok(Self::from_index(Index::new(index, utc)?, data))
    }

    pub fn from_index(index: Index, data: impl Into<Value>) -> Self {
        Self {
            index,
            data: into_data(data.into()),
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn index_as_string(&self) -> &str {
        self.index.as_string()
    }

    pub fn timerange(&self) -> TimeRange {
        self.index.as_timerange()
    }
}

impl TimedEvent for IndexedEvent {
    fn timestamp(&self) -> i64 {
        self.index.begin()
    }

    fn begin(&self) -> i64 {
        self.index.begin()
    }

    fn end(&self) -> i64 {
        self.index.end()
    }

    fn data(&self) -> &Data {
        &self.data
    }

    fn key(&self) -> EventKey {
        EventKey::Index(self.index.as_string().to_string())
    }

    fn variant(&self) -> EventVariant {
        EventVariant::Indexed
    }

    fn set_data(&self, data: Data) -> Self {
        Self {
            index: self.index.clone(),
            data,
        }
    }

    fn to_json(&self) -> Value {
        json!({ "index": self.index.as_string(), "data": self.data })
    }

    fn point_key(&self) -> Value {
        json!(self.index.as_string())
    }
}

impl Serialize for IndexedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (self.index.as_string(), &self.data).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IndexedEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (index, data) = <(String, Value)>::deserialize(deserializer)?;
        IndexedEvent::new(&index, data, true).map_err(serde::de::Error::custom)
    }
}
