//! The three event variants and the operations shared between them.
//!
//! `Event` sits at an instant, `IndexedEvent` covers a named time bucket and
//! `TimeRangeEvent` covers an arbitrary range. All of them implement
//! [`TimedEvent`]; [`AnyEvent`] wraps whichever one is flowing down a chain.
//! Events are immutable: `set_data` and every operation below return new
//! events with the same time extent.

pub mod field;
mod indexed;
mod instant;
mod ranged;

pub use field::{Data, FieldSpec};
pub use indexed::IndexedEvent;
pub use instant::Event;
pub use ranged::TimeRangeEvent;

use crate::error::{PondError, Result};
use crate::functions::Reducer;
use crate::time_range::TimeRange;
use field::{deep_merge, get_path, optional_number_value, set_path};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Which of the three event representations an event uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventVariant {
    Event,
    Indexed,
    TimeRange,
}

impl fmt::Display for EventVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventVariant::Event => "Event",
            EventVariant::Indexed => "IndexedEvent",
            EventVariant::TimeRange => "TimeRangeEvent",
        };
        f.write_str(name)
    }
}

/// The time extent of an event, used for dedup and exact-key lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKey {
    Time(i64),
    Index(String),
    Range(TimeRange),
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKey::Time(ts) => write!(f, "{}", ts),
            EventKey::Index(index) => f.write_str(index),
            EventKey::Range(range) => write!(f, "{},{}", range.begin(), range.end()),
        }
    }
}

impl From<i64> for EventKey {
    fn from(ts: i64) -> Self {
        EventKey::Time(ts)
    }
}

impl From<&str> for EventKey {
    fn from(index: &str) -> Self {
        EventKey::Index(index.to_string())
    }
}

impl From<TimeRange> for EventKey {
    fn from(range: TimeRange) -> Self {
        EventKey::Range(range)
    }
}

/// Capabilities shared by every event variant.
pub trait TimedEvent: Clone {
    /// Primary instant used for ordering.
    fn timestamp(&self) -> i64;
    fn begin(&self) -> i64;
    fn end(&self) -> i64;
    fn data(&self) -> &Data;
    fn key(&self) -> EventKey;
    fn variant(&self) -> EventVariant;

    /// A new event with the same variant and time extent carrying `data`.
    fn set_data(&self, data: Data) -> Self;

    fn to_json(&self) -> Value;

    /// First column of a flat point row: timestamp, index string or [begin, end].
    fn point_key(&self) -> Value;

    /// Dot-path lookup ("in.avg").
    fn get(&self, path: &str) -> Option<&Value> {
        get_path(self.data(), path)
    }

    /// Numeric value at a dot-path, if there is one.
    fn value(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(field::as_number)
    }

    fn is_valid_value(&self, path: &str) -> bool {
        field::is_valid(self.get(path))
    }

    /// Flat row: the point key followed by the named columns, or by every
    /// top-level value when `columns` is empty.
    fn to_point(&self, columns: &[&str]) -> Vec<Value> {
        let mut point = vec![self.point_key()];
        if columns.is_empty() {
            point.extend(self.data().values().cloned());
        } else {
            point.extend(
                columns
                    .iter()
                    .map(|column| self.get(column).cloned().unwrap_or(Value::Null)),
            );
        }
        point
    }
}

/// Any of the three event variants, as carried through a processing chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnyEvent {
    Event(Event),
    Indexed(IndexedEvent),
    TimeRange(TimeRangeEvent),
}

macro_rules! dispatch {
    ($self:ident, $event:ident => $body:expr) => {
        match $self {
            AnyEvent::Event($event) => $body,
            AnyEvent::Indexed($event) => $body,
            AnyEvent::TimeRange($event) => $body,
        }
    };
}

impl AnyEvent {
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            AnyEvent::Event(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_indexed(&self) -> Option<&IndexedEvent> {
        match self {
            AnyEvent::Indexed(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_time_range(&self) -> Option<&TimeRangeEvent> {
        match self {
            AnyEvent::TimeRange(event) => Some(event),
            _ => None,
        }
    }

    /// The extent as a TimeRange. Instants give a zero-length range.
    pub fn timerange(&self) -> TimeRange {
        match self {
            AnyEvent::Event(event) => TimeRange::instant(event.timestamp()),
            AnyEvent::Indexed(event) => event.timerange(),
            AnyEvent::TimeRange(event) => event.timerange(),
        }
    }
}

impl TimedEvent for AnyEvent {
    fn timestamp(&self) -> i64 {
        dispatch!(self, e => e.timestamp())
    }

    fn begin(&self) -> i64 {
        dispatch!(self, e => e.begin())
    }

    fn end(&self) -> i64 {
        dispatch!(self, e => e.end())
    }

    fn data(&self) -> &Data {
        dispatch!(self, e => e.data())
    }

    fn key(&self) -> EventKey {
        dispatch!(self, e => e.key())
    }

    fn variant(&self) -> EventVariant {
        dispatch!(self, e => e.variant())
    }

    fn set_data(&self, data: Data) -> Self {
        match self {
            AnyEvent::Event(e) => AnyEvent::Event(e.set_data(data)),
            AnyEvent::Indexed(e) => AnyEvent::Indexed(e.set_data(data)),
            AnyEvent::TimeRange(e) => AnyEvent::TimeRange(e.set_data(data)),
        }
    }

    fn to_json(&self) -> Value {
        dispatch!(self, e => e.to_json())
    }

    fn point_key(&self) -> Value {
        dispatch!(self, e => e.point_key())
    }
}

impl From<Event> for AnyEvent {
    fn from(event: Event) -> Self {
        AnyEvent::Event(event)
    }
}

impl From<IndexedEvent> for AnyEvent {
    fn from(event: IndexedEvent) -> Self {
        AnyEvent::Indexed(event)
    }
}

impl From<TimeRangeEvent> for AnyEvent {
    fn from(event: TimeRangeEvent) -> Self {
        AnyEvent::TimeRange(event)
    }
}

/// Project an event onto the given fields. Missing fields come back as null.
pub fn selector<E: TimedEvent>(event: &E, fields: &FieldSpec) -> E {
    let mut data = Data::new();
    for path in fields.paths() {
        let value = event.get(path).cloned().unwrap_or(Value::Null);
        set_path(&mut data, path, value);
    }
    event.set_data(data)
}

/// Reduce the values of `fields` into a single value stored under `name`.
/// With `append` the result is added to the existing data, otherwise it
/// replaces it.
pub fn collapse<E: TimedEvent>(
    event: &E,
    fields: &FieldSpec,
    name: &str,
    reducer: &Reducer,
    append: bool,
) -> E {
    let values: Vec<f64> = fields
        .paths()
        .iter()
        .filter_map(|path| event.value(path))
        .collect();
    let result = optional_number_value(reducer.apply(&values));

    let mut data = if append {
        event.data().clone()
    } else {
        Data::new()
    };
    data.insert(name.to_string(), result);
    event.set_data(data)
}

fn check_homogeneous<E: TimedEvent>(events: &[E]) -> Result<()> {
    if let Some(first) = events.first() {
        let variant = first.variant();
        if let Some(other) = events.iter().find(|e| e.variant() != variant) {
            return Err(PondError::data(format!(
                "Mixed event variants: {} and {}",
                variant,
                other.variant()
            )));
        }
    }
    Ok(())
}

/// Deep-merge the data of events sharing one time extent. Later events win
/// on conflicting keys.
pub fn merge<E: TimedEvent>(events: &[E]) -> Result<E> {
    let first = events
        .first()
        .ok_or_else(|| PondError::data("Cannot merge an empty list of events"))?;
    check_homogeneous(events)?;

    let key = first.key();
    let mut data = Data::new();
    for event in events {
        if event.key() != key {
            return Err(PondError::data(format!(
                "Events being merged must have the same key: {} vs {}",
                key,
                event.key()
            )));
        }
        deep_merge(&mut data, event.data());
    }
    Ok(first.set_data(data))
}

/// Fold events that share a key into one event per key, reducing each field
/// (every numeric top-level field when `fields` is None). Keys keep the order
/// in which they were first seen.
pub fn combine<E: TimedEvent>(
    events: &[E],
    fields: Option<&FieldSpec>,
    reducer: &Reducer,
) -> Result<Vec<E>> {
    check_homogeneous(events)?;

    let mut order: Vec<EventKey> = Vec::new();
    let mut groups: HashMap<EventKey, Vec<&E>> = HashMap::new();
    for event in events {
        let key = event.key();
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(event);
    }

    let mut combined = Vec::with_capacity(order.len());
    for key in &order {
        let Some(group) = groups.get(key) else {
            continue;
        };
        let paths: Vec<String> = match fields {
            Some(spec) => spec.paths().to_vec(),
            None => {
                let mut names: Vec<String> = Vec::new();
                for event in group {
                    for (name, value) in event.data() {
                        if value.is_number() && !names.contains(name) {
                            names.push(name.clone());
                        }
                    }
                }
                names
            }
        };

        let mut data = Data::new();
        for path in &paths {
            let values: Vec<f64> = group.iter().filter_map(|e| e.value(path)).collect();
            set_path(&mut data, path, optional_number_value(reducer.apply(&values)));
        }
        combined.push(group[0].set_data(data));
    }
    Ok(combined)
}

pub fn sum<E: TimedEvent>(events: &[E], fields: Option<&FieldSpec>) -> Result<Vec<E>> {
    combine(events, fields, &Reducer::sum())
}

pub fn avg<E: TimedEvent>(events: &[E], fields: Option<&FieldSpec>) -> Result<Vec<E>> {
    combine(events, fields, &Reducer::avg())
}

/// True when both events have the same variant and time extent, and, unless
/// `ignore_values` is set, the same data.
pub fn is_duplicate<E: TimedEvent>(a: &E, b: &E, ignore_values: bool) -> bool {
    a.variant() == b.variant() && a.key() == b.key() && (ignore_values || a.data() == b.data())
}

/// Strict equality of variant, time extent and data.
pub fn same<E: TimedEvent>(a: &E, b: &E) -> bool {
    is_duplicate(a, b, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts_event(ts: i64, data: Value) -> AnyEvent {
        Event::new(ts, data).into()
    }

    #[test]
    fn test_selector_is_idempotent() {
        let event = ts_event(1000, json!({"in": 1, "out": {"a": 2, "b": 3}, "x": 9}));
        let fields = FieldSpec::from(vec!["in", "out.a", "missing"]);
        let once = selector(&event, &fields);
        let twice = selector(&once, &fields);
        assert_eq!(once, twice);
        assert_eq!(
            Value::Object(once.data().clone()),
            json!({"in": 1, "out": {"a": 2}, "missing": null})
        );
    }

    #[test]
    fn test_collapse() {
        let event = ts_event(1000, json!({"in": 2, "out": 6}));
        let fields = FieldSpec::from(["in", "out"]);
        let replaced = collapse(&event, &fields, "total", &Reducer::sum(), false);
        assert_eq!(Value::Object(replaced.data().clone()), json!({"total": 8}));

        let appended = collapse(&event, &fields, "mean", &Reducer::avg(), true);
        assert_eq!(
            Value::Object(appended.data().clone()),
            json!({"in": 2, "out": 6, "mean": 4})
        );
    }

    #[test]
    fn test_merge_deep() {
        let a = ts_event(1000, json!({"payload": {"a": 1}}));
        let b = ts_event(1000, json!({"payload": {"b": 2}}));
        let merged = merge(&[a, b]).unwrap();
        assert_eq!(merged.get("payload.a"), Some(&json!(1)));
        assert_eq!(merged.get("payload.b"), Some(&json!(2)));
    }

    #[test]
    fn test_merge_later_wins() {
        let a = ts_event(1000, json!({"a": 1}));
        let b = ts_event(1000, json!({"a": 2}));
        assert_eq!(merge(&[a, b]).unwrap().value("a"), Some(2.0));
    }

    #[test]
    fn test_merge_errors() {
        assert!(matches!(merge::<AnyEvent>(&[]), Err(PondError::Data(_))));

        let a = ts_event(1000, json!({"a": 1}));
        let b = ts_event(2000, json!({"b": 1}));
        assert!(matches!(merge(&[a.clone(), b]), Err(PondError::Data(_))));

        let range = TimeRange::new(1000, 1000).unwrap();
        let c: AnyEvent = TimeRangeEvent::new(range, json!({"c": 1})).into();
        assert!(matches!(merge(&[a, c]), Err(PondError::Data(_))));
    }

    #[test]
    fn test_is_duplicate() {
        let a = ts_event(1429673400000, json!(23));
        let b = ts_event(1429673400000, json!(25));
        assert!(is_duplicate(&a, &b, true));
        assert!(!is_duplicate(&a, &b, false));
        assert!(is_duplicate(&a, &a.clone(), false));
    }

    #[test]
    fn test_same() {
        let a = ts_event(1000, json!({"a": 1}));
        let indexed: AnyEvent = IndexedEvent::new("1s-1", json!({"a": 1}), true)
            .unwrap()
            .into();
        assert!(same(&a, &a.clone()));
        assert!(!same(&a, &indexed));
        assert!(!same(&a, &ts_event(1000, json!({"a": 2}))));
    }

    #[test]
    fn test_combine_sum_and_avg() {
        let events = vec![
            ts_event(1000, json!({"a": 1, "b": 2})),
            ts_event(1000, json!({"a": 3, "b": 4})),
            ts_event(2000, json!({"a": 5, "b": 6})),
        ];
        let summed = sum(&events, None).unwrap();
        assert_eq!(summed.len(), 2);
        assert_eq!(summed[0].value("a"), Some(4.0));
        assert_eq!(summed[0].value("b"), Some(6.0));
        assert_eq!(summed[1].value("a"), Some(5.0));

        let averaged = avg(&events, Some(&FieldSpec::from("a"))).unwrap();
        assert_eq!(averaged[0].value("a"), Some(2.0));
        assert_eq!(averaged[0].get("b"), None);
    }

    #[test]
    fn test_any_event_wire_format() {
        let events: Vec<AnyEvent> = serde_json::from_str(
            r#"[[1000,{"a":1}],["1h-396199",{"a":2}],[[1,2],{"a":3}]]"#,
        )
        .unwrap();
        assert_eq!(events[0].variant(), EventVariant::Event);
        assert_eq!(events[1].variant(), EventVariant::Indexed);
        assert_eq!(events[2].variant(), EventVariant::TimeRange);
        assert_eq!(
            serde_json::to_string(&events).unwrap(),
            r#"[[1000,{"a":1}],["1h-396199",{"a":2}],[[1,2],{"a":3}]]"#
        );
    }

    #[test]
    fn test_event_key_display() {
        assert_eq!(EventKey::from(1000).to_string(), "1000");
        assert_eq!(EventKey::from("1h-1").to_string(), "1h-1");
        assert_eq!(
            EventKey::from(TimeRange::new(1, 2).unwrap()).to_string(),
            "1,2"
        );
    }
}
