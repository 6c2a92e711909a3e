use crate::error::{PondError, Result};
use crate::event::{AnyEvent, EventKey, EventVariant, TimedEvent};
use crate::functions::Reducer;
use crate::time_range::TimeRange;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

// Representing an ordered sequence of events of a single variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    events: Vec<AnyEvent>,
}

impl Collection {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Build from a list of events, which must all be the same variant.
    pub fn from_events<E: Into<AnyEvent>>(events: impl IntoIterator<Item = E>) -> Result<Self> {
        let mut collection = Self::new();
        for event in events {
            collection.push(event.into())?;
        }
        Ok(collection)
    }

    /// A new collection with `event` appended.
    pub fn add_event(&self, event: impl Into<AnyEvent>) -> Result<Self> {
        let mut collection = self.clone();
        collection.push(event.into())?;
        Ok(collection)
    }

    pub(crate) fn push(&mut self, event: AnyEvent) -> Result<()> {
        if let Some(variant) = self.variant() {
            if event.variant() != variant {
                return Err(PondError::data(format!(
                    "Cannot add a {} to a collection of {}",
                    event.variant(),
                    variant
                )));
            }
        }
        self.events.push(event);
        Ok(())
    }

    /// Variant of the contained events, None while empty.
    pub fn variant(&self) -> Option<EventVariant> {
        self.events.first().map(|e| e.variant())
    }

    pub fn size(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events with a usable value at `path`.
    pub fn size_valid(&self, path: &str) -> usize {
        self.events.iter().filter(|e| e.is_valid_value(path)).count()
    }

    pub fn at(&self, pos: usize) -> Option<&AnyEvent> {
        self.events.get(pos)
    }

    pub fn first(&self) -> Option<&AnyEvent> {
        self.events.first()
    }

    pub fn last(&self) -> Option<&AnyEvent> {
        self.events.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnyEvent> {
        self.events.iter()
    }

    pub fn events(&self) -> &[AnyEvent] {
        &self.events
    }

    /// Extent covering every event, None when empty.
    pub fn range(&self) -> Option<TimeRange> {
        let begin = self.events.iter().map(|e| e.begin()).min()?;
        let end = self.events.iter().map(|e| e.end()).max()?;
        TimeRange::new(begin, end).ok()
    }

    /// Events in positions [begin, end).
    pub fn slice(&self, begin: usize, end: usize) -> Self {
        let end = end.min(self.events.len());
        let begin = begin.min(end);
        Self {
            events: self.events[begin..end].to_vec(),
        }
    }

    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&AnyEvent) -> bool,
    {
        Self {
            events: self.events.iter().filter(|e| predicate(e)).cloned().collect(),
        }
    }

    /// Map every event. The results must still share one variant.
    pub fn map<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&AnyEvent) -> AnyEvent,
    {
        Self::from_events(self.events.iter().map(f))
    }

    /// Drop events without a usable value at `path`.
    pub fn clean(&self, path: &str) -> Self {
        self.filter(|e| e.is_valid_value(path))
    }

    /// Every event whose time extent equals `key`, in arrival order.
    pub fn at_key(&self, key: impl Into<EventKey>) -> Vec<&AnyEvent> {
        let key = key.into();
        self.events.iter().filter(|e| e.key() == key).collect()
    }

    /// Remove events with a duplicate time extent. The last event for a key
    /// wins and takes the position of the first one.
    pub fn dedup(&self) -> Self {
        let mut positions: HashMap<EventKey, usize> = HashMap::new();
        let mut events: Vec<AnyEvent> = Vec::with_capacity(self.events.len());
        for event in &self.events {
            match positions.get(&event.key()) {
                Some(&pos) => events[pos] = event.clone(),
                None => {
                    positions.insert(event.key(), events.len());
                    events.push(event.clone());
                }
            }
        }
        Self { events }
    }

    /// Events grouped by time extent.
    pub fn event_list_as_map(&self) -> BTreeMap<EventKey, Vec<AnyEvent>> {
        let mut map: BTreeMap<EventKey, Vec<AnyEvent>> = BTreeMap::new();
        for event in &self.events {
            map.entry(event.key()).or_default().push(event.clone());
        }
        map
    }

    pub fn is_chronological(&self) -> bool {
        self.events
            .windows(2)
            .all(|pair| pair[0].timestamp() <= pair[1].timestamp())
    }

    /// Stable sort on the primary instant.
    pub fn sort_by_time(&self) -> Self {
        let mut events = self.events.clone();
        events.sort_by_key(|e| e.timestamp());
        Self { events }
    }

    /// Position of the last event at or before `t`, assuming chronological
    /// order. None if every event is after `t`.
    pub fn bisect(&self, t: i64) -> Option<usize> {
        let after = self.events.partition_point(|e| e.timestamp() <= t);
        after.checked_sub(1)
    }

    /// Apply `reducer` to the numeric values at `path`. Missing and
    /// non-numeric values are skipped.
    pub fn aggregate(&self, reducer: &Reducer, path: &str) -> Option<f64> {
        let values: Vec<f64> = self.events.iter().filter_map(|e| e.value(path)).collect();
        reducer.apply(&values)
    }

    pub fn count(&self, path: &str) -> usize {
        self.size_valid(path)
    }

    pub fn sum(&self, path: &str) -> Option<f64> {
        self.aggregate(&Reducer::sum(), path)
    }

    pub fn avg(&self, path: &str) -> Option<f64> {
        self.aggregate(&Reducer::avg(), path)
    }

    pub fn min(&self, path: &str) -> Option<f64> {
        self.aggregate(&Reducer::min(), path)
    }

    pub fn max(&self, path: &str) -> Option<f64> {
        self.aggregate(&Reducer::max(), path)
    }

    pub fn median(&self, path: &str) -> Option<f64> {
        self.aggregate(&Reducer::median(), path)
    }

    pub fn stdev(&self, path: &str) -> Option<f64> {
        self.aggregate(&Reducer::stdev(), path)
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.events.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a AnyEvent;
    type IntoIter = std::slice::Iter<'a, AnyEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, TimeRangeEvent};
    use serde_json::json;

    fn dup_collection() -> Collection {
        Collection::from_events(vec![
            Event::new(1429673400000, json!({"in": 1, "out": 2})),
            Event::new(1429673460000, json!({"in": 3, "out": 4})),
            Event::new(1429673460000, json!({"in": 4, "out": 5})),
            Event::new(1429673520000, json!({"in": 5, "out": 6})),
        ])
        .unwrap()
    }

    #[test]
    fn test_collection_basics() {
        let collection = dup_collection();
        assert_eq!(collection.size(), 4);
        assert_eq!(collection.first().unwrap().timestamp(), 1429673400000);
        assert_eq!(collection.last().unwrap().timestamp(), 1429673520000);
        assert_eq!(
            collection.range(),
            Some(TimeRange::new(1429673400000, 1429673520000).unwrap())
        );
        assert!(collection.is_chronological());
        assert_eq!(collection.variant(), Some(EventVariant::Event));
    }

    #[test]
    fn test_dedup_keeps_last() {
        let deduped = dup_collection().dedup();
        assert_eq!(deduped.size(), 3);
        assert_eq!(deduped.at(1).unwrap().value("in"), Some(4.0));
        assert_eq!(deduped.at(2).unwrap().timestamp(), 1429673520000);
    }

    #[test]
    fn test_at_key() {
        let collection = dup_collection();
        let found = collection.at_key(1429673460000);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value("in"), Some(3.0));
        assert_eq!(found[1].value("in"), Some(4.0));
        assert!(collection.at_key(5).is_empty());
    }

    #[test]
    fn test_mixed_variants_rejected() {
        let collection = Collection::from_events(vec![Event::new(1, json!(1))]).unwrap();
        let range = TimeRangeEvent::new(TimeRange::new(1, 2).unwrap(), json!(1));
        assert!(matches!(collection.add_event(range), Err(PondError::Data(_))));
        // the original is untouched
        assert_eq!(collection.size(), 1);
    }

    #[test]
    fn test_statistics() {
        let collection = dup_collection();
        assert_eq!(collection.sum("in"), Some(13.0));
        assert_eq!(collection.avg("out"), Some(4.25));
        assert_eq!(collection.min("in"), Some(1.0));
        assert_eq!(collection.max("out"), Some(6.0));
        assert_eq!(collection.median("in"), Some(3.5));
        assert_eq!(collection.count("in"), 4);
        assert_eq!(collection.avg("missing"), None);
    }

    #[test]
    fn test_clean_and_size_valid() {
        let collection = Collection::from_events(vec![
            Event::new(1, json!({"a": 1})),
            Event::new(2, json!({"a": null})),
            Event::new(3, json!({"b": 1})),
        ])
        .unwrap();
        assert_eq!(collection.size_valid("a"), 1);
        assert_eq!(collection.clean("a").size(), 1);
    }

    #[test]
    fn test_sort_and_bisect() {
        let collection = Collection::from_events(vec![
            Event::new(30, json!(3)),
            Event::new(10, json!(1)),
            Event::new(20, json!(2)),
        ])
        .unwrap();
        assert!(!collection.is_chronological());
        let sorted = collection.sort_by_time();
        assert!(sorted.is_chronological());
        assert_eq!(sorted.bisect(25), Some(1));
        assert_eq!(sorted.bisect(30), Some(2));
        assert_eq!(sorted.bisect(5), None);
    }

    #[test]
    fn test_slice_filter_map() {
        let collection = dup_collection();
        assert_eq!(collection.slice(1, 3).size(), 2);
        assert_eq!(collection.slice(3, 10).size(), 1);
        assert_eq!(collection.filter(|e| e.value("in") > Some(3.0)).size(), 2);

        let doubled = collection
            .map(|e| {
                let mut data = e.data().clone();
                data.insert("in".to_string(), json!(e.value("in").unwrap_or(0.0) * 2.0));
                e.set_data(data)
            })
            .unwrap();
        assert_eq!(doubled.at(0).unwrap().value("in"), Some(2.0));
    }

    #[test]
    fn test_event_list_as_map() {
        let map = dup_collection().event_list_as_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map[&EventKey::Time(1429673460000)].len(), 2);
    }
}
