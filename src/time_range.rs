use crate::error::{PondError, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const RANGE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

// Representing an immutable [begin, end] interval in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeRange {
    begin: i64,
    end: i64,
}

impl TimeRange {
    pub fn new(begin: i64, end: i64) -> Result<Self> {
        if begin > end {
            return Err(PondError::data(format!(
                "Invalid range - end {} is earlier in time than begin {}",
                end, begin
            )));
        }
        Ok(Self { begin, end })
    }

    /// Zero-length range at a single instant.
    pub fn instant(at: i64) -> Self {
        Self { begin: at, end: at }
    }

    pub fn begin(&self) -> i64 {
        self.begin
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// Duration of the range in milliseconds, saturating at `i64::MAX`
    pub fn duration(&self) -> i64 {
        self.end.saturating_sub(self.begin)
    }

    pub fn set_begin(&self, begin: i64) -> Result<Self> {
        Self::new(begin, self.end)
    }

    pub fn set_end(&self, end: i64) -> Result<Self> {
        Self::new(self.begin, end)
    }

    /// Returns true if the instant falls inside the range (inclusive on both ends)
    pub fn contains_time(&self, instant: i64) -> bool {
        self.begin <= instant && instant <= self.end
    }

    /// Returns true if other is completely inside this range
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// Returns true if this range is completely inside other
    pub fn within(&self, other: &TimeRange) -> bool {
        other.contains(self)
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    pub fn disjoint(&self, other: &TimeRange) -> bool {
        !self.overlaps(other)
    }

    /// Smallest range covering both
    pub fn extents(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }

    /// Overlapping part of both ranges, if any
    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        if self.disjoint(other) {
            return None;
        }
        Some(TimeRange {
            begin: self.begin.max(other.begin),
            end: self.end.min(other.end),
        })
    }

    pub fn to_json(&self) -> [i64; 2] {
        [self.begin, self.end]
    }

    pub fn to_utc_string(&self) -> String {
        format!(
            "[{} UTC, {} UTC]",
            format_instant(&Utc, self.begin),
            format_instant(&Utc, self.end)
        )
    }

    pub fn to_local_string(&self) -> String {
        format!(
            "[{}, {}]",
            format_instant(&Local, self.begin),
            format_instant(&Local, self.end)
        )
    }
}

fn format_instant<Tz: TimeZone>(tz: &Tz, ms: i64) -> String
where
    Tz::Offset: fmt::Display,
{
    match tz.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format(RANGE_FORMAT).to_string(),
        None => ms.to_string(),
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.begin, self.end)
    }
}

impl TryFrom<(DateTime<Utc>, DateTime<Utc>)> for TimeRange {
    type Error = PondError;

    fn try_from((begin, end): (DateTime<Utc>, DateTime<Utc>)) -> Result<Self> {
        Self::new(begin.timestamp_millis(), end.timestamp_millis())
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let [begin, end] = <[i64; 2]>::deserialize(deserializer)?;
        TimeRange::new(begin, end).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_creation() {
        let range = TimeRange::new(1000, 5000).unwrap();
        assert_eq!(range.begin(), 1000);
        assert_eq!(range.end(), 5000);
        assert_eq!(range.duration(), 4000);
        assert_eq!(range.to_json(), [1000, 5000]);
    }

    #[test]
    fn test_inverted_range_fails() {
        let result = TimeRange::new(5000, 1000);
        assert!(matches!(result, Err(PondError::Data(_))));
    }

    #[test]
    fn test_zero_length_range_is_valid() {
        let range = TimeRange::new(1000, 1000).unwrap();
        assert_eq!(range.duration(), 0);
    }

    #[test]
    fn test_duration_of_widest_range_saturates() {
        let range: TimeRange =
            serde_json::from_str("[-9223372036854775808, 9223372036854775807]").unwrap();
        assert_eq!(range.duration(), i64::MAX);
    }

    #[test]
    fn test_range_ordering() {
        let a = TimeRange::new(0, 10).unwrap();
        let b = TimeRange::new(0, 20).unwrap();
        let c = TimeRange::new(5, 6).unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_range_algebra() {
        let a = TimeRange::new(0, 100).unwrap();
        let b = TimeRange::new(50, 150).unwrap();
        let c = TimeRange::new(200, 300).unwrap();
        let inner = TimeRange::new(10, 20).unwrap();

        assert!(a.overlaps(&b));
        assert!(a.disjoint(&c));
        assert!(a.contains(&inner));
        assert!(inner.within(&a));
        assert!(a.contains_time(100));
        assert_eq!(a.extents(&c), TimeRange::new(0, 300).unwrap());
        assert_eq!(a.intersection(&b), Some(TimeRange::new(50, 100).unwrap()));
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_utc_string() {
        // 1d-12355
        let range = TimeRange::new(12355 * 86_400_000, 12356 * 86_400_000).unwrap();
        assert_eq!(
            range.to_utc_string(),
            "[Thu, 30 Oct 2003 00:00:00 UTC, Fri, 31 Oct 2003 00:00:00 UTC]"
        );
    }

    #[test]
    fn test_wire_format() {
        let range = TimeRange::new(1, 2).unwrap();
        assert_eq!(serde_json::to_string(&range).unwrap(), "[1,2]");
        let parsed: TimeRange = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(parsed, range);
        assert!(serde_json::from_str::<TimeRange>("[2,1]").is_err());
    }
}
