//! Time bucket keys.
//!
//! An index string names either a fixed-size bucket counted from the epoch
//! ("5m-4754394" is the 4754394th five minute bucket) or a calendar period
//! ("2014", "2014-09", "2014-09-17"). Fixed-size buckets are always computed on
//! the UTC epoch so the strings are identical in every implementation sharing
//! wire data; calendar periods honour the utc flag.

use crate::error::{PondError, Result};
use crate::time_range::TimeRange;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)([smhd])$").expect("valid duration regex"));
static BUCKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+[smhd])-(-?[0-9]+)$").expect("valid bucket regex"));
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})$").expect("valid year regex"));
static MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})$").expect("valid month regex"));
static DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").expect("valid day regex")
});

/// Parse a "{n}{unit}" window spec (unit one of s, m, h, d) into milliseconds.
pub fn window_duration(spec: &str) -> Result<i64> {
    let caps = DURATION_RE
        .captures(spec)
        .ok_or_else(|| PondError::data(format!("Unable to parse window duration: {}", spec)))?;

    let n: i64 = caps[1]
        .parse()
        .map_err(|_| PondError::data(format!("Window duration out of range: {}", spec)))?;
    let unit_ms = match &caps[2] {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        other => return Err(PondError::data(format!("Unknown duration unit: {}", other))),
    };

    n.checked_mul(unit_ms)
        .ok_or_else(|| PondError::data(format!("Window duration out of range: {}", spec)))
}

/// Index string of the fixed-size bucket containing `timestamp`: "{spec}-{floor(ts / d)}".
pub fn get_index_string(spec: &str, timestamp: i64) -> Result<String> {
    let duration = window_duration(spec)?;
    if duration == 0 {
        return Err(PondError::data(format!("Window duration must be positive: {}", spec)));
    }
    Ok(format!("{}-{}", spec, timestamp.div_euclid(duration)))
}

/// Every bucket index string that overlaps the range, in time order.
pub fn index_string_list(spec: &str, range: &TimeRange) -> Result<Vec<String>> {
    let duration = window_duration(spec)?;
    if duration == 0 {
        return Err(PondError::data(format!("Window duration must be positive: {}", spec)));
    }
    let first = range.begin().div_euclid(duration);
    let last = range.end().div_euclid(duration);
    Ok((first..=last).map(|i| format!("{}-{}", spec, i)).collect())
}

pub fn daily_index_string(timestamp: i64, utc: bool) -> Result<String> {
    calendar_string(timestamp, utc, "%Y-%m-%d")
}

pub fn monthly_index_string(timestamp: i64, utc: bool) -> Result<String> {
    calendar_string(timestamp, utc, "%Y-%m")
}

pub fn yearly_index_string(timestamp: i64, utc: bool) -> Result<String> {
    calendar_string(timestamp, utc, "%Y")
}

fn calendar_string(timestamp: i64, utc: bool, fmt: &str) -> Result<String> {
    if utc {
        let dt = DateTime::<Utc>::from_timestamp_millis(timestamp)
            .ok_or_else(|| PondError::data(format!("Timestamp out of range: {}", timestamp)))?;
        Ok(dt.format(fmt).to_string())
    } else {
        let dt = Local
            .timestamp_millis_opt(timestamp)
            .single()
            .ok_or_else(|| PondError::data(format!("Timestamp out of range: {}", timestamp)))?;
        Ok(dt.format(fmt).to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IndexKind {
    Bucket,
    Year,
    Month,
    Day,
}

/// A string naming a time range, decodable back into that range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Index {
    value: String,
    utc: bool,
    kind: IndexKind,
    range: TimeRange,
}

impl Index {
    pub fn new(value: impl Into<String>, utc: bool) -> Result<Self> {
        let value = value.into();
        let (kind, range) = decode(&value, utc)?;
        Ok(Self {
            value,
            utc,
            kind,
            range,
        })
    }

    /// Index of the fixed-size bucket containing `timestamp`.
    pub fn bucket(spec: &str, timestamp: i64) -> Result<Self> {
        Self::new(get_index_string(spec, timestamp)?, true)
    }

    pub fn as_string(&self) -> &str {
        &self.value
    }

    pub fn as_timerange(&self) -> TimeRange {
        self.range
    }

    pub fn begin(&self) -> i64 {
        self.range.begin()
    }

    pub fn end(&self) -> i64 {
        self.range.end()
    }

    pub fn utc(&self) -> bool {
        self.utc
    }

    /// Human readable form of calendar indexes, e.g. "September 17 2014".
    /// Fixed-size bucket indexes are returned verbatim.
    pub fn to_nice_string(&self, fmt: Option<&str>) -> String {
        let default_fmt = match self.kind {
            IndexKind::Bucket => return self.value.clone(),
            IndexKind::Year => "%Y",
            IndexKind::Month => "%B",
            IndexKind::Day => "%B %-d %Y",
        };
        let fmt = fmt.unwrap_or(default_fmt);
        let begin = self.range.begin();
        let formatted = if self.utc {
            DateTime::<Utc>::from_timestamp_millis(begin).map(|dt| dt.format(fmt).to_string())
        } else {
            Local
                .timestamp_millis_opt(begin)
                .single()
                .map(|dt| dt.format(fmt).to_string())
        };
        formatted.unwrap_or_else(|| self.value.clone())
    }
}

fn decode(value: &str, utc: bool) -> Result<(IndexKind, TimeRange)> {
    if let Some(caps) = BUCKET_RE.captures(value) {
        let duration = window_duration(&caps[1])?;
        let position: i64 = caps[2]
            .parse()
            .map_err(|_| PondError::data(format!("Index position out of range: {}", value)))?;
        let begin = position
            .checked_mul(duration)
            .ok_or_else(|| PondError::data(format!("Index out of range: {}", value)))?;
        let end = begin
            .checked_add(duration)
            .ok_or_else(|| PondError::data(format!("Index out of range: {}", value)))?;
        return Ok((IndexKind::Bucket, TimeRange::new(begin, end)?));
    }

    if let Some(caps) = DAY_RE.captures(value) {
        let (year, month, day) = (parse_part(&caps[1])?, parse_part(&caps[2])?, parse_part(&caps[3])?);
        let start = ymd(year, month, day, value)?;
        let next = start
            .succ_opt()
            .ok_or_else(|| PondError::data(format!("Index out of range: {}", value)))?;
        return Ok((IndexKind::Day, calendar_range(start, next, utc, value)?));
    }

    if let Some(caps) = MONTH_RE.captures(value) {
        let (year, month) = (parse_part(&caps[1])?, parse_part(&caps[2])?);
        let start = ymd(year, month, 1, value)?;
        let next = if month == 12 {
            ymd(year + 1, 1, 1, value)?
        } else {
            ymd(year, month + 1, 1, value)?
        };
        return Ok((IndexKind::Month, calendar_range(start, next, utc, value)?));
    }

    if let Some(caps) = YEAR_RE.captures(value) {
        let year = parse_part(&caps[1])?;
        let start = ymd(year, 1, 1, value)?;
        let next = ymd(year + 1, 1, 1, value)?;
        return Ok((IndexKind::Year, calendar_range(start, next, utc, value)?));
    }

    Err(PondError::data(format!("Unable to parse index string: {}", value)))
}

fn parse_part(s: &str) -> Result<u32> {
    s.parse()
        .map_err(|_| PondError::data(format!("Bad index component: {}", s)))
}

fn ymd(year: u32, month: u32, day: u32, value: &str) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| PondError::data(format!("Invalid calendar index: {}", value)))
}

// Calendar periods end on the last millisecond before the next period starts.
fn calendar_range(start: NaiveDate, next: NaiveDate, utc: bool, value: &str) -> Result<TimeRange> {
    let begin = midnight_ms(start, utc, value)?;
    let end = midnight_ms(next, utc, value)? - 1;
    TimeRange::new(begin, end)
}

fn midnight_ms(date: NaiveDate, utc: bool, value: &str) -> Result<i64> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| PondError::data(format!("Invalid calendar index: {}", value)))?;
    if utc {
        Ok(naive.and_utc().timestamp_millis())
    } else {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .ok_or_else(|| PondError::data(format!("No local midnight for index: {}", value)))
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl Serialize for Index {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}
