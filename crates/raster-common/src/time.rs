//! Time keys for raster time series.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Orderable timestamp identifying one raster in a time series.
///
/// Date-only keys are stored at midnight so that dates and datetimes share a
/// single total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeKey(NaiveDateTime);

impl TimeKey {
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }

    /// Key for a calendar date (midnight).
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN))
    }

    /// Convenience constructor; `None` for an invalid calendar date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from_date)
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Parse an ISO 8601 date or datetime ("2024-01-15", "2024-01-15T12:00:00").
    pub fn from_iso8601(s: &str) -> Result<Self, TimeParseError> {
        let s = s.trim();
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.naive_utc()));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Self(ndt));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }
        Err(TimeParseError::InvalidFormat(s.to_string()))
    }
}

impl From<NaiveDateTime> for TimeKey {
    fn from(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }
}

impl From<NaiveDate> for TimeKey {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.time() == chrono::NaiveTime::MIN {
            write!(f, "{}", self.0.format("%Y-%m-%d"))
        } else {
            write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S"))
        }
    }
}

/// Rule for extracting a [`TimeKey`] from a file name.
///
/// The file name is sliced by character index `[start, end)` (an open end
/// runs to the end of the name) and the slice is parsed with a chrono format
/// string. Formats carrying a time of day are tried as datetimes first;
/// date-only formats fall back to midnight.
///
/// ```
/// use raster_common::{TimeExtractionRule, TimeKey};
///
/// let rule = TimeExtractionRule::new(3, Some(11), "%Y%m%d");
/// let key = rule.extract("S2_20240115_B04.zarr").unwrap();
/// assert_eq!(key, TimeKey::from_ymd(2024, 1, 15).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeExtractionRule {
    pub start: usize,
    pub end: Option<usize>,
    pub format: String,
}

impl TimeExtractionRule {
    pub fn new(start: usize, end: Option<usize>, format: impl Into<String>) -> Self {
        Self {
            start,
            end,
            format: format.into(),
        }
    }

    /// Rule that parses the whole file name with `format`.
    pub fn whole_name(format: impl Into<String>) -> Self {
        Self::new(0, None, format)
    }

    /// Extract the time key from a file name.
    pub fn extract(&self, file_name: &str) -> Result<TimeKey, TimeParseError> {
        let char_count = file_name.chars().count();
        let end = self.end.unwrap_or(char_count);
        if self.start >= end || end > char_count {
            return Err(TimeParseError::SliceOutOfRange {
                name: file_name.to_string(),
                start: self.start,
                end,
            });
        }

        let slice: String = file_name
            .chars()
            .skip(self.start)
            .take(end - self.start)
            .collect();

        if let Ok(ndt) = NaiveDateTime::parse_from_str(&slice, &self.format) {
            return Ok(TimeKey(ndt));
        }
        NaiveDate::parse_from_str(&slice, &self.format)
            .map(TimeKey::from_date)
            .map_err(|e| TimeParseError::FormatMismatch {
                value: slice,
                format: self.format.clone(),
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("slice [{start}, {end}) is out of range for file name '{name}'")]
    SliceOutOfRange {
        name: String,
        start: usize,
        end: usize,
    },

    #[error("'{value}' does not match format '{format}': {reason}")]
    FormatMismatch {
        value: String,
        format: String,
        reason: String,
    },
}
