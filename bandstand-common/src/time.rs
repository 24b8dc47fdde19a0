//! Timestamp and quota-period utilities

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Days a past event stays in the "recent" bucket before it counts as archived
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Start of the recent window relative to `now`
pub fn recent_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RECENT_WINDOW_DAYS)
}

/// Calendar month (UTC) that suggestion quotas are counted in
///
/// Rendered and stored as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuotaPeriod {
    year: i32,
    month: u32,
}

impl QuotaPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::Validation(format!("invalid month: {}", month)));
        }
        if !(1970..=9999).contains(&year) {
            return Err(Error::Validation(format!("invalid year: {}", year)));
        }
        Ok(Self { year, month })
    }

    /// Period that contains the given instant
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Following calendar month
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Storage key, e.g. `2026-10`
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QuotaPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for QuotaPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| Error::Validation(format!("period must be YYYY-MM, got {:?}", s)))?;
        let year: i32 = year
            .parse()
            .map_err(|_| Error::Validation(format!("invalid year in period {:?}", s)))?;
        let month: u32 = month
            .parse()
            .map_err(|_| Error::Validation(format!("invalid month in period {:?}", s)))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for QuotaPeriod {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<QuotaPeriod> for String {
    fn from(period: QuotaPeriod) -> Self {
        period.to_string()
    }
}
