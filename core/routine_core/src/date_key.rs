use chrono::{DateTime, Datelike, Days, FixedOffset, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid date '{0}' (expected YYYY-MM-DD)")]
pub struct DateKeyError(pub String);

/// Local calendar date used as the key of every per-day log (`YYYY-MM-DD`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Date of a local wall-clock reading. Callers pass local time, never UTC.
    pub fn from_local(now: NaiveDateTime) -> Self {
        Self(now.date())
    }

    pub fn today(clock: &impl Clock) -> Self {
        Self::from_local(clock.now().naive_local())
    }

    pub fn parse(input: &str) -> Result<Self, DateKeyError> {
        let s = input.trim();
        // Strict width: chrono alone would also accept "2024-1-9".
        if s.len() != 10 {
            return Err(DateKeyError(input.to_string()));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| DateKeyError(input.to_string()))
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn pred(self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    pub fn succ(self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    pub fn days_before(self, n: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(n)).map(Self)
    }

    /// Short weekday name, e.g. `Mon`.
    pub fn weekday_label(self) -> String {
        self.0.format("%a").to_string()
    }

    pub fn day_of_month(self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DateKey {
    type Error = DateKeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<DateKey> for String {
    fn from(k: DateKey) -> Self {
        k.to_string()
    }
}

/// Source of "now". Everything downstream takes the reading as a parameter.
pub trait Clock {
    /// Current instant with the local UTC offset attached.
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Clock pinned to `rfc3339`, e.g. `2024-01-10T06:30:00+05:30`.
    pub fn parse(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(rfc3339).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
