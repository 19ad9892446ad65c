//! Coverage validation
//!
//! A stitched or extended run is only usable if its time axis spans a
//! required period. The period bounds are plain calendar dates that are
//! converted into the calendar of the data being checked.

use crate::errors::{PacGradError, PacGradResult};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar-agnostic `YYYY-MM-DD` date
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Express this date in the same calendar as `reference`
    pub fn in_calendar_of(&self, reference: &Timestamp) -> PacGradResult<Timestamp> {
        reference.boundary_like(self.year, self.month, self.day)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for CalendarDate {
    type Err = PacGradError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PacGradError::Config(format!("expected a YYYY-MM-DD date, got '{}'", s));
        let mut parts = s.trim().splitn(3, '-');
        let mut next = || parts.next().ok_or_else(invalid);
        let year = next()?.parse::<i32>().map_err(|_| invalid())?;
        let month = next()?.parse::<u32>().map_err(|_| invalid())?;
        let day = next()?.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(year, month, day))
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = PacGradError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CalendarDate> for String {
    fn from(value: CalendarDate) -> Self {
        value.to_string()
    }
}

/// Period a run's time axis must span
///
/// Bounds are deliberately inside the first and last months (31st of January,
/// 1st of December) because monthly data is stamped on different days of the
/// month by different models.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSpan {
    pub start: CalendarDate,
    pub end: CalendarDate,
}

impl CoverageSpan {
    /// Historical experiment, 1850 to 2014
    pub const HISTORICAL: CoverageSpan = CoverageSpan {
        start: CalendarDate::new(1850, 1, 31),
        end: CalendarDate::new(2014, 12, 1),
    };

    /// Scenario continuation, 2015 to 2022
    pub const SCENARIO: CoverageSpan = CoverageSpan {
        start: CalendarDate::new(2015, 1, 31),
        end: CalendarDate::new(2022, 12, 1),
    };

    pub fn new(start: CalendarDate, end: CalendarDate) -> Self {
        Self { start, end }
    }

    /// Whether a time axis starts on or before `start` and ends on or after `end`
    ///
    /// The bounds are constructed in the calendar of the first timestamp.
    pub fn is_covered_by(&self, time: &[Timestamp]) -> PacGradResult<bool> {
        let (first, last) = match (time.first(), time.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(false),
        };
        let start = self.start.in_calendar_of(first)?;
        let end = self.end.in_calendar_of(first)?;
        Ok(*first <= start && *last >= end)
    }

    /// Fail with [`PacGradError::Coverage`] unless the time axis spans this period
    pub fn check(&self, time: &[Timestamp]) -> PacGradResult<()> {
        if self.is_covered_by(time)? {
            return Ok(());
        }
        let describe = |t: Option<&Timestamp>| t.map_or("none".to_string(), |t| t.to_string());
        Err(PacGradError::Coverage {
            expected_start: self.start.to_string(),
            expected_end: self.end.to_string(),
            actual_start: describe(time.first()),
            actual_end: describe(time.last()),
        })
    }
}

impl fmt::Display for CoverageSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
