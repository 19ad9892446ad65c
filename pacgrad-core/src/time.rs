//! Calendar-aware timestamps
//!
//! Model output arrives with one of two time representations: a proleptic
//! Gregorian date-time ([`Calendar::Standard`]) or a 365-day calendar with no
//! leap days ([`Calendar::NoLeap`]). Every ordering or boundary comparison in
//! this crate goes through [`Timestamp::comparable`], so the stitcher, the
//! continuity resolver and the trend engine share one conversion.
//!
//! ```rust
//! use pacgrad_core::time::{Calendar, Timestamp};
//!
//! let t = Timestamp::no_leap(2014, 12, 16).unwrap();
//! // Period boundaries are built in the same calendar as the data
//! let end = t.boundary_like(2014, 12, 1).unwrap();
//! assert_eq!(end.calendar(), Calendar::NoLeap);
//! assert!(t >= end);
//! ```

use crate::errors::{PacGradError, PacGradResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

const SECONDS_PER_DAY: u32 = 86_400;
const NO_LEAP_DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Concrete time representation used by a dataset
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Calendar {
    /// Proleptic Gregorian calendar
    Standard,
    /// 365-day calendar, February always has 28 days
    NoLeap,
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Calendar::Standard => write!(f, "standard"),
            Calendar::NoLeap => write!(f, "noleap"),
        }
    }
}

impl Calendar {
    /// Build midnight of the given date in this calendar
    pub fn date(&self, year: i32, month: u32, day: u32) -> PacGradResult<Timestamp> {
        match self {
            Calendar::Standard => Timestamp::standard(year, month, day),
            Calendar::NoLeap => Timestamp::no_leap(year, month, day),
        }
    }
}

/// A date-time in the 365-day calendar
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoLeapDateTime {
    year: i32,
    month: u32,
    day: u32,
    second: u32,
}

impl NoLeapDateTime {
    /// Create a new no-leap date-time
    ///
    /// `second` counts seconds since midnight.
    pub fn new(year: i32, month: u32, day: u32, second: u32) -> PacGradResult<Self> {
        let valid_day = month
            .checked_sub(1)
            .and_then(|m| NO_LEAP_DAYS_IN_MONTH.get(m as usize))
            .is_some_and(|days| day >= 1 && day <= *days);
        if !valid_day || second >= SECONDS_PER_DAY {
            return Err(PacGradError::InvalidTimestamp {
                calendar: Calendar::NoLeap.to_string(),
                year,
                month,
                day,
            });
        }
        Ok(Self {
            year,
            month,
            day,
            second,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

/// Calendar-independent ordering key
///
/// Dates from the two calendars are compared field by field. Both calendars
/// agree on every date except Feb 29, which only exists in the standard one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComparableTimestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub second: u32,
}

/// A single point on a dataset's time axis
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub enum Timestamp {
    Standard(NaiveDateTime),
    NoLeap(NoLeapDateTime),
}

impl Timestamp {
    /// Midnight of a proleptic Gregorian date
    pub fn standard(year: i32, month: u32, day: u32) -> PacGradResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Timestamp::Standard)
            .ok_or_else(|| PacGradError::InvalidTimestamp {
                calendar: Calendar::Standard.to_string(),
                year,
                month,
                day,
            })
    }

    /// Midnight of a no-leap date
    pub fn no_leap(year: i32, month: u32, day: u32) -> PacGradResult<Self> {
        NoLeapDateTime::new(year, month, day, 0).map(Timestamp::NoLeap)
    }

    pub fn calendar(&self) -> Calendar {
        match self {
            Timestamp::Standard(_) => Calendar::Standard,
            Timestamp::NoLeap(_) => Calendar::NoLeap,
        }
    }

    pub fn year(&self) -> i32 {
        self.comparable().year
    }

    pub fn month(&self) -> u32 {
        self.comparable().month
    }

    /// Convert to the calendar-independent ordering key
    pub fn comparable(&self) -> ComparableTimestamp {
        match self {
            Timestamp::Standard(dt) => ComparableTimestamp {
                year: dt.year(),
                month: dt.month(),
                day: dt.day(),
                second: dt.num_seconds_from_midnight(),
            },
            Timestamp::NoLeap(dt) => ComparableTimestamp {
                year: dt.year,
                month: dt.month,
                day: dt.day,
                second: dt.second,
            },
        }
    }

    /// Build a boundary date in the same calendar as `self`
    ///
    /// Used to construct period bounds that are comparable with a dataset's
    /// own time axis.
    pub fn boundary_like(&self, year: i32, month: u32, day: u32) -> PacGradResult<Timestamp> {
        self.calendar().date(year, month, day)
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.comparable() == other.comparable()
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparable().cmp(&other.comparable())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.comparable();
        write!(f, "{:04}-{:02}-{:02}", c.year, c.month, c.day)?;
        if c.second != 0 {
            write!(
                f,
                " {:02}:{:02}:{:02}",
                c.second / 3600,
                (c.second / 60) % 60,
                c.second % 60
            )?;
        }
        if self.calendar() == Calendar::NoLeap {
            write!(f, " (noleap)")?;
        }
        Ok(())
    }
}

/// Check that a time axis is strictly increasing
pub fn ensure_strictly_increasing(time: &[Timestamp]) -> PacGradResult<()> {
    match time.windows(2).position(|w| w[0] >= w[1]) {
        Some(i) => Err(PacGradError::NonMonotonicTime {
            index: i + 1,
            timestamp: time[i + 1].to_string(),
        }),
        None => Ok(()),
    }
}
