//! Scalar time series
//!
//! A [`TimeSeries`] pairs a strictly increasing time axis with one value per
//! step. Missing values are represented as `NaN`.

use crate::errors::{PacGradError, PacGradResult};
use crate::time::{ensure_strictly_increasing, ComparableTimestamp, Timestamp};
use ndarray::{s, Array1, ArrayView1};
use serde::{Deserialize, Serialize};

pub type FloatValue = f64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TimeSeriesFields")]
pub struct TimeSeries {
    time: Vec<Timestamp>,
    values: Array1<FloatValue>,
}

/// Unchecked serialised form, validated through [`TimeSeries::new`]
#[derive(Deserialize)]
struct TimeSeriesFields {
    time: Vec<Timestamp>,
    values: Array1<FloatValue>,
}

impl TryFrom<TimeSeriesFields> for TimeSeries {
    type Error = PacGradError;

    fn try_from(fields: TimeSeriesFields) -> PacGradResult<Self> {
        Self::new(fields.time, fields.values)
    }
}

impl TimeSeries {
    /// Create a new series
    ///
    /// Fails if the lengths differ or the time axis is not strictly increasing.
    pub fn new(time: Vec<Timestamp>, values: Array1<FloatValue>) -> PacGradResult<Self> {
        if time.len() != values.len() {
            return Err(PacGradError::ShapeMismatch {
                what: "time series values".to_string(),
                expected: time.len().to_string(),
                actual: values.len().to_string(),
            });
        }
        ensure_strictly_increasing(&time)?;
        Ok(Self { time, values })
    }

    pub fn from_vec(time: Vec<Timestamp>, values: Vec<FloatValue>) -> PacGradResult<Self> {
        Self::new(time, Array1::from(values))
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[Timestamp] {
        &self.time
    }

    pub fn values(&self) -> ArrayView1<FloatValue> {
        self.values.view()
    }

    pub fn first_time(&self) -> Option<&Timestamp> {
        self.time.first()
    }

    pub fn last_time(&self) -> Option<&Timestamp> {
        self.time.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Timestamp, FloatValue)> {
        self.time.iter().zip(self.values.iter().copied())
    }

    /// Values whose timestamps lie within `[start, end]` (inclusive)
    pub fn select_between(
        &self,
        start: ComparableTimestamp,
        end: ComparableTimestamp,
    ) -> ArrayView1<FloatValue> {
        let lo = self.time.partition_point(|t| t.comparable() < start);
        let hi = self.time.partition_point(|t| t.comparable() <= end);
        if lo >= hi {
            return self.values.slice(s![0..0]);
        }
        self.values.slice(s![lo..hi])
    }

    /// Combine two series sharing the same time axis, step by step
    pub fn zip_with<F>(&self, other: &TimeSeries, f: F) -> PacGradResult<TimeSeries>
    where
        F: Fn(FloatValue, FloatValue) -> FloatValue,
    {
        if self.time != other.time {
            return Err(PacGradError::ShapeMismatch {
                what: "time axis".to_string(),
                expected: format!("{} steps", self.len()),
                actual: format!("{} steps", other.len()),
            });
        }
        let values = ndarray::Zip::from(&self.values)
            .and(&other.values)
            .map_collect(|a, b| f(*a, *b));
        Ok(TimeSeries {
            time: self.time.clone(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn monthly(year: i32, n: usize) -> Vec<Timestamp> {
        (0..n)
            .map(|i| {
                Timestamp::standard(year + (i / 12) as i32, (i % 12) as u32 + 1, 16).unwrap()
            })
            .collect()
    }

    #[test]
    fn rejects_length_mismatch() {
        let res = TimeSeries::new(monthly(2000, 3), array![1.0, 2.0]);
        assert!(matches!(res, Err(PacGradError::ShapeMismatch { .. })));
    }

    #[test]
    fn rejects_duplicate_time() {
        let mut time = monthly(2000, 2);
        time.push(time[1]);
        let res = TimeSeries::new(time, array![1.0, 2.0, 3.0]);
        assert!(matches!(res, Err(PacGradError::NonMonotonicTime { .. })));
    }

    #[test]
    fn select_between_inclusive() {
        let ts = TimeSeries::from_vec(monthly(2000, 36), (0..36).map(|x| x as f64).collect())
            .unwrap();
        let start = Timestamp::standard(2001, 1, 1).unwrap().comparable();
        let end = Timestamp::standard(2001, 12, 31).unwrap().comparable();
        let selected = ts.select_between(start, end);
        assert_eq!(selected.len(), 12);
        assert_eq!(selected[0], 12.0);
        assert_eq!(selected[11], 23.0);

        let exact = Timestamp::standard(2000, 1, 16).unwrap().comparable();
        assert_eq!(ts.select_between(exact, exact).len(), 1);
    }

    #[test]
    fn select_between_outside_range() {
        let ts = TimeSeries::from_vec(monthly(2000, 12), vec![0.0; 12]).unwrap();
        let start = Timestamp::standard(1990, 1, 1).unwrap().comparable();
        let end = Timestamp::standard(1990, 12, 31).unwrap().comparable();
        assert!(ts.select_between(start, end).is_empty());
        // Reversed bounds select nothing
        assert!(ts.select_between(end, start).is_empty());
    }

    #[test]
    fn deserialising_checks_time_axis() {
        let ts = TimeSeries::from_vec(monthly(2000, 3), vec![1.0, 2.0, 3.0]).unwrap();
        let json = serde_json::to_value(&ts).unwrap();
        assert_eq!(serde_json::from_value::<TimeSeries>(json.clone()).unwrap(), ts);

        let mut unsorted = json.clone();
        unsorted["time"].as_array_mut().unwrap().swap(0, 2);
        assert!(serde_json::from_value::<TimeSeries>(unsorted).is_err());

        let mut short = json;
        short["time"].as_array_mut().unwrap().pop();
        assert!(serde_json::from_value::<TimeSeries>(short).is_err());
    }

    #[test]
    fn zip_with_requires_same_axis() {
        let a = TimeSeries::from_vec(monthly(2000, 2), vec![3.0, f64::NAN]).unwrap();
        let b = TimeSeries::from_vec(monthly(2000, 2), vec![1.0, 1.0]).unwrap();
        let diff = a.zip_with(&b, |x, y| x - y).unwrap();
        assert_eq!(diff.values()[0], 2.0);
        assert!(diff.values()[1].is_nan());

        let c = TimeSeries::from_vec(monthly(2001, 2), vec![1.0, 1.0]).unwrap();
        assert!(a.zip_with(&c, |x, y| x - y).is_err());
    }
}
