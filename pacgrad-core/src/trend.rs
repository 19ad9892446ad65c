//! Moving-window trend matrix
//!
//! For a gradient series, a linear trend is estimated for every pair of
//! start and end years in the analysis range. The regressor is the sample
//! index rather than calendar time, so the fitted slope is "per sample"
//! (per month for monthly data). Every slope is rescaled to a fixed
//! 120-sample reporting unit, so trends over windows of any length are
//! expressed as change per decade.
//!
//! Cells that cannot be estimated are recorded as missing (`None`):
//!
//! - the start year is not before the end year,
//! - the window is shorter than `min_trend` years,
//! - the window holds no more than one year (12 samples) of data,
//! - the fit is degenerate (for example missing values inside the window).
//!
//! ```rust
//! use pacgrad_core::time::Timestamp;
//! use pacgrad_core::timeseries::TimeSeries;
//! use pacgrad_core::trend::{compute_trends, TrendConfig};
//!
//! let time: Vec<Timestamp> = (1900..1950)
//!     .flat_map(|y| (1..=12).map(move |m| Timestamp::standard(y, m, 16).unwrap()))
//!     .collect();
//! let values = (0..time.len()).map(|i| 0.01 * i as f64).collect();
//! let series = TimeSeries::from_vec(time, values).unwrap();
//!
//! let config = TrendConfig::new(10).with_years(1900, 1949);
//! let trends = compute_trends(&series, &config).unwrap();
//! let decadal = trends.trend(1900, 1930).unwrap();
//! assert!((decadal - 1.2).abs() < 1e-9);
//! assert!(trends.trend(1920, 1925).is_none());
//! ```

use crate::errors::{PacGradError, PacGradResult};
use crate::time::ComparableTimestamp;
use crate::timeseries::{FloatValue, TimeSeries};
use crate::utils::linear_algebra::linear_fit;
use log::debug;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// Samples per year of monthly data
pub const SAMPLES_PER_YEAR: usize = 12;

/// Number of samples the per-sample slope is scaled to (one decade of months)
pub const TREND_UNIT_SAMPLES: FloatValue = 120.0;

pub const DEFAULT_YEAR_START: i32 = 1870;
pub const DEFAULT_YEAR_END: i32 = 2024;

fn default_year_start() -> i32 {
    DEFAULT_YEAR_START
}

fn default_year_end() -> i32 {
    DEFAULT_YEAR_END
}

/// Parameters of the trend matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Minimum window length in years
    pub min_trend: i32,
    /// First year of the analysis range (inclusive)
    #[serde(default = "default_year_start")]
    pub year_start: i32,
    /// Last year of the analysis range (inclusive)
    #[serde(default = "default_year_end")]
    pub year_end: i32,
}

impl TrendConfig {
    /// Create a configuration over the default 1870-2024 range
    pub fn new(min_trend: i32) -> Self {
        Self {
            min_trend,
            year_start: DEFAULT_YEAR_START,
            year_end: DEFAULT_YEAR_END,
        }
    }

    pub fn with_years(self, year_start: i32, year_end: i32) -> Self {
        Self {
            year_start,
            year_end,
            ..self
        }
    }

    /// Reject settings for which the key ranges cannot be formed
    ///
    /// An analysis range shorter than `min_trend` is valid and yields an
    /// empty matrix.
    pub fn validate(&self) -> PacGradResult<()> {
        if self.min_trend < 0 {
            return Err(PacGradError::InvalidConfig(format!(
                "min_trend must not be negative, got {}",
                self.min_trend
            )));
        }
        if self.year_start.checked_add(self.min_trend).is_none()
            || self.year_end.checked_sub(self.min_trend).is_none()
        {
            return Err(PacGradError::InvalidConfig(format!(
                "min_trend of {} years overflows the analysis range {}-{}",
                self.min_trend, self.year_start, self.year_end
            )));
        }
        Ok(())
    }

    /// Candidate start years: `[year_start, year_end - min_trend]`
    pub fn start_years(&self) -> RangeInclusive<i32> {
        self.year_start..=self.year_end.saturating_sub(self.min_trend)
    }

    /// Candidate end years: `[year_start + min_trend, year_end]`
    pub fn end_years(&self) -> RangeInclusive<i32> {
        self.year_start.saturating_add(self.min_trend)..=self.year_end
    }
}

/// Trend over a single window, or `None` if it cannot be estimated
///
/// `index` is the integer regressor built over the whole series; the prefix
/// matching the number of selected samples is used.
pub fn trend_for_window(
    series: &TimeSeries,
    index: &[FloatValue],
    start_year: i32,
    end_year: i32,
    min_trend: i32,
) -> Option<FloatValue> {
    if start_year >= end_year
        || i64::from(end_year) - i64::from(start_year) < i64::from(min_trend)
    {
        return None;
    }

    let window_start = ComparableTimestamp {
        year: start_year,
        month: 1,
        day: 1,
        second: 0,
    };
    let window_end = ComparableTimestamp {
        year: end_year,
        month: 12,
        day: 31,
        second: 0,
    };
    let selected = series.select_between(window_start, window_end).to_vec();
    if selected.len() <= SAMPLES_PER_YEAR {
        return None;
    }

    let x = index.get(..selected.len())?;
    linear_fit(x, &selected).map(|fit| fit.slope * TREND_UNIT_SAMPLES)
}

/// Compute the full start-year by end-year trend matrix
///
/// Cells are independent and evaluated in parallel.
pub fn compute_trends(series: &TimeSeries, config: &TrendConfig) -> PacGradResult<TrendMatrix> {
    config.validate()?;

    let index: Vec<FloatValue> = (0..series.len()).map(|i| i as FloatValue).collect();
    let windows: Vec<(i32, i32)> = config
        .start_years()
        .flat_map(|start| config.end_years().map(move |end| (start, end)))
        .collect();

    let cells: BTreeMap<(i32, i32), Option<FloatValue>> = windows
        .par_iter()
        .map(|&(start, end)| {
            (
                (start, end),
                trend_for_window(series, &index, start, end, config.min_trend),
            )
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    let matrix = TrendMatrix { cells };
    debug!(
        "Computed {} of {} trend windows ({}-{}, min {} years)",
        matrix.count_computed(),
        matrix.len(),
        config.year_start,
        config.year_end,
        config.min_trend
    );
    Ok(matrix)
}

/// Trends keyed by `(start_year, end_year)`
///
/// Built once by [`compute_trends`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrendMatrix {
    cells: BTreeMap<(i32, i32), Option<FloatValue>>,
}

impl TrendMatrix {
    /// Trend for a window
    ///
    /// `None` both for missing cells and for windows outside the generated range;
    /// use [`contains`](Self::contains) to tell them apart.
    pub fn trend(&self, start_year: i32, end_year: i32) -> Option<FloatValue> {
        self.cells.get(&(start_year, end_year)).copied().flatten()
    }

    /// Whether a cell (missing or not) was generated for this window
    pub fn contains(&self, start_year: i32, end_year: i32) -> bool {
        self.cells.contains_key(&(start_year, end_year))
    }

    /// Number of cells, including missing ones
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn count_computed(&self) -> usize {
        self.cells.values().filter(|v| v.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((i32, i32), Option<FloatValue>)> + '_ {
        self.cells.iter().map(|(k, v)| (*k, *v))
    }

    /// Pivot into a table with end years as rows (descending) and start years as columns
    pub fn to_table(&self) -> TrendTable {
        let start_years: Vec<i32> = self
            .cells
            .keys()
            .map(|(s, _)| *s)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let end_years: Vec<i32> = self
            .cells
            .keys()
            .map(|(_, e)| *e)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .rev()
            .collect();

        let row_of: BTreeMap<i32, usize> =
            end_years.iter().enumerate().map(|(i, y)| (*y, i)).collect();
        let col_of: BTreeMap<i32, usize> =
            start_years.iter().enumerate().map(|(i, y)| (*y, i)).collect();

        let mut values = Array2::from_elem((end_years.len(), start_years.len()), FloatValue::NAN);
        for ((start, end), value) in &self.cells {
            if let (Some(r), Some(c), Some(v)) = (row_of.get(end), col_of.get(start), value) {
                values[[*r, *c]] = *v;
            }
        }

        TrendTable {
            end_years,
            start_years,
            values,
        }
    }
}

/// Trend matrix laid out as a 2-D table; missing cells are `NaN`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendTable {
    /// Row labels, descending
    pub end_years: Vec<i32>,
    /// Column labels, ascending
    pub start_years: Vec<i32>,
    /// Values with shape `(end_years.len(), start_years.len())`
    pub values: Array2<FloatValue>,
}

impl TrendTable {
    pub fn get(&self, start_year: i32, end_year: i32) -> Option<FloatValue> {
        let r = self.end_years.iter().position(|y| *y == end_year)?;
        let c = self.start_years.iter().position(|y| *y == start_year)?;
        let v = self.values[[r, c]];
        (!v.is_nan()).then_some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timestamp;
    use is_close::is_close;

    fn monthly_series(from: i32, to: i32, f: impl Fn(usize) -> f64) -> TimeSeries {
        let time: Vec<Timestamp> = (from..=to)
            .flat_map(|y| (1..=12).map(move |m| Timestamp::standard(y, m, 16).unwrap()))
            .collect();
        let values = (0..time.len()).map(f).collect();
        TimeSeries::from_vec(time, values).unwrap()
    }

    fn index(series: &TimeSeries) -> Vec<f64> {
        (0..series.len()).map(|i| i as f64).collect()
    }

    #[test]
    fn linear_series_gives_same_trend_for_any_window() {
        let series = monthly_series(1900, 1960, |i| 0.01 * i as f64);
        let idx = index(&series);
        for (start, end) in [(1900, 1910), (1905, 1960), (1930, 1941)] {
            let trend = trend_for_window(&series, &idx, start, end, 10).unwrap();
            assert!(is_close!(trend, 1.2), "{}-{}: {}", start, end, trend);
        }
    }

    #[test]
    fn invalid_windows_are_missing() {
        let series = monthly_series(1900, 1960, |i| i as f64);
        let idx = index(&series);
        assert_eq!(trend_for_window(&series, &idx, 1920, 1920, 1), None);
        assert_eq!(trend_for_window(&series, &idx, 1930, 1920, 1), None);
        assert_eq!(trend_for_window(&series, &idx, 1920, 1929, 10), None);
        assert!(trend_for_window(&series, &idx, 1920, 1930, 10).is_some());
    }

    #[test]
    fn too_few_samples_are_missing() {
        // Data ends mid-1901: window 1901-1905 selects only 6 samples
        let series = monthly_series(1900, 1900, |i| i as f64);
        let idx = index(&series);
        assert_eq!(trend_for_window(&series, &idx, 1900, 1901, 1), None);

        let time: Vec<Timestamp> = (0..18)
            .map(|i| Timestamp::standard(1900 + i / 12, (i % 12) as u32 + 1, 16).unwrap())
            .collect();
        let series = TimeSeries::from_vec(time, (0..18).map(|i| i as f64).collect()).unwrap();
        let idx = index(&series);
        assert_eq!(trend_for_window(&series, &idx, 1901, 1905, 1), None);
        // 18 samples in 1900-1901 is enough
        assert!(trend_for_window(&series, &idx, 1900, 1901, 1).is_some());
    }

    #[test]
    fn exactly_twelve_samples_is_missing() {
        let time: Vec<Timestamp> = (0..13)
            .map(|i| {
                Timestamp::standard(1899 + (i + 11) / 12, ((i + 11) % 12) as u32 + 1, 16).unwrap()
            })
            .collect();
        // Dec 1899 followed by all of 1900
        let series = TimeSeries::from_vec(time, (0..13).map(|i| i as f64).collect()).unwrap();
        let idx = index(&series);
        assert_eq!(trend_for_window(&series, &idx, 1900, 1901, 1), None);
        assert!(trend_for_window(&series, &idx, 1899, 1901, 1).is_some());
    }

    #[test]
    fn window_uses_index_prefix() {
        // Slope is independent of where the window sits, so a step change
        // before the window does not leak into it
        let series = monthly_series(1900, 1940, |i| {
            if i < 120 {
                100.0
            } else {
                0.5 * i as f64
            }
        });
        let idx = index(&series);
        let trend = trend_for_window(&series, &idx, 1910, 1940, 10).unwrap();
        assert!(is_close!(trend, 60.0));
    }

    #[test]
    fn missing_values_isolated_to_their_windows() {
        let series = monthly_series(1900, 1960, |i| if i == 5 { f64::NAN } else { i as f64 });
        let config = TrendConfig::new(10).with_years(1900, 1960);
        let trends = compute_trends(&series, &config).unwrap();
        assert_eq!(trends.trend(1900, 1920), None);
        assert!(trends.contains(1900, 1920));
        assert!(is_close!(trends.trend(1901, 1920).unwrap(), 120.0));
    }

    #[test]
    fn key_ranges_follow_config() {
        let series = monthly_series(1900, 1960, |i| i as f64);
        let config = TrendConfig::new(10).with_years(1900, 1960);
        let trends = compute_trends(&series, &config).unwrap();
        // 51 start years x 51 end years
        assert_eq!(trends.len(), 51 * 51);
        assert!(trends.contains(1950, 1910));
        assert_eq!(trends.trend(1950, 1910), None);
        assert!(!trends.contains(1951, 1960));
        assert!(!trends.contains(1900, 1909));
        assert!(trends.contains(1905, 1910));
        assert_eq!(trends.trend(1905, 1910), None);
    }

    #[test]
    fn rejects_invalid_config() {
        let series = monthly_series(1900, 1910, |i| i as f64);
        assert!(matches!(
            compute_trends(&series, &TrendConfig::new(-1)),
            Err(PacGradError::InvalidConfig(_))
        ));
        assert!(matches!(
            compute_trends(&series, &TrendConfig::new(i32::MAX).with_years(1870, 2024)),
            Err(PacGradError::InvalidConfig(_))
        ));
        assert!(matches!(
            compute_trends(&series, &TrendConfig::new(10).with_years(1870, i32::MIN)),
            Err(PacGradError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_min_trend_covers_full_range() {
        let series = monthly_series(1900, 1930, |i| 0.01 * i as f64);
        let config = TrendConfig::new(0).with_years(1900, 1930);
        let trends = compute_trends(&series, &config).unwrap();
        assert_eq!(trends.len(), 31 * 31);
        assert!(trends.contains(1900, 1900));
        assert_eq!(trends.trend(1900, 1900), None);
        assert_eq!(trends.trend(1910, 1905), None);
        assert!(is_close!(trends.trend(1900, 1901).unwrap(), 1.2));
    }

    #[test]
    fn range_shorter_than_min_trend_is_empty() {
        let series = monthly_series(1900, 1910, |i| i as f64);
        let config = TrendConfig::new(20).with_years(1900, 1910);
        let trends = compute_trends(&series, &config).unwrap();
        assert!(trends.is_empty());
        let table = trends.to_table();
        assert_eq!(table.values.dim(), (0, 0));
    }

    #[test]
    fn empty_series_gives_all_missing() {
        let series = TimeSeries::from_vec(vec![], vec![]).unwrap();
        let config = TrendConfig::new(5).with_years(2000, 2010);
        let trends = compute_trends(&series, &config).unwrap();
        assert_eq!(trends.len(), 36);
        assert_eq!(trends.count_computed(), 0);
    }

    #[test]
    fn table_layout() {
        let series = monthly_series(1900, 1930, |i| 0.01 * i as f64);
        let config = TrendConfig::new(10).with_years(1900, 1930);
        let trends = compute_trends(&series, &config).unwrap();
        let table = trends.to_table();

        assert_eq!(table.end_years, (1910..=1930).rev().collect::<Vec<_>>());
        assert_eq!(table.start_years, (1900..=1920).collect::<Vec<_>>());
        assert_eq!(table.values.dim(), (21, 21));

        for ((start, end), value) in trends.iter() {
            assert_eq!(table.get(start, end), value);
        }
        // Top-left is the longest window, bottom-right the degenerate triangle
        assert!(is_close!(table.values[[0, 0]], 1.2));
        assert!(table.values[[20, 20]].is_nan());
    }

    #[test]
    fn config_from_toml_defaults() {
        let config: TrendConfig = toml::from_str("min_trend = 10").unwrap();
        assert_eq!(config, TrendConfig::new(10));
        assert_eq!(config.year_start, 1870);
        assert_eq!(config.year_end, 2024);
    }
}
