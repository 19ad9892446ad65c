//! Python bindings
//!
//! Exposes the gradient reduction and the trend matrix to Python as plain
//! numpy arrays. Time axes are passed as separate year, month and day arrays
//! plus a calendar name (`"standard"` or `"noleap"`).

use numpy::ndarray::Array3;
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray3};
use pacgrad_core::errors::PacGradError;
use pacgrad_core::field::GriddedField;
use pacgrad_core::region::gradient;
use pacgrad_core::time::{Calendar, Timestamp};
use pacgrad_core::timeseries::TimeSeries;
use pacgrad_core::trend::{compute_trends, TrendConfig, DEFAULT_YEAR_END, DEFAULT_YEAR_START};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn to_py_err(e: PacGradError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_calendar(name: &str) -> PyResult<Calendar> {
    match name.to_ascii_lowercase().as_str() {
        "standard" | "gregorian" | "proleptic_gregorian" => Ok(Calendar::Standard),
        "noleap" | "365_day" => Ok(Calendar::NoLeap),
        other => Err(PyValueError::new_err(format!(
            "Unsupported calendar '{}'",
            other
        ))),
    }
}

fn build_time(
    years: &[i32],
    months: &[u32],
    days: &[u32],
    calendar: &str,
) -> PyResult<Vec<Timestamp>> {
    if years.len() != months.len() || years.len() != days.len() {
        return Err(PyValueError::new_err(
            "years, months and days must have the same length",
        ));
    }
    let calendar = parse_calendar(calendar)?;
    years
        .iter()
        .zip(months)
        .zip(days)
        .map(|((y, m), d)| calendar.date(*y, *m, *d).map_err(to_py_err))
        .collect()
}

/// Zonal SST gradient (west box minus east box) of a (time, lat, lon) field
#[pyfunction]
#[pyo3(signature = (years, months, days, lat, lon, values, calendar="standard"))]
#[allow(clippy::too_many_arguments)]
fn zonal_gradient<'py>(
    py: Python<'py>,
    years: PyReadonlyArray1<'py, i32>,
    months: PyReadonlyArray1<'py, u32>,
    days: PyReadonlyArray1<'py, u32>,
    lat: PyReadonlyArray1<'py, f64>,
    lon: PyReadonlyArray1<'py, f64>,
    values: PyReadonlyArray3<'py, f64>,
    calendar: &str,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let time = build_time(
        &years.as_array().to_vec(),
        &months.as_array().to_vec(),
        &days.as_array().to_vec(),
        calendar,
    )?;
    let values: Array3<f64> = values.as_array().to_owned();
    let field = GriddedField::new(
        "ts",
        time,
        lat.as_array().to_owned(),
        lon.as_array().to_owned(),
        values,
    )
    .map_err(to_py_err)?;
    let series = gradient(&field).map_err(to_py_err)?;
    Ok(series.values().to_owned().into_pyarray_bound(py))
}

/// Trend matrix of a series as a table
///
/// Returns `(end_years, start_years, trends)` where `trends` has one row per
/// end year (descending) and one column per start year; missing cells are NaN.
#[pyfunction]
#[pyo3(signature = (years, months, days, values, min_trend, year_start=DEFAULT_YEAR_START, year_end=DEFAULT_YEAR_END, calendar="standard"))]
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
fn trend_table<'py>(
    py: Python<'py>,
    years: PyReadonlyArray1<'py, i32>,
    months: PyReadonlyArray1<'py, u32>,
    days: PyReadonlyArray1<'py, u32>,
    values: PyReadonlyArray1<'py, f64>,
    min_trend: i32,
    year_start: i32,
    year_end: i32,
    calendar: &str,
) -> PyResult<(
    Bound<'py, PyArray1<i32>>,
    Bound<'py, PyArray1<i32>>,
    Bound<'py, PyArray2<f64>>,
)> {
    let time = build_time(
        &years.as_array().to_vec(),
        &months.as_array().to_vec(),
        &days.as_array().to_vec(),
        calendar,
    )?;
    let series = TimeSeries::new(time, values.as_array().to_owned()).map_err(to_py_err)?;
    let config = TrendConfig::new(min_trend).with_years(year_start, year_end);

    // Release the GIL while the cells are evaluated
    let table = py
        .allow_threads(|| compute_trends(&series, &config))
        .map_err(to_py_err)?
        .to_table();

    Ok((
        table.end_years.into_pyarray_bound(py),
        table.start_years.into_pyarray_bound(py),
        table.values.into_pyarray_bound(py),
    ))
}

#[pymodule]
#[pyo3(name = "_lib")]
fn pacgrad(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(zonal_gradient, m)?)?;
    m.add_function(wrap_pyfunction!(trend_table, m)?)?;
    Ok(())
}
