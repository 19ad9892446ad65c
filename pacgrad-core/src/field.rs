//! Gridded model output
//!
//! [`GriddedField`] is the in-memory form of one model variable over
//! (time, latitude, longitude), as produced by the dataset loader. Coordinates
//! are assumed to already use canonical latitude/longitude naming.

use crate::errors::{PacGradError, PacGradResult};
use crate::registry::{LineageKey, RunIdentity};
use crate::time::{ensure_strictly_increasing, Timestamp};
use crate::timeseries::FloatValue;
use ndarray::{concatenate, Array1, Array2, Array3, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ATTR_SOURCE_ID: &str = "source_id";
pub const ATTR_VARIANT_LABEL: &str = "variant_label";
pub const ATTR_PARENT_VARIANT_LABEL: &str = "parent_variant_label";
pub const ATTR_PARENT_SOURCE_ID: &str = "parent_source_id";

/// A named scalar variable on a (time, lat, lon) grid plus free-form metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GriddedFieldFields")]
pub struct GriddedField {
    variable: String,
    time: Vec<Timestamp>,
    lat: Array1<FloatValue>,
    lon: Array1<FloatValue>,
    values: Array3<FloatValue>,
    attributes: BTreeMap<String, String>,
}

/// Unchecked serialised form, validated through [`GriddedField::new`]
#[derive(Deserialize)]
struct GriddedFieldFields {
    variable: String,
    time: Vec<Timestamp>,
    lat: Array1<FloatValue>,
    lon: Array1<FloatValue>,
    values: Array3<FloatValue>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

impl TryFrom<GriddedFieldFields> for GriddedField {
    type Error = PacGradError;

    fn try_from(fields: GriddedFieldFields) -> PacGradResult<Self> {
        let mut field = Self::new(
            &fields.variable,
            fields.time,
            fields.lat,
            fields.lon,
            fields.values,
        )?;
        field.attributes = fields.attributes;
        Ok(field)
    }
}

impl GriddedField {
    /// Create a new field, checking that `values` has shape `(time, lat, lon)`
    pub fn new(
        variable: &str,
        time: Vec<Timestamp>,
        lat: Array1<FloatValue>,
        lon: Array1<FloatValue>,
        values: Array3<FloatValue>,
    ) -> PacGradResult<Self> {
        let expected = (time.len(), lat.len(), lon.len());
        if values.dim() != expected {
            return Err(PacGradError::ShapeMismatch {
                what: format!("field '{}'", variable),
                expected: format!("{:?}", expected),
                actual: format!("{:?}", values.dim()),
            });
        }
        Ok(Self {
            variable: variable.to_string(),
            time,
            lat,
            lon,
            values,
            attributes: BTreeMap::new(),
        })
    }

    /// Set an attribute, returning the updated field
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn time(&self) -> &[Timestamp] {
        &self.time
    }

    pub fn lat(&self) -> &Array1<FloatValue> {
        &self.lat
    }

    pub fn lon(&self) -> &Array1<FloatValue> {
        &self.lon
    }

    pub fn values(&self) -> ArrayView3<FloatValue> {
        self.values.view()
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Get an attribute that must be present
    pub fn require_attribute(&self, name: &str) -> PacGradResult<&str> {
        self.attribute(name)
            .ok_or_else(|| PacGradError::MissingAttribute(name.to_string()))
    }

    /// Identity of this realisation: `(source_id, variant_label)`
    pub fn run_identity(&self) -> PacGradResult<RunIdentity> {
        Ok(RunIdentity::new(
            self.require_attribute(ATTR_SOURCE_ID)?,
            self.require_attribute(ATTR_VARIANT_LABEL)?,
        ))
    }

    /// The historical run a scenario run continues: `(source_id, parent_variant_label)`
    pub fn lineage_key(&self) -> PacGradResult<LineageKey> {
        Ok(LineageKey::new(
            self.require_attribute(ATTR_SOURCE_ID)?,
            self.require_attribute(ATTR_PARENT_VARIANT_LABEL)?,
        ))
    }

    /// Label used to identify the model in output
    ///
    /// Joins `parent_source_id` and `variant_label` with `_`, skipping any that are absent.
    pub fn model_name(&self) -> String {
        [ATTR_PARENT_SOURCE_ID, ATTR_VARIANT_LABEL]
            .iter()
            .filter_map(|name| self.attribute(name))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn first_time(&self) -> Option<&Timestamp> {
        self.time.first()
    }

    pub fn last_time(&self) -> Option<&Timestamp> {
        self.time.last()
    }

    /// Append `other` along the time axis
    ///
    /// Both fields must share the variable name and spatial grid. Attributes
    /// are taken from `self`. No sorting is performed.
    pub fn concat_time(&self, other: &GriddedField) -> PacGradResult<GriddedField> {
        if self.variable != other.variable {
            return Err(PacGradError::ShapeMismatch {
                what: "variable name".to_string(),
                expected: self.variable.clone(),
                actual: other.variable.clone(),
            });
        }
        if self.lat != other.lat || self.lon != other.lon {
            return Err(PacGradError::ShapeMismatch {
                what: format!("spatial grid of '{}'", self.variable),
                expected: format!("{}x{}", self.lat.len(), self.lon.len()),
                actual: format!("{}x{}", other.lat.len(), other.lon.len()),
            });
        }
        let values = concatenate(Axis(0), &[self.values.view(), other.values.view()]).map_err(
            |e| PacGradError::ShapeMismatch {
                what: format!("values of '{}'", self.variable),
                expected: format!("{:?}", self.values.dim()),
                actual: e.to_string(),
            },
        )?;
        let mut time = self.time.clone();
        time.extend_from_slice(&other.time);

        Ok(GriddedField {
            variable: self.variable.clone(),
            time,
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            values,
            attributes: self.attributes.clone(),
        })
    }

    /// Reorder time steps so the time axis is ascending
    pub fn sort_by_time(self) -> GriddedField {
        let mut order: Vec<usize> = (0..self.time.len()).collect();
        order.sort_by(|a, b| self.time[*a].cmp(&self.time[*b]));
        if order.iter().enumerate().all(|(i, j)| i == *j) {
            return self;
        }
        let time = order.iter().map(|i| self.time[*i]).collect();
        let values = self.values.select(Axis(0), &order);
        GriddedField {
            time,
            values,
            ..self
        }
    }

    pub fn ensure_strictly_increasing(&self) -> PacGradResult<()> {
        ensure_strictly_increasing(&self.time)
    }

    /// Subtract the mean annual cycle
    ///
    /// Each cell has the mean of that cell over all time steps in the same
    /// calendar month removed. Missing values are skipped when forming the
    /// monthly means.
    pub fn remove_monthly_climatology(&self) -> GriddedField {
        let (_, n_lat, n_lon) = self.values.dim();
        let mut sums = Array3::<FloatValue>::zeros((12, n_lat, n_lon));
        let mut counts = Array3::<FloatValue>::zeros((12, n_lat, n_lon));

        for (t, step) in self.time.iter().zip(self.values.outer_iter()) {
            let m = (t.month() - 1) as usize;
            let mut sum = sums.index_axis_mut(Axis(0), m);
            let mut count = counts.index_axis_mut(Axis(0), m);
            ndarray::Zip::from(&mut sum)
                .and(&mut count)
                .and(&step)
                .for_each(|s, c, v| {
                    if !v.is_nan() {
                        *s += v;
                        *c += 1.0;
                    }
                });
        }
        let climatology: Array3<FloatValue> = ndarray::Zip::from(&sums)
            .and(&counts)
            .map_collect(|s, c| if *c > 0.0 { s / c } else { FloatValue::NAN });

        let mut anomalies = self.values.clone();
        for (t, mut step) in self.time.iter().zip(anomalies.outer_iter_mut()) {
            let mean: Array2<FloatValue> = climatology
                .index_axis(Axis(0), (t.month() - 1) as usize)
                .to_owned();
            step -= &mean;
        }

        GriddedField {
            values: anomalies,
            ..self.clone()
        }
    }
}
