//! Regional averaging and the zonal SST gradient
//!
//! The gradient is the difference between area-weighted mean surface
//! temperature in a western and an eastern equatorial Pacific box
//! (Seager et al. 2022). Without cell areas, grid cells are weighted by the
//! cosine of their latitude.
//!
//! ```rust
//! use pacgrad_core::region::{BoundingBox, EAST_BOX, WEST_BOX};
//!
//! assert!(WEST_BOX.contains(0.0, 150.0));
//! assert!(!EAST_BOX.contains(0.0, 150.0));
//! ```

use crate::errors::PacGradResult;
use crate::field::GriddedField;
use crate::timeseries::{FloatValue, TimeSeries};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// A latitude/longitude rectangle, bounds inclusive
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: FloatValue,
    pub lat_max: FloatValue,
    pub lon_min: FloatValue,
    pub lon_max: FloatValue,
}

/// Eastern equatorial Pacific box
pub const EAST_BOX: BoundingBox = BoundingBox {
    lat_min: -3.0,
    lat_max: 3.0,
    lon_min: 190.0,
    lon_max: 270.0,
};

/// Western equatorial Pacific box
pub const WEST_BOX: BoundingBox = BoundingBox {
    lat_min: -3.0,
    lat_max: 3.0,
    lon_min: 140.0,
    lon_max: 170.0,
};

impl BoundingBox {
    pub fn contains(&self, lat: FloatValue, lon: FloatValue) -> bool {
        self.contains_lat(lat) && self.contains_lon(lon)
    }

    fn contains_lat(&self, lat: FloatValue) -> bool {
        lat >= self.lat_min && lat <= self.lat_max
    }

    fn contains_lon(&self, lon: FloatValue) -> bool {
        lon >= self.lon_min && lon <= self.lon_max
    }
}

/// Area-weighted mean of a field over a box, per time step
///
/// Weights are `cos(lat)`. Missing cells are skipped; a step with no valid
/// cells in the box (including an empty box) is `NaN`.
pub fn box_mean(field: &GriddedField, bbox: &BoundingBox) -> PacGradResult<TimeSeries> {
    let lat_idx: Vec<usize> = field
        .lat()
        .iter()
        .enumerate()
        .filter(|(_, lat)| bbox.contains_lat(**lat))
        .map(|(i, _)| i)
        .collect();
    let lon_idx: Vec<usize> = field
        .lon()
        .iter()
        .enumerate()
        .filter(|(_, lon)| bbox.contains_lon(**lon))
        .map(|(i, _)| i)
        .collect();
    let weights: Vec<FloatValue> = lat_idx
        .iter()
        .map(|i| field.lat()[*i].to_radians().cos())
        .collect();

    let values = field.values();
    let means: Array1<FloatValue> = values
        .outer_iter()
        .map(|step| {
            let mut weighted_sum = 0.0;
            let mut weight_sum = 0.0;
            for (i, w) in lat_idx.iter().zip(weights.iter()) {
                for j in &lon_idx {
                    let x = step[[*i, *j]];
                    if !x.is_nan() {
                        weighted_sum += w * x;
                        weight_sum += w;
                    }
                }
            }
            if weight_sum > 0.0 {
                weighted_sum / weight_sum
            } else {
                FloatValue::NAN
            }
        })
        .collect();

    TimeSeries::new(field.time().to_vec(), means)
}

/// West-minus-east difference of two box means on a shared time axis
pub fn gradient_between(west: &TimeSeries, east: &TimeSeries) -> PacGradResult<TimeSeries> {
    west.zip_with(east, |w, e| w - e)
}

/// Zonal SST gradient of a field: `mean(WEST_BOX) - mean(EAST_BOX)`
pub fn gradient(field: &GriddedField) -> PacGradResult<TimeSeries> {
    let west = box_mean(field, &WEST_BOX)?;
    let east = box_mean(field, &EAST_BOX)?;
    gradient_between(&west, &east)
}
