//! Classification of historical model files
//!
//! CMIP file names follow
//! `<variable>_<table>_<source_id>_<experiment>_<variant_label>_<grid>_<YYYYMM-YYYYMM>.nc`.
//! Runs stored in a single file spanning the whole historical period can be
//! used directly; the others are grouped per realisation so their fragments
//! can be stitched.

use crate::errors::{PacGradError, PacGradResult};
use crate::registry::RunIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Date range of a historical file covering the full period
pub const FULL_HISTORICAL_RANGE: &str = "185001-201412";

/// Components of a CMIP file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileName {
    pub variable: String,
    pub table: String,
    pub source_id: String,
    pub experiment: String,
    pub variant_label: String,
    pub grid_label: String,
    pub date_range: String,
}

impl FileName {
    /// Parse the file name part of a path or URL
    pub fn parse(location: &str) -> PacGradResult<Self> {
        let invalid = || PacGradError::InvalidIdentifier(location.to_string());
        let name = location.rsplit('/').next().unwrap_or(location);
        let stem = name.split_once('.').map_or(name, |(stem, _)| stem);
        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() != 7 || parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        Ok(Self {
            variable: parts[0].to_string(),
            table: parts[1].to_string(),
            source_id: parts[2].to_string(),
            experiment: parts[3].to_string(),
            variant_label: parts[4].to_string(),
            grid_label: parts[5].to_string(),
            date_range: parts[6].to_string(),
        })
    }

    pub fn run_identity(&self) -> RunIdentity {
        RunIdentity::new(&self.source_id, &self.variant_label)
    }

    pub fn is_full_historical(&self) -> bool {
        self.date_range == FULL_HISTORICAL_RANGE
    }
}

/// Bucket a historical file belongs to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HistoricalGroup {
    /// Single file spanning the full historical period
    Full,
    /// Fragment of the given realisation
    Partial(RunIdentity),
}

/// Group historical files into complete runs and per-run fragments
///
/// Locations keep their input order within each group.
pub fn classify_historical<I, S>(
    locations: I,
) -> PacGradResult<BTreeMap<HistoricalGroup, Vec<String>>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<HistoricalGroup, Vec<String>> = BTreeMap::new();
    for location in locations {
        let location = location.as_ref();
        let file = FileName::parse(location)?;
        let group = if file.is_full_historical() {
            HistoricalGroup::Full
        } else {
            HistoricalGroup::Partial(file.run_identity())
        };
        groups.entry(group).or_default().push(location.to_string());
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_url() {
        let f = FileName::parse(
            "http://esgf.example.org/thredds/dodsC/CMIP6/ts_Amon_CESM2_historical_r1i1p1f1_gn_185001-201412.nc",
        )
        .unwrap();
        assert_eq!(f.variable, "ts");
        assert_eq!(f.table, "Amon");
        assert_eq!(f.source_id, "CESM2");
        assert_eq!(f.experiment, "historical");
        assert_eq!(f.variant_label, "r1i1p1f1");
        assert_eq!(f.grid_label, "gn");
        assert_eq!(f.date_range, "185001-201412");
        assert!(f.is_full_historical());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(FileName::parse("ts_Amon_CESM2.nc").is_err());
        assert!(FileName::parse("ts_Amon__historical_r1i1p1f1_gn_185001-201412.nc").is_err());
    }

    #[test]
    fn classify() {
        let groups = classify_historical([
            "ts_Amon_CESM2_historical_r1i1p1f1_gn_185001-201412.nc",
            "ts_Amon_MIROC6_historical_r1i1p1f1_gn_195001-201412.nc",
            "ts_Amon_MIROC6_historical_r1i1p1f1_gn_185001-194912.nc",
            "ts_Amon_MIROC6_historical_r2i1p1f1_gn_185001-201412.nc",
        ])
        .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&HistoricalGroup::Full].len(), 2);
        let partial = &groups[&HistoricalGroup::Partial(RunIdentity::new("MIROC6", "r1i1p1f1"))];
        assert_eq!(
            partial,
            &vec![
                "ts_Amon_MIROC6_historical_r1i1p1f1_gn_195001-201412.nc".to_string(),
                "ts_Amon_MIROC6_historical_r1i1p1f1_gn_185001-194912.nc".to_string(),
            ]
        );
    }
}
