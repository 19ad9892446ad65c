//! Analysis configuration
//!
//! Configuration is read from TOML:
//!
//! ```toml
//! remove_climatology = true
//! seed = 42
//!
//! [trend]
//! min_trend = 10
//! year_start = 1870
//! year_end = 2024
//!
//! [historical_span]
//! start = "1850-01-31"
//! end = "2014-12-01"
//! ```
//!
//! Everything except `trend.min_trend` has a default.

use crate::coverage::CoverageSpan;
use crate::errors::{PacGradError, PacGradResult};
use crate::trend::TrendConfig;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_historical_span() -> CoverageSpan {
    CoverageSpan::HISTORICAL
}

fn default_scenario_span() -> CoverageSpan {
    CoverageSpan::SCENARIO
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Remove the mean annual cycle before computing the gradient
    #[serde(default)]
    pub remove_climatology: bool,
    /// Seed for the random scenario fallback; entropy from the OS if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub trend: TrendConfig,
    /// Period a stitched historical run must cover
    #[serde(default = "default_historical_span")]
    pub historical_span: CoverageSpan,
    /// Period a scenario run must cover to be registered
    #[serde(default = "default_scenario_span")]
    pub scenario_span: CoverageSpan,
}

impl AnalysisConfig {
    pub fn new(trend: TrendConfig) -> Self {
        Self {
            remove_climatology: false,
            seed: None,
            trend,
            historical_span: CoverageSpan::HISTORICAL,
            scenario_span: CoverageSpan::SCENARIO,
        }
    }

    pub fn from_toml_str(content: &str) -> PacGradResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PacGradError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> PacGradResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PacGradError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> PacGradResult<String> {
        toml::to_string(self).map_err(|e| PacGradError::Config(e.to_string()))
    }

    pub fn validate(&self) -> PacGradResult<()> {
        self.trend.validate()?;
        for (name, span) in [
            ("historical_span", &self.historical_span),
            ("scenario_span", &self.scenario_span),
        ] {
            if span.start > span.end {
                return Err(PacGradError::InvalidConfig(format!(
                    "{} starts after it ends ({})",
                    name, span
                )));
            }
        }
        Ok(())
    }

    /// Random source for scenario selection, seeded if `seed` is set
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CalendarDate;
    use rand::Rng;

    #[test]
    fn minimal() {
        let config = AnalysisConfig::from_toml_str("[trend]\nmin_trend = 10\n").unwrap();
        assert_eq!(config, AnalysisConfig::new(TrendConfig::new(10)));
    }

    #[test]
    fn full() {
        let config = AnalysisConfig::from_toml_str(
            r#"
remove_climatology = true
seed = 7

[trend]
min_trend = 20
year_start = 1900
year_end = 2020

[historical_span]
start = "1850-01-01"
end = "2014-12-31"
"#,
        )
        .unwrap();
        assert!(config.remove_climatology);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.trend, TrendConfig::new(20).with_years(1900, 2020));
        assert_eq!(config.historical_span.end, CalendarDate::new(2014, 12, 31));
        assert_eq!(config.scenario_span, CoverageSpan::SCENARIO);
    }

    #[test]
    fn missing_min_trend() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("[trend]\nyear_start = 1900\n"),
            Err(PacGradError::Config(_))
        ));
    }

    #[test]
    fn invalid_values() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("[trend]\nmin_trend = -1\n"),
            Err(PacGradError::InvalidConfig(_))
        ));
        let reversed = r#"
[trend]
min_trend = 10

[scenario_span]
start = "2022-12-01"
end = "2015-01-31"
"#;
        assert!(matches!(
            AnalysisConfig::from_toml_str(reversed),
            Err(PacGradError::InvalidConfig(_))
        ));
        let short_date = r#"
[trend]
min_trend = 10

[historical_span]
start = "1850"
end = "2014-12-01"
"#;
        assert!(matches!(
            AnalysisConfig::from_toml_str(short_date),
            Err(PacGradError::Config(_))
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = AnalysisConfig::new(TrendConfig::new(15));
        config.seed = Some(3);
        let serialised = config.to_toml_string().unwrap();
        assert_eq!(AnalysisConfig::from_toml_str(&serialised).unwrap(), config);
    }

    #[test]
    fn from_file() {
        let path =
            std::env::temp_dir().join(format!("pacgrad-config-{}.toml", std::process::id()));
        std::fs::write(&path, "seed = 5\n\n[trend]\nmin_trend = 30\n").unwrap();
        let config = AnalysisConfig::from_file(&path);
        std::fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.trend, TrendConfig::new(30));

        assert!(matches!(
            AnalysisConfig::from_file(std::env::temp_dir().join("pacgrad-does-not-exist.toml")),
            Err(PacGradError::Config(_))
        ));
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut config = AnalysisConfig::new(TrendConfig::new(10));
        config.seed = Some(11);
        let a: u64 = config.rng().random();
        let b: u64 = config.rng().random();
        assert_eq!(a, b);
    }
}
