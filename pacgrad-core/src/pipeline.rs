//! End-to-end gradient trend analysis for an ensemble of model runs
//!
//! For each historical run: stitch its fragments, extend it with a scenario
//! run, optionally remove the annual cycle, reduce it to the zonal SST
//! gradient and compute the trend matrix.

use crate::config::AnalysisConfig;
use crate::continuity::{ContinuityResolver, Selection};
use crate::coverage::CoverageSpan;
use crate::errors::PacGradResult;
use crate::field::GriddedField;
use crate::loader::DatasetLoader;
use crate::region::gradient;
use crate::registry::{RunIdentity, ScenarioRegistry};
use crate::stitch::stitch;
use crate::timeseries::TimeSeries;
use crate::trend::{compute_trends, TrendMatrix};
use log::{info, warn};
use rand::Rng;

/// Gradient and trends for one model realisation
#[derive(Debug, Clone)]
pub struct ModelTrends {
    pub identity: RunIdentity,
    pub model_name: String,
    pub selection: Selection,
    pub gradient: TimeSeries,
    pub trends: TrendMatrix,
}

pub struct GradientPipeline<L: DatasetLoader> {
    config: AnalysisConfig,
    resolver: ContinuityResolver<L>,
}

impl<L: DatasetLoader> GradientPipeline<L> {
    pub fn new(loader: L, config: AnalysisConfig) -> PacGradResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            resolver: ContinuityResolver::new(loader),
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn loader(&self) -> &L {
        self.resolver.loader()
    }

    /// Period an extended run must cover: start of the historical span to end of the scenario span
    pub fn extended_span(&self) -> CoverageSpan {
        CoverageSpan::new(self.config.historical_span.start, self.config.scenario_span.end)
    }

    /// Register the scenario runs that cover the configured scenario span
    pub fn build_registry<I>(&self, scenarios: I) -> PacGradResult<ScenarioRegistry<L::Ref>>
    where
        I: IntoIterator<Item = L::Ref>,
    {
        let registry = ScenarioRegistry::from_candidates(
            self.loader(),
            scenarios,
            &self.config.scenario_span,
        )?;
        info!("Scenario registry holds {} lineages", registry.len());
        Ok(registry)
    }

    /// Assemble one historical run from its fragments
    pub fn historical_run(&self, fragments: &[L::Ref]) -> PacGradResult<GriddedField> {
        stitch(self.loader(), fragments, &self.config.historical_span)
    }

    /// Extend an assembled historical run and compute its gradient trends
    pub fn analyse_run<R: Rng>(
        &self,
        historical: &GriddedField,
        registry: &ScenarioRegistry<L::Ref>,
        rng: &mut R,
    ) -> PacGradResult<ModelTrends> {
        let identity = historical.run_identity()?;
        let extended = self.resolver.extend(historical, registry, rng)?;
        extended.check_coverage(&self.extended_span())?;

        let selection = extended.selection().clone();
        let field = if self.config.remove_climatology {
            extended.field().remove_monthly_climatology()
        } else {
            extended.into_field()
        };

        let gradient = gradient(&field)?;
        let trends = compute_trends(&gradient, &self.config.trend)?;
        info!(
            "{}: {} of {} trend windows estimated",
            identity,
            trends.count_computed(),
            trends.len()
        );

        Ok(ModelTrends {
            model_name: field.model_name(),
            identity,
            selection,
            gradient,
            trends,
        })
    }

    /// Stitch, extend and analyse one run given its fragments
    pub fn analyse_fragments<R: Rng>(
        &self,
        fragments: &[L::Ref],
        registry: &ScenarioRegistry<L::Ref>,
        rng: &mut R,
    ) -> PacGradResult<ModelTrends> {
        let historical = self.historical_run(fragments)?;
        self.analyse_run(&historical, registry, rng)
    }

    /// Analyse every run, keeping per-run failures
    ///
    /// A run that cannot be stitched, matched or covered does not stop the
    /// others; the caller decides whether to drop it from the ensemble.
    pub fn analyse_ensemble<R: Rng>(
        &self,
        runs: &[Vec<L::Ref>],
        registry: &ScenarioRegistry<L::Ref>,
        rng: &mut R,
    ) -> Vec<PacGradResult<ModelTrends>> {
        runs.iter()
            .enumerate()
            .map(|(i, fragments)| {
                let result = self.analyse_fragments(fragments, registry, rng);
                if let Err(e) = &result {
                    warn!("Run {} of {} excluded: {}", i + 1, runs.len(), e);
                }
                result
            })
            .collect()
    }
}
