//! Extending historical runs with scenario runs
//!
//! A historical run ends in 2014. To analyse trends up to the present it is
//! continued with a scenario run from the same model. The preferred
//! continuation is the scenario branched from that exact historical
//! realisation; when none exists, a scenario from the same model is drawn at
//! random.
//!
//! The random source is passed in explicitly, so seeding it (for example with
//! `rand_chacha::ChaCha8Rng::seed_from_u64`) makes the selection reproducible.

use crate::coverage::CoverageSpan;
use crate::errors::{PacGradError, PacGradResult};
use crate::field::{GriddedField, ATTR_VARIANT_LABEL};
use crate::loader::DatasetLoader;
use crate::registry::{RunIdentity, ScenarioRegistry};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How a scenario continuation was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionKind {
    /// The scenario's parent is the historical run itself
    Exact,
    /// Drawn at random among scenarios of the same model
    Random,
}

/// A scenario candidate chosen for a historical run
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a, R> {
    /// Registry key (flattened key for random selections)
    pub key: String,
    pub kind: SelectionKind,
    pub reference: &'a R,
}

/// Record of which scenario extended a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub key: String,
    pub kind: SelectionKind,
    /// Variant label of the chosen scenario run (not its parent)
    pub scenario_variant_label: Option<String>,
}

/// Choose the scenario candidate that continues `identity`
///
/// An exact lineage match always wins and takes the first candidate under
/// that key. Otherwise the registry is flattened and one candidate whose
/// leading source token equals `identity.source_id` is drawn uniformly.
pub fn select_candidate<'a, Ref, R>(
    identity: &RunIdentity,
    registry: &'a ScenarioRegistry<Ref>,
    rng: &mut R,
) -> PacGradResult<Candidate<'a, Ref>>
where
    R: Rng,
{
    let key = identity.as_lineage_key();
    if let Some(reference) = registry.get(&key).and_then(|candidates| candidates.first()) {
        return Ok(Candidate {
            key: key.to_string(),
            kind: SelectionKind::Exact,
            reference,
        });
    }

    let flat = registry.flatten();
    let matching: Vec<usize> = flat
        .iter()
        .enumerate()
        .filter(|(_, candidate)| candidate.source_token() == identity.source_id)
        .map(|(i, _)| i)
        .collect();
    if matching.is_empty() {
        return Err(PacGradError::Matching {
            source_id: identity.source_id.clone(),
            variant_label: identity.variant_label.clone(),
        });
    }

    let chosen = &flat[matching[rng.random_range(0..matching.len())]];
    Ok(Candidate {
        key: chosen.key.clone(),
        kind: SelectionKind::Random,
        reference: chosen.reference,
    })
}

/// A historical run continued by a scenario run
///
/// The time axis is sorted and strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedRun {
    field: GriddedField,
    selection: Selection,
}

impl ExtendedRun {
    pub fn field(&self) -> &GriddedField {
        &self.field
    }

    pub fn into_field(self) -> GriddedField {
        self.field
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Check the merged run spans `span`
    pub fn check_coverage(&self, span: &CoverageSpan) -> PacGradResult<()> {
        span.check(self.field.time())
    }
}

/// Resolves and attaches scenario continuations to historical runs
#[derive(Debug, Clone)]
pub struct ContinuityResolver<L> {
    loader: L,
}

impl<L: DatasetLoader> ContinuityResolver<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Extend a historical run with its scenario continuation
    ///
    /// The historical run must carry `source_id` and `variant_label`
    /// attributes. The merged run keeps the historical run's attributes.
    /// Coverage of the merged run is not checked here; see
    /// [`ExtendedRun::check_coverage`].
    pub fn extend<R>(
        &self,
        historical: &GriddedField,
        registry: &ScenarioRegistry<L::Ref>,
        rng: &mut R,
    ) -> PacGradResult<ExtendedRun>
    where
        R: Rng,
    {
        let identity = historical.run_identity()?;
        let candidate = select_candidate(&identity, registry, rng)?;
        match candidate.kind {
            SelectionKind::Exact => {
                debug!("Extending {} with {}", identity, candidate.reference)
            }
            SelectionKind::Random => warn!(
                "No scenario branched from {}; randomly selected {} ({})",
                identity, candidate.key, candidate.reference
            ),
        }

        let scenario = self.loader.load(candidate.reference)?;
        let field = historical.concat_time(&scenario)?.sort_by_time();
        field.ensure_strictly_increasing()?;

        info!("Extended {} to {} time steps", identity, field.len());
        Ok(ExtendedRun {
            field,
            selection: Selection {
                key: candidate.key,
                kind: candidate.kind,
                scenario_variant_label: scenario.attribute(ATTR_VARIANT_LABEL).map(String::from),
            },
        })
    }
}
