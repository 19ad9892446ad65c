//! Run identities and the scenario registry
//!
//! A scenario run records which historical run it was branched from through
//! its `parent_variant_label`. The [`ScenarioRegistry`] buckets scenario
//! candidates by that lineage so the continuity resolver can look up the
//! continuation of a historical run.

use crate::coverage::CoverageSpan;
use crate::errors::PacGradResult;
use crate::loader::DatasetLoader;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One model realisation: `(source_id, variant_label)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunIdentity {
    pub source_id: String,
    pub variant_label: String,
}

impl RunIdentity {
    pub fn new(source_id: &str, variant_label: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            variant_label: variant_label.to_string(),
        }
    }

    /// The lineage key a scenario continuing this run would carry
    pub fn as_lineage_key(&self) -> LineageKey {
        LineageKey::new(&self.source_id, &self.variant_label)
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.source_id, self.variant_label)
    }
}

/// The historical run a scenario run continues: `(source_id, parent_variant_label)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineageKey {
    pub source_id: String,
    pub parent_variant_label: String,
}

impl LineageKey {
    pub fn new(source_id: &str, parent_variant_label: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            parent_variant_label: parent_variant_label.to_string(),
        }
    }
}

impl fmt::Display for LineageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.source_id, self.parent_variant_label)
    }
}

/// A single scenario candidate with its flattened key
///
/// Lineages holding more than one candidate are split into one entry per
/// candidate, keyed `"{lineage}_{index}"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatCandidate<'a, R> {
    pub key: String,
    pub lineage: &'a LineageKey,
    pub reference: &'a R,
}

impl<R> FlatCandidate<'_, R> {
    /// Leading source identifier token of the flattened key
    pub fn source_token(&self) -> &str {
        self.key.split('_').next().unwrap_or_default()
    }
}

/// Mapping from lineage key to candidate scenario runs
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRegistry<R> {
    entries: BTreeMap<LineageKey, Vec<R>>,
}

impl<R> Default for ScenarioRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ScenarioRegistry<R> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add a candidate under a lineage key, after any existing candidates
    pub fn insert(&mut self, key: LineageKey, reference: R) {
        self.entries.entry(key).or_default().push(reference);
    }

    pub fn get(&self, key: &LineageKey) -> Option<&[R]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &LineageKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of lineage keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LineageKey, &[R])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Split every lineage into single-candidate entries
    ///
    /// The result is ordered by lineage key, then by insertion order within
    /// a lineage.
    pub fn flatten(&self) -> Vec<FlatCandidate<'_, R>> {
        let mut flat = Vec::new();
        for (lineage, candidates) in &self.entries {
            if candidates.len() > 1 {
                flat.extend(
                    candidates
                        .iter()
                        .enumerate()
                        .map(|(i, reference)| FlatCandidate {
                            key: format!("{}_{}", lineage, i),
                            lineage,
                            reference,
                        }),
                );
            } else {
                flat.extend(candidates.iter().map(|reference| FlatCandidate {
                    key: lineage.to_string(),
                    lineage,
                    reference,
                }));
            }
        }
        flat
    }
}

impl<R: fmt::Display> ScenarioRegistry<R> {
    /// Build a registry from scenario runs, keeping only those that cover `span`
    ///
    /// Each candidate is loaded to read its lineage attributes and time axis.
    pub fn from_candidates<L, I>(
        loader: &L,
        references: I,
        span: &CoverageSpan,
    ) -> PacGradResult<Self>
    where
        L: DatasetLoader<Ref = R>,
        I: IntoIterator<Item = R>,
    {
        let references: Vec<R> = references.into_iter().collect();
        let total = references.len();
        let mut registry = Self::new();

        for (i, reference) in references.into_iter().enumerate() {
            let field = loader.load(&reference)?;
            let key = field.lineage_key()?;
            if span.is_covered_by(field.time())? {
                debug!(
                    "Registered scenario {} under {} ({}/{})",
                    reference,
                    key,
                    i + 1,
                    total
                );
                registry.insert(key, reference);
            } else {
                debug!(
                    "Skipped scenario {} not covering {} ({}/{})",
                    reference,
                    span,
                    i + 1,
                    total
                );
            }
        }
        Ok(registry)
    }
}

impl<R> FromIterator<(LineageKey, R)> for ScenarioRegistry<R> {
    fn from_iter<T: IntoIterator<Item = (LineageKey, R)>>(iter: T) -> Self {
        let mut registry = Self::new();
        for (key, reference) in iter {
            registry.insert(key, reference);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{GriddedField, ATTR_PARENT_VARIANT_LABEL, ATTR_SOURCE_ID};
    use crate::loader::{DatasetRef, InMemoryLoader};
    use crate::time::Timestamp;
    use ndarray::{array, Array3};

    fn registry() -> ScenarioRegistry<&'static str> {
        [
            (LineageKey::new("CESM2", "r1i1p1f1"), "cesm-a"),
            (LineageKey::new("CESM2", "r1i1p1f1"), "cesm-b"),
            (LineageKey::new("ACCESS-CM2", "r1i1p1f1"), "access"),
            (LineageKey::new("CESM2", "r2i1p1f1"), "cesm-c"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn insert_and_get() {
        let reg = registry();
        assert_eq!(reg.len(), 3);
        assert_eq!(
            reg.get(&LineageKey::new("CESM2", "r1i1p1f1")),
            Some(&["cesm-a", "cesm-b"][..])
        );
        assert!(reg.get(&LineageKey::new("CESM2", "r9i1p1f1")).is_none());

        let counts: Vec<(String, usize)> =
            reg.iter().map(|(k, v)| (k.to_string(), v.len())).collect();
        assert_eq!(
            counts,
            vec![
                ("ACCESS-CM2_r1i1p1f1".to_string(), 1),
                ("CESM2_r1i1p1f1".to_string(), 2),
                ("CESM2_r2i1p1f1".to_string(), 1),
            ]
        );
    }

    #[test]
    fn flatten_splits_multi_candidate_lineages() {
        let reg = registry();
        let flat = reg.flatten();
        let keys: Vec<&str> = flat.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "ACCESS-CM2_r1i1p1f1",
                "CESM2_r1i1p1f1_0",
                "CESM2_r1i1p1f1_1",
                "CESM2_r2i1p1f1",
            ]
        );
        assert_eq!(*flat[2].reference, "cesm-b");
        assert_eq!(flat[2].lineage, &LineageKey::new("CESM2", "r1i1p1f1"));
        assert_eq!(flat[2].source_token(), "CESM2");
        assert_eq!(flat[0].source_token(), "ACCESS-CM2");
    }

    #[test]
    fn flatten_is_pure() {
        let reg = registry();
        assert_eq!(reg.flatten(), reg.flatten());
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn identity_to_lineage() {
        let id = RunIdentity::new("CESM2", "r1i1p1f1");
        assert!(registry().contains_key(&id.as_lineage_key()));
        assert_eq!(id.to_string(), "CESM2_r1i1p1f1");
    }

    fn scenario(parent: &str, end_year: i32) -> GriddedField {
        let time: Vec<Timestamp> = (2015..=end_year)
            .flat_map(|y| (1..=12).map(move |m| Timestamp::no_leap(y, m, 16).unwrap()))
            .collect();
        let n = time.len();
        GriddedField::new("ts", time, array![0.0], array![180.0], Array3::zeros((n, 1, 1)))
            .unwrap()
            .with_attribute(ATTR_SOURCE_ID, "CESM2")
            .with_attribute(ATTR_PARENT_VARIANT_LABEL, parent)
    }

    #[test]
    fn from_candidates_filters_coverage() {
        let loader = InMemoryLoader::new()
            .with_dataset("full.nc", scenario("r1i1p1f1", 2100))
            .with_dataset("short.nc", scenario("r2i1p1f1", 2020));
        let reg = ScenarioRegistry::from_candidates(
            &loader,
            vec![DatasetRef::path("full.nc"), DatasetRef::path("short.nc")],
            &CoverageSpan::SCENARIO,
        )
        .unwrap();
        assert_eq!(reg.len(), 1);
        assert!(reg.contains_key(&LineageKey::new("CESM2", "r1i1p1f1")));
    }

    #[test]
    fn from_candidates_requires_lineage() {
        let loader = InMemoryLoader::new();
        let orphan = GriddedField::new(
            "ts",
            vec![Timestamp::no_leap(2015, 1, 16).unwrap()],
            array![0.0],
            array![180.0],
            Array3::zeros((1, 1, 1)),
        )
        .unwrap();
        let res = ScenarioRegistry::from_candidates(
            &loader,
            vec![DatasetRef::in_memory(orphan)],
            &CoverageSpan::SCENARIO,
        );
        assert!(res.is_err());
    }
}
