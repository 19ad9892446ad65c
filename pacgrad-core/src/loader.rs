//! Access to datasets by reference
//!
//! Opening files or remote endpoints is the job of an external loader; the
//! core only needs the [`DatasetLoader`] seam. [`InMemoryLoader`] serves
//! datasets that are already loaded, either embedded in the reference itself
//! or registered under a name.

use crate::errors::{PacGradError, PacGradResult};
use crate::field::GriddedField;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolves a dataset reference to a loaded [`GriddedField`]
///
/// Implementations are expected to return fields with canonical
/// latitude/longitude coordinates and a uniform time representation.
pub trait DatasetLoader {
    /// Reference type understood by this loader
    type Ref: fmt::Display;

    fn load(&self, reference: &Self::Ref) -> PacGradResult<GriddedField>;
}

/// Reference to a dataset, either by location or already in memory
#[derive(Debug, Clone)]
pub enum DatasetRef {
    /// Location of a dataset (path or URL)
    Path(String),
    /// A dataset that has already been loaded or assembled
    InMemory(Arc<GriddedField>),
}

impl DatasetRef {
    pub fn path(location: &str) -> Self {
        DatasetRef::Path(location.to_string())
    }

    pub fn in_memory(field: GriddedField) -> Self {
        DatasetRef::InMemory(Arc::new(field))
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetRef::Path(location) => write!(f, "{}", location),
            DatasetRef::InMemory(field) => {
                let name = field.model_name();
                if name.is_empty() {
                    write!(f, "<in-memory {}>", field.variable())
                } else {
                    write!(f, "<in-memory {} {}>", field.variable(), name)
                }
            }
        }
    }
}

/// Loader for datasets held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    datasets: HashMap<String, Arc<GriddedField>>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset under a location so `DatasetRef::Path` can resolve it
    pub fn insert(&mut self, location: &str, field: GriddedField) {
        self.datasets.insert(location.to_string(), Arc::new(field));
    }

    pub fn with_dataset(mut self, location: &str, field: GriddedField) -> Self {
        self.insert(location, field);
        self
    }
}

impl DatasetLoader for InMemoryLoader {
    type Ref = DatasetRef;

    fn load(&self, reference: &DatasetRef) -> PacGradResult<GriddedField> {
        match reference {
            DatasetRef::InMemory(field) => Ok(field.as_ref().clone()),
            DatasetRef::Path(location) => self
                .datasets
                .get(location)
                .map(|field| field.as_ref().clone())
                .ok_or_else(|| PacGradError::Load {
                    reference: location.clone(),
                    reason: "no dataset registered at this location".to_string(),
                }),
        }
    }
}
