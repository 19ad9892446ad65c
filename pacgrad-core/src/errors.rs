use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum PacGradError {
    #[error("Run does not span the required period. Expected {expected_start} to {expected_end}, got {actual_start} to {actual_end}")]
    Coverage {
        expected_start: String,
        expected_end: String,
        actual_start: String,
        actual_end: String,
    },
    #[error("No scenario candidate found for historical run {source_id} ({variant_label})")]
    Matching {
        source_id: String,
        variant_label: String,
    },
    #[error("Dataset is missing the required attribute '{0}'")]
    MissingAttribute(String),
    #[error("Time axis is not strictly increasing at index {index} ({timestamp})")]
    NonMonotonicTime { index: usize, timestamp: String },
    #[error("Shape mismatch for {what}. Expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid {calendar} timestamp {year:04}-{month:02}-{day:02}")]
    InvalidTimestamp {
        calendar: String,
        year: i32,
        month: u32,
        day: u32,
    },
    #[error("Could not parse dataset identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("{0} requires at least one input")]
    EmptyInput(String),
    #[error("Failed to load dataset {reference}: {reason}")]
    Load { reference: String, reason: String },
    #[error("Could not read configuration: {0}")]
    Config(String),
}

/// Convenience type for `Result<T, PacGradError>`.
pub type PacGradResult<T> = Result<T, PacGradError>;
