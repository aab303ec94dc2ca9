//! Error types for the sensitivity analysis engine.

use thiserror::Error;

/// Errors raised inside one analysis call.
///
/// None of these cross the top-level `analyze*` operations: they are absorbed there and
/// surface as partial or empty [`ValuePreservance`](crate::ValuePreservance) reports.
#[derive(Debug, Error)]
pub enum SensitivityError {
    /// No valid seed test was produced within the construction budget.
    #[error("seed construction timed out after {budget_ms}ms")]
    SeedTimeout { budget_ms: u64 },

    /// A root variable could not be mapped to a statement of the seed.
    #[error("resolution failure: {0}")]
    ResolutionFailure(String),

    /// The construction-path synthesizer failed to build a difficult object.
    #[error("construction failure: {0}")]
    ConstructionFailure(String),

    /// An observation site's declaring type could not be loaded.
    #[error("class load failure for {class_name}: {reason}")]
    ClassLoadFailure { class_name: String, reason: String },

    /// No fitness function for the branch is attached to the chromosome.
    #[error("missing fitness for {0}")]
    MissingFitness(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),

    /// Report or configuration (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SensitivityError {
    fn from(e: serde_json::Error) -> Self {
        SensitivityError::Serialization(e.to_string())
    }
}

/// Result type for sensitivity analysis operations.
pub type SensitivityResult<T> = Result<T, SensitivityError>;
