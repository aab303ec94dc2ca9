//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SensitivityError, SensitivityResult};

/// How a primitive input is changed by one mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStrategy {
    /// Add a small non-zero delta (numbers), flip (booleans), edit one character (strings).
    Delta,
    /// Replace with a fresh random value.
    RandomReplace,
    /// Random replacement one time in three, delta otherwise.
    Mixed,
}

/// Configuration for the sensitivity analyzer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Signature of the target operation (name + descriptor), e.g. `targetM(I)V`.
    pub target_method: String,
    /// Trials per analysis.
    pub dynamic_sensitivity_threshold: usize,
    /// Minimum edit-distance similarity for two values to count as similar.
    pub value_similarity_threshold: f64,
    /// Largest absolute numeric difference still counted as similar.
    pub numeric_tolerance: f64,
    /// Wall-clock budget for building a seed test, in milliseconds.
    pub seed_timeout_ms: u64,
    /// Keep null statements in seeds instead of replacing them.
    pub allow_null_inputs: bool,
    pub mutation_strategy: MutationStrategy,
    /// Largest magnitude of a delta mutation.
    pub max_delta: i64,
    /// Bound for random integer replacement (`-max_int..=max_int`).
    pub max_int: i64,
    /// Seed for the engine's random source; entropy when unset.
    pub random_seed: Option<u64>,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            target_method: String::new(),
            dynamic_sensitivity_threshold: 10,
            value_similarity_threshold: 0.8,
            numeric_tolerance: 10.0,
            seed_timeout_ms: 3000,
            allow_null_inputs: false,
            mutation_strategy: MutationStrategy::Mixed,
            max_delta: 20,
            max_int: 2048,
            random_seed: None,
        }
    }
}

impl SensitivityConfig {
    pub fn for_target(target_method: impl Into<String>) -> Self {
        Self {
            target_method: target_method.into(),
            ..Self::default()
        }
    }

    pub fn seed_timeout(&self) -> Duration {
        Duration::from_millis(self.seed_timeout_ms)
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> SensitivityResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SensitivityResult<()> {
        if self.dynamic_sensitivity_threshold == 0 {
            return Err(SensitivityError::InvalidConfiguration(
                "dynamic_sensitivity_threshold must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.value_similarity_threshold) {
            return Err(SensitivityError::InvalidConfiguration(format!(
                "value_similarity_threshold {} outside 0.0..=1.0",
                self.value_similarity_threshold
            )));
        }
        if self.numeric_tolerance < 0.0 {
            return Err(SensitivityError::InvalidConfiguration(format!(
                "numeric_tolerance {} is negative",
                self.numeric_tolerance
            )));
        }
        if self.seed_timeout_ms == 0 {
            return Err(SensitivityError::InvalidConfiguration(
                "seed_timeout_ms must be positive".into(),
            ));
        }
        if self.max_delta <= 0 || self.max_int <= 0 {
            return Err(SensitivityError::InvalidConfiguration(
                "max_delta and max_int must be positive".into(),
            ));
        }
        Ok(())
    }
}
