//! Seed construction: a minimal valid test case for the outer search to probe.
//!
//! Both entry points retry inside one wall-clock budget and fail with
//! [`SensitivityError::SeedTimeout`] once it is spent.

use std::time::{Duration, Instant};

use rand::RngCore;
use smartseed_types::TestCase;
use tracing::{debug, warn};

use crate::collaborators::TestFactory;
use crate::config::SensitivityConfig;
use crate::error::{SensitivityError, SensitivityResult};

/// Builds seed test cases through a [`TestFactory`].
#[derive(Clone, Debug)]
pub struct SeedBuilder {
    budget: Duration,
    allow_null_inputs: bool,
}

impl SeedBuilder {
    pub fn new(budget: Duration, allow_null_inputs: bool) -> Self {
        Self {
            budget,
            allow_null_inputs,
        }
    }

    pub fn from_config(config: &SensitivityConfig) -> Self {
        Self::new(config.seed_timeout(), config.allow_null_inputs)
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// A non-empty test case whose construction succeeded and, unless nulls are allowed,
    /// that holds no null statement.
    pub fn build_seed(
        &self,
        factory: &mut dyn TestFactory,
        rng: &mut dyn RngCore,
    ) -> SensitivityResult<TestCase> {
        let started = Instant::now();
        self.build_until(started, factory, rng)
    }

    /// Like [`build_seed`](Self::build_seed), additionally requiring the last statement to be
    /// a call to `target_method` (name + descriptor). The budget covers all attempts.
    pub fn build_seed_calling_target(
        &self,
        factory: &mut dyn TestFactory,
        rng: &mut dyn RngCore,
        target_method: &str,
    ) -> SensitivityResult<TestCase> {
        let started = Instant::now();
        let mut attempts = 0usize;
        loop {
            let test = self.build_until(started, factory, rng)?;
            attempts += 1;
            let last = test.last_method_call().map(|c| c.signature());
            if last.as_deref() == Some(target_method) {
                debug!(attempts, statements = test.len(), "Seed calls target");
                return Ok(test);
            }
            debug!(attempts, last = ?last, target = target_method, "Seed misses target, retrying");
        }
    }

    fn build_until(
        &self,
        started: Instant,
        factory: &mut dyn TestFactory,
        rng: &mut dyn RngCore,
    ) -> SensitivityResult<TestCase> {
        loop {
            if started.elapsed() >= self.budget {
                let budget_ms = self.budget.as_millis() as u64;
                warn!(budget_ms, "Seed construction timed out");
                return Err(SensitivityError::SeedTimeout { budget_ms });
            }

            let mut test = TestCase::new();
            if factory.insert_random_statement(&mut test, 0, rng).is_none() || test.is_empty() {
                continue;
            }
            if !self.allow_null_inputs && !self.replace_nulls(&mut test, factory, rng) {
                continue;
            }
            return Ok(test);
        }
    }

    /// Replace every null statement; `false` if one could not be replaced.
    fn replace_nulls(
        &self,
        test: &mut TestCase,
        factory: &mut dyn TestFactory,
        rng: &mut dyn RngCore,
    ) -> bool {
        let nulls: Vec<usize> = test
            .statements()
            .iter()
            .enumerate()
            .filter(|(_, st)| st.is_null())
            .map(|(pos, _)| pos)
            .collect();
        nulls
            .into_iter()
            .all(|pos| factory.change_null_statement(test, pos, rng))
            && !test.statements().iter().any(|st| st.is_null())
    }
}
