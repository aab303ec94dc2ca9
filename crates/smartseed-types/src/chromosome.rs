//! Test chromosomes: a test case plus the fitness bookkeeping of the outer search.

use serde::{Deserialize, Serialize};

use crate::analysis::{Branch, BranchId, InstructionId};
use crate::statement::TestCase;

/// Identifier of an isolated loading context.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoaderId(pub String);

impl LoaderId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for LoaderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LoaderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loader:{}", self.0)
    }
}

/// An isolated loading context a test case is bound to for execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoaderBinding {
    pub id: LoaderId,
    /// Observation sites the context instruments.
    pub scope: Vec<InstructionId>,
    /// Classes successfully loaded into the context.
    pub loaded_classes: Vec<String>,
}

impl LoaderBinding {
    pub fn new(scope: Vec<InstructionId>) -> Self {
        Self {
            id: LoaderId::new(),
            scope,
            loaded_classes: Vec::new(),
        }
    }

    pub fn is_loaded(&self, class_name: &str) -> bool {
        self.loaded_classes.iter().any(|c| c == class_name)
    }
}

/// Branch-coverage goal: reach `branch` and take the `expected` outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchCoverageGoal {
    pub branch: Branch,
    pub expected: bool,
}

impl BranchCoverageGoal {
    pub fn new(branch: Branch, expected: bool) -> Self {
        Self { branch, expected }
    }

    pub fn branch_id(&self) -> BranchId {
        self.branch.id
    }
}

/// A goal attached to a chromosome with its cached fitness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitnessEntry {
    pub goal: BranchCoverageGoal,
    pub value: Option<f64>,
}

/// A test case wrapped for the search.
///
/// Cloning yields a fully independent copy: mutating the clone's test case never affects the
/// original.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestChromosome {
    test: TestCase,
    fitness: Vec<FitnessEntry>,
    loader: Option<LoaderBinding>,
    changed: bool,
}

impl TestChromosome {
    pub fn new(test: TestCase) -> Self {
        Self {
            test,
            fitness: Vec::new(),
            loader: None,
            changed: true,
        }
    }

    pub fn test_case(&self) -> &TestCase {
        &self.test
    }

    /// Mutable access marks the chromosome as changed.
    pub fn test_case_mut(&mut self) -> &mut TestCase {
        self.changed = true;
        &mut self.test
    }

    pub fn set_test_case(&mut self, test: TestCase) {
        self.test = test;
        self.changed = true;
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Attach a goal; attaching the same goal twice keeps one entry.
    pub fn add_fitness(&mut self, goal: BranchCoverageGoal) {
        if !self.fitness.iter().any(|e| e.goal == goal) {
            self.fitness.push(FitnessEntry { goal, value: None });
        }
    }

    pub fn fitness_entries(&self) -> &[FitnessEntry] {
        &self.fitness
    }

    /// The attached goal targeting `branch`, if any.
    pub fn find_fitness(&self, branch: BranchId) -> Option<&BranchCoverageGoal> {
        self.fitness
            .iter()
            .map(|e| &e.goal)
            .find(|g| g.branch_id() == branch)
    }

    pub fn fitness_value(&self, branch: BranchId) -> Option<f64> {
        self.fitness
            .iter()
            .find(|e| e.goal.branch_id() == branch)
            .and_then(|e| e.value)
    }

    pub fn set_fitness_value(&mut self, branch: BranchId, value: f64) {
        if let Some(entry) = self.fitness.iter_mut().find(|e| e.goal.branch_id() == branch) {
            entry.value = Some(value);
        }
        self.changed = false;
    }

    /// Drop cached fitness values so the next evaluation re-executes the test.
    pub fn clear_cached_results(&mut self) {
        for entry in &mut self.fitness {
            entry.value = None;
        }
        self.changed = true;
    }

    pub fn bind_loader(&mut self, loader: LoaderBinding) {
        self.loader = Some(loader);
    }

    pub fn loader(&self) -> Option<&LoaderBinding> {
        self.loader.as_ref()
    }
}
