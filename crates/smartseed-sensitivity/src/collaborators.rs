//! Contracts of the external systems the engine drives.
//!
//! The engine owns none of these concerns: it asks the static analysis for root variables
//! and paths, the test factory for random statements, the synthesizer for difficult objects,
//! the sandbox for isolated loading, and the fitness framework for executing tests.

use rand::RngCore;

use smartseed_types::{
    Branch, BranchCoverageGoal, ComputationPath, GraphToCodeMap, Instruction, LoaderBinding,
    RootVariable, TestCase, TestChromosome,
};

use crate::error::SensitivityResult;
use crate::harness::ObservationBuffer;

/// Static interprocedural dependency analysis.
pub trait DependencyAnalysis: Send {
    /// Branches inside the method with the given signature.
    fn branches_in_method(&self, method: &str) -> Vec<Branch>;

    /// Root variables hypothesized to influence `branch`.
    fn root_variables(&self, branch: &Branch) -> Vec<RootVariable>;

    /// Computation paths from `root` to the observation points of `branch`.
    fn computation_paths(&self, root: &RootVariable, branch: &Branch) -> Vec<ComputationPath>;
}

/// Random test construction.
pub trait TestFactory: Send {
    /// Insert a random call (plus whatever it needs) at `position`.
    ///
    /// Returns the position of the inserted call, `None` on failure.
    fn insert_random_statement(
        &mut self,
        test: &mut TestCase,
        position: usize,
        rng: &mut dyn RngCore,
    ) -> Option<usize>;

    /// Replace the null statement at `position` with a concretely typed value.
    ///
    /// Returns `false` when no substitute could be built.
    fn change_null_statement(
        &mut self,
        test: &mut TestCase,
        position: usize,
        rng: &mut dyn RngCore,
    ) -> bool;
}

/// Builds the statements needed to reach a branch's hard-to-construct objects, and records
/// which test variables realize which dependency-graph nodes.
pub trait ConstructionPathSynthesizer: Send {
    fn construct_difficult_object_statement(
        &mut self,
        test: &mut TestCase,
        branch: &Branch,
        allow_null: bool,
        rng: &mut dyn RngCore,
    ) -> SensitivityResult<()>;

    /// Graph-to-code map of the last construction.
    fn graph_to_code_map(&self) -> &GraphToCodeMap;
}

/// Isolated, type-scoped class loading.
pub trait ExecutionSandbox: Send {
    /// Mark a class as an analysis target so it gets instrumented.
    fn register_target_class(&mut self, class_name: &str);

    /// Create a fresh loading context scoped to exactly `observations`.
    fn create_loader(&mut self, observations: &[Instruction]) -> LoaderBinding;

    /// Load a class into `loader`.
    fn load_class(&mut self, loader: &mut LoaderBinding, class_name: &str) -> SensitivityResult<()>;
}

/// Branch fitness functions and test execution.
pub trait FitnessFramework: Send {
    /// Factory for the branch-coverage goal of `branch`.
    fn branch_goal(&self, branch: &Branch) -> BranchCoverageGoal;

    /// Execute the chromosome's test under its bound loader and compute fitness for `goal`.
    ///
    /// Probes fired during execution append to `probes`.
    fn evaluate(
        &mut self,
        goal: &BranchCoverageGoal,
        chromosome: &TestChromosome,
        probes: &mut ObservationBuffer,
    ) -> f64;
}
