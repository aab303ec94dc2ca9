//! # smartseed-sensitivity
//!
//! Dynamic sensitivity and value-preservation analysis for search-based test generation.
//!
//! Given a target branch, the engine builds a seed test calling the target operation,
//! resolves the branch's root variables to concrete statements, mutates one input per trial,
//! executes the test in an isolated context, and captures the values reaching the observation
//! sites. The trials aggregate into a [`ValuePreservance`] report:
//!
//! - **Sensitivity**: does mutating an input change the observed value?
//! - **Value preservation**: does the observed value stay close to the input?
//!
//! ## Pipeline
//!
//! ```text
//! SeedBuilder ─► DependencyResolver ─► MethodInputs ─► ObservationHarness ─► ValuePreservance
//!   (seed.rs)       (resolver.rs)       (inputs.rs)        (harness.rs)       (preservance.rs)
//! ```
//!
//! External systems (static analysis, test factory, synthesizer, sandbox, fitness) are traits
//! in [`collaborators`]; [`simulated`] provides in-process implementations.
//!
//! ## Failure policy
//!
//! No error crosses the `analyze*` operations. Seed timeouts yield an empty report, failed
//! constructions and resolutions are skipped, unloadable sites keep empty observations.

#![deny(unsafe_code)]

pub mod analyzer;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod harness;
pub mod inputs;
pub mod mutation;
pub mod preservance;
pub mod resolver;
pub mod seed;
pub mod similarity;
pub mod simulated;

// ── Re-exports ──────────────────────────────────────────────────────

pub use analyzer::{
    parse_computation_paths, prioritize_field_paths, Collaborators, SensitivityAnalyzer,
};
pub use collaborators::{
    ConstructionPathSynthesizer, DependencyAnalysis, ExecutionSandbox, FitnessFramework,
    TestFactory,
};
pub use config::{MutationStrategy, SensitivityConfig};
pub use error::{SensitivityError, SensitivityResult};
pub use harness::{ObservationBuffer, ObservationHarness, ObservationMap};
pub use inputs::{HeadCollector, MethodInputs, Mutation};
pub use mutation::ValueMutator;
pub use preservance::{AnalysisId, ObservationRecord, ResolvedHead, ValuePreservance};
pub use resolver::{constant_value, DependencyResolver, ResolvedInput};
pub use seed::SeedBuilder;
pub use similarity::{edit_distance, similarity_ratio, ValueSimilarity};
pub use simulated::{
    Binding, ProgramFitness, ProgramInput, ProgramRun, SimulatedSandbox, SimulatedSynthesizer,
    SimulatedTestFactory, StaticDependencyAnalysis,
};
