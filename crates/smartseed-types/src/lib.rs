//! # smartseed-types
//!
//! Shared model for dynamic sensitivity analysis in search-based test generation.
//!
//! - **Values**: boxed primitive values and type names of the program under test
//! - **Statements**: test cases as ordered, position-addressed statement sequences
//! - **Analysis**: root variables, computation paths and branches from the static
//!   dependency analysis, plus the graph-to-code map into a concrete test case
//! - **Chromosomes**: a test case with attached branch goals and cached fitness
//!
//! ## Invariants
//!
//! - Statement references only point to earlier positions of the same test case.
//! - Analysis artifacts are immutable once produced.
//! - Cloning a chromosome never shares mutable state with the original.

#![deny(unsafe_code)]

pub mod analysis;
pub mod chromosome;
pub mod statement;
pub mod value;

// ── Re-exports ──────────────────────────────────────────────────────

pub use analysis::{
    Branch, BranchId, ComputationPath, GraphToCodeMap, Instruction, InstructionId, Opcode,
    Operand, RootVariable, VariableKey, VariableKind,
};
pub use chromosome::{BranchCoverageGoal, FitnessEntry, LoaderBinding, LoaderId, TestChromosome};
pub use statement::{
    Assignment, AssignmentTarget, Call, Statement, StatementKind, TestCase, VariableReference,
};
pub use value::{TypeName, Value};
