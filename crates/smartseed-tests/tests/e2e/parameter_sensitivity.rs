//! A single integer parameter observed at the return of the target operation.

use smartseed_sensitivity::{MutationStrategy, ProgramFitness, ProgramRun, ValuePreservance};
use smartseed_tests::*;
use smartseed_types::Value;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run(strategy: MutationStrategy, fitness: ProgramFitness) -> ValuePreservance {
    init_test_logging();
    let mut analyzer = Scenario::new(strategy)
        .with_fitness(fitness)
        .build()
        .expect("valid config");
    analyzer.analyze(&target_branch(), &[int_parameter(1)], &[return_site()], None)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn random_replace_records_one_sequence_per_trial() {
    let report = run(MutationStrategy::RandomReplace, adding_program());

    assert_eq!(report.len(), 10);
    for record in report.records() {
        assert_eq!(record.observations.len(), 1);
        let captured = &record.observations[&return_site().id()];
        assert!(captured.len() <= 1);
        let mutation = record.inputs.mutation.as_ref().expect("parameter is mutable");
        assert_eq!(mutation.position, 1);
        assert_ne!(mutation.before, mutation.after);
    }
}

#[test]
fn identity_is_value_and_sensitivity_preserving() {
    let report = run(MutationStrategy::Delta, adding_program());

    // no field assignment in the seed, so the program returns x itself
    assert_eq!(report.value_preservation_ratio(), 1.0);
    assert!(report.is_value_preserving(0.9));
    assert!(report.is_sensitivity_preserving(0.5));
}

#[test]
fn constant_output_is_not_sensitive() {
    let site = return_site();
    let constant = ProgramFitness::new(TARGET_METHOD, move |_| {
        ProgramRun::new(0.0).probe(&site, Value::Int(-90_000))
    });
    let report = run(MutationStrategy::Delta, constant);

    assert_eq!(report.len(), 10);
    assert_eq!(report.sensitivity_ratio(), 0.0);
    assert_eq!(report.value_preservation_ratio(), 0.0);
}

#[test]
fn partial_executions_keep_short_sequences() {
    let site = return_site();
    let crashing_on_negative = ProgramFitness::new(TARGET_METHOD, move |input| {
        match input.argument(1) {
            Some(Value::Int(x)) if *x >= 0 => ProgramRun::new(0.0).probe(&site, Value::Int(*x)),
            _ => ProgramRun::new(1.0),
        }
    });
    let report = run(MutationStrategy::RandomReplace, crashing_on_negative);

    assert_eq!(report.len(), 10);
    for record in report.records() {
        let captured = &record.observations[&return_site().id()];
        let after = &record.inputs.mutation.as_ref().expect("mutated").after;
        match after {
            Value::Int(x) if *x >= 0 => assert_eq!(captured, &vec![Value::Int(*x)]),
            _ => assert!(captured.is_empty()),
        }
    }
}

#[test]
fn report_exports_as_json() {
    let report = run(MutationStrategy::Mixed, adding_program());
    let json = report.to_json().expect("serializable");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(parsed["records"].as_array().map(Vec::len), Some(10));
    assert!(parsed["sensitivity_ratio"].is_number());
    assert!(parsed["value_preservation_ratio"].is_number());
}
