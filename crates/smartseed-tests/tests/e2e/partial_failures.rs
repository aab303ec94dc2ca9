//! Collaborator failures degrade the report without aborting the analysis.

use smartseed_sensitivity::{
    Binding, MutationStrategy, SimulatedSandbox, SimulatedSynthesizer, ValuePreservance,
};
use smartseed_tests::*;
use smartseed_types::{Branch, Opcode, Value};

fn analyze(scenario: Scenario) -> ValuePreservance {
    init_test_logging();
    let mut analyzer = scenario.build().expect("valid config");
    analyzer.analyze(&target_branch(), &[int_parameter(1)], &[return_site()], None)
}

#[test]
fn failed_construction_still_runs_every_trial() {
    let synthesizer = SimulatedSynthesizer::new()
        .bind(int_parameter(1), Binding::Parameter(1))
        .failing("no construction path");
    let report = analyze(Scenario::new(MutationStrategy::Delta).with_synthesizer(synthesizer));

    // without a map nothing is mutated, yet every trial executes the seed as built
    assert_eq!(report.len(), 10);
    for record in report.records() {
        assert!(record.inputs.mutation.is_none());
        assert_eq!(record.observations[&return_site().id()], vec![Value::Int(5)]);
    }
    assert_eq!(report.sensitivity_ratio(), 0.0);
}

#[test]
fn unloadable_site_class_leaves_sequences_empty() {
    let sandbox = SimulatedSandbox::new().with_unloadable(TARGET_CLASS);
    let report = analyze(Scenario::new(MutationStrategy::Delta).with_sandbox(sandbox));

    assert_eq!(report.len(), 10);
    for record in report.records() {
        assert!(record.observations[&return_site().id()].is_empty());
        assert!(record.inputs.mutation.is_some());
    }
    assert_eq!(report.sensitivity_ratio(), 0.0);
}

#[test]
fn missing_fitness_goal_skips_execution() {
    let elsewhere = Branch::new(99, instruction(40, Opcode::IfCmp));
    let fitness = adding_program().routing_goals_to(elsewhere);
    let report = analyze(Scenario::new(MutationStrategy::Delta).with_fitness(fitness));

    assert_eq!(report.len(), 10);
    assert!(report
        .records()
        .iter()
        .all(|r| r.observations[&return_site().id()].is_empty()));
    assert!(!report.is_value_preserving(0.1));
}

#[test]
fn unmapped_root_is_reported_but_not_mutated() {
    init_test_logging();
    let mut analyzer = Scenario::new(MutationStrategy::Delta)
        .build()
        .expect("valid config");
    // targetM takes a single argument and the synthesizer only binds parameter 1
    let report = analyzer.analyze(&target_branch(), &[int_parameter(3)], &[return_site()], None);

    assert_eq!(report.len(), 10);
    assert!(report.records().iter().all(|r| r.inputs.mutation.is_none()));
    // the head is still resolved through the target argument for reporting
    assert_eq!(report.resolved_heads.len(), 1);
    assert_eq!(report.resolved_heads[0].head_positions, vec![1]);
}
