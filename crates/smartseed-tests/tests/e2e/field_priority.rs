//! Branch-level analysis over several computation paths.

use smartseed_sensitivity::{
    prioritize_field_paths, Binding, MutationStrategy, ProgramFitness, ProgramRun,
    SimulatedSynthesizer, SimulatedTestFactory, StaticDependencyAnalysis,
};
use smartseed_tests::*;
use smartseed_types::{ComputationPath, Instruction, Opcode, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn field_read_site() -> Instruction {
    instruction(6, Opcode::GetField)
}

fn local_path() -> ComputationPath {
    ComputationPath::new(target_branch(), vec![local("tmp")], return_site())
}

fn field_path() -> ComputationPath {
    ComputationPath::new(target_branch(), vec![instance_field("offset")], field_read_site())
}

/// Reports the field read and `x + offset` at the return.
fn two_site_program() -> ProgramFitness {
    let read = field_read_site();
    let ret = return_site();
    ProgramFitness::new(TARGET_METHOD, move |input| {
        let x = match input.argument(1) {
            Some(Value::Int(x)) => *x,
            _ => return ProgramRun::new(1.0),
        };
        let offset = match input.field("offset") {
            Some(Value::Int(o)) => o,
            _ => 0,
        };
        ProgramRun::new(0.0)
            .probe(&read, Value::Int(offset))
            .probe(&ret, Value::Int(x.wrapping_add(offset)))
    })
}

fn scenario() -> Scenario {
    init_test_logging();
    let analysis = StaticDependencyAnalysis::new()
        .with_branch(TARGET_METHOD, target_branch())
        .with_path(local_path())
        .with_path(field_path());
    let synthesizer = SimulatedSynthesizer::new()
        .bind(instance_field("offset"), Binding::Field("offset".into()))
        .bind(local("tmp"), Binding::Parameter(1));
    Scenario::new(MutationStrategy::Delta)
        .with_analysis(analysis)
        .with_factory(SimulatedTestFactory::single(field_target_seed(2, 5)))
        .with_synthesizer(synthesizer)
        .with_fitness(two_site_program())
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn field_rooted_paths_move_to_the_front() {
    let ordered = prioritize_field_paths(vec![local_path(), field_path()]);
    assert_eq!(ordered, vec![field_path(), local_path()]);
}

#[test]
fn field_path_is_probed_before_local_path() {
    let mut analyzer = scenario().build().expect("valid config");
    let report = analyzer.analyze_branch(&target_branch(), None);

    assert_eq!(report.len(), 20);
    assert_eq!(report.group_count(), 2);
    let (first, second) = report.records().split_at(10);
    assert!(first.iter().all(|r| r.group == 0));
    assert!(second.iter().all(|r| r.group == 1));

    // the field is realized by the offset literal
    for record in first {
        assert!(record.observations.contains_key(&field_read_site().id()));
        assert_eq!(record.inputs.mutation.as_ref().map(|m| m.position), Some(1));
    }
    // the local is realized by the target argument
    for record in second {
        assert!(record.observations.contains_key(&return_site().id()));
        assert_eq!(record.inputs.mutation.as_ref().map(|m| m.position), Some(3));
    }
}

#[test]
fn merged_report_carries_every_root_and_site() {
    let mut analyzer = scenario().build().expect("valid config");
    let report = analyzer.analyze_branch(&target_branch(), None);

    assert_eq!(report.root_variables.len(), 2);
    assert_eq!(report.observations.len(), 2);
    assert_eq!(report.resolved_heads.len(), 2);
    // the field read and the sum both move with their mutated input
    assert_eq!(report.value_preservation_ratio(), 1.0);
}

#[test]
fn branches_without_paths_yield_empty_reports() {
    let analysis = StaticDependencyAnalysis::new().with_branch(TARGET_METHOD, target_branch());
    let mut analyzer = Scenario::new(MutationStrategy::Delta)
        .with_analysis(analysis)
        .build()
        .expect("valid config");

    let reports = analyzer.analyze_target_method();
    assert_eq!(reports.len(), 1);
    assert!(reports[&target_branch().id].is_empty());
}
