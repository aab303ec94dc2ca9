//! A caller-supplied seed is constructed and mapped on its own layout.

use smartseed_sensitivity::{MutationStrategy, SimulatedTestFactory, ValuePreservance};
use smartseed_tests::*;
use smartseed_types::{TestChromosome, Value};

fn mutated_positions(report: &ValuePreservance) -> Vec<Option<usize>> {
    report
        .records()
        .iter()
        .map(|r| r.inputs.mutation.as_ref().map(|m| m.position))
        .collect()
}

#[test]
fn reused_seed_is_mapped_after_a_different_layout() {
    init_test_logging();
    let mut analyzer = Scenario::new(MutationStrategy::Delta)
        .with_factory(SimulatedTestFactory::single(int_target_seed(5)))
        .build()
        .expect("valid config");

    // built seed: the argument sits at position 1
    let first = analyzer.analyze(&target_branch(), &[int_parameter(1)], &[return_site()], None);
    assert_eq!(mutated_positions(&first), vec![Some(1); 10]);

    // supplied seed: the offset literal sits at 1, the argument at 3
    let seed = TestChromosome::new(field_target_seed(2, 5));
    let second =
        analyzer.analyze(&target_branch(), &[int_parameter(1)], &[return_site()], Some(&seed));

    assert_eq!(mutated_positions(&second), vec![Some(3); 10]);
    for record in second.records() {
        let mutation = record.inputs.mutation.as_ref().expect("argument is mapped");
        assert_eq!(mutation.before, Value::Int(5));
        let Value::Int(x) = &mutation.after else {
            panic!("argument stays an int");
        };
        assert_eq!(record.observations[&return_site().id()], vec![Value::Int(*x + 2)]);
    }
}

#[test]
fn reused_seed_is_left_untouched() {
    init_test_logging();
    let mut analyzer = Scenario::new(MutationStrategy::RandomReplace)
        .build()
        .expect("valid config");
    let seed = TestChromosome::new(field_target_seed(2, 5));
    let before = seed.clone();

    let report =
        analyzer.analyze(&target_branch(), &[int_parameter(1)], &[return_site()], Some(&seed));

    assert_eq!(report.len(), 10);
    assert_eq!(seed, before);
}
