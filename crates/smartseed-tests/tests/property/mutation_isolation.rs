//! Property tests: a trial mutates exactly one statement of its own copy of the seed.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use smartseed_sensitivity::{MethodInputs, MutationStrategy, ValueMutator};
use smartseed_tests::*;
use smartseed_types::{GraphToCodeMap, TestCase, TestChromosome, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arb_strategy() -> impl Strategy<Value = MutationStrategy> {
    prop_oneof![
        Just(MutationStrategy::Delta),
        Just(MutationStrategy::RandomReplace),
        Just(MutationStrategy::Mixed),
    ]
}

/// A seed with two primitive arguments besides the field literal.
fn seed(offset: i32, x: i32, label: &str) -> TestCase {
    let mut tc = field_target_seed(offset, x);
    tc.add_typed_primitive("java.lang.String".into(), Value::Str(label.to_string()));
    tc
}

fn primitive_positions(test: &TestCase) -> Vec<usize> {
    test.statements()
        .iter()
        .enumerate()
        .filter(|(_, st)| st.primitive_value().is_some())
        .map(|(pos, _)| pos)
        .collect()
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Mutating a clone leaves the seed untouched and changes a single statement of the clone.
    #[test]
    fn mutation_touches_one_statement_of_the_copy(
        offset in -500i32..500,
        x in -500i32..500,
        label in "[a-z]{1,8}",
        strategy in arb_strategy(),
        rng_seed in any::<u64>(),
    ) {
        let original = TestChromosome::new(seed(offset, x, &label));
        let snapshot = original.clone();
        let mut rng = StdRng::seed_from_u64(rng_seed);
        let mutator = ValueMutator::new(strategy, 20, 2048);

        let mut copy = original.clone();
        let mut inputs = MethodInputs::default();
        for pos in primitive_positions(copy.test_case()) {
            if let Some(value) = copy.test_case().get(pos).and_then(|s| s.primitive_value()) {
                inputs.variables.insert(pos, value.clone());
            }
        }
        let mutation = inputs
            .mutate(copy.test_case_mut(), &mutator, &mut rng)
            .cloned()
            .expect("primitives are mutable");

        prop_assert_eq!(&original, &snapshot);
        prop_assert_ne!(&mutation.before, &mutation.after);

        let changed: Vec<usize> = (0..original.test_case().len())
            .filter(|&pos| original.test_case().get(pos) != copy.test_case().get(pos))
            .collect();
        prop_assert_eq!(changed, vec![mutation.position]);
        prop_assert_eq!(
            copy.test_case().get(mutation.position).and_then(|s| s.primitive_value()),
            Some(&mutation.after)
        );
        prop_assert_eq!(inputs.variables.get(&mutation.position), Some(&mutation.after));
    }

    /// Inputs built from an empty map carry nothing to mutate.
    #[test]
    fn empty_map_yields_empty_inputs(offset in any::<i32>(), x in any::<i32>()) {
        let test = field_target_seed(offset, x);
        let inputs = MethodInputs::build(&[instance_field("offset")], &test, &GraphToCodeMap::new());
        prop_assert!(inputs.is_empty());
    }
}
