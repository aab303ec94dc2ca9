//! Property tests: value similarity is tolerant for numbers and symmetric for strings.

use proptest::prelude::*;
use smartseed_sensitivity::{edit_distance, similarity_ratio, ValueSimilarity};
use smartseed_types::Value;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A non-null scalar value.
fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int),
        any::<i64>().prop_map(Value::Long),
        (-1.0e6f64..1.0e6).prop_map(Value::Double),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::Str),
    ]
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Integers within the default tolerance of 10 are always similar.
    #[test]
    fn close_integers_are_similar(head in -1_000_000i32..1_000_000, delta in -10i32..=10) {
        let sim = ValueSimilarity::default();
        prop_assert!(sim.similar(&Value::Int(head), &Value::Int(head + delta)));
        prop_assert!(sim.similar(&Value::Int(head), &Value::Long(i64::from(head + delta))));
    }

    /// Integers further apart than the tolerance never are, whatever their digits look like.
    #[test]
    fn distant_integers_are_not_similar(head in -1_000_000i64..1_000_000, delta in 11i64..100_000) {
        let sim = ValueSimilarity::default();
        prop_assert!(!sim.similar(&Value::Long(head), &Value::Long(head + delta)));
        prop_assert!(!sim.similar(&Value::Long(head + delta), &Value::Long(head)));
    }

    /// Null is never similar to anything, itself included.
    #[test]
    fn null_is_never_similar(value in arb_scalar()) {
        let sim = ValueSimilarity::default();
        prop_assert!(!sim.similar(&Value::Null, &value));
        prop_assert!(!sim.similar(&value, &Value::Null));
        prop_assert!(!sim.similar(&Value::Null, &Value::Null));
    }

    /// Every non-null value is similar to itself.
    #[test]
    fn similarity_is_reflexive(value in arb_scalar()) {
        prop_assert!(ValueSimilarity::default().similar(&value, &value));
    }

    /// Edit distance and the derived ratio do not depend on argument order.
    #[test]
    fn string_measures_are_symmetric(a in "[a-zA-Z0-9]{0,16}", b in "[a-zA-Z0-9]{0,16}") {
        prop_assert_eq!(edit_distance(&a, &b), edit_distance(&b, &a));
        prop_assert_eq!(similarity_ratio(&a, &b), similarity_ratio(&b, &a));
    }

    /// Case never contributes to the distance.
    #[test]
    fn case_is_ignored(s in "[a-zA-Z]{1,16}") {
        prop_assert_eq!(edit_distance(&s, &s.to_uppercase()), 0);
    }
}
