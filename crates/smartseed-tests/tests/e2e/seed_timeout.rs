//! Seed construction is bounded by the configured budget.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use smartseed_sensitivity::{
    MutationStrategy, SeedBuilder, SensitivityConfig, SensitivityError, SimulatedTestFactory,
};
use smartseed_tests::*;

#[test]
fn default_budget_gives_up_after_three_seconds() {
    init_test_logging();
    let builder = SeedBuilder::from_config(&SensitivityConfig::for_target(TARGET_METHOD));
    let mut factory = SimulatedTestFactory::failing();
    let mut rng = StdRng::seed_from_u64(7);

    let start = Instant::now();
    let result = builder.build_seed(&mut factory, &mut rng);
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(SensitivityError::SeedTimeout { budget_ms: 3000 })));
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn analysis_without_seed_is_empty() {
    init_test_logging();
    let mut analyzer = Scenario::new(MutationStrategy::Delta)
        .with_factory(SimulatedTestFactory::failing())
        .with_seed_timeout_ms(200)
        .build()
        .expect("valid config");

    let start = Instant::now();
    let report = analyzer.analyze(&target_branch(), &[int_parameter(1)], &[return_site()], None);

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert!(report.is_empty());
    assert_eq!(report.branch, Some(target_branch().id));
    assert_eq!(report.sensitivity_ratio(), 0.0);
    assert!(!report.is_sensitivity_preserving(0.0));
}
