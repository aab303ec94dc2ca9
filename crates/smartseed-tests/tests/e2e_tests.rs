//! End-to-end scenarios driving the analyzer through simulated collaborators.

#[path = "e2e/parameter_sensitivity.rs"]
mod parameter_sensitivity;

#[path = "e2e/field_priority.rs"]
mod field_priority;

#[path = "e2e/partial_failures.rs"]
mod partial_failures;

#[path = "e2e/seed_reuse.rs"]
mod seed_reuse;

#[path = "e2e/seed_timeout.rs"]
mod seed_timeout;
