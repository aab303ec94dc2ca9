//! The mutation unit of one trial: the primitive statements and constants feeding a branch.

use std::collections::{BTreeMap, BTreeSet};

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use smartseed_types::{GraphToCodeMap, InstructionId, RootVariable, StatementKind, TestCase, Value};
use tracing::debug;

use crate::mutation::ValueMutator;
use crate::resolver::{constant_value, DependencyResolver};

/// The single value change applied in one trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub position: usize,
    pub before: Value,
    pub after: Value,
}

/// Primitive inputs by statement position, and constants by instruction identity.
///
/// `variables` always holds the value currently stored in the test case, so after
/// [`mutate`](Self::mutate) it reflects the executed input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodInputs {
    pub variables: BTreeMap<usize, Value>,
    pub constants: BTreeMap<InstructionId, Value>,
    pub mutation: Option<Mutation>,
}

impl MethodInputs {
    /// Collect inputs through direct graph-to-code map lookups.
    pub fn build(roots: &[RootVariable], test: &TestCase, map: &GraphToCodeMap) -> Self {
        let mut inputs = Self::default();
        for root in roots {
            inputs.add_root(root, test, map);
        }
        inputs
    }

    /// Roots without a map entry contribute nothing.
    fn add_root(&mut self, root: &RootVariable, test: &TestCase, map: &GraphToCodeMap) {
        if root.is_constant() {
            if let Some(value) = constant_value(&root.instruction) {
                self.constants.insert(root.instruction.id(), value);
            }
            return;
        }

        for variable in root.all_children_including_self() {
            let Some(refs) = map.get(variable) else {
                continue;
            };
            for reference in refs {
                match test.get(reference.position).map(|s| &s.kind) {
                    Some(StatementKind::Primitive(_)) => self.add_primitive(test, reference.position),
                    Some(StatementKind::Array { .. }) => {
                        for (_, value) in test.array_elements(reference.position) {
                            self.add_primitive(test, value);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn add_primitive(&mut self, test: &TestCase, position: usize) {
        if let Some(value) = test.get(position).and_then(|s| s.primitive_value()) {
            if !value.is_null() {
                self.variables.insert(position, value.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.constants.is_empty()
    }

    /// Change one primitive, chosen uniformly among the mutable ones, in `test`.
    ///
    /// Constants are never touched. Returns `None` when nothing can be mutated.
    pub fn mutate(
        &mut self,
        test: &mut TestCase,
        mutator: &ValueMutator,
        rng: &mut dyn RngCore,
    ) -> Option<&Mutation> {
        let candidates: Vec<usize> = self
            .variables
            .iter()
            .filter(|(_, v)| ValueMutator::can_mutate(v))
            .map(|(pos, _)| *pos)
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let position = candidates[rng.gen_range(0..candidates.len())];
        let before = self.variables.get(&position)?.clone();
        let after = mutator.mutate(&before, rng)?;
        test.set_primitive_value(position, after.clone())?;
        self.variables.insert(position, after.clone());
        debug!(position, before = %before, after = %after, "Mutated input");
        self.mutation = Some(Mutation {
            position,
            before,
            after,
        });
        self.mutation.as_ref()
    }

    /// Head values of the trial: primitives in position order, then constants.
    pub fn head_values(&self) -> Vec<Value> {
        self.variables
            .values()
            .chain(self.constants.values())
            .cloned()
            .collect()
    }
}

/// Expands resolved statements into the primitive statements feeding them.
#[derive(Clone, Debug)]
pub struct HeadCollector<'r> {
    resolver: &'r DependencyResolver,
}

impl<'r> HeadCollector<'r> {
    pub fn new(resolver: &'r DependencyResolver) -> Self {
        Self { resolver }
    }

    /// Primitive statements feeding the statement at `position`.
    ///
    /// Arrays contribute their assigned elements; method calls and assignments contribute the
    /// heads of every identical statement in the test.
    pub fn head_statements(
        &self,
        test: &TestCase,
        position: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<usize> {
        let mut seen = BTreeSet::new();
        let mut heads = Vec::new();
        self.collect_heads(test, position, rng, &mut seen, &mut heads);
        heads
    }

    fn collect_heads(
        &self,
        test: &TestCase,
        position: usize,
        rng: &mut dyn RngCore,
        seen: &mut BTreeSet<usize>,
        heads: &mut Vec<usize>,
    ) {
        if !seen.insert(position) {
            return;
        }
        let Some(statement) = test.get(position) else {
            return;
        };

        let feeders: Vec<usize> = match &statement.kind {
            StatementKind::Primitive(_) => {
                heads.push(position);
                return;
            }
            StatementKind::Null => return,
            StatementKind::Array { lengths } => {
                if lengths.first().copied().unwrap_or(0) == 0 {
                    return;
                }
                test.array_elements(position)
                    .into_iter()
                    .map(|(_, value)| value)
                    .collect()
            }
            kind @ (StatementKind::Constructor(_)
            | StatementKind::Method(_)
            | StatementKind::Assignment(_)) => test
                .statements()
                .iter()
                .enumerate()
                .filter(|(_, st)| &st.kind == kind)
                .map(|(pos, _)| pos)
                .collect(),
        };

        for feeder in feeders {
            if let Some(root) = self.resolver.root_value_statement(test, feeder, rng) {
                self.collect_heads(test, root, rng, seen, heads);
            }
        }
    }
}
