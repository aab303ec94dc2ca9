//! Mapping static root variables to concrete statements of a seed test.
//!
//! Resolution order: constant table, graph-to-code map (earliest definition), target-call
//! parameter, backward field scan, then any target parameter. Every statement found is
//! unwrapped to its *root value statement*, the statement actually holding a scalar.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use smartseed_types::{
    Call, GraphToCodeMap, Instruction, Opcode, Operand, RootVariable, StatementKind, TestCase,
    TypeName, Value, VariableKind, VariableReference,
};
use tracing::debug;

use crate::error::{SensitivityError, SensitivityResult};

/// Literal pushed by a constant-loading instruction.
///
/// Returns `None` for any opcode outside the constant table.
pub fn constant_value(instruction: &Instruction) -> Option<Value> {
    let value = match instruction.opcode {
        Opcode::IConstM1 => Value::Int(-1),
        Opcode::IConst0 => Value::Int(0),
        Opcode::IConst1 => Value::Int(1),
        Opcode::IConst2 => Value::Int(2),
        Opcode::IConst3 => Value::Int(3),
        Opcode::IConst4 => Value::Int(4),
        Opcode::IConst5 => Value::Int(5),
        Opcode::LConst0 => Value::Long(0),
        Opcode::LConst1 => Value::Long(1),
        Opcode::FConst0 => Value::Float(0.0),
        Opcode::FConst1 => Value::Float(1.0),
        Opcode::FConst2 => Value::Float(2.0),
        Opcode::DConst0 => Value::Double(0.0),
        Opcode::DConst1 => Value::Double(1.0),
        Opcode::BiPush | Opcode::SiPush => match &instruction.operand {
            Some(Operand::Int(i)) => Value::Int(*i),
            _ => return None,
        },
        Opcode::Ldc => match &instruction.operand {
            Some(Operand::Constant(v)) => v.clone(),
            Some(Operand::Int(i)) => Value::Int(*i),
            _ => return None,
        },
        _ => return None,
    };
    Some(value)
}

/// Outcome of resolving one root variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ResolvedInput {
    /// A compile-time constant, no statement involved.
    Constant(Value),
    /// Position of the root value statement in the test case.
    Statement(usize),
}

/// Resolves root variables against test cases calling one target operation.
#[derive(Clone, Debug)]
pub struct DependencyResolver {
    target_method: String,
}

impl DependencyResolver {
    pub fn new(target_method: impl Into<String>) -> Self {
        Self {
            target_method: target_method.into(),
        }
    }

    pub fn target_method(&self) -> &str {
        &self.target_method
    }

    pub fn resolve(
        &self,
        root: &RootVariable,
        test: &TestCase,
        map: &GraphToCodeMap,
        rng: &mut dyn RngCore,
    ) -> SensitivityResult<ResolvedInput> {
        if root.is_constant() {
            return constant_value(&root.instruction)
                .map(ResolvedInput::Constant)
                .ok_or_else(|| {
                    SensitivityError::ResolutionFailure(format!(
                        "{} is not a known constant",
                        root.instruction.id()
                    ))
                });
        }

        if let Some(reference) = map.get(root).and_then(|refs| earliest(refs, test)) {
            if let Some(pos) = self.root_value_statement(test, reference.position, rng) {
                return Ok(ResolvedInput::Statement(pos));
            }
        }

        let found = match &root.kind {
            VariableKind::Parameter { index } => self
                .target_params(test)
                .get(index.wrapping_sub(1))
                .map(|p| p.position),
            VariableKind::InstanceField { owner, name } | VariableKind::StaticField { owner, name } => {
                field_statement(test, owner, name)
            }
            _ => None,
        };
        if let Some(pos) = found.and_then(|pos| self.root_value_statement(test, pos, rng)) {
            return Ok(ResolvedInput::Statement(pos));
        }

        for param in self.target_params(test) {
            if let Some(pos) = self.root_value_statement(test, param.position, rng) {
                debug!(root = %root.key().0, position = pos, "Resolved through target fallback");
                return Ok(ResolvedInput::Statement(pos));
            }
        }

        Err(SensitivityError::ResolutionFailure(format!(
            "{} has no statement in the seed",
            root.key().0
        )))
    }

    /// Descend from `position` to the statement holding a mutable scalar.
    ///
    /// The descent takes at most `test.len()` hops; a reference to a missing statement stops
    /// it at the current one. `None` only when `position` is out of range.
    pub fn root_value_statement(
        &self,
        test: &TestCase,
        position: usize,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        test.get(position)?;
        let mut current = position;
        for _ in 0..test.len() {
            let statement = test.get(current)?;
            let next = match &statement.kind {
                StatementKind::Primitive(_) | StatementKind::Null => None,
                StatementKind::Array { lengths } => match lengths.as_slice() {
                    [len] if *len > 0 => test
                        .array_elements(current)
                        .into_iter()
                        .find(|(index, _)| *index == len - 1)
                        .map(|(_, value)| value),
                    _ => None,
                },
                StatementKind::Constructor(call) | StatementKind::Method(call) => {
                    if call.params.is_empty() {
                        None
                    } else {
                        let choice = rng.gen_range(0..call.params.len());
                        Some(call.params[choice].position)
                    }
                }
                StatementKind::Assignment(assignment) => Some(assignment.value.position),
            };
            match next {
                Some(next) if next != current && next < test.len() => current = next,
                _ => return Some(current),
            }
        }
        Some(current)
    }

    /// Parameters of the final statement when it calls the target operation.
    pub fn target_params<'t>(&self, test: &'t TestCase) -> &'t [VariableReference] {
        match test.last_method_call() {
            Some(call) if self.is_target(call) => &call.params,
            _ => &[],
        }
    }

    fn is_target(&self, call: &Call) -> bool {
        call.signature() == self.target_method
    }
}

/// Reference with the smallest in-range position, first seen on ties.
fn earliest<'r>(refs: &'r [VariableReference], test: &TestCase) -> Option<&'r VariableReference> {
    refs.iter()
        .filter(|r| r.position < test.len())
        .fold(None, |best: Option<&VariableReference>, r| match best {
            Some(b) if b.position <= r.position => Some(b),
            _ => Some(r),
        })
}

/// Last statement defining `field` by name, or calling its setter on `owner`.
fn field_statement(test: &TestCase, owner: &TypeName, field: &str) -> Option<usize> {
    let dotted = format!(".{}", field);
    let setter = format!("set{}", field);
    let owner = owner.internal_name();
    test.statements()
        .iter()
        .enumerate()
        .rev()
        .find(|(_, st)| {
            if st.name == field || st.name.ends_with(&dotted) {
                return true;
            }
            match &st.kind {
                StatementKind::Method(call) => {
                    call.method_name.eq_ignore_ascii_case(&setter)
                        && call.owner.internal_name() == owner
                }
                _ => false,
            }
        })
        .map(|(pos, _)| pos)
}
