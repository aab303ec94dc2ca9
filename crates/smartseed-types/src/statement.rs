//! Test cases as ordered statement sequences.
//!
//! A statement's position is its index in the owning [`TestCase`]. Calls, arrays and
//! assignments refer to other statements by position; every such reference must point to an
//! earlier statement of the same test case.

use serde::{Deserialize, Serialize};

use crate::value::{TypeName, Value};

// ── Variable References ─────────────────────────────────────────────

/// The variable defined by the statement at `position`, with its declared type.
///
/// Only meaningful against the [`TestCase`] it was taken from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableReference {
    pub position: usize,
    pub ty: TypeName,
}

impl VariableReference {
    pub fn new(position: usize, ty: impl Into<TypeName>) -> Self {
        Self {
            position,
            ty: ty.into(),
        }
    }
}

// ── Statement Kinds ─────────────────────────────────────────────────

/// A constructor or method invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Declaring type of the invoked operation.
    pub owner: TypeName,
    /// Operation name (`<init>` for constructors).
    pub method_name: String,
    /// Parameter/return descriptor, e.g. `(I)V`.
    pub descriptor: String,
    /// Receiver for instance methods.
    pub callee: Option<VariableReference>,
    /// Arguments in declaration order.
    pub params: Vec<VariableReference>,
}

impl Call {
    /// Name plus descriptor, the form target operations are configured in.
    pub fn signature(&self) -> String {
        format!("{}{}", self.method_name, self.descriptor)
    }
}

/// Left-hand side of an assignment statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentTarget {
    /// `array[index] = value`
    ArrayIndex { array: usize, index: usize },
    /// `owner.field = value`, or a static field when `owner` is `None`.
    Field {
        owner: Option<usize>,
        owner_type: TypeName,
        field: String,
    },
}

/// An assignment of a previously defined value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: AssignmentTarget,
    pub value: VariableReference,
}

/// Closed set of statement variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    Primitive(Value),
    Array { lengths: Vec<usize> },
    Constructor(Call),
    Method(Call),
    Assignment(Assignment),
    Null,
}

/// One line of a test case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Name of the variable this statement defines (`int0`, `foo0.bar`, `intArray0[1]`).
    pub name: String,
    /// Declared or returned type.
    pub return_type: TypeName,
    pub kind: StatementKind,
}

impl Statement {
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, StatementKind::Primitive(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, StatementKind::Null)
    }

    /// The value held by a primitive statement.
    pub fn primitive_value(&self) -> Option<&Value> {
        match &self.kind {
            StatementKind::Primitive(v) => Some(v),
            _ => None,
        }
    }

    /// The call made by a constructor or method statement.
    pub fn call(&self) -> Option<&Call> {
        match &self.kind {
            StatementKind::Constructor(c) | StatementKind::Method(c) => Some(c),
            _ => None,
        }
    }

    /// Positions of every statement this one refers to.
    pub fn references(&self) -> Vec<usize> {
        match &self.kind {
            StatementKind::Primitive(_) | StatementKind::Array { .. } | StatementKind::Null => {
                Vec::new()
            }
            StatementKind::Constructor(call) | StatementKind::Method(call) => call
                .callee
                .iter()
                .chain(call.params.iter())
                .map(|r| r.position)
                .collect(),
            StatementKind::Assignment(a) => {
                let mut refs = vec![a.value.position];
                match &a.target {
                    AssignmentTarget::ArrayIndex { array, .. } => refs.push(*array),
                    AssignmentTarget::Field {
                        owner: Some(owner), ..
                    } => refs.push(*owner),
                    AssignmentTarget::Field { owner: None, .. } => {}
                }
                refs
            }
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            StatementKind::Primitive(Value::Str(s)) => {
                write!(f, "{} {} = \"{}\";", self.return_type, self.name, s)
            }
            StatementKind::Primitive(v) => write!(f, "{} {} = {};", self.return_type, self.name, v),
            StatementKind::Null => write!(f, "{} {} = null;", self.return_type, self.name),
            StatementKind::Array { lengths } => {
                let dims: String = lengths.iter().map(|l| format!("[{}]", l)).collect();
                write!(
                    f,
                    "{} {} = new {}{};",
                    self.return_type,
                    self.name,
                    self.return_type.element_type(),
                    dims
                )
            }
            StatementKind::Constructor(call) => write!(
                f,
                "{} {} = new {}({});",
                self.return_type,
                self.name,
                call.owner.simple_name(),
                call.params.len()
            ),
            StatementKind::Method(call) => write!(
                f,
                "{} {} = {}.{}({});",
                self.return_type,
                self.name,
                call.owner.simple_name(),
                call.method_name,
                call.params.len()
            ),
            StatementKind::Assignment(a) => write!(f, "{} = @{};", self.name, a.value.position),
        }
    }
}

// ── Test Case ───────────────────────────────────────────────────────

/// An ordered sequence of statements.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    statements: Vec<Statement>,
}

impl TestCase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn get(&self, position: usize) -> Option<&Statement> {
        self.statements.get(position)
    }

    pub fn last(&self) -> Option<&Statement> {
        self.statements.last()
    }

    /// Append a statement and return a reference to the variable it defines.
    pub fn push(&mut self, statement: Statement) -> VariableReference {
        let reference = VariableReference::new(self.statements.len(), statement.return_type.clone());
        self.statements.push(statement);
        reference
    }

    /// Replace the statement at `position`, keeping its variable name.
    ///
    /// Returns `false` when the position is out of range.
    pub fn replace(&mut self, position: usize, mut statement: Statement) -> bool {
        match self.statements.get_mut(position) {
            Some(slot) => {
                statement.name = slot.name.clone();
                *slot = statement;
                true
            }
            None => false,
        }
    }

    /// Overwrite the value of the primitive statement at `position`.
    ///
    /// Returns the previous value, or `None` if the statement is not primitive.
    pub fn set_primitive_value(&mut self, position: usize, value: Value) -> Option<Value> {
        match self.statements.get_mut(position).map(|s| &mut s.kind) {
            Some(StatementKind::Primitive(slot)) => Some(std::mem::replace(slot, value)),
            _ => None,
        }
    }

    /// Positions of `(statement, reference)` pairs that break the ordering invariant.
    ///
    /// A reference may point at an earlier statement or at the statement itself.
    pub fn dangling_references(&self) -> Vec<(usize, usize)> {
        let len = self.statements.len();
        self.statements
            .iter()
            .enumerate()
            .flat_map(|(pos, st)| {
                st.references()
                    .into_iter()
                    .filter(move |r| *r > pos || *r >= len)
                    .map(move |r| (pos, r))
            })
            .collect()
    }

    /// Whether every reference resolves to an earlier or co-located statement.
    pub fn is_consistent(&self) -> bool {
        self.dangling_references().is_empty()
    }

    /// The call of the last statement, when it is a method statement.
    pub fn last_method_call(&self) -> Option<&Call> {
        match self.statements.last().map(|s| &s.kind) {
            Some(StatementKind::Method(call)) => Some(call),
            _ => None,
        }
    }

    /// Index assignments into the array defined at `array`, as `(index, value position)`,
    /// scanning forward from the array definition.
    pub fn array_elements(&self, array: usize) -> Vec<(usize, usize)> {
        self.statements
            .iter()
            .skip(array)
            .filter_map(|st| match &st.kind {
                StatementKind::Assignment(Assignment {
                    target: AssignmentTarget::ArrayIndex { array: a, index },
                    value,
                }) if *a == array => Some((*index, value.position)),
                _ => None,
            })
            .collect()
    }

    /// Concrete argument values of the call at `position`.
    ///
    /// Primitive arguments yield their value, null arguments `Value::Null`, anything else an
    /// opaque `Value::Object` of the argument's type.
    pub fn argument_values(&self, position: usize) -> Vec<Value> {
        let Some(call) = self.get(position).and_then(Statement::call) else {
            return Vec::new();
        };
        call.params
            .iter()
            .map(|p| match self.get(p.position).map(|s| &s.kind) {
                Some(StatementKind::Primitive(v)) => v.clone(),
                Some(StatementKind::Null) | None => Value::Null,
                Some(_) => Value::Object(p.ty.clone()),
            })
            .collect()
    }

    // ── Builders ────────────────────────────────────────────────────

    fn fresh_name(&self, ty: &TypeName) -> String {
        let base = {
            let simple = ty.element_type().simple_name().to_string();
            let mut chars = simple.chars();
            let mut base: String = match chars.next() {
                Some(c) => c.to_lowercase().chain(chars).collect(),
                None => "var".to_string(),
            };
            if ty.is_array() {
                base.push_str("Array");
            }
            base
        };
        let taken = self
            .statements
            .iter()
            .filter(|s| {
                s.name
                    .strip_prefix(base.as_str())
                    .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
            .count();
        format!("{}{}", base, taken)
    }

    fn name_of(&self, position: usize) -> String {
        self.get(position)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("var{}", position))
    }

    pub fn add_primitive(&mut self, value: Value) -> VariableReference {
        let ty = value.type_name();
        self.add_typed_primitive(ty, value)
    }

    pub fn add_typed_primitive(&mut self, ty: TypeName, value: Value) -> VariableReference {
        let name = self.fresh_name(&ty);
        self.push(Statement {
            name,
            return_type: ty,
            kind: StatementKind::Primitive(value),
        })
    }

    pub fn add_null(&mut self, ty: impl Into<TypeName>) -> VariableReference {
        let ty = ty.into();
        let name = self.fresh_name(&ty);
        self.push(Statement {
            name,
            return_type: ty,
            kind: StatementKind::Null,
        })
    }

    pub fn add_array(&mut self, ty: impl Into<TypeName>, lengths: Vec<usize>) -> VariableReference {
        let ty = ty.into();
        let name = self.fresh_name(&ty);
        self.push(Statement {
            name,
            return_type: ty,
            kind: StatementKind::Array { lengths },
        })
    }

    pub fn add_array_assignment(
        &mut self,
        array: &VariableReference,
        index: usize,
        value: &VariableReference,
    ) -> VariableReference {
        let name = format!("{}[{}]", self.name_of(array.position), index);
        self.push(Statement {
            name,
            return_type: array.ty.element_type(),
            kind: StatementKind::Assignment(Assignment {
                target: AssignmentTarget::ArrayIndex {
                    array: array.position,
                    index,
                },
                value: value.clone(),
            }),
        })
    }

    pub fn add_field_assignment(
        &mut self,
        owner: Option<&VariableReference>,
        owner_type: impl Into<TypeName>,
        field: &str,
        value: &VariableReference,
    ) -> VariableReference {
        let owner_type = owner_type.into();
        let prefix = match owner {
            Some(o) => self.name_of(o.position),
            None => owner_type.simple_name().to_string(),
        };
        self.push(Statement {
            name: format!("{}.{}", prefix, field),
            return_type: value.ty.clone(),
            kind: StatementKind::Assignment(Assignment {
                target: AssignmentTarget::Field {
                    owner: owner.map(|o| o.position),
                    owner_type,
                    field: field.to_string(),
                },
                value: value.clone(),
            }),
        })
    }

    pub fn add_constructor(
        &mut self,
        owner: impl Into<TypeName>,
        descriptor: &str,
        params: Vec<VariableReference>,
    ) -> VariableReference {
        let owner = owner.into();
        let name = self.fresh_name(&owner);
        self.push(Statement {
            name,
            return_type: owner.clone(),
            kind: StatementKind::Constructor(Call {
                owner,
                method_name: "<init>".to_string(),
                descriptor: descriptor.to_string(),
                callee: None,
                params,
            }),
        })
    }

    pub fn add_method(
        &mut self,
        callee: Option<&VariableReference>,
        owner: impl Into<TypeName>,
        method_name: &str,
        descriptor: &str,
        params: Vec<VariableReference>,
        return_type: impl Into<TypeName>,
    ) -> VariableReference {
        let return_type = return_type.into();
        let name = self.fresh_name(&return_type);
        self.push(Statement {
            name,
            return_type,
            kind: StatementKind::Method(Call {
                owner: owner.into(),
                method_name: method_name.to_string(),
                descriptor: descriptor.to_string(),
                callee: callee.cloned(),
                params,
            }),
        })
    }
}

impl std::fmt::Display for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for st in &self.statements {
            writeln!(f, "{}", st)?;
        }
        Ok(())
    }
}
