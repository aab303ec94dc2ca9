//! Static dependency artifacts: instructions, root variables, computation paths, branches,
//! and the graph-to-code map linking graph nodes to test statements.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::statement::VariableReference;
use crate::value::{TypeName, Value};

// ── Instructions ────────────────────────────────────────────────────

/// Bytecode opcodes the sensitivity analysis distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush,
    SiPush,
    Ldc,
    ILoad,
    ALoad,
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    Invoke,
    IReturn,
    AReturn,
    IfCmp,
    If,
    Other,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::IConstM1 => "ICONST_M1",
            Self::IConst0 => "ICONST_0",
            Self::IConst1 => "ICONST_1",
            Self::IConst2 => "ICONST_2",
            Self::IConst3 => "ICONST_3",
            Self::IConst4 => "ICONST_4",
            Self::IConst5 => "ICONST_5",
            Self::LConst0 => "LCONST_0",
            Self::LConst1 => "LCONST_1",
            Self::FConst0 => "FCONST_0",
            Self::FConst1 => "FCONST_1",
            Self::FConst2 => "FCONST_2",
            Self::DConst0 => "DCONST_0",
            Self::DConst1 => "DCONST_1",
            Self::BiPush => "BIPUSH",
            Self::SiPush => "SIPUSH",
            Self::Ldc => "LDC",
            Self::ILoad => "ILOAD",
            Self::ALoad => "ALOAD",
            Self::GetField => "GETFIELD",
            Self::GetStatic => "GETSTATIC",
            Self::PutField => "PUTFIELD",
            Self::PutStatic => "PUTSTATIC",
            Self::Invoke => "INVOKE",
            Self::IReturn => "IRETURN",
            Self::AReturn => "ARETURN",
            Self::IfCmp => "IF_CMP",
            Self::If => "IF",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Immediate or constant-pool operand of an instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// `BIPUSH`/`SIPUSH` immediate.
    Int(i32),
    /// Loaded constant-pool value.
    Constant(Value),
    /// Field owner (internal form) and name.
    Field { owner: String, name: String },
}

/// Identity string of an instruction, used to key observation sites.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstructionId(pub String);

impl std::fmt::Display for InstructionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One instruction of the program under test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Declaring class, dotted form.
    pub class_name: String,
    /// Method name with descriptor.
    pub method_name: String,
    /// Instruction index inside the method.
    pub offset: u32,
    pub opcode: Opcode,
    pub operand: Option<Operand>,
}

impl Instruction {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        offset: u32,
        opcode: Opcode,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            offset,
            opcode,
            operand: None,
        }
    }

    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operand = Some(operand);
        self
    }

    pub fn id(&self) -> InstructionId {
        InstructionId(format!(
            "{}.{}:{} {}",
            self.class_name, self.method_name, self.offset, self.opcode
        ))
    }

    /// Whether the instruction pushes a compile-time constant.
    pub fn is_constant(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::IConstM1
                | Opcode::IConst0
                | Opcode::IConst1
                | Opcode::IConst2
                | Opcode::IConst3
                | Opcode::IConst4
                | Opcode::IConst5
                | Opcode::LConst0
                | Opcode::LConst1
                | Opcode::FConst0
                | Opcode::FConst1
                | Opcode::FConst2
                | Opcode::DConst0
                | Opcode::DConst1
                | Opcode::BiPush
                | Opcode::SiPush
                | Opcode::Ldc
        )
    }

    /// Field owner of a field instruction, in internal form.
    pub fn field_owner(&self) -> Option<&str> {
        match &self.operand {
            Some(Operand::Field { owner, .. }) => Some(owner),
            _ => None,
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

// ── Branches ────────────────────────────────────────────────────────

/// Identifier of a branch (decision point) in the program under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchId(pub u32);

impl std::fmt::Display for BranchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "branch:{}", self.0)
    }
}

/// A decision point targeted by the search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub instruction: Instruction,
}

impl Branch {
    pub fn new(id: u32, instruction: Instruction) -> Self {
        Self {
            id: BranchId(id),
            instruction,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.instruction.class_name
    }

    pub fn method_name(&self) -> &str {
        &self.instruction.method_name
    }
}

// ── Root Variables ──────────────────────────────────────────────────

/// What kind of program location a dependency node stands for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    Constant,
    /// Method parameter, 1-based.
    Parameter { index: usize },
    InstanceField { owner: TypeName, name: String },
    StaticField { owner: TypeName, name: String },
    Local { name: String },
}

/// Wrapped identity of a dependency node, the key of [`GraphToCodeMap`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableKey(pub String);

/// A node of the static dependency graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootVariable {
    pub kind: VariableKind,
    /// Defining instruction.
    pub instruction: Instruction,
    /// Direct primitive contributors.
    pub children: Vec<RootVariable>,
}

impl RootVariable {
    pub fn new(kind: VariableKind, instruction: Instruction) -> Self {
        Self {
            kind,
            instruction,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: RootVariable) -> Self {
        self.children.push(child);
        self
    }

    pub fn key(&self) -> VariableKey {
        let kind = match &self.kind {
            VariableKind::Constant => "const".to_string(),
            VariableKind::Parameter { index } => format!("param{}", index),
            VariableKind::InstanceField { owner, name } => format!("field {}.{}", owner, name),
            VariableKind::StaticField { owner, name } => format!("static {}.{}", owner, name),
            VariableKind::Local { name } => format!("local {}", name),
        };
        VariableKey(format!("{}|{}", kind, self.instruction.id()))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, VariableKind::Constant)
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, VariableKind::Parameter { .. })
    }

    /// Instance or static field.
    pub fn is_field(&self) -> bool {
        matches!(
            self.kind,
            VariableKind::InstanceField { .. } | VariableKind::StaticField { .. }
        )
    }

    /// Name of the location for fields and locals.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            VariableKind::InstanceField { name, .. }
            | VariableKind::StaticField { name, .. }
            | VariableKind::Local { name } => Some(name),
            _ => None,
        }
    }

    /// This node followed by all its transitive children, each identity once, depth first.
    pub fn all_children_including_self(&self) -> Vec<&RootVariable> {
        let mut out: Vec<&RootVariable> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if !seen.insert(node.key()) {
                continue;
            }
            out.push(node);
            for child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

// ── Computation Paths ───────────────────────────────────────────────

/// A static chain from a root variable to the instruction whose value is observed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputationPath {
    pub branch: Branch,
    /// Nodes from the root variable onward.
    pub nodes: Vec<RootVariable>,
    /// The observation instruction at the end of the path.
    pub tail: Instruction,
}

impl ComputationPath {
    pub fn new(branch: Branch, nodes: Vec<RootVariable>, tail: Instruction) -> Self {
        Self {
            branch,
            nodes,
            tail,
        }
    }

    pub fn root(&self) -> Option<&RootVariable> {
        self.nodes.first()
    }

    pub fn relevant_tail_instruction(&self) -> &Instruction {
        &self.tail
    }

    /// Whether the root is an instance or static field.
    pub fn is_field_rooted(&self) -> bool {
        self.root().map(RootVariable::is_field).unwrap_or(false)
    }
}

// ── Graph-to-Code Map ───────────────────────────────────────────────

/// Links dependency-graph nodes to the variables that realize them in one test case.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphToCodeMap {
    entries: HashMap<VariableKey, Vec<VariableReference>>,
}

impl GraphToCodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: &RootVariable, reference: VariableReference) {
        self.entries.entry(variable.key()).or_default().push(reference);
    }

    pub fn get(&self, variable: &RootVariable) -> Option<&[VariableReference]> {
        self.entries.get(&variable.key()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
