//! Shared fixtures for the cross-crate scenarios.
//!
//! The program under test is a single class `com.example.Calc` whose target operation
//! `targetM(I)I` is simulated by a closure through [`ProgramFitness`].

use smartseed_sensitivity::{
    Binding, Collaborators, ExecutionSandbox, MutationStrategy, ProgramFitness, ProgramRun,
    SensitivityAnalyzer, SensitivityConfig, SensitivityResult, SimulatedSandbox,
    SimulatedSynthesizer, SimulatedTestFactory, StaticDependencyAnalysis,
};
use smartseed_sensitivity::{ConstructionPathSynthesizer, DependencyAnalysis, TestFactory};
use smartseed_types::{
    Branch, Instruction, Opcode, RootVariable, TestCase, TypeName, Value, VariableKind,
};

pub const TARGET_CLASS: &str = "com.example.Calc";
pub const TARGET_METHOD: &str = "targetM(I)I";

/// Install a test-friendly subscriber honoring `RUST_LOG`; later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn instruction(offset: u32, opcode: Opcode) -> Instruction {
    Instruction::new(TARGET_CLASS, TARGET_METHOD, offset, opcode)
}

pub fn target_branch() -> Branch {
    Branch::new(1, instruction(3, Opcode::IfCmp))
}

pub fn int_parameter(index: usize) -> RootVariable {
    RootVariable::new(VariableKind::Parameter { index }, instruction(0, Opcode::ILoad))
}

pub fn instance_field(name: &str) -> RootVariable {
    RootVariable::new(
        VariableKind::InstanceField {
            owner: TypeName::new(TARGET_CLASS),
            name: name.to_string(),
        },
        instruction(1, Opcode::GetField),
    )
}

pub fn local(name: &str) -> RootVariable {
    RootVariable::new(
        VariableKind::Local {
            name: name.to_string(),
        },
        instruction(2, Opcode::ILoad),
    )
}

/// The `IRETURN` of the target operation.
pub fn return_site() -> Instruction {
    instruction(20, Opcode::IReturn)
}

/// `calc0 = new Calc(); int0 = x; int1 = calc0.targetM(int0)`
pub fn int_target_seed(x: i32) -> TestCase {
    let mut tc = TestCase::new();
    let calc = tc.add_constructor(TARGET_CLASS, "()V", vec![]);
    let arg = tc.add_primitive(Value::Int(x));
    tc.add_method(Some(&calc), TARGET_CLASS, "targetM", "(I)I", vec![arg], "int");
    tc
}

/// `calc0 = new Calc(); int0 = offset; calc0.offset = int0; int1 = x; int2 = calc0.targetM(int1)`
pub fn field_target_seed(offset: i32, x: i32) -> TestCase {
    let mut tc = TestCase::new();
    let calc = tc.add_constructor(TARGET_CLASS, "()V", vec![]);
    let off = tc.add_primitive(Value::Int(offset));
    tc.add_field_assignment(Some(&calc), TARGET_CLASS, "offset", &off);
    let arg = tc.add_primitive(Value::Int(x));
    tc.add_method(Some(&calc), TARGET_CLASS, "targetM", "(I)I", vec![arg], "int");
    tc
}

/// `targetM(x) = x + offset`, captured at the return site.
pub fn adding_program() -> ProgramFitness {
    let site = return_site();
    ProgramFitness::new(TARGET_METHOD, move |input| {
        let x = match input.argument(1) {
            Some(Value::Int(x)) => *x,
            _ => return ProgramRun::new(1.0),
        };
        let offset = match input.field("offset") {
            Some(Value::Int(o)) => o,
            _ => 0,
        };
        ProgramRun::new(0.0).probe(&site, Value::Int(x.wrapping_add(offset)))
    })
}

/// An analyzer assembled from simulated collaborators.
pub struct Scenario {
    pub config: SensitivityConfig,
    pub analysis: Box<dyn DependencyAnalysis>,
    pub factory: Box<dyn TestFactory>,
    pub synthesizer: Box<dyn ConstructionPathSynthesizer>,
    pub sandbox: Box<dyn ExecutionSandbox>,
    pub fitness: ProgramFitness,
}

impl Scenario {
    /// Seeds from `int_target_seed(5)`, binds parameter 1 to the target argument, executes
    /// [`adding_program`], reproducible RNG.
    pub fn new(strategy: MutationStrategy) -> Self {
        Self {
            config: SensitivityConfig {
                mutation_strategy: strategy,
                random_seed: Some(42),
                ..SensitivityConfig::for_target(TARGET_METHOD)
            },
            analysis: Box::new(StaticDependencyAnalysis::new()),
            factory: Box::new(SimulatedTestFactory::single(int_target_seed(5))),
            synthesizer: Box::new(
                SimulatedSynthesizer::new().bind(int_parameter(1), Binding::Parameter(1)),
            ),
            sandbox: Box::new(SimulatedSandbox::new()),
            fitness: adding_program(),
        }
    }

    pub fn with_analysis(mut self, analysis: impl DependencyAnalysis + 'static) -> Self {
        self.analysis = Box::new(analysis);
        self
    }

    pub fn with_factory(mut self, factory: impl TestFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: impl ConstructionPathSynthesizer + 'static) -> Self {
        self.synthesizer = Box::new(synthesizer);
        self
    }

    pub fn with_sandbox(mut self, sandbox: impl ExecutionSandbox + 'static) -> Self {
        self.sandbox = Box::new(sandbox);
        self
    }

    pub fn with_fitness(mut self, fitness: ProgramFitness) -> Self {
        self.fitness = fitness;
        self
    }

    pub fn with_seed_timeout_ms(mut self, budget_ms: u64) -> Self {
        self.config.seed_timeout_ms = budget_ms;
        self
    }

    pub fn build(self) -> SensitivityResult<SensitivityAnalyzer> {
        SensitivityAnalyzer::new(
            self.config,
            Collaborators {
                analysis: self.analysis,
                factory: self.factory,
                synthesizer: self.synthesizer,
                sandbox: self.sandbox,
                fitness: Box::new(self.fitness),
            },
        )
    }
}
