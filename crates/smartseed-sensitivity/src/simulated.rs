//! In-process stand-ins for the external collaborators.
//!
//! They let the engine run end to end without a real program under test: a template-driven
//! test factory, a rule-based synthesizer, a recording sandbox, a table-backed dependency
//! analysis and a fitness framework that executes a Rust closure as the target operation.

use std::collections::{BTreeMap, BTreeSet};

use rand::{Rng, RngCore};
use smartseed_types::{
    AssignmentTarget, Branch, BranchCoverageGoal, BranchId, Call, ComputationPath,
    GraphToCodeMap, Instruction, InstructionId, LoaderBinding, RootVariable, Statement,
    StatementKind, TestCase, TestChromosome, TypeName, Value, VariableReference,
};
use tracing::debug;

use crate::collaborators::{
    ConstructionPathSynthesizer, DependencyAnalysis, ExecutionSandbox, FitnessFramework,
    TestFactory,
};
use crate::error::{SensitivityError, SensitivityResult};
use crate::harness::ObservationBuffer;

// ── Test Factory ────────────────────────────────────────────────────

/// Builds tests by copying one of a set of template test cases.
#[derive(Clone, Debug, Default)]
pub struct SimulatedTestFactory {
    templates: Vec<TestCase>,
    randomize_primitives: bool,
    insertions: usize,
}

impl SimulatedTestFactory {
    pub fn new(templates: Vec<TestCase>) -> Self {
        Self {
            templates,
            randomize_primitives: false,
            insertions: 0,
        }
    }

    pub fn single(template: TestCase) -> Self {
        Self::new(vec![template])
    }

    /// A factory whose insertions always fail.
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    /// Draw fresh values for integral primitives of every copied template.
    pub fn with_randomized_primitives(mut self) -> Self {
        self.randomize_primitives = true;
        self
    }

    /// Successful insertions so far.
    pub fn insertions(&self) -> usize {
        self.insertions
    }
}

impl TestFactory for SimulatedTestFactory {
    /// Only builds into an empty test case at position 0.
    fn insert_random_statement(
        &mut self,
        test: &mut TestCase,
        position: usize,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        if self.templates.is_empty() || !test.is_empty() || position != 0 {
            return None;
        }
        let mut copy = self.templates[rng.gen_range(0..self.templates.len())].clone();
        if self.randomize_primitives {
            for pos in 0..copy.len() {
                let fresh = match copy.get(pos).and_then(Statement::primitive_value) {
                    Some(Value::Int(_)) => Value::Int(rng.gen_range(-100..=100)),
                    Some(Value::Long(_)) => Value::Long(rng.gen_range(-100..=100)),
                    Some(Value::Short(_)) => Value::Short(rng.gen_range(-100..=100)),
                    _ => continue,
                };
                copy.set_primitive_value(pos, fresh);
            }
        }
        *test = copy;
        self.insertions += 1;
        test.len().checked_sub(1)
    }

    fn change_null_statement(
        &mut self,
        test: &mut TestCase,
        position: usize,
        rng: &mut dyn RngCore,
    ) -> bool {
        let Some(ty) = test.get(position).filter(|s| s.is_null()).map(|s| s.return_type.clone())
        else {
            return false;
        };
        let kind = match default_value(&ty, rng) {
            Some(value) => StatementKind::Primitive(value),
            None if ty.is_array() => StatementKind::Array { lengths: vec![0] },
            None => StatementKind::Constructor(Call {
                owner: ty.clone(),
                method_name: "<init>".to_string(),
                descriptor: "()V".to_string(),
                callee: None,
                params: Vec::new(),
            }),
        };
        test.replace(
            position,
            Statement {
                name: String::new(),
                return_type: ty,
                kind,
            },
        )
    }
}

/// A small random value for primitive and boxed types.
fn default_value(ty: &TypeName, rng: &mut dyn RngCore) -> Option<Value> {
    let value = match ty.as_str() {
        "int" | "java.lang.Integer" => Value::Int(rng.gen_range(-10..=10)),
        "long" | "java.lang.Long" => Value::Long(rng.gen_range(-10..=10)),
        "short" | "java.lang.Short" => Value::Short(rng.gen_range(-10..=10)),
        "byte" | "java.lang.Byte" => Value::Byte(rng.gen_range(-10..=10)),
        "boolean" | "java.lang.Boolean" => Value::Bool(rng.gen_bool(0.5)),
        "char" | "java.lang.Character" => Value::Char('a'),
        "float" | "java.lang.Float" => Value::Float(0.0),
        "double" | "java.lang.Double" => Value::Double(0.0),
        "java.lang.String" => Value::Str(String::new()),
        _ => return None,
    };
    Some(value)
}

// ── Construction Path Synthesizer ───────────────────────────────────

/// How a root variable is realized in a seed.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    /// 1-based argument of the final call.
    Parameter(usize),
    /// Value of the last assignment to the named field.
    Field(String),
}

/// Rebuilds the graph-to-code map from binding rules after every construction.
#[derive(Clone, Debug, Default)]
pub struct SimulatedSynthesizer {
    rules: Vec<(RootVariable, Binding)>,
    failure: Option<String>,
    map: GraphToCodeMap,
}

impl SimulatedSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, root: RootVariable, binding: Binding) -> Self {
        self.rules.push((root, binding));
        self
    }

    /// Every construction fails with `reason`; the map stays empty.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    fn locate(test: &TestCase, binding: &Binding) -> Option<VariableReference> {
        match binding {
            Binding::Parameter(index) => test
                .last_method_call()
                .and_then(|call| call.params.get(index.checked_sub(1)?))
                .cloned(),
            Binding::Field(field) => test.statements().iter().rev().find_map(|st| match &st.kind {
                StatementKind::Assignment(a) => match &a.target {
                    AssignmentTarget::Field { field: f, .. } if f == field => Some(a.value.clone()),
                    _ => None,
                },
                _ => None,
            }),
        }
    }
}

impl ConstructionPathSynthesizer for SimulatedSynthesizer {
    fn construct_difficult_object_statement(
        &mut self,
        test: &mut TestCase,
        branch: &Branch,
        _allow_null: bool,
        _rng: &mut dyn RngCore,
    ) -> SensitivityResult<()> {
        self.map = GraphToCodeMap::new();
        if let Some(reason) = &self.failure {
            return Err(SensitivityError::ConstructionFailure(format!(
                "{}: {}",
                branch.id, reason
            )));
        }
        for (root, binding) in &self.rules {
            match Self::locate(test, binding) {
                Some(reference) => self.map.insert(root, reference),
                None => debug!(root = %root.key().0, ?binding, "Binding not realized"),
            }
        }
        Ok(())
    }

    fn graph_to_code_map(&self) -> &GraphToCodeMap {
        &self.map
    }
}

// ── Execution Sandbox ───────────────────────────────────────────────

/// Records registrations; classes named as unloadable fail to load.
#[derive(Clone, Debug, Default)]
pub struct SimulatedSandbox {
    registered: BTreeSet<String>,
    unloadable: BTreeSet<String>,
    loaders_created: usize,
}

impl SimulatedSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unloadable(mut self, class_name: impl Into<String>) -> Self {
        self.unloadable.insert(class_name.into());
        self
    }

    pub fn registered_classes(&self) -> &BTreeSet<String> {
        &self.registered
    }

    pub fn loaders_created(&self) -> usize {
        self.loaders_created
    }
}

impl ExecutionSandbox for SimulatedSandbox {
    fn register_target_class(&mut self, class_name: &str) {
        self.registered.insert(class_name.to_string());
    }

    fn create_loader(&mut self, observations: &[Instruction]) -> LoaderBinding {
        self.loaders_created += 1;
        LoaderBinding::new(observations.iter().map(Instruction::id).collect())
    }

    fn load_class(&mut self, loader: &mut LoaderBinding, class_name: &str) -> SensitivityResult<()> {
        if self.unloadable.contains(class_name) {
            return Err(SensitivityError::ClassLoadFailure {
                class_name: class_name.to_string(),
                reason: "class not found".into(),
            });
        }
        if !loader.is_loaded(class_name) {
            loader.loaded_classes.push(class_name.to_string());
        }
        Ok(())
    }
}

// ── Dependency Analysis ─────────────────────────────────────────────

/// Dependency analysis answered from fixed tables.
#[derive(Clone, Debug, Default)]
pub struct StaticDependencyAnalysis {
    branches: Vec<(String, Branch)>,
    roots: BTreeMap<BranchId, Vec<RootVariable>>,
    paths: Vec<ComputationPath>,
}

impl StaticDependencyAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `branch` inside the method with signature `method`.
    pub fn with_branch(mut self, method: impl Into<String>, branch: Branch) -> Self {
        self.branches.push((method.into(), branch));
        self
    }

    pub fn with_root(mut self, branch: BranchId, root: RootVariable) -> Self {
        let roots = self.roots.entry(branch).or_default();
        if !roots.contains(&root) {
            roots.push(root);
        }
        self
    }

    /// Add a path; its root becomes a root variable of its branch.
    pub fn with_path(mut self, path: ComputationPath) -> Self {
        if let Some(root) = path.root().cloned() {
            self = self.with_root(path.branch.id, root);
        }
        self.paths.push(path);
        self
    }
}

impl DependencyAnalysis for StaticDependencyAnalysis {
    fn branches_in_method(&self, method: &str) -> Vec<Branch> {
        self.branches
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, b)| b.clone())
            .collect()
    }

    fn root_variables(&self, branch: &Branch) -> Vec<RootVariable> {
        self.roots.get(&branch.id).cloned().unwrap_or_default()
    }

    fn computation_paths(&self, root: &RootVariable, branch: &Branch) -> Vec<ComputationPath> {
        self.paths
            .iter()
            .filter(|p| p.branch.id == branch.id && p.root() == Some(root))
            .cloned()
            .collect()
    }
}

// ── Fitness Framework ───────────────────────────────────────────────

/// What the simulated target operation sees when called.
pub struct ProgramInput<'a> {
    test: &'a TestCase,
    /// Argument values of the target call.
    pub arguments: Vec<Value>,
}

impl<'a> ProgramInput<'a> {
    /// 1-based argument.
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index.checked_sub(1)?)
    }

    /// Value of the last primitive assignment to `field` before the call.
    pub fn field(&self, field: &str) -> Option<Value> {
        self.test.statements().iter().rev().find_map(|st| match &st.kind {
            StatementKind::Assignment(a) => match &a.target {
                AssignmentTarget::Field { field: f, .. } if f == field => self
                    .test
                    .get(a.value.position)
                    .and_then(Statement::primitive_value)
                    .cloned(),
                _ => None,
            },
            _ => None,
        })
    }
}

/// Probes fired by one simulated execution and its branch distance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgramRun {
    pub probes: Vec<(InstructionId, Value)>,
    pub distance: f64,
}

impl ProgramRun {
    pub fn new(distance: f64) -> Self {
        Self {
            probes: Vec::new(),
            distance,
        }
    }

    pub fn probe(mut self, site: &Instruction, value: Value) -> Self {
        self.probes.push((site.id(), value));
        self
    }
}

type Program = Box<dyn FnMut(&ProgramInput<'_>) -> ProgramRun + Send>;

/// Executes a closure standing in for the target operation.
///
/// Tests whose last statement does not call the target are not executed and score 1.0.
pub struct ProgramFitness {
    target_method: String,
    program: Program,
    route_to: Option<Branch>,
    executions: usize,
}

impl ProgramFitness {
    pub fn new(
        target_method: impl Into<String>,
        program: impl FnMut(&ProgramInput<'_>) -> ProgramRun + Send + 'static,
    ) -> Self {
        Self {
            target_method: target_method.into(),
            program: Box::new(program),
            route_to: None,
            executions: 0,
        }
    }

    /// Hand out goals for `branch` whatever branch is asked for.
    pub fn routing_goals_to(mut self, branch: Branch) -> Self {
        self.route_to = Some(branch);
        self
    }

    pub fn executions(&self) -> usize {
        self.executions
    }
}

impl FitnessFramework for ProgramFitness {
    fn branch_goal(&self, branch: &Branch) -> BranchCoverageGoal {
        BranchCoverageGoal::new(self.route_to.clone().unwrap_or_else(|| branch.clone()), true)
    }

    fn evaluate(
        &mut self,
        _goal: &BranchCoverageGoal,
        chromosome: &TestChromosome,
        probes: &mut ObservationBuffer,
    ) -> f64 {
        let test = chromosome.test_case();
        let calls_target = test
            .last_method_call()
            .map(|c| c.signature() == self.target_method)
            .unwrap_or(false);
        if !calls_target {
            return 1.0;
        }

        let input = ProgramInput {
            test,
            arguments: test.argument_values(test.len() - 1),
        };
        let run = (self.program)(&input);
        self.executions += 1;
        for (site, value) in run.probes {
            probes.record(&site, value);
        }
        run.distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use smartseed_types::{Opcode, VariableKind};

    const CLASS: &str = "com.example.Foo";

    fn template() -> TestCase {
        let mut tc = TestCase::new();
        let foo = tc.add_constructor(CLASS, "()V", vec![]);
        let v = tc.add_primitive(Value::Int(6));
        tc.add_field_assignment(Some(&foo), CLASS, "limit", &v);
        let x = tc.add_primitive(Value::Int(3));
        tc.add_method(Some(&foo), CLASS, "targetM", "(I)I", vec![x], "int");
        tc
    }

    fn branch() -> Branch {
        Branch::new(1, Instruction::new(CLASS, "targetM(I)I", 4, Opcode::IfCmp))
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(2)
    }

    #[test]
    fn factory_copies_templates() {
        let mut factory = SimulatedTestFactory::single(template());
        let mut tc = TestCase::new();
        assert_eq!(factory.insert_random_statement(&mut tc, 0, &mut rng()), Some(4));
        assert_eq!(tc, template());
        assert_eq!(factory.insert_random_statement(&mut tc, 0, &mut rng()), None);
        assert!(SimulatedTestFactory::failing()
            .insert_random_statement(&mut TestCase::new(), 0, &mut rng())
            .is_none());
    }

    #[test]
    fn factory_replaces_nulls_by_type() {
        let mut tc = TestCase::new();
        tc.add_null("java.lang.Integer");
        tc.add_null("com.example.Bar");
        tc.add_null("int[]");
        let mut factory = SimulatedTestFactory::default();
        for pos in 0..3 {
            assert!(factory.change_null_statement(&mut tc, pos, &mut rng()));
        }
        assert!(matches!(tc.get(0).unwrap().kind, StatementKind::Primitive(Value::Int(_))));
        assert!(matches!(tc.get(1).unwrap().kind, StatementKind::Constructor(_)));
        assert!(matches!(tc.get(2).unwrap().kind, StatementKind::Array { .. }));
        assert!(!factory.change_null_statement(&mut tc, 0, &mut rng()));
    }

    #[test]
    fn synthesizer_binds_parameters_and_fields() {
        let param = RootVariable::new(
            VariableKind::Parameter { index: 1 },
            Instruction::new(CLASS, "targetM(I)I", 0, Opcode::ILoad),
        );
        let field = RootVariable::new(
            VariableKind::InstanceField {
                owner: CLASS.into(),
                name: "limit".into(),
            },
            Instruction::new(CLASS, "targetM(I)I", 1, Opcode::GetField),
        );
        let mut synth = SimulatedSynthesizer::new()
            .bind(param.clone(), Binding::Parameter(1))
            .bind(field.clone(), Binding::Field("limit".into()));
        let mut tc = template();
        synth
            .construct_difficult_object_statement(&mut tc, &branch(), false, &mut rng())
            .unwrap();
        assert_eq!(synth.graph_to_code_map().get(&param).unwrap()[0].position, 3);
        assert_eq!(synth.graph_to_code_map().get(&field).unwrap()[0].position, 1);
    }

    #[test]
    fn failing_synthesizer_reports_construction_failure() {
        let mut synth = SimulatedSynthesizer::new().failing("no factory method");
        let err = synth
            .construct_difficult_object_statement(&mut template(), &branch(), false, &mut rng())
            .unwrap_err();
        assert!(matches!(err, SensitivityError::ConstructionFailure(_)));
        assert!(synth.graph_to_code_map().is_empty());
    }

    #[test]
    fn program_fitness_runs_target_with_arguments() {
        let site = Instruction::new(CLASS, "targetM(I)I", 9, Opcode::IReturn);
        let probe_site = site.clone();
        let mut fitness = ProgramFitness::new("targetM(I)I", move |input| {
            let x = input.argument(1).cloned().unwrap_or(Value::Null);
            let limit = input.field("limit").unwrap_or(Value::Null);
            assert_eq!(limit, Value::Int(6));
            ProgramRun::new(0.0).probe(&probe_site, x)
        });
        let mut buffer = ObservationBuffer::for_sites(&[site.clone()]);
        let chromosome = TestChromosome::new(template());
        let goal = fitness.branch_goal(&branch());
        assert_eq!(fitness.evaluate(&goal, &chromosome, &mut buffer), 0.0);
        assert_eq!(buffer.values(&site.id()), Some(&[Value::Int(3)][..]));
        assert_eq!(fitness.executions(), 1);
    }

    #[test]
    fn static_analysis_answers_from_tables() {
        let root = RootVariable::new(
            VariableKind::Parameter { index: 1 },
            Instruction::new(CLASS, "targetM(I)I", 0, Opcode::ILoad),
        );
        let tail = Instruction::new(CLASS, "targetM(I)I", 9, Opcode::IReturn);
        let path = ComputationPath::new(branch(), vec![root.clone()], tail);
        let analysis = StaticDependencyAnalysis::new()
            .with_branch("targetM(I)I", branch())
            .with_path(path.clone());
        assert_eq!(analysis.branches_in_method("targetM(I)I").len(), 1);
        assert!(analysis.branches_in_method("other()V").is_empty());
        assert_eq!(analysis.root_variables(&branch()), vec![root.clone()]);
        assert_eq!(analysis.computation_paths(&root, &branch()), vec![path]);
    }
}
