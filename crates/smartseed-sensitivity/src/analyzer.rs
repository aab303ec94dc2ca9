//! The sensitivity analyzer: seed, mutate, execute, observe, aggregate.
//!
//! Every `analyze*` operation absorbs collaborator failures and returns a report, possibly
//! empty, so the outer search never sees an error from here.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use smartseed_types::{
    Branch, BranchId, ComputationPath, GraphToCodeMap, Instruction, RootVariable, TestCase,
    TestChromosome,
};
use tracing::{debug, info, warn};

use crate::collaborators::{
    ConstructionPathSynthesizer, DependencyAnalysis, ExecutionSandbox, FitnessFramework,
    TestFactory,
};
use crate::config::SensitivityConfig;
use crate::error::SensitivityResult;
use crate::harness::ObservationHarness;
use crate::inputs::{HeadCollector, MethodInputs};
use crate::mutation::ValueMutator;
use crate::preservance::{ObservationRecord, ResolvedHead, ValuePreservance};
use crate::resolver::{DependencyResolver, ResolvedInput};
use crate::seed::SeedBuilder;
use crate::similarity::ValueSimilarity;

/// The external systems an analyzer drives.
pub struct Collaborators {
    pub analysis: Box<dyn DependencyAnalysis>,
    pub factory: Box<dyn TestFactory>,
    pub synthesizer: Box<dyn ConstructionPathSynthesizer>,
    pub sandbox: Box<dyn ExecutionSandbox>,
    pub fitness: Box<dyn FitnessFramework>,
}

/// Computation paths of every root variable of `branch`, deduplicated, first seen first.
pub fn parse_computation_paths(
    analysis: &dyn DependencyAnalysis,
    branch: &Branch,
) -> Vec<ComputationPath> {
    let mut paths: Vec<ComputationPath> = Vec::new();
    for root in analysis.root_variables(branch) {
        for path in analysis.computation_paths(&root, branch) {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Field-rooted paths first, relative order kept inside both groups.
pub fn prioritize_field_paths(paths: Vec<ComputationPath>) -> Vec<ComputationPath> {
    let (mut fields, others): (Vec<_>, Vec<_>) =
        paths.into_iter().partition(ComputationPath::is_field_rooted);
    fields.extend(others);
    fields
}

/// Dynamic sensitivity and value-preservation analysis for one target operation.
pub struct SensitivityAnalyzer {
    config: SensitivityConfig,
    collaborators: Collaborators,
    seeds: SeedBuilder,
    resolver: DependencyResolver,
    mutator: ValueMutator,
    similarity: ValueSimilarity,
    rng: StdRng,
}

impl SensitivityAnalyzer {
    pub fn new(config: SensitivityConfig, collaborators: Collaborators) -> SensitivityResult<Self> {
        config.validate()?;
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            seeds: SeedBuilder::from_config(&config),
            resolver: DependencyResolver::new(config.target_method.clone()),
            mutator: ValueMutator::from_config(&config),
            similarity: ValueSimilarity::from_config(&config),
            config,
            collaborators,
            rng,
        })
    }

    pub fn config(&self) -> &SensitivityConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// A fresh seed calling the target, with the branch's difficult objects constructed.
    ///
    /// Construction failures are logged and the plain seed is used.
    pub fn create_seed_chromosome(&mut self, branch: &Branch) -> SensitivityResult<TestChromosome> {
        self.constructed_seed(branch).map(|(chromosome, _)| chromosome)
    }

    /// Probe `roots` against `sites` over the configured number of trials.
    ///
    /// `seed` is reused when its last statement calls the target; otherwise a new seed is
    /// built. Either way the branch's difficult objects are constructed on the trial seed.
    pub fn analyze(
        &mut self,
        branch: &Branch,
        roots: &[RootVariable],
        sites: &[Instruction],
        seed: Option<&TestChromosome>,
    ) -> ValuePreservance {
        let trials = self.config.dynamic_sensitivity_threshold;
        self.analyze_with_trials(branch, roots, sites, seed, trials)
    }

    pub fn analyze_with_trials(
        &mut self,
        branch: &Branch,
        roots: &[RootVariable],
        sites: &[Instruction],
        seed: Option<&TestChromosome>,
        trials: usize,
    ) -> ValuePreservance {
        let prepared = match seed.filter(|c| self.calls_target(c.test_case())) {
            Some(c) => {
                let mut chromosome = c.clone();
                let map = self.construct(chromosome.test_case_mut(), branch);
                Ok((chromosome, map))
            }
            None => self.constructed_seed(branch),
        };
        match prepared {
            Ok((seed, map)) => self.analyze_prepared(branch, roots, sites, &seed, &map, trials),
            Err(e) => {
                warn!(branch = %branch.id, error = %e, "No seed, returning empty report");
                ValuePreservance::empty(Some(branch.id), self.similarity.clone())
            }
        }
    }

    /// Probe a single computation path: its root against its tail instruction.
    pub fn analyze_path(&mut self, path: &ComputationPath) -> ValuePreservance {
        let Some(root) = path.root() else {
            warn!(branch = %path.branch.id, "Computation path without root");
            return ValuePreservance::empty(Some(path.branch.id), self.similarity.clone());
        };
        let roots = [root.clone()];
        let sites = [path.relevant_tail_instruction().clone()];
        self.analyze(&path.branch, &roots, &sites, None)
    }

    /// Probe every computation path of `branch`, field-rooted paths first, or only `path0`.
    ///
    /// All paths share one seed; each contributes its own trial group to the result.
    pub fn analyze_branch(
        &mut self,
        branch: &Branch,
        path0: Option<&ComputationPath>,
    ) -> ValuePreservance {
        let paths = match path0 {
            Some(path) => vec![path.clone()],
            None => prioritize_field_paths(parse_computation_paths(
                self.collaborators.analysis.as_ref(),
                branch,
            )),
        };
        let mut merged = ValuePreservance::empty(Some(branch.id), self.similarity.clone());
        if paths.is_empty() {
            info!(branch = %branch.id, "No computation paths");
            return merged;
        }

        let (seed, map) = match self.constructed_seed(branch) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(branch = %branch.id, error = %e, "No seed, returning empty report");
                return merged;
            }
        };
        let trials = self.config.dynamic_sensitivity_threshold;
        for path in &paths {
            let Some(root) = path.root() else {
                continue;
            };
            debug!(branch = %branch.id, root = %root.key().0, tail = %path.tail.id(), "Probing path");
            let part = self.analyze_prepared(
                branch,
                &[root.clone()],
                &[path.tail.clone()],
                &seed,
                &map,
                trials,
            );
            merged.merge(part);
        }
        merged
    }

    /// Analyze every branch the static analysis reports inside the target operation.
    pub fn analyze_target_method(&mut self) -> BTreeMap<BranchId, ValuePreservance> {
        let branches = self
            .collaborators
            .analysis
            .branches_in_method(&self.config.target_method);
        info!(target = %self.config.target_method, branches = branches.len(), "Analyzing target");
        branches
            .iter()
            .map(|branch| (branch.id, self.analyze_branch(branch, None)))
            .collect()
    }

    fn calls_target(&self, test: &TestCase) -> bool {
        test.last_method_call()
            .map(|c| c.signature() == self.config.target_method)
            .unwrap_or(false)
    }

    /// New seed calling the target, with its graph-to-code map.
    fn constructed_seed(
        &mut self,
        branch: &Branch,
    ) -> SensitivityResult<(TestChromosome, GraphToCodeMap)> {
        let mut test = self.seeds.build_seed_calling_target(
            self.collaborators.factory.as_mut(),
            &mut self.rng,
            &self.config.target_method,
        )?;
        let map = self.construct(&mut test, branch);
        Ok((TestChromosome::new(test), map))
    }

    /// Construct the branch's difficult objects in `test`.
    ///
    /// The returned map describes `test`; a failed construction yields an empty map.
    fn construct(&mut self, test: &mut TestCase, branch: &Branch) -> GraphToCodeMap {
        match self.collaborators.synthesizer.construct_difficult_object_statement(
            test,
            branch,
            self.config.allow_null_inputs,
            &mut self.rng,
        ) {
            Ok(()) => self.collaborators.synthesizer.graph_to_code_map().clone(),
            Err(e) => {
                warn!(branch = %branch.id, error = %e, "Difficult object construction failed");
                GraphToCodeMap::new()
            }
        }
    }

    fn analyze_prepared(
        &mut self,
        branch: &Branch,
        roots: &[RootVariable],
        sites: &[Instruction],
        seed: &TestChromosome,
        map: &GraphToCodeMap,
        trials: usize,
    ) -> ValuePreservance {
        let mut report = ValuePreservance::new(
            branch.id,
            roots.to_vec(),
            sites.to_vec(),
            self.similarity.clone(),
        );
        report.resolved_heads = self.resolve_heads(roots, seed.test_case(), map);

        for trial in 0..trials {
            let mut chromosome = seed.clone();
            let mut inputs = MethodInputs::build(roots, chromosome.test_case(), map);
            if inputs.mutate(chromosome.test_case_mut(), &self.mutator, &mut self.rng).is_none() {
                debug!(trial, "Nothing to mutate");
            }

            let observations = ObservationHarness::new(
                self.collaborators.sandbox.as_mut(),
                self.collaborators.fitness.as_mut(),
            )
            .observe(branch, sites, &mut chromosome);
            debug!(trial, captured = observations.values().map(Vec::len).sum::<usize>(), "Trial done");
            report.add_record(ObservationRecord::new(trial, 0, inputs, observations));
        }
        info!(
            branch = %branch.id,
            records = report.len(),
            sensitivity = report.sensitivity_ratio(),
            preservation = report.value_preservation_ratio(),
            "Analysis complete"
        );
        report
    }

    fn resolve_heads(
        &mut self,
        roots: &[RootVariable],
        test: &TestCase,
        map: &GraphToCodeMap,
    ) -> Vec<ResolvedHead> {
        let collector = HeadCollector::new(&self.resolver);
        let mut heads = Vec::new();
        for root in roots {
            match self.resolver.resolve(root, test, map, &mut self.rng) {
                Ok(input) => {
                    let head_positions = match &input {
                        ResolvedInput::Statement(pos) => {
                            collector.head_statements(test, *pos, &mut self.rng)
                        }
                        ResolvedInput::Constant(_) => Vec::new(),
                    };
                    heads.push(ResolvedHead {
                        root: root.key(),
                        input,
                        head_positions,
                    });
                }
                Err(e) => warn!(root = %root.key().0, error = %e, "Root variable skipped"),
            }
        }
        heads
    }
}
