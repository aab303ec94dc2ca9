//! Executing a test case in an isolated context and capturing values at observation sites.

use std::collections::{BTreeMap, BTreeSet};

use smartseed_types::{Branch, Instruction, InstructionId, TestChromosome, Value};
use tracing::{debug, warn};

use crate::collaborators::{ExecutionSandbox, FitnessFramework};
use crate::error::SensitivityError;

/// Captured values per observation site, in capture order.
pub type ObservationMap = BTreeMap<InstructionId, Vec<Value>>;

/// Probe sink for one execution.
///
/// Only pre-registered sites accept values; probes firing elsewhere are dropped.
#[derive(Clone, Debug, Default)]
pub struct ObservationBuffer {
    sites: ObservationMap,
}

impl ObservationBuffer {
    /// A buffer with one empty sequence per site.
    pub fn for_sites(sites: &[Instruction]) -> Self {
        Self {
            sites: sites.iter().map(|s| (s.id(), Vec::new())).collect(),
        }
    }

    pub fn is_registered(&self, site: &InstructionId) -> bool {
        self.sites.contains_key(site)
    }

    /// Append a captured value; `false` if the site is not registered.
    pub fn record(&mut self, site: &InstructionId, value: Value) -> bool {
        match self.sites.get_mut(site) {
            Some(values) => {
                values.push(value);
                true
            }
            None => false,
        }
    }

    pub fn values(&self, site: &InstructionId) -> Option<&[Value]> {
        self.sites.get(site).map(Vec::as_slice)
    }

    fn clear_site(&mut self, site: &InstructionId) {
        if let Some(values) = self.sites.get_mut(site) {
            values.clear();
        }
    }

    pub fn into_map(self) -> ObservationMap {
        self.sites
    }
}

/// Runs one observed execution of a chromosome against a branch.
pub struct ObservationHarness<'a> {
    sandbox: &'a mut dyn ExecutionSandbox,
    fitness: &'a mut dyn FitnessFramework,
}

impl<'a> ObservationHarness<'a> {
    pub fn new(sandbox: &'a mut dyn ExecutionSandbox, fitness: &'a mut dyn FitnessFramework) -> Self {
        Self { sandbox, fitness }
    }

    /// Execute `chromosome` and return the values captured at `sites`.
    ///
    /// Every site has an entry. A site whose class failed to load keeps an empty sequence, and
    /// a missing fitness goal leaves every sequence empty.
    pub fn observe(
        &mut self,
        branch: &Branch,
        sites: &[Instruction],
        chromosome: &mut TestChromosome,
    ) -> ObservationMap {
        chromosome.add_fitness(self.fitness.branch_goal(branch));

        self.register_targets(sites, chromosome);

        let mut loader = self.sandbox.create_loader(sites);
        let mut unloaded = BTreeSet::new();
        for site in sites {
            if loader.is_loaded(&site.class_name) {
                continue;
            }
            if let Err(e) = self.sandbox.load_class(&mut loader, &site.class_name) {
                warn!(site = %site.id(), error = %e, "Observation site unavailable");
                unloaded.insert(site.class_name.clone());
            }
        }

        let mut buffer = ObservationBuffer::for_sites(sites);

        chromosome.bind_loader(loader);
        let goal = match chromosome.find_fitness(branch.id) {
            Some(goal) => goal.clone(),
            None => {
                let e = SensitivityError::MissingFitness(branch.id.to_string());
                warn!(error = %e, "Observation skipped");
                return buffer.into_map();
            }
        };
        chromosome.clear_cached_results();
        let fitness = self.fitness.evaluate(&goal, chromosome, &mut buffer);
        chromosome.set_fitness_value(branch.id, fitness);

        for site in sites.iter().filter(|s| unloaded.contains(&s.class_name)) {
            buffer.clear_site(&site.id());
        }
        debug!(branch = %branch.id, fitness, sites = sites.len(), "Observed execution");
        buffer.into_map()
    }

    /// Register the declaring classes of the sites and the qualified types the test uses.
    fn register_targets(&mut self, sites: &[Instruction], chromosome: &TestChromosome) {
        let mut classes: BTreeSet<String> = sites.iter().map(|s| s.class_name.clone()).collect();
        for statement in chromosome.test_case().statements() {
            let ty = statement.return_type.element_type();
            if ty.is_qualified() {
                classes.insert(ty.as_str().to_string());
            }
        }
        for class in &classes {
            self.sandbox.register_target_class(class);
        }
    }
}
