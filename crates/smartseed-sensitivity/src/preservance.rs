//! Trial records and the preservation report derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartseed_types::{BranchId, Instruction, RootVariable, Value, VariableKey};

use crate::error::SensitivityResult;
use crate::harness::ObservationMap;
use crate::inputs::MethodInputs;
use crate::resolver::ResolvedInput;
use crate::similarity::ValueSimilarity;

// ── Identifiers ─────────────────────────────────────────────────────

/// Unique identifier for one analysis call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisId(pub String);

impl AnalysisId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "analysis:{}", self.0)
    }
}

// ── Records ─────────────────────────────────────────────────────────

/// Outcome of one trial.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Trial index inside its group.
    pub trial: usize,
    /// Probed path this trial belongs to; consecutive records are compared only inside a group.
    pub group: usize,
    pub inputs: MethodInputs,
    pub observations: ObservationMap,
    pub recorded_at: DateTime<Utc>,
}

impl ObservationRecord {
    pub fn new(trial: usize, group: usize, inputs: MethodInputs, observations: ObservationMap) -> Self {
        Self {
            trial,
            group,
            inputs,
            observations,
            recorded_at: Utc::now(),
        }
    }

    pub fn head_values(&self) -> Vec<Value> {
        self.inputs.head_values()
    }

    /// Every captured value, sites in identity order.
    pub fn tail_values(&self) -> Vec<Value> {
        self.observations.values().flatten().cloned().collect()
    }

    /// Some head value is similar to some tail value.
    pub fn is_value_preserving(&self, similarity: &ValueSimilarity) -> bool {
        let heads = self.head_values();
        let tails = self.tail_values();
        heads
            .iter()
            .any(|h| tails.iter().any(|t| similarity.similar(h, t)))
    }
}

/// A root variable and the statements that realize it in the seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHead {
    pub root: VariableKey,
    pub input: ResolvedInput,
    /// Primitive statements feeding the resolved statement.
    pub head_positions: Vec<usize>,
}

// ── Report ──────────────────────────────────────────────────────────

/// Aggregate of all trials for one (branch, root variables, observation sites) request.
///
/// Ratios are derived on demand. An empty report means "no signal", not "no influence".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValuePreservance {
    pub id: AnalysisId,
    pub branch: Option<BranchId>,
    pub root_variables: Vec<RootVariable>,
    pub observations: Vec<Instruction>,
    pub resolved_heads: Vec<ResolvedHead>,
    records: Vec<ObservationRecord>,
    similarity: ValueSimilarity,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    preservance: &'a ValuePreservance,
    sensitivity_ratio: f64,
    value_preservation_ratio: f64,
}

impl ValuePreservance {
    pub fn new(
        branch: BranchId,
        root_variables: Vec<RootVariable>,
        observations: Vec<Instruction>,
        similarity: ValueSimilarity,
    ) -> Self {
        Self {
            id: AnalysisId::new(),
            branch: Some(branch),
            root_variables,
            observations,
            resolved_heads: Vec::new(),
            records: Vec::new(),
            similarity,
            created_at: Utc::now(),
        }
    }

    /// A report without any trial, returned when an analysis could not run.
    pub fn empty(branch: Option<BranchId>, similarity: ValueSimilarity) -> Self {
        Self {
            id: AnalysisId::new(),
            branch,
            root_variables: Vec::new(),
            observations: Vec::new(),
            resolved_heads: Vec::new(),
            records: Vec::new(),
            similarity,
            created_at: Utc::now(),
        }
    }

    pub fn add_record(&mut self, record: ObservationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn similarity(&self) -> &ValueSimilarity {
        &self.similarity
    }

    /// Number of groups (probed paths) contributing records.
    pub fn group_count(&self) -> usize {
        let mut groups: Vec<usize> = self.records.iter().map(|r| r.group).collect();
        groups.dedup();
        groups.len()
    }

    pub fn value_preserving_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.is_value_preserving(&self.similarity))
            .count()
    }

    /// Trials whose head and tail both changed relative to the previous trial of their group.
    ///
    /// A null or missing head or tail on either side never counts.
    pub fn sensitivity_preserving_count(&self) -> usize {
        self.records
            .windows(2)
            .filter(|pair| pair[0].group == pair[1].group)
            .filter(|pair| {
                let (prev_heads, heads) = (pair[0].head_values(), pair[1].head_values());
                let (prev_tails, tails) = (pair[0].tail_values(), pair[1].tail_values());
                let usable = |values: &[Value]| !values.is_empty() && !values.iter().any(Value::is_null);
                usable(&prev_heads)
                    && usable(&heads)
                    && usable(&prev_tails)
                    && usable(&tails)
                    && heads != prev_heads
                    && tails != prev_tails
            })
            .count()
    }

    pub fn sensitivity_ratio(&self) -> f64 {
        self.ratio(self.sensitivity_preserving_count())
    }

    pub fn value_preservation_ratio(&self) -> f64 {
        self.ratio(self.value_preserving_count())
    }

    fn ratio(&self, count: usize) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            count as f64 / self.records.len() as f64
        }
    }

    /// Non-empty and at least `min_ratio` of the trials preserved the value.
    pub fn is_value_preserving(&self, min_ratio: f64) -> bool {
        !self.is_empty() && self.value_preservation_ratio() >= min_ratio
    }

    /// Non-empty and at least `min_ratio` of the trials propagated the mutation.
    pub fn is_sensitivity_preserving(&self, min_ratio: f64) -> bool {
        !self.is_empty() && self.sensitivity_ratio() >= min_ratio
    }

    /// Append another report's records as new groups after this one's.
    ///
    /// Root variables, sites and resolved heads are unioned by equality.
    pub fn merge(&mut self, other: ValuePreservance) {
        let offset = self.records.iter().map(|r| r.group + 1).max().unwrap_or(0);
        if self.branch.is_none() {
            self.branch = other.branch;
        }
        for root in other.root_variables {
            if !self.root_variables.contains(&root) {
                self.root_variables.push(root);
            }
        }
        for site in other.observations {
            if !self.observations.contains(&site) {
                self.observations.push(site);
            }
        }
        for head in other.resolved_heads {
            if !self.resolved_heads.contains(&head) {
                self.resolved_heads.push(head);
            }
        }
        self.records.extend(other.records.into_iter().map(|mut r| {
            r.group += offset;
            r
        }));
    }

    /// JSON export with the derived ratios alongside the raw records.
    pub fn to_json(&self) -> SensitivityResult<String> {
        let report = Report {
            preservance: self,
            sensitivity_ratio: self.sensitivity_ratio(),
            value_preservation_ratio: self.value_preservation_ratio(),
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

impl std::fmt::Display for ValuePreservance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let branch = self
            .branch
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{} [{}] trials={} sensitivity={:.2} preservation={:.2}",
            self.id,
            branch,
            self.records.len(),
            self.sensitivity_ratio(),
            self.value_preservation_ratio()
        )
    }
}
