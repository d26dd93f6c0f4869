use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::comparator::{ScenarioComparator, ScenarioDelta};
use super::suggestions::{self, ImprovementPlan, DEFAULT_MAX_SUGGESTIONS};
use crate::decisioning::{
    ApplicationRecord, Decision, DecisionEngine, DecisionError, Field, FieldKind, FieldValue,
};

/// Field overrides applied on top of a baseline record.
pub type Modifications = BTreeMap<Field, FieldValue>;

/// Named set of modifications for batch runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub modifications: Modifications,
}

impl Scenario {
    pub fn new(modifications: Modifications) -> Self {
        Self {
            name: None,
            modifications,
        }
    }

    pub fn named(name: impl Into<String>, modifications: Modifications) -> Self {
        Self {
            name: Some(name.into()),
            modifications,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub baseline: Decision,
    pub variant: Decision,
    pub modifications: Modifications,
    pub modified_fields: Vec<Field>,
    pub delta: ScenarioDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub scenario_id: usize,
    pub scenario_name: String,
    #[serde(flatten)]
    pub result: SimulationResult,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("modification '{0}' must look like field=value")]
    MalformedAssignment(String),
    #[error("{field} expects a number (found '{value}')")]
    InvalidNumber { field: Field, value: String },
}

/// Parse a `field=value` assignment, typing the value by the field's kind.
pub fn parse_assignment(raw: &str) -> Result<(Field, FieldValue), SimulationError> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| SimulationError::MalformedAssignment(raw.to_string()))?;
    let name = name.trim();
    let value = value.trim();

    let field =
        Field::parse(name).ok_or_else(|| SimulationError::UnknownField(name.to_string()))?;

    let value = match field.kind() {
        FieldKind::Numeric => value
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .map(FieldValue::Number)
            .ok_or_else(|| SimulationError::InvalidNumber {
                field,
                value: value.to_string(),
            })?,
        FieldKind::Categorical => FieldValue::Text(value.to_string()),
    };

    Ok((field, value))
}

/// Re-decides modified copies of a baseline application and compares them with the baseline.
#[derive(Debug, Clone)]
pub struct WhatIfSimulator {
    engine: DecisionEngine,
    comparator: ScenarioComparator,
    max_suggestions: usize,
}

impl WhatIfSimulator {
    pub fn new(engine: DecisionEngine) -> Self {
        Self {
            engine,
            comparator: ScenarioComparator::default(),
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }

    pub fn with_comparator(mut self, comparator: ScenarioComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn simulate(
        &self,
        baseline: &ApplicationRecord,
        modifications: &Modifications,
    ) -> Result<SimulationResult, SimulationError> {
        let baseline_decision = self.engine.decide(baseline)?;
        self.simulate_against(baseline, &baseline_decision, modifications)
    }

    /// Scenarios are numbered from 1 and named `Scenario N` unless named explicitly. The baseline
    /// is decided once and shared by every comparison.
    pub fn batch_simulate(
        &self,
        baseline: &ApplicationRecord,
        scenarios: &[Scenario],
    ) -> Result<Vec<ScenarioResult>, SimulationError> {
        let baseline_decision = self.engine.decide(baseline)?;

        scenarios
            .iter()
            .enumerate()
            .map(|(index, scenario)| {
                let scenario_id = index + 1;
                let result =
                    self.simulate_against(baseline, &baseline_decision, &scenario.modifications)?;
                Ok(ScenarioResult {
                    scenario_id,
                    scenario_name: scenario
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("Scenario {scenario_id}")),
                    result,
                })
            })
            .collect()
    }

    pub fn suggest_improvements(
        &self,
        record: &ApplicationRecord,
        decision: &Decision,
    ) -> ImprovementPlan {
        suggestions::suggest_improvements(record, decision, self.max_suggestions)
    }

    fn simulate_against(
        &self,
        baseline: &ApplicationRecord,
        baseline_decision: &Decision,
        modifications: &Modifications,
    ) -> Result<SimulationResult, SimulationError> {
        let modified = baseline.with_changes(modifications);
        let variant = self.engine.decide(&modified)?;
        let delta = self.comparator.compare(baseline_decision, &variant);

        debug!(
            modified_fields = modifications.len(),
            direction = ?delta.direction,
            impact = %delta.impact,
            "what-if scenario evaluated"
        );

        Ok(SimulationResult {
            baseline: baseline_decision.clone(),
            variant,
            modifications: modifications.clone(),
            modified_fields: modifications.keys().copied().collect(),
            delta,
        })
    }
}
