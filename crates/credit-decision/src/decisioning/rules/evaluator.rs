use serde::Serialize;
use tracing::warn;

use super::condition::EvalError;
use super::{Rule, RuleSet};
use crate::decisioning::domain::ApplicationRecord;

/// Triggered rules ordered by severity rank, declaration order preserved within a rank.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TriggeredRules(Vec<Rule>);

impl TriggeredRules {
    /// Order `rules` (given in declaration order) by severity with a stable sort.
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|rule| rule.severity.rank());
        Self(rules)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Rule] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.0.get(index)
    }

    /// Index of the first rule (in severity order) matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&Rule) -> bool) -> Option<usize> {
        self.0.iter().position(predicate)
    }

    pub fn any(&self, predicate: impl Fn(&Rule) -> bool) -> bool {
        self.0.iter().any(predicate)
    }
}

impl<'a> IntoIterator for &'a TriggeredRules {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A single rule whose condition could not be evaluated; the rule is treated as not triggered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("rule '{rule_id}' could not be evaluated: {source}")]
pub struct RuleEvaluationError {
    pub rule_id: String,
    #[source]
    pub source: EvalError,
}

/// Result of running every rule against one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleEvaluation {
    pub triggered: TriggeredRules,
    pub failures: Vec<RuleEvaluationError>,
}

/// Stateless evaluator applying a rule set to an application record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, record: &ApplicationRecord, rules: &RuleSet) -> RuleEvaluation {
        let mut triggered = Vec::new();
        let mut failures = Vec::new();

        for rule in rules.rules() {
            match rule.condition.evaluate(record) {
                Ok(true) => triggered.push(rule.clone()),
                Ok(false) => {}
                Err(source) => {
                    warn!(
                        rule_id = %rule.rule_id,
                        condition = %rule.condition,
                        error = %source,
                        "rule evaluation failed; treating as not triggered"
                    );
                    failures.push(RuleEvaluationError {
                        rule_id: rule.rule_id.clone(),
                        source,
                    });
                }
            }
        }

        RuleEvaluation {
            triggered: TriggeredRules::new(triggered),
            failures,
        }
    }
}
