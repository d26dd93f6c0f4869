//! Rule-augmented credit decisioning: rule evaluation, risk banding, and the decision table that
//! merges both into one [`Decision`].

pub mod domain;
pub mod explanation;
pub mod policy;
pub mod risk;
pub mod rules;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, ApplicationRecord, CreditApplication, Field, FieldKind, FieldValue,
    InputContractError,
};
pub use explanation::{Explanation, ExplanationFormatter, ExplanationStyle, Language};
pub use policy::{Decision, DecisionCombiner, DecisionReason, PolicyContext, PolicyStep, PolicyVerdict};
pub use risk::{
    confidence, CreditDecision, ReferenceScorecard, RiskBand, RiskResult, RiskScorer, ScoringError,
};
pub use rules::{
    Condition, ConditionError, Rule, RuleAction, RuleEvaluation, RuleEvaluationError,
    RuleEvaluator, RuleSet, RuleSetError, Severity, TriggeredRules,
};

use std::sync::Arc;

use tracing::debug;

/// Failures that stop a single decision from being produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionError {
    #[error(transparent)]
    InputContract(#[from] InputContractError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Decision plus the rules that could not be evaluated along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRun {
    pub decision: Decision,
    pub rule_failures: Vec<RuleEvaluationError>,
}

/// Scorer, rule evaluator, and decision table wired together over a shared rule set.
#[derive(Clone)]
pub struct DecisionEngine {
    rules: Arc<RuleSet>,
    scorer: Arc<dyn RiskScorer>,
    evaluator: RuleEvaluator,
    combiner: DecisionCombiner,
}

impl DecisionEngine {
    pub fn new(rules: Arc<RuleSet>, scorer: Arc<dyn RiskScorer>) -> Self {
        Self {
            rules,
            scorer,
            evaluator: RuleEvaluator::new(),
            combiner: DecisionCombiner::new(),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn decide(&self, record: &ApplicationRecord) -> Result<Decision, DecisionError> {
        self.run(record).map(|run| run.decision)
    }

    pub fn run(&self, record: &ApplicationRecord) -> Result<DecisionRun, DecisionError> {
        let score = self.scorer.score(record)?;
        let risk = RiskResult::from_score(score)?;
        Ok(self.run_with_risk(record, &risk))
    }

    /// Decide with an externally produced, already validated risk result.
    pub fn run_with_risk(&self, record: &ApplicationRecord, risk: &RiskResult) -> DecisionRun {
        let evaluation = self.evaluator.evaluate(record, &self.rules);
        let decision = self.combiner.combine(risk, evaluation.triggered, record);

        debug!(
            application_id = ?decision.application_id().map(|id| id.0.as_str()),
            decision = %decision.final_decision(),
            reason = %decision.decision_reason(),
            score = risk.score,
            triggered = decision.triggered_rules().len(),
            "credit decision made"
        );

        DecisionRun {
            decision,
            rule_failures: evaluation.failures,
        }
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}
