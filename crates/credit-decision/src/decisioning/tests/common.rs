use std::sync::Arc;

use crate::decisioning::domain::{ApplicationId, ApplicationRecord, CreditApplication, Field};
use crate::decisioning::risk::{RiskResult, RiskScorer, ScoringError};
use crate::decisioning::rules::{Condition, Rule, RuleAction, RuleSet, Severity};
use crate::decisioning::DecisionEngine;

/// Scorer returning the same score for every record.
pub(super) struct FixedScorer(pub f64);

impl RiskScorer for FixedScorer {
    fn score(&self, _record: &ApplicationRecord) -> Result<f64, ScoringError> {
        Ok(self.0)
    }
}

pub(super) struct FailingScorer;

impl RiskScorer for FailingScorer {
    fn score(&self, _record: &ApplicationRecord) -> Result<f64, ScoringError> {
        Err(ScoringError::Unavailable("model offline".to_string()))
    }
}

pub(super) fn rule(
    rule_id: &str,
    condition: &str,
    severity: Severity,
    action: RuleAction,
    override_allowed: bool,
) -> Rule {
    Rule {
        rule_id: rule_id.to_string(),
        rule_name: rule_id.to_lowercase(),
        condition: Condition::parse(condition).expect("test condition parses"),
        severity,
        action,
        override_allowed,
        reason_th: format!("เหตุผล {rule_id}"),
        reason_en: format!("reason {rule_id}"),
        recommendation_th: format!("คำแนะนำ {rule_id}"),
        recommendation_en: format!("recommendation {rule_id}"),
        policy_reference: Some(format!("Policy {rule_id}")),
    }
}

/// Rule that always fires.
pub(super) fn always(rule_id: &str, severity: Severity, action: RuleAction) -> Rule {
    rule(rule_id, "True", severity, action, true)
}

pub(super) fn risk(score: f64) -> RiskResult {
    RiskResult::from_score(score).expect("test score in range")
}

pub(super) fn engine_with(rules: Vec<Rule>, score: f64) -> DecisionEngine {
    DecisionEngine::new(
        Arc::new(RuleSet::new(rules).expect("valid rule set")),
        Arc::new(FixedScorer(score)),
    )
}

pub(super) fn standard_engine(score: f64) -> DecisionEngine {
    DecisionEngine::new(
        Arc::new(RuleSet::standard().expect("embedded rules load")),
        Arc::new(FixedScorer(score)),
    )
}

pub(super) fn record() -> ApplicationRecord {
    ApplicationRecord::new(Some(ApplicationId("APP-T1".to_string())))
        .with(Field::MonthlyIncome, 45000.0)
        .with(Field::DebtToIncome, 0.3)
        .with(Field::LatePaymentCount, 0u32)
        .with(Field::EmploymentType, "permanent")
}

pub(super) fn application() -> CreditApplication {
    CreditApplication {
        application_id: Some("APP-T2".to_string()),
        monthly_income: 25000.0,
        employment_years: 2,
        employment_type: "contract".to_string(),
        debt_to_income: 0.55,
        existing_loans: 3,
        late_payment_count: 2,
        credit_utilization: 0.75,
        requested_amount: 500000.0,
        loan_purpose: "personal".to_string(),
        age: 28,
        education_level: "bachelor".to_string(),
        marital_status: "single".to_string(),
        dependents: 0,
        home_ownership: "rent".to_string(),
        savings_balance: 50000.0,
        checking_balance: 10000.0,
        credit_history_length: 3,
        previous_defaults: 0,
    }
}
