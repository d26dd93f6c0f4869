use super::common::*;
use crate::decisioning::domain::ApplicationRecord;
use crate::decisioning::policy::{DecisionCombiner, DecisionReason, PolicyContext};
use crate::decisioning::risk::CreditDecision;
use crate::decisioning::rules::{Rule, RuleAction, Severity, TriggeredRules};

fn combine(score: f64, rules: Vec<Rule>) -> crate::decisioning::policy::Decision {
    DecisionCombiner::new().combine(&risk(score), TriggeredRules::new(rules), &record())
}

#[test]
fn approves_low_risk_profile_without_rules() {
    let decision = combine(0.8, Vec::new());

    assert_eq!(decision.final_decision(), CreditDecision::Approved);
    assert_eq!(decision.decision_reason(), DecisionReason::LowRiskProfile);
    assert!((decision.confidence() - 0.6).abs() < 1e-12);
    assert!(!decision.override_allowed());
    assert!(decision.primary_rule().is_none());
}

#[test]
fn critical_reject_beats_approve_rules() {
    let decision = combine(
        0.95,
        vec![
            always("GOOD_1", Severity::Low, RuleAction::Approve),
            always("GOOD_2", Severity::Low, RuleAction::Approve),
            always("CRIT", Severity::Critical, RuleAction::Reject),
        ],
    );

    assert_eq!(decision.final_decision(), CreditDecision::Rejected);
    assert_eq!(decision.decision_reason(), DecisionReason::CriticalRuleViolation);
    assert_eq!(decision.confidence(), 1.0);
    assert!(!decision.override_allowed());
    assert_eq!(
        decision.primary_rule().map(|rule| rule.rule_id.as_str()),
        Some("CRIT")
    );
}

#[test]
fn critical_reject_never_allows_override_even_if_rule_does() {
    let decision = combine(
        0.2,
        vec![rule("CRIT", "True", Severity::Critical, RuleAction::Reject, true)],
    );

    assert!(!decision.override_allowed());
}

#[test]
fn high_reject_uses_rule_override_flag() {
    let decision = combine(
        0.3,
        vec![rule("HIGH", "True", Severity::High, RuleAction::Reject, false)],
    );

    assert_eq!(decision.final_decision(), CreditDecision::Rejected);
    assert_eq!(decision.decision_reason(), DecisionReason::HighRiskFactors);
    assert!(!decision.override_allowed());
    assert_eq!(decision.confidence(), 0.85);

    let overridable = combine(
        0.9,
        vec![rule("HIGH", "True", Severity::High, RuleAction::Reject, true)],
    );
    assert_eq!(overridable.final_decision(), CreditDecision::Rejected);
    assert!(overridable.override_allowed());
}

#[test]
fn high_review_does_not_force_rejection() {
    let decision = combine(0.75, vec![always("HIGH", Severity::High, RuleAction::Review)]);

    assert_eq!(decision.final_decision(), CreditDecision::Approved);
    assert_eq!(decision.decision_reason(), DecisionReason::LowRiskProfile);
}

#[test]
fn medium_rule_rejects_only_with_ml_rejection() {
    let rejected = combine(0.45, vec![always("MED", Severity::Medium, RuleAction::Review)]);
    assert_eq!(rejected.final_decision(), CreditDecision::Rejected);
    assert_eq!(rejected.decision_reason(), DecisionReason::MediumRiskFactors);
    assert_eq!(rejected.confidence(), 0.7);
    assert!(rejected.override_allowed());
    assert_eq!(
        rejected.primary_rule().map(|rule| rule.rule_id.as_str()),
        Some("MED")
    );

    let approved = combine(0.6, vec![always("MED", Severity::Medium, RuleAction::Review)]);
    assert_eq!(approved.final_decision(), CreditDecision::Approved);
    assert_eq!(approved.decision_reason(), DecisionReason::LowRiskProfile);
}

#[test]
fn approval_names_first_approve_rule() {
    let decision = combine(
        0.7,
        vec![
            always("MED", Severity::Medium, RuleAction::Review),
            always("STABLE", Severity::Low, RuleAction::Approve),
            always("RESERVES", Severity::Low, RuleAction::Approve),
        ],
    );

    assert_eq!(
        decision.primary_rule().map(|rule| rule.rule_id.as_str()),
        Some("STABLE")
    );
}

#[test]
fn ml_rejection_is_never_overturned_by_approve_rules() {
    let decision = combine(0.2, vec![always("GOOD", Severity::Low, RuleAction::Approve)]);

    assert_eq!(decision.final_decision(), CreditDecision::Rejected);
    assert_eq!(decision.decision_reason(), DecisionReason::MlBasedDecision);
    assert!(decision.override_allowed());
    assert!((decision.confidence() - 0.6).abs() < 1e-12);
    assert!(decision.primary_rule().is_none());
}

#[test]
fn combine_is_deterministic() {
    let rules = vec![
        always("MED", Severity::Medium, RuleAction::Review),
        always("GOOD", Severity::Low, RuleAction::Approve),
    ];

    let first = combine(0.55, rules.clone());
    let second = combine(0.55, rules);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("serializes"),
        serde_json::to_string(&second).expect("serializes")
    );
}

#[test]
fn approved_decisions_never_carry_critical_or_high_rejects() {
    let catalogue = [
        always("CRIT", Severity::Critical, RuleAction::Reject),
        always("HIGH", Severity::High, RuleAction::Reject),
        always("MED", Severity::Medium, RuleAction::Review),
        always("GOOD", Severity::Low, RuleAction::Approve),
    ];

    for mask in 0u8..16 {
        let rules: Vec<Rule> = catalogue
            .iter()
            .enumerate()
            .filter(|(index, _)| mask & (1 << index) != 0)
            .map(|(_, rule)| rule.clone())
            .collect();

        for step in 0..=10 {
            let decision = combine(step as f64 / 10.0, rules.clone());
            if decision.is_approved() {
                assert!(!decision.triggered_rules().any(|rule| {
                    rule.action == RuleAction::Reject
                        && matches!(rule.severity, Severity::Critical | Severity::High)
                }));
            }
        }
    }
}

#[test]
fn policy_table_is_ordered_and_inspectable() {
    let combiner = DecisionCombiner::new();
    let reasons: Vec<DecisionReason> = combiner.policy().iter().map(|step| step.reason).collect();

    assert_eq!(
        reasons,
        [
            DecisionReason::CriticalRuleViolation,
            DecisionReason::HighRiskFactors,
            DecisionReason::MediumRiskFactors,
            DecisionReason::LowRiskProfile,
            DecisionReason::MlBasedDecision,
        ]
    );

    let triggered = TriggeredRules::new(vec![always("MED", Severity::Medium, RuleAction::Review)]);
    let risk = risk(0.6);
    let record = ApplicationRecord::default();
    let context = PolicyContext {
        risk: &risk,
        triggered: &triggered,
        record: &record,
    };

    let matches: Vec<bool> = combiner
        .policy()
        .iter()
        .map(|step| step.apply(&context).is_some())
        .collect();
    assert_eq!(matches, [false, false, false, true, true]);
}

#[test]
fn decision_carries_application_id() {
    let decision = combine(0.9, Vec::new());

    assert_eq!(
        decision.application_id().map(|id| id.0.as_str()),
        Some("APP-T1")
    );
}
