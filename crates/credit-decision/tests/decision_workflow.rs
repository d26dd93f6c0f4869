use std::sync::Arc;

use credit_decision::decisioning::{
    CreditApplication, CreditDecision, DecisionEngine, DecisionReason, ExplanationFormatter,
    ExplanationStyle, Language, ReferenceScorecard, RiskBand, RuleSet, Severity,
};

fn standard_engine() -> DecisionEngine {
    let rules = RuleSet::standard().expect("embedded rules parse");
    let scorecard = ReferenceScorecard::standard().expect("scorecard factors parse");
    DecisionEngine::new(Arc::new(rules), Arc::new(scorecard))
}

fn established_applicant() -> CreditApplication {
    CreditApplication {
        application_id: Some("APP-IT-001".to_string()),
        monthly_income: 85000.0,
        employment_years: 8,
        employment_type: "permanent".to_string(),
        debt_to_income: 0.25,
        existing_loans: 1,
        late_payment_count: 0,
        credit_utilization: 0.3,
        requested_amount: 400000.0,
        loan_purpose: "car".to_string(),
        age: 38,
        education_level: "master".to_string(),
        marital_status: "married".to_string(),
        dependents: 1,
        home_ownership: "own".to_string(),
        savings_balance: 600000.0,
        checking_balance: 80000.0,
        credit_history_length: 10,
        previous_defaults: 0,
    }
}

fn stretched_applicant() -> CreditApplication {
    CreditApplication {
        application_id: Some("APP-IT-002".to_string()),
        monthly_income: 25000.0,
        employment_years: 1,
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

#[test]
fn embedded_rule_set_loads_every_severity() {
    let rules = RuleSet::standard().expect("embedded rules parse");

    for severity in [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ] {
        assert!(
            rules.rules().iter().any(|rule| rule.severity == severity),
            "expected at least one {severity:?} rule"
        );
    }
    assert!(rules.get("DTI_CRITICAL").is_some());
}

#[test]
fn established_applicant_is_approved_with_low_risk() {
    let application = established_applicant();
    application.validate().expect("valid application");

    let decision = standard_engine()
        .decide(&application.to_record())
        .expect("decides");

    assert_eq!(decision.final_decision(), CreditDecision::Approved);
    assert_eq!(decision.decision_reason(), DecisionReason::LowRiskProfile);
    assert_eq!(decision.risk_result().risk_band, RiskBand::Low);
    assert!(decision
        .triggered_rules()
        .iter()
        .all(|rule| rule.severity == Severity::Low));
    assert_eq!(
        decision.application_id().map(|id| id.0.as_str()),
        Some("APP-IT-001")
    );
}

#[test]
fn stretched_applicant_is_rejected_on_medium_factors() {
    let decision = standard_engine()
        .decide(&stretched_applicant().to_record())
        .expect("decides");

    assert_eq!(decision.final_decision(), CreditDecision::Rejected);
    assert_eq!(decision.decision_reason(), DecisionReason::MediumRiskFactors);
    assert_eq!(decision.confidence(), 0.7);
    assert!(decision.override_allowed());
    let ids: Vec<&str> = decision
        .triggered_rules()
        .iter()
        .map(|rule| rule.rule_id.as_str())
        .collect();
    assert!(ids.contains(&"DTI_ELEVATED"));
    assert!(ids.contains(&"AMOUNT_TO_INCOME"));
}

#[test]
fn prior_default_is_a_critical_rejection_even_for_strong_profiles() {
    let mut application = established_applicant();
    application.previous_defaults = 1;

    let decision = standard_engine()
        .decide(&application.to_record())
        .expect("decides");

    assert_eq!(decision.final_decision(), CreditDecision::Rejected);
    assert_eq!(
        decision.decision_reason(),
        DecisionReason::CriticalRuleViolation
    );
    assert_eq!(decision.confidence(), 1.0);
    assert!(!decision.override_allowed());
    assert_eq!(
        decision.primary_rule().map(|rule| rule.rule_id.as_str()),
        Some("DEFAULT_HISTORY")
    );
}

#[test]
fn english_explanation_lists_reasons_and_citations() {
    let decision = standard_engine()
        .decide(&stretched_applicant().to_record())
        .expect("decides");

    let explanation =
        ExplanationFormatter::new(Language::English, ExplanationStyle::Formal).explain(&decision);

    assert_eq!(explanation.decision, CreditDecision::Rejected);
    assert_eq!(explanation.application_id.as_deref(), Some("APP-IT-002"));
    assert!(!explanation.reasons.is_empty());
    assert!(explanation.reasons.len() <= 5);
    assert!(!explanation.recommendations.is_empty());
    assert!(explanation.recommendations.len() <= 3);
    assert!(explanation.policy_citations.len() <= 3);

    let text = explanation.render_text();
    assert!(text.contains("CREDIT DECISION EXPLANATION"));
    assert!(text.contains("Application ID: APP-IT-002"));
    assert!(text.contains("Decision: REJECTED"));
    assert!(text.contains("Key Reasons:"));
}

#[test]
fn approved_explanation_carries_no_recommendations() {
    let decision = standard_engine()
        .decide(&established_applicant().to_record())
        .expect("decides");

    let explanation =
        ExplanationFormatter::new(Language::Thai, ExplanationStyle::Short).explain(&decision);

    assert_eq!(explanation.language, Language::Thai);
    assert!(explanation.recommendations.is_empty());
    assert!(!explanation.summary.is_empty());
}
