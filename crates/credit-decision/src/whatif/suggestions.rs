//! Best-effort mapping from triggered rules back to field changes an applicant could make.
//!
//! Matching is substring-based over rule ids and condition text and only recognizes debt ratio,
//! late payments, income, and savings. It is a hint for applicants, not an optimizer.

use serde::Serialize;

use crate::decisioning::{ApplicationRecord, Decision, Field, Rule, Severity};

pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;

const TARGET_DEBT_TO_INCOME: f64 = 0.35;
const INCOME_UPLIFT: f64 = 1.2;
const SAVINGS_MONTHS: f64 = 3.0;
const FALLBACK_MONTHLY_INCOME: f64 = 50_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub rule_id: String,
    pub field: Field,
    pub current_value: f64,
    pub suggested_value: f64,
    pub reason: String,
    pub priority: SuggestionPriority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImprovementPlan {
    AlreadyApproved,
    Suggestions { suggestions: Vec<Suggestion> },
}

impl ImprovementPlan {
    pub fn suggestions(&self) -> &[Suggestion] {
        match self {
            ImprovementPlan::AlreadyApproved => &[],
            ImprovementPlan::Suggestions { suggestions } => suggestions,
        }
    }
}

/// Walk critical, high, and medium triggered rules in decision order and keep at most `limit`
/// suggestions. Duplicates are kept when several rules map to the same field.
pub fn suggest_improvements(
    record: &ApplicationRecord,
    decision: &Decision,
    limit: usize,
) -> ImprovementPlan {
    if decision.is_approved() {
        return ImprovementPlan::AlreadyApproved;
    }

    let suggestions = decision
        .triggered_rules()
        .iter()
        .filter(|rule| {
            matches!(
                rule.severity,
                Severity::Critical | Severity::High | Severity::Medium
            )
        })
        .filter_map(|rule| suggestion_for(rule, record))
        .take(limit)
        .collect();

    ImprovementPlan::Suggestions { suggestions }
}

/// First matching heuristic wins.
pub fn suggestion_for(rule: &Rule, record: &ApplicationRecord) -> Option<Suggestion> {
    let current = |field| record.number(field).unwrap_or(0.0);
    let suggest = |field, suggested_value, reason: &str, priority| Suggestion {
        rule_id: rule.rule_id.clone(),
        field,
        current_value: current(field),
        suggested_value,
        reason: reason.to_string(),
        priority,
    };

    if rule.rule_id.contains("DTI") || rule.condition.mentions("debt_to_income") {
        Some(suggest(
            Field::DebtToIncome,
            TARGET_DEBT_TO_INCOME,
            "Reduce debt-to-income ratio to below 35%",
            SuggestionPriority::High,
        ))
    } else if rule.condition.mentions("late_payment") {
        Some(suggest(
            Field::LatePaymentCount,
            0.0,
            "Maintain perfect payment history for 12 months",
            SuggestionPriority::High,
        ))
    } else if rule.condition.mentions("income") {
        Some(suggest(
            Field::MonthlyIncome,
            current(Field::MonthlyIncome) * INCOME_UPLIFT,
            "Increase monthly income or add co-applicant",
            SuggestionPriority::Medium,
        ))
    } else if rule.condition.mentions("savings") {
        let income = record
            .number(Field::MonthlyIncome)
            .unwrap_or(FALLBACK_MONTHLY_INCOME);
        Some(suggest(
            Field::SavingsBalance,
            income * SAVINGS_MONTHS,
            "Build emergency fund (3-6 months of income)",
            SuggestionPriority::Medium,
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decisioning::{
        Condition, DecisionCombiner, RiskResult, RuleAction, TriggeredRules,
    };

    fn rule(rule_id: &str, condition: &str, severity: Severity) -> Rule {
        Rule {
            rule_id: rule_id.to_string(),
            rule_name: String::new(),
            condition: Condition::parse(condition).expect("parses"),
            severity,
            action: RuleAction::Review,
            override_allowed: true,
            reason_th: String::new(),
            reason_en: String::new(),
            recommendation_th: String::new(),
            recommendation_en: String::new(),
            policy_reference: None,
        }
    }

    fn record() -> ApplicationRecord {
        ApplicationRecord::new(None)
            .with(Field::MonthlyIncome, 30000.0)
            .with(Field::DebtToIncome, 0.55)
            .with(Field::LatePaymentCount, 2u32)
            .with(Field::SavingsBalance, 30000.0)
    }

    fn decide(score: f64, rules: Vec<Rule>) -> Decision {
        let risk = RiskResult::from_score(score).expect("valid score");
        DecisionCombiner::new().combine(&risk, TriggeredRules::new(rules), &record())
    }

    #[test]
    fn approved_decisions_need_no_suggestions() {
        let plan = suggest_improvements(&record(), &decide(0.9, Vec::new()), 5);

        assert_eq!(plan, ImprovementPlan::AlreadyApproved);
        assert!(plan.suggestions().is_empty());
    }

    #[test]
    fn maps_rules_to_recognized_fields() {
        let decision = decide(
            0.2,
            vec![
                rule("DTI_ELEVATED", "debt_to_income > 0.45", Severity::Medium),
                rule("LATE", "late_payment_count >= 2", Severity::High),
                rule("INCOME", "monthly_income < 40000", Severity::Medium),
                rule("RESERVES", "savings_balance < 50000", Severity::Medium),
                rule("HISTORY", "credit_history_length < 2", Severity::Medium),
            ],
        );

        let plan = suggest_improvements(&record(), &decision, 5);
        let fields: Vec<Field> = plan.suggestions().iter().map(|s| s.field).collect();

        assert_eq!(
            fields,
            [
                Field::LatePaymentCount,
                Field::DebtToIncome,
                Field::MonthlyIncome,
                Field::SavingsBalance,
            ]
        );
        let income = &plan.suggestions()[2];
        assert!((income.suggested_value - 36000.0).abs() < 1e-9);
        assert_eq!(income.priority, SuggestionPriority::Medium);
        assert_eq!(plan.suggestions()[3].suggested_value, 90000.0);
    }

    #[test]
    fn rule_id_alone_can_select_debt_suggestion() {
        let suggestion = suggestion_for(
            &rule("DTI_LIMIT", "existing_loans > 4", Severity::High),
            &record(),
        )
        .expect("debt suggestion");

        assert_eq!(suggestion.field, Field::DebtToIncome);
        assert_eq!(suggestion.current_value, 0.55);
        assert_eq!(suggestion.suggested_value, 0.35);
    }

    #[test]
    fn savings_target_falls_back_when_income_missing() {
        let suggestion = suggestion_for(
            &rule("RESERVES", "savings_balance < 1000", Severity::Medium),
            &ApplicationRecord::default(),
        )
        .expect("savings suggestion");

        assert_eq!(suggestion.suggested_value, 150_000.0);
        assert_eq!(suggestion.current_value, 0.0);
    }

    #[test]
    fn low_severity_and_unrecognized_rules_are_skipped() {
        let decision = decide(
            0.2,
            vec![
                rule("LOW_DTI", "debt_to_income > 0.1", Severity::Low),
                rule("LOANS", "existing_loans >= 0", Severity::High),
            ],
        );

        let plan = suggest_improvements(&record(), &decision, 5);

        assert!(matches!(plan, ImprovementPlan::Suggestions { ref suggestions } if suggestions.is_empty()));
    }

    #[test]
    fn limit_caps_suggestions_without_deduplication() {
        let rules = (0..7)
            .map(|index| rule(&format!("DTI_{index}"), "debt_to_income > 0", Severity::Medium))
            .collect();

        let plan = suggest_improvements(&record(), &decide(0.2, rules), 5);

        assert_eq!(plan.suggestions().len(), 5);
        assert!(plan
            .suggestions()
            .iter()
            .all(|suggestion| suggestion.field == Field::DebtToIncome));
    }
}
