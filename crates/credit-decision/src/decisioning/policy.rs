use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, ApplicationRecord};
use super::risk::{CreditDecision, RiskResult};
use super::rules::{Rule, RuleAction, Severity, TriggeredRules};

/// Confidence reported when a critical rule forces a rejection.
pub const CRITICAL_REJECT_CONFIDENCE: f64 = 1.0;
/// Confidence reported when a high-severity rule forces a rejection.
pub const HIGH_REJECT_CONFIDENCE: f64 = 0.85;
/// Confidence reported when medium-severity rules agree with an ML rejection.
pub const MEDIUM_REJECT_CONFIDENCE: f64 = 0.7;

/// Reason code attached to every final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    CriticalRuleViolation,
    HighRiskFactors,
    MediumRiskFactors,
    LowRiskProfile,
    MlBasedDecision,
}

impl DecisionReason {
    pub const fn code(self) -> &'static str {
        match self {
            DecisionReason::CriticalRuleViolation => "critical_rule_violation",
            DecisionReason::HighRiskFactors => "high_risk_factors",
            DecisionReason::MediumRiskFactors => "medium_risk_factors",
            DecisionReason::LowRiskProfile => "low_risk_profile",
            DecisionReason::MlBasedDecision => "ml_based_decision",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Final outcome of one evaluation. Built only by [`DecisionCombiner`] and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    #[serde(skip_serializing_if = "Option::is_none")]
    application_id: Option<ApplicationId>,
    final_decision: CreditDecision,
    decision_reason: DecisionReason,
    primary_rule: Option<Rule>,
    triggered_rules: TriggeredRules,
    risk_result: RiskResult,
    override_allowed: bool,
    confidence: f64,
}

impl Decision {
    pub fn application_id(&self) -> Option<&ApplicationId> {
        self.application_id.as_ref()
    }

    pub fn final_decision(&self) -> CreditDecision {
        self.final_decision
    }

    pub fn is_approved(&self) -> bool {
        self.final_decision == CreditDecision::Approved
    }

    pub fn decision_reason(&self) -> DecisionReason {
        self.decision_reason
    }

    pub fn primary_rule(&self) -> Option<&Rule> {
        self.primary_rule.as_ref()
    }

    pub fn triggered_rules(&self) -> &TriggeredRules {
        &self.triggered_rules
    }

    pub fn risk_result(&self) -> &RiskResult {
        &self.risk_result
    }

    pub fn override_allowed(&self) -> bool {
        self.override_allowed
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Inputs visible to each policy guard.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub risk: &'a RiskResult,
    pub triggered: &'a TriggeredRules,
    pub record: &'a ApplicationRecord,
}

/// What a matching guard decides. `primary_rule` indexes into the triggered rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyVerdict {
    pub final_decision: CreditDecision,
    pub override_allowed: bool,
    pub confidence: f64,
    pub primary_rule: Option<usize>,
}

/// One row of the decision table.
#[derive(Clone, Copy)]
pub struct PolicyStep {
    pub reason: DecisionReason,
    guard: fn(&PolicyContext<'_>) -> Option<PolicyVerdict>,
}

impl PolicyStep {
    pub fn apply(&self, context: &PolicyContext<'_>) -> Option<PolicyVerdict> {
        (self.guard)(context)
    }
}

impl fmt::Debug for PolicyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyStep")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Ordered guards; the first that matches decides. Rules can only force rejections: an ML
/// rejection is never turned into an approval, and medium-severity rules alone never block an
/// ML approval.
static POLICY: [PolicyStep; 5] = [
    PolicyStep {
        reason: DecisionReason::CriticalRuleViolation,
        guard: critical_reject,
    },
    PolicyStep {
        reason: DecisionReason::HighRiskFactors,
        guard: high_reject,
    },
    PolicyStep {
        reason: DecisionReason::MediumRiskFactors,
        guard: medium_risk_with_ml_reject,
    },
    PolicyStep {
        reason: DecisionReason::LowRiskProfile,
        guard: ml_approve_without_high_reject,
    },
    PolicyStep {
        reason: DecisionReason::MlBasedDecision,
        guard: ml_fallback,
    },
];

fn is_high_reject(rule: &Rule) -> bool {
    rule.is(Severity::High, RuleAction::Reject)
}

fn critical_reject(context: &PolicyContext<'_>) -> Option<PolicyVerdict> {
    let index = context
        .triggered
        .position(|rule| rule.is(Severity::Critical, RuleAction::Reject))?;

    Some(PolicyVerdict {
        final_decision: CreditDecision::Rejected,
        override_allowed: false,
        confidence: CRITICAL_REJECT_CONFIDENCE,
        primary_rule: Some(index),
    })
}

fn high_reject(context: &PolicyContext<'_>) -> Option<PolicyVerdict> {
    let index = context.triggered.position(is_high_reject)?;
    let override_allowed = context
        .triggered
        .get(index)
        .map(|rule| rule.override_allowed)
        .unwrap_or(false);

    Some(PolicyVerdict {
        final_decision: CreditDecision::Rejected,
        override_allowed,
        confidence: HIGH_REJECT_CONFIDENCE,
        primary_rule: Some(index),
    })
}

fn medium_risk_with_ml_reject(context: &PolicyContext<'_>) -> Option<PolicyVerdict> {
    if context.risk.ml_decision != CreditDecision::Rejected {
        return None;
    }

    let index = context.triggered.position(|rule| {
        rule.is(Severity::Medium, RuleAction::Reject) || rule.is(Severity::Medium, RuleAction::Review)
    })?;

    Some(PolicyVerdict {
        final_decision: CreditDecision::Rejected,
        override_allowed: true,
        confidence: MEDIUM_REJECT_CONFIDENCE,
        primary_rule: Some(index),
    })
}

fn ml_approve_without_high_reject(context: &PolicyContext<'_>) -> Option<PolicyVerdict> {
    if context.risk.ml_decision != CreditDecision::Approved || context.triggered.any(is_high_reject)
    {
        return None;
    }

    Some(PolicyVerdict {
        final_decision: CreditDecision::Approved,
        override_allowed: false,
        confidence: context.risk.confidence,
        primary_rule: context
            .triggered
            .position(|rule| rule.action == RuleAction::Approve),
    })
}

fn ml_fallback(context: &PolicyContext<'_>) -> Option<PolicyVerdict> {
    Some(follow_ml(context))
}

fn follow_ml(context: &PolicyContext<'_>) -> PolicyVerdict {
    PolicyVerdict {
        final_decision: context.risk.ml_decision,
        override_allowed: true,
        confidence: context.risk.confidence,
        primary_rule: None,
    }
}

/// Merges a validated risk result with the triggered rules into one [`Decision`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionCombiner;

impl DecisionCombiner {
    pub fn new() -> Self {
        Self
    }

    /// The ordered guard table applied by [`DecisionCombiner::combine`].
    pub fn policy(&self) -> &'static [PolicyStep] {
        &POLICY
    }

    /// First matching step with its verdict. The final step always matches.
    pub fn resolve(&self, context: &PolicyContext<'_>) -> (DecisionReason, PolicyVerdict) {
        POLICY
            .iter()
            .find_map(|step| step.apply(context).map(|verdict| (step.reason, verdict)))
            .unwrap_or_else(|| (DecisionReason::MlBasedDecision, follow_ml(context)))
    }

    /// `risk` must already be validated; scores outside [0, 1] are not re-checked here.
    pub fn combine(
        &self,
        risk: &RiskResult,
        triggered: TriggeredRules,
        record: &ApplicationRecord,
    ) -> Decision {
        let context = PolicyContext {
            risk,
            triggered: &triggered,
            record,
        };
        let (reason, verdict) = self.resolve(&context);
        let primary_rule = verdict
            .primary_rule
            .and_then(|index| triggered.get(index))
            .cloned();

        Decision {
            application_id: record.application_id().cloned(),
            final_decision: verdict.final_decision,
            decision_reason: reason,
            primary_rule,
            triggered_rules: triggered,
            risk_result: *risk,
            override_allowed: verdict.override_allowed,
            confidence: verdict.confidence,
        }
    }
}
