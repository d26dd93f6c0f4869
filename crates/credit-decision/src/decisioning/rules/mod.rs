mod condition;
mod evaluator;

pub use condition::{
    ArithOp, CmpOp, Condition, ConditionError, EvalError, Expr, FieldView, Haystack, LogicOp,
    Value,
};
pub use evaluator::{RuleEvaluation, RuleEvaluationError, RuleEvaluator, TriggeredRules};

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::explanation::Language;

const STANDARD_RULES: &str = include_str!("../../../rules/credit_rules.json");

/// Business-rule severity. Lower rank sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Approve,
    Reject,
    Review,
}

/// Declarative condition → action business rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    #[serde(default)]
    pub rule_name: String,
    pub condition: Condition,
    pub severity: Severity,
    pub action: RuleAction,
    #[serde(default = "default_override_allowed")]
    pub override_allowed: bool,
    #[serde(default)]
    pub reason_th: String,
    #[serde(default)]
    pub reason_en: String,
    #[serde(default)]
    pub recommendation_th: String,
    #[serde(default)]
    pub recommendation_en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_reference: Option<String>,
}

fn default_override_allowed() -> bool {
    true
}

impl Rule {
    pub fn reason(&self, language: Language) -> &str {
        match language {
            Language::Thai => &self.reason_th,
            Language::English => &self.reason_en,
        }
    }

    pub fn recommendation(&self, language: Language) -> &str {
        match language {
            Language::Thai => &self.recommendation_th,
            Language::English => &self.recommendation_en,
        }
    }

    pub fn is(&self, severity: Severity, action: RuleAction) -> bool {
        self.severity == severity && self.action == action
    }
}

/// Ordered, immutable collection of rules. Declaration order is the tie-break for equal severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

#[derive(Deserialize)]
struct RuleFile {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleSetError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.rule_id.trim().is_empty() {
                return Err(RuleSetError::MissingRuleId);
            }
            if !seen.insert(rule.rule_id.as_str()) {
                return Err(RuleSetError::DuplicateRuleId(rule.rule_id.clone()));
            }
            if let Some(err) = rule.condition.parse_error() {
                warn!(
                    rule_id = %rule.rule_id,
                    condition = %rule.condition,
                    error = %err,
                    "rule condition does not parse; the rule will never trigger"
                );
            }
        }

        Ok(Self { rules })
    }

    /// Rule set bundled with the library.
    pub fn standard() -> Result<Self, RuleSetError> {
        Self::from_json_str(STANDARD_RULES)
    }

    pub fn from_json_str(json: &str) -> Result<Self, RuleSetError> {
        let file: RuleFile = serde_json::from_str(json)?;
        Self::new(file.rules)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let rules = Self::from_json_str(&contents)?;
        info!(path = %path.display(), rules = rules.len(), "loaded rule set");
        Ok(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.rule_id == rule_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Failures while loading rule configuration.
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("failed to read rule file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid rule file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule without a rule_id")]
    MissingRuleId,
    #[error("duplicate rule_id '{0}'")]
    DuplicateRuleId(String),
}
