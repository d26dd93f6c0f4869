use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use super::policy::{Decision, DecisionReason};
use super::risk::{CreditDecision, RiskBand};
use super::rules::{RuleAction, Severity};

const MAX_REASONS: usize = 5;
const RECOMMENDATION_WINDOW: usize = 3;
const CITATION_WINDOW: usize = 3;
const RULE_WIDTH: usize = 60;

/// Language used for summaries and rule text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "th")]
    Thai,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "th" => Some(Language::Thai),
            "en" => Some(Language::English),
            _ => None,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Language::Thai => "th",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationStyle {
    Short,
    #[default]
    Formal,
    Advisory,
}

impl ExplanationStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "short" => Some(ExplanationStyle::Short),
            "formal" => Some(ExplanationStyle::Formal),
            "advisory" => Some(ExplanationStyle::Advisory),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ExplanationStyle::Short => "short",
            ExplanationStyle::Formal => "formal",
            ExplanationStyle::Advisory => "advisory",
        }
    }
}

impl fmt::Display for ExplanationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationReason {
    pub rule_id: String,
    pub severity: Severity,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskInsights {
    pub score: f64,
    pub risk_level: RiskBand,
    pub confidence: f64,
}

/// Reader-facing account of a decision assembled from rule text and the risk result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub application_id: Option<String>,
    pub decision: CreditDecision,
    pub language: Language,
    pub style: ExplanationStyle,
    pub summary: String,
    pub reasons: Vec<ExplanationReason>,
    pub recommendations: Vec<String>,
    pub ml_insights: RiskInsights,
    pub policy_citations: Vec<String>,
}

impl Explanation {
    /// Console rendering used by the command line.
    pub fn render_text(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "CREDIT DECISION EXPLANATION");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "\nApplication ID: {}",
            self.application_id.as_deref().unwrap_or("-")
        );
        let _ = writeln!(
            out,
            "Decision: {}",
            self.decision.label().to_ascii_uppercase()
        );
        let _ = writeln!(out, "\n{}", self.summary);

        if !self.reasons.is_empty() {
            let _ = writeln!(out, "\nKey Reasons:");
            for (index, reason) in self.reasons.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  {}. [{}] {}",
                    index + 1,
                    reason.severity.label().to_ascii_uppercase(),
                    reason.reason
                );
            }
        }

        if !self.recommendations.is_empty() {
            let _ = writeln!(out, "\nRecommendations:");
            for (index, recommendation) in self.recommendations.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", index + 1, recommendation);
            }
        }

        let _ = writeln!(out, "\nML Insights:");
        let _ = writeln!(out, "  Score: {:.3}", self.ml_insights.score);
        let _ = writeln!(out, "  Risk Level: {}", self.ml_insights.risk_level);
        let _ = writeln!(
            out,
            "  Confidence: {:.1}%",
            self.ml_insights.confidence * 100.0
        );

        if !self.policy_citations.is_empty() {
            let _ = writeln!(out, "\nPolicy References:");
            for citation in &self.policy_citations {
                let _ = writeln!(out, "  - {citation}");
            }
        }

        out.push_str(&rule);
        out
    }
}

/// Selects localized rule text and summary templates for a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplanationFormatter {
    language: Language,
    style: ExplanationStyle,
}

impl ExplanationFormatter {
    pub fn new(language: Language, style: ExplanationStyle) -> Self {
        Self { language, style }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn style(&self) -> ExplanationStyle {
        self.style
    }

    pub fn explain(&self, decision: &Decision) -> Explanation {
        let triggered = decision.triggered_rules();
        let language = self.language;

        let reasons = triggered
            .iter()
            .take(MAX_REASONS)
            .map(|rule| ExplanationReason {
                rule_id: rule.rule_id.clone(),
                severity: rule.severity,
                reason: rule.reason(language).to_string(),
            })
            .collect();

        let recommendations = if decision.is_approved() {
            Vec::new()
        } else {
            triggered
                .iter()
                .take(RECOMMENDATION_WINDOW)
                .filter(|rule| matches!(rule.action, RuleAction::Reject | RuleAction::Review))
                .map(|rule| rule.recommendation(language).to_string())
                .collect()
        };

        let policy_citations = triggered
            .iter()
            .take(CITATION_WINDOW)
            .filter_map(|rule| rule.policy_reference.clone())
            .collect();

        let risk = decision.risk_result();

        Explanation {
            application_id: decision.application_id().map(|id| id.0.clone()),
            decision: decision.final_decision(),
            language,
            style: self.style,
            summary: self.summary(decision),
            reasons,
            recommendations,
            ml_insights: RiskInsights {
                score: risk.score,
                risk_level: risk.risk_band,
                confidence: decision.confidence(),
            },
            policy_citations,
        }
    }

    fn summary(&self, decision: &Decision) -> String {
        let band = decision.risk_result().risk_band;
        match decision.final_decision() {
            CreditDecision::Approved => approval_summary(self.language, self.style, band),
            CreditDecision::Rejected => {
                rejection_summary(self.language, self.style, decision.decision_reason())
            }
        }
    }
}

fn approval_summary(language: Language, style: ExplanationStyle, band: RiskBand) -> String {
    match (language, style) {
        (Language::Thai, ExplanationStyle::Short) => "คำขอสินเชื่อได้รับการอนุมัติ".to_string(),
        (Language::Thai, ExplanationStyle::Formal) => format!(
            "คำขอสินเชื่อได้รับการอนุมัติตามเกณฑ์การประเมินความเสี่ยง ระดับความเสี่ยง: {band}"
        ),
        (Language::Thai, ExplanationStyle::Advisory) => format!(
            "ยินดีด้วย! คำขอสินเชื่อของคุณได้รับการอนุมัติ คุณมีโปรไฟล์ทางการเงินที่ดี (ระดับความเสี่ยง: {band})"
        ),
        (Language::English, ExplanationStyle::Short) => "Credit application approved".to_string(),
        (Language::English, ExplanationStyle::Formal) => format!(
            "Credit application approved based on risk assessment criteria. Risk level: {band}"
        ),
        (Language::English, ExplanationStyle::Advisory) => format!(
            "Congratulations! Your credit application has been approved. You have a strong financial profile (risk level: {band})"
        ),
    }
}

fn rejection_summary(
    language: Language,
    style: ExplanationStyle,
    reason: DecisionReason,
) -> String {
    let text = match (language, style) {
        (Language::Thai, ExplanationStyle::Short) => "คำขอสินเชื่อไม่ได้รับการอนุมัติ",
        (Language::Thai, ExplanationStyle::Formal) => match reason {
            DecisionReason::CriticalRuleViolation => {
                "คำขอสินเชื่อไม่ได้รับการอนุมัติเนื่องจากไม่ผ่านเกณฑ์ความเสี่ยงที่กำหนด"
            }
            DecisionReason::HighRiskFactors => {
                "คำขอสินเชื่อไม่ได้รับการอนุมัติเนื่องจากปัจจัยความเสี่ยงสูง"
            }
            _ => "คำขอสินเชื่อไม่ได้รับการอนุมัติตามผลการประเมินความเสี่ยง",
        },
        (Language::Thai, ExplanationStyle::Advisory) => {
            "คำขอสินเชื่อของคุณไม่ได้รับการอนุมัติในครั้งนี้ กรุณาดูคำแนะนำด้านล่างเพื่อปรับปรุงโอกาสในการขอสินเชื่อครั้งต่อไป"
        }
        (Language::English, ExplanationStyle::Short) => "Credit application declined",
        (Language::English, ExplanationStyle::Formal) => match reason {
            DecisionReason::CriticalRuleViolation => {
                "Credit application declined due to critical risk criteria not met"
            }
            DecisionReason::HighRiskFactors => {
                "Credit application declined due to high risk factors"
            }
            _ => "Credit application declined based on risk assessment",
        },
        (Language::English, ExplanationStyle::Advisory) => {
            "Your credit application was not approved at this time. Please review the recommendations below to improve your chances for future applications"
        }
    };
    text.to_string()
}
