use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{ApplicationRecord, InputContractError};
use super::rules::{Condition, ConditionError};

/// Scores at or above this are low risk.
pub const LOW_RISK_THRESHOLD: f64 = 0.7;
/// Scores at or above this (and below [`LOW_RISK_THRESHOLD`]) are medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.4;
/// Scores at or above this are suggested for approval.
pub const APPROVAL_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score >= LOW_RISK_THRESHOLD {
            RiskBand::Low
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskBand::Medium
        } else {
            RiskBand::High
        }
    }

    /// Ordinal used for band transitions: low=0, medium=1, high=2.
    pub const fn rank(self) -> u8 {
        match self {
            RiskBand::Low => 0,
            RiskBand::Medium => 1,
            RiskBand::High => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Medium => "medium",
            RiskBand::High => "high",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Binary credit outcome, used both for the ML suggestion and the final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditDecision {
    Approved,
    Rejected,
}

impl CreditDecision {
    pub fn from_score(score: f64) -> Self {
        if score >= APPROVAL_THRESHOLD {
            CreditDecision::Approved
        } else {
            CreditDecision::Rejected
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CreditDecision::Approved => "approved",
            CreditDecision::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => Some(CreditDecision::Approved),
            "rejected" => Some(CreditDecision::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for CreditDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `|score - 0.5| * 2` clamped to [0, 1]: zero at the boundary, one at the extremes.
pub fn confidence(score: f64) -> f64 {
    ((score - APPROVAL_THRESHOLD).abs() * 2.0).clamp(0.0, 1.0)
}

/// Scorer output with the band, suggestion and confidence derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub score: f64,
    pub risk_band: RiskBand,
    pub ml_decision: CreditDecision,
    pub confidence: f64,
}

impl RiskResult {
    /// Validate a raw scorer output and derive the band, suggestion and confidence.
    pub fn from_score(score: f64) -> Result<Self, InputContractError> {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(InputContractError::ScoreOutOfRange { score });
        }

        Ok(Self {
            score,
            risk_band: RiskBand::from_score(score),
            ml_decision: CreditDecision::from_score(score),
            confidence: confidence(score),
        })
    }
}

/// External capability mapping an application to an approval probability in [0, 1].
pub trait RiskScorer: Send + Sync {
    fn score(&self, record: &ApplicationRecord) -> Result<f64, ScoringError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("scorer unavailable: {0}")]
    Unavailable(String),
    #[error("scorer could not evaluate factor '{factor}': {reason}")]
    Factor { factor: String, reason: String },
}

/// One weighted scorecard line: `points` are added when `condition` holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorecardFactor {
    pub condition: Condition,
    pub points: f64,
}

/// Deterministic points-based scorer used where no trained model is wired in.
///
/// Risk points accumulate from weighted conditions and are mapped to an approval probability with
/// `1 / (1 + exp((points - midpoint) / scale))`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceScorecard {
    factors: Vec<ScorecardFactor>,
    midpoint: f64,
    scale: f64,
}

const STANDARD_FACTORS: &[(&str, f64)] = &[
    // critical criteria
    ("debt_to_income > 0.65", 100.0),
    ("previous_defaults > 0", 100.0),
    ("monthly_income < 20000", 100.0),
    // high risk
    ("late_payment_count >= 3", 50.0),
    ("late_payment_count == 2", 20.0),
    ("late_payment_count == 1", 8.0),
    ("credit_utilization > 0.8", 25.0),
    ("0.6 < credit_utilization <= 0.8", 12.0),
    ("employment_years < 1", 15.0),
    ("1 <= employment_years < 2", 6.0),
    // medium risk
    ("debt_to_income > 0.45", 15.0),
    ("0.35 < debt_to_income <= 0.45", 6.0),
    ("existing_loans > 4", 10.0),
    ("2 < existing_loans <= 4", 4.0),
    ("credit_history_length < 2", 10.0),
    ("2 <= credit_history_length < 3", 4.0),
    ("requested_amount > monthly_income * 10", 20.0),
    ("savings_balance < monthly_income * 2", 6.0),
    // strengths
    ("monthly_income > 100000", -20.0),
    ("80000 < monthly_income <= 100000", -12.0),
    ("50000 < monthly_income <= 80000", -6.0),
    ("home_ownership == 'own'", -15.0),
    ("savings_balance > monthly_income * 10", -15.0),
    (
        "monthly_income * 6 < savings_balance <= monthly_income * 10",
        -8.0,
    ),
    ("employment_type == 'permanent' and employment_years > 10", -12.0),
    (
        "employment_type == 'permanent' and 5 < employment_years <= 10",
        -6.0,
    ),
];

impl ReferenceScorecard {
    pub fn new(factors: Vec<ScorecardFactor>, midpoint: f64, scale: f64) -> Self {
        Self {
            factors,
            midpoint,
            scale,
        }
    }

    /// Scorecard calibrated so that 25 risk points sit on the 0.5 approval boundary.
    pub fn standard() -> Result<Self, ConditionError> {
        let factors = STANDARD_FACTORS
            .iter()
            .map(|(source, points)| {
                Ok(ScorecardFactor {
                    condition: Condition::parse(source)?,
                    points: *points,
                })
            })
            .collect::<Result<Vec<_>, ConditionError>>()?;

        Ok(Self::new(factors, 25.0, 12.0))
    }

    pub fn risk_points(&self, record: &ApplicationRecord) -> Result<f64, ScoringError> {
        let mut points = 0.0;
        for factor in &self.factors {
            let holds =
                factor
                    .condition
                    .evaluate(record)
                    .map_err(|err| ScoringError::Factor {
                        factor: factor.condition.source().to_string(),
                        reason: err.to_string(),
                    })?;
            if holds {
                points += factor.points;
            }
        }
        Ok(points)
    }
}

impl RiskScorer for ReferenceScorecard {
    fn score(&self, record: &ApplicationRecord) -> Result<f64, ScoringError> {
        let points = self.risk_points(record)?;
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        Ok(1.0 / (1.0 + ((points - self.midpoint) / scale).exp()))
    }
}
