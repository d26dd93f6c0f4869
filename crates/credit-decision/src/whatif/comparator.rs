use std::fmt;

use serde::Serialize;

use crate::decisioning::{CreditDecision, Decision, RiskBand};

/// Default absolute score delta above which a scenario has a moderate impact.
pub const DEFAULT_MODERATE_SCORE_DELTA: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionDirection {
    Unchanged,
    Improved,
    Worsened,
}

impl DecisionDirection {
    pub fn between(baseline: CreditDecision, variant: CreditDecision) -> Self {
        match (baseline, variant) {
            (before, after) if before == after => DecisionDirection::Unchanged,
            (CreditDecision::Rejected, CreditDecision::Approved) => DecisionDirection::Improved,
            _ => DecisionDirection::Worsened,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandDirection {
    Reduced,
    Unchanged,
    Increased,
}

impl BandDirection {
    pub fn between(baseline: RiskBand, variant: RiskBand) -> Self {
        match variant.rank().cmp(&baseline.rank()) {
            std::cmp::Ordering::Less => BandDirection::Reduced,
            std::cmp::Ordering::Equal => BandDirection::Unchanged,
            std::cmp::Ordering::Greater => BandDirection::Increased,
        }
    }
}

/// Qualitative impact, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    SignificantImprovement,
    SignificantDecline,
    Moderate,
    Minor,
    Minimal,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Impact::SignificantImprovement => "significant_improvement",
            Impact::SignificantDecline => "significant_decline",
            Impact::Moderate => "moderate",
            Impact::Minor => "minor",
            Impact::Minimal => "minimal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComparisonError {
    #[error("baseline score is zero; relative score change is undefined")]
    ZeroBaselineScore,
}

/// Read-only comparison of a baseline decision against a variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioDelta {
    pub changed: bool,
    pub direction: DecisionDirection,
    pub baseline_decision: CreditDecision,
    pub variant_decision: CreditDecision,
    pub score_delta: f64,
    /// `None` when the baseline score is zero.
    pub score_change_pct: Option<f64>,
    pub confidence_delta: f64,
    pub baseline_band: RiskBand,
    pub variant_band: RiskBand,
    pub risk_band_direction: BandDirection,
    pub impact: Impact,
    pub impact_summary: String,
}

impl ScenarioDelta {
    pub fn risk_band_changed(&self) -> bool {
        self.risk_band_direction != BandDirection::Unchanged
    }

    /// Relative score change in percent, or an error when the baseline score is zero.
    pub fn relative_score_change(&self) -> Result<f64, ComparisonError> {
        self.score_change_pct
            .ok_or(ComparisonError::ZeroBaselineScore)
    }
}

/// Computes deltas between two decisions. Holds only the moderate-impact threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioComparator {
    moderate_score_delta: f64,
}

impl Default for ScenarioComparator {
    fn default() -> Self {
        Self::new(DEFAULT_MODERATE_SCORE_DELTA)
    }
}

impl ScenarioComparator {
    pub fn new(moderate_score_delta: f64) -> Self {
        Self {
            moderate_score_delta,
        }
    }

    pub fn moderate_score_delta(&self) -> f64 {
        self.moderate_score_delta
    }

    pub fn compare(&self, baseline: &Decision, variant: &Decision) -> ScenarioDelta {
        let before = baseline.risk_result();
        let after = variant.risk_result();

        let direction =
            DecisionDirection::between(baseline.final_decision(), variant.final_decision());
        let score_delta = after.score - before.score;
        let score_change_pct = if before.score == 0.0 {
            None
        } else {
            Some(score_delta / before.score * 100.0)
        };
        let risk_band_direction = BandDirection::between(before.risk_band, after.risk_band);

        let impact = self.classify(direction, score_delta, risk_band_direction);

        ScenarioDelta {
            changed: direction != DecisionDirection::Unchanged,
            direction,
            baseline_decision: baseline.final_decision(),
            variant_decision: variant.final_decision(),
            score_delta,
            score_change_pct,
            confidence_delta: variant.confidence() - baseline.confidence(),
            baseline_band: before.risk_band,
            variant_band: after.risk_band,
            risk_band_direction,
            impact,
            impact_summary: impact_summary(impact, score_delta),
        }
    }

    fn classify(
        &self,
        direction: DecisionDirection,
        score_delta: f64,
        band: BandDirection,
    ) -> Impact {
        match direction {
            DecisionDirection::Improved => Impact::SignificantImprovement,
            DecisionDirection::Worsened => Impact::SignificantDecline,
            DecisionDirection::Unchanged if score_delta.abs() > self.moderate_score_delta => {
                Impact::Moderate
            }
            DecisionDirection::Unchanged if band != BandDirection::Unchanged => Impact::Minor,
            DecisionDirection::Unchanged => Impact::Minimal,
        }
    }
}

fn impact_summary(impact: Impact, score_delta: f64) -> String {
    match impact {
        Impact::SignificantImprovement => {
            "Significant improvement - Decision changed to APPROVED".to_string()
        }
        Impact::SignificantDecline => {
            "Significant decline - Decision changed to REJECTED".to_string()
        }
        Impact::Moderate => format!(
            "Moderate impact - Score changed by {:.1}%",
            score_delta.abs() * 100.0
        ),
        Impact::Minor => "Minor impact - Risk level changed".to_string(),
        Impact::Minimal => "Minimal impact - No significant changes".to_string(),
    }
}
