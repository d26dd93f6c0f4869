//! What-if exploration: re-decide modified applications and compare against the baseline.

pub mod comparator;
pub mod simulator;
pub mod suggestions;

pub use comparator::{
    BandDirection, ComparisonError, DecisionDirection, Impact, ScenarioComparator, ScenarioDelta,
};
pub use simulator::{
    parse_assignment, Modifications, Scenario, ScenarioResult, SimulationError, SimulationResult,
    WhatIfSimulator,
};
pub use suggestions::{suggest_improvements, ImprovementPlan, Suggestion, SuggestionPriority};
