use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decisioning::{ApplicationId, CreditApplication, CreditDecision, Decision, Explanation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    Decided,
}

impl ApplicationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Decided => "decided",
        }
    }
}

/// Submitted application as held by the repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredApplication {
    pub application_id: ApplicationId,
    pub application: CreditApplication,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Decided case: the decision, its explanation, and when it was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub application_id: ApplicationId,
    pub decision: Decision,
    pub explanation: Explanation,
    pub decided_at: DateTime<Utc>,
}

impl CaseRecord {
    pub fn final_decision(&self) -> CreditDecision {
        self.decision.final_decision()
    }
}

/// Storage abstraction so the case service can run over any backing store.
pub trait CaseRepository: Send + Sync {
    fn insert_application(
        &self,
        application: StoredApplication,
    ) -> Result<StoredApplication, RepositoryError>;
    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<StoredApplication>, RepositoryError>;
    fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), RepositoryError>;
    fn application_count(&self) -> Result<usize, RepositoryError>;
    /// Store a case, replacing any earlier case for the same application.
    fn store_case(&self, case: CaseRecord) -> Result<(), RepositoryError>;
    fn fetch_case(&self, id: &ApplicationId) -> Result<Option<CaseRecord>, RepositoryError>;
    fn cases(&self) -> Result<Vec<CaseRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
