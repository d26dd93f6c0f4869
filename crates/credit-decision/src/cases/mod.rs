//! Case bookkeeping over an injected repository: submitted applications and decided cases.

pub mod repository;
pub mod service;

pub use repository::{
    ApplicationStatus, CaseRecord, CaseRepository, RepositoryError, StoredApplication,
};
pub use service::{
    CasePage, CaseQuery, CaseService, CaseServiceError, CaseStats, DecisionRequest,
    DecisionResponse, DEFAULT_PAGE_LIMIT,
};
