use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::repository::{
    ApplicationStatus, CaseRecord, CaseRepository, RepositoryError, StoredApplication,
};
use crate::decisioning::{
    ApplicationId, CreditApplication, CreditDecision, DecisionEngine, DecisionError, Explanation,
    ExplanationFormatter, ExplanationStyle, InputContractError, Language, RiskBand,
};

pub const DEFAULT_PAGE_LIMIT: usize = 10;

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("APP{id:06}"))
}

fn assign_id(application: &mut CreditApplication) -> ApplicationId {
    match application
        .application_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        Some(id) => ApplicationId(id.to_string()),
        None => {
            let id = next_application_id();
            application.application_id = Some(id.0.clone());
            id
        }
    }
}

/// Request to decide one application. Language and style fall back to the service defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub application: CreditApplication,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub style: Option<ExplanationStyle>,
}

impl DecisionRequest {
    pub fn new(application: CreditApplication) -> Self {
        Self {
            application,
            language: None,
            style: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResponse {
    pub application_id: ApplicationId,
    pub decision: CreditDecision,
    pub confidence: f64,
    pub ml_score: f64,
    pub risk_level: RiskBand,
    pub explanation: Explanation,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub decision: Option<CreditDecision>,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

impl Default for CaseQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
            decision: None,
        }
    }
}

/// One page of cases; `total` counts every case matching the filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CasePage {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub cases: Vec<CaseRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseStats {
    pub total_applications: usize,
    pub total_decisions: usize,
    pub approved: usize,
    pub rejected: usize,
    pub approval_rate: f64,
}

/// Service composing the decision engine, explanation formatter, and case repository.
pub struct CaseService<R> {
    repository: Arc<R>,
    engine: DecisionEngine,
    formatter: ExplanationFormatter,
}

impl<R> CaseService<R>
where
    R: CaseRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: DecisionEngine, formatter: ExplanationFormatter) -> Self {
        Self {
            repository,
            engine,
            formatter,
        }
    }

    /// Validate and store a new application with status `submitted`.
    pub fn submit(
        &self,
        mut application: CreditApplication,
    ) -> Result<StoredApplication, CaseServiceError> {
        application.validate()?;
        let application_id = assign_id(&mut application);

        let stored = self.repository.insert_application(StoredApplication {
            application_id,
            application,
            status: ApplicationStatus::Submitted,
            submitted_at: Utc::now(),
        })?;

        info!(application_id = %stored.application_id, "application submitted");
        Ok(stored)
    }

    /// Decide an application, explain it, and record the case.
    pub fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, CaseServiceError> {
        let DecisionRequest {
            mut application,
            language,
            style,
        } = request;

        application.validate()?;
        let application_id = assign_id(&mut application);

        let decision = self.engine.decide(&application.to_record())?;
        let formatter = ExplanationFormatter::new(
            language.unwrap_or_else(|| self.formatter.language()),
            style.unwrap_or_else(|| self.formatter.style()),
        );
        let explanation = formatter.explain(&decision);
        let decided_at = Utc::now();

        self.repository.store_case(CaseRecord {
            application_id: application_id.clone(),
            decision: decision.clone(),
            explanation: explanation.clone(),
            decided_at,
        })?;

        match self
            .repository
            .update_status(&application_id, ApplicationStatus::Decided)
        {
            Ok(()) | Err(RepositoryError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }

        info!(
            application_id = %application_id,
            decision = %decision.final_decision(),
            reason = %decision.decision_reason(),
            "case recorded"
        );

        let risk = decision.risk_result();
        Ok(DecisionResponse {
            application_id,
            decision: decision.final_decision(),
            confidence: decision.confidence(),
            ml_score: risk.score,
            risk_level: risk.risk_band,
            explanation,
            timestamp: decided_at,
        })
    }

    pub fn application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<StoredApplication, CaseServiceError> {
        let stored = self
            .repository
            .fetch_application(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(stored)
    }

    pub fn case(&self, application_id: &ApplicationId) -> Result<CaseRecord, CaseServiceError> {
        let case = self
            .repository
            .fetch_case(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(case)
    }

    /// Cases newest first, optionally filtered by final decision.
    pub fn list(&self, query: &CaseQuery) -> Result<CasePage, CaseServiceError> {
        let mut cases: Vec<CaseRecord> = self
            .repository
            .cases()?
            .into_iter()
            .filter(|case| {
                query
                    .decision
                    .map_or(true, |decision| case.final_decision() == decision)
            })
            .collect();

        cases.sort_by(|left, right| right.decided_at.cmp(&left.decided_at));

        let total = cases.len();
        let cases = cases
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();

        Ok(CasePage {
            total,
            limit: query.limit,
            offset: query.offset,
            cases,
        })
    }

    pub fn stats(&self) -> Result<CaseStats, CaseServiceError> {
        let cases = self.repository.cases()?;
        let total_decisions = cases.len();
        let approved = cases
            .iter()
            .filter(|case| case.final_decision() == CreditDecision::Approved)
            .count();
        let approval_rate = if total_decisions == 0 {
            0.0
        } else {
            approved as f64 / total_decisions as f64
        };

        Ok(CaseStats {
            total_applications: self.repository.application_count()?,
            total_decisions,
            approved,
            rejected: total_decisions - approved,
            approval_rate,
        })
    }
}

/// Error raised by the case service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaseServiceError {
    #[error(transparent)]
    InvalidApplication(#[from] InputContractError),
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use chrono::Duration;

    use super::*;
    use crate::decisioning::{ApplicationRecord, Field, RiskScorer, RuleSet, ScoringError};

    #[derive(Default)]
    struct MemoryRepository {
        applications: Mutex<BTreeMap<ApplicationId, StoredApplication>>,
        cases: Mutex<BTreeMap<ApplicationId, CaseRecord>>,
    }

    impl CaseRepository for MemoryRepository {
        fn insert_application(
            &self,
            application: StoredApplication,
        ) -> Result<StoredApplication, RepositoryError> {
            let mut guard = self.applications.lock().expect("lock");
            if guard.contains_key(&application.application_id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(application.application_id.clone(), application.clone());
            Ok(application)
        }

        fn fetch_application(
            &self,
            id: &ApplicationId,
        ) -> Result<Option<StoredApplication>, RepositoryError> {
            Ok(self.applications.lock().expect("lock").get(id).cloned())
        }

        fn update_status(
            &self,
            id: &ApplicationId,
            status: ApplicationStatus,
        ) -> Result<(), RepositoryError> {
            let mut guard = self.applications.lock().expect("lock");
            let stored = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
            stored.status = status;
            Ok(())
        }

        fn application_count(&self) -> Result<usize, RepositoryError> {
            Ok(self.applications.lock().expect("lock").len())
        }

        fn store_case(&self, case: CaseRecord) -> Result<(), RepositoryError> {
            self.cases
                .lock()
                .expect("lock")
                .insert(case.application_id.clone(), case);
            Ok(())
        }

        fn fetch_case(&self, id: &ApplicationId) -> Result<Option<CaseRecord>, RepositoryError> {
            Ok(self.cases.lock().expect("lock").get(id).cloned())
        }

        fn cases(&self) -> Result<Vec<CaseRecord>, RepositoryError> {
            Ok(self.cases.lock().expect("lock").values().cloned().collect())
        }
    }

    /// Approves when income is at least 40 000.
    struct IncomeScorer;

    impl RiskScorer for IncomeScorer {
        fn score(&self, record: &ApplicationRecord) -> Result<f64, ScoringError> {
            let income = record.number(Field::MonthlyIncome).unwrap_or(0.0);
            Ok(if income >= 40000.0 { 0.8 } else { 0.2 })
        }
    }

    fn service() -> (Arc<MemoryRepository>, CaseService<MemoryRepository>) {
        let repository = Arc::new(MemoryRepository::default());
        let engine = DecisionEngine::new(
            Arc::new(RuleSet::new(Vec::new()).expect("empty rule set")),
            Arc::new(IncomeScorer),
        );
        let service = CaseService::new(
            repository.clone(),
            engine,
            ExplanationFormatter::new(Language::English, ExplanationStyle::Short),
        );
        (repository, service)
    }

    fn application(id: Option<&str>, monthly_income: f64) -> CreditApplication {
        CreditApplication {
            application_id: id.map(str::to_string),
            monthly_income,
            employment_years: 4,
            employment_type: "permanent".to_string(),
            debt_to_income: 0.3,
            existing_loans: 1,
            late_payment_count: 0,
            credit_utilization: 0.3,
            requested_amount: 200000.0,
            loan_purpose: "car".to_string(),
            age: 35,
            education_level: "master".to_string(),
            marital_status: "married".to_string(),
            dependents: 1,
            home_ownership: "mortgage".to_string(),
            savings_balance: 120000.0,
            checking_balance: 20000.0,
            credit_history_length: 8,
            previous_defaults: 0,
        }
    }

    #[test]
    fn submit_assigns_sequential_ids_when_missing() {
        let (_, service) = service();

        let first = service.submit(application(None, 50000.0)).expect("submits");
        let second = service.submit(application(None, 50000.0)).expect("submits");

        assert!(first.application_id.0.starts_with("APP"));
        assert_eq!(first.application_id.0.len(), 9);
        assert_ne!(first.application_id, second.application_id);
        assert_eq!(first.status, ApplicationStatus::Submitted);
        assert_eq!(
            first.application.application_id.as_deref(),
            Some(first.application_id.0.as_str())
        );
    }

    #[test]
    fn submit_rejects_duplicates_and_invalid_applications() {
        let (_, service) = service();
        service
            .submit(application(Some("APP-X"), 50000.0))
            .expect("first submit");

        let duplicate = service.submit(application(Some("APP-X"), 50000.0));
        assert!(matches!(
            duplicate,
            Err(CaseServiceError::Repository(RepositoryError::Conflict))
        ));

        let mut invalid = application(Some("APP-Y"), 50000.0);
        invalid.age = 17;
        assert!(matches!(
            service.submit(invalid),
            Err(CaseServiceError::InvalidApplication(_))
        ));
    }

    #[test]
    fn decide_records_case_and_marks_application_decided() {
        let (_, service) = service();
        let stored = service
            .submit(application(Some("APP-1"), 60000.0))
            .expect("submits");

        let response = service
            .decide(DecisionRequest {
                application: stored.application.clone(),
                language: Some(Language::Thai),
                style: None,
            })
            .expect("decides");

        assert_eq!(response.decision, CreditDecision::Approved);
        assert_eq!(response.risk_level, RiskBand::Low);
        assert_eq!(response.explanation.language, Language::Thai);
        assert_eq!(response.explanation.style, ExplanationStyle::Short);

        let case = service.case(&stored.application_id).expect("case stored");
        assert_eq!(case.final_decision(), CreditDecision::Approved);
        assert_eq!(
            service
                .application(&stored.application_id)
                .expect("application stored")
                .status,
            ApplicationStatus::Decided
        );
    }

    #[test]
    fn decide_without_prior_submission_still_records_case() {
        let (_, service) = service();

        let response = service
            .decide(DecisionRequest::new(application(None, 20000.0)))
            .expect("decides");

        assert_eq!(response.decision, CreditDecision::Rejected);
        assert!(service.case(&response.application_id).is_ok());
        assert!(matches!(
            service.application(&response.application_id),
            Err(CaseServiceError::Repository(RepositoryError::NotFound))
        ));
    }

    #[test]
    fn list_filters_sorts_and_paginates() {
        let (repository, service) = service();
        let now = Utc::now();
        for (index, income) in [50000.0, 20000.0, 70000.0, 30000.0, 90000.0]
            .into_iter()
            .enumerate()
        {
            let response = service
                .decide(DecisionRequest::new(application(
                    Some(format!("APP-{index}").as_str()),
                    income,
                )))
                .expect("decides");
            let mut case = service.case(&response.application_id).expect("stored");
            case.decided_at = now + Duration::seconds(index as i64);
            repository.store_case(case).expect("restamp");
        }

        let approved = service
            .list(&CaseQuery {
                decision: Some(CreditDecision::Approved),
                ..CaseQuery::default()
            })
            .expect("lists");
        let ids: Vec<&str> = approved
            .cases
            .iter()
            .map(|case| case.application_id.0.as_str())
            .collect();
        assert_eq!(approved.total, 3);
        assert_eq!(ids, ["APP-4", "APP-2", "APP-0"]);

        let page = service
            .list(&CaseQuery {
                limit: 2,
                offset: 1,
                decision: None,
            })
            .expect("lists");
        let ids: Vec<&str> = page
            .cases
            .iter()
            .map(|case| case.application_id.0.as_str())
            .collect();
        assert_eq!(page.total, 5);
        assert_eq!(ids, ["APP-3", "APP-2"]);
    }

    #[test]
    fn stats_count_decisions() {
        let (_, service) = service();
        let empty = service.stats().expect("stats");
        assert_eq!(empty.approval_rate, 0.0);
        assert_eq!(empty.total_decisions, 0);

        service
            .submit(application(Some("APP-A"), 80000.0))
            .expect("submits");
        for (id, income) in [("APP-A", 80000.0), ("APP-B", 10000.0), ("APP-C", 45000.0)] {
            service
                .decide(DecisionRequest::new(application(Some(id), income)))
                .expect("decides");
        }

        let stats = service.stats().expect("stats");
        assert_eq!(stats.total_applications, 1);
        assert_eq!(stats.total_decisions, 3);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.rejected, 1);
        assert!((stats.approval_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn case_query_defaults_when_deserialized() {
        let query: CaseQuery = serde_json::from_str("{}").expect("parses");
        assert_eq!(query, CaseQuery::default());
    }
}
