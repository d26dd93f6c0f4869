use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use credit_decision::cases::{
    ApplicationStatus, CaseRecord, CaseRepository, RepositoryError, StoredApplication,
};
use credit_decision::config::DecisioningConfig;
use credit_decision::decisioning::{
    ApplicationId, CreditApplication, DecisionEngine, ExplanationStyle, Language,
    ReferenceScorecard, RuleSet,
};
use credit_decision::error::AppError;
use credit_decision::whatif::{ScenarioComparator, WhatIfSimulator};
use tracing::debug;

#[derive(Default, Clone)]
pub(crate) struct InMemoryCaseRepository {
    applications: Arc<Mutex<BTreeMap<ApplicationId, StoredApplication>>>,
    /// Insertion order; re-deciding an application replaces its case in place.
    cases: Arc<Mutex<Vec<CaseRecord>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
}

impl CaseRepository for InMemoryCaseRepository {
    fn insert_application(
        &self,
        application: StoredApplication,
    ) -> Result<StoredApplication, RepositoryError> {
        let mut guard = lock(&self.applications)?;
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
        Ok(lock(&self.applications)?.get(id).cloned())
    }

    fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.applications)?;
        match guard.get_mut(id) {
            Some(stored) => {
                stored.status = status;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn application_count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.applications)?.len())
    }

    fn store_case(&self, case: CaseRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.cases)?;
        match guard
            .iter_mut()
            .find(|stored| stored.application_id == case.application_id)
        {
            Some(stored) => *stored = case,
            None => guard.push(case),
        }
        Ok(())
    }

    fn fetch_case(&self, id: &ApplicationId) -> Result<Option<CaseRecord>, RepositoryError> {
        Ok(lock(&self.cases)?
            .iter()
            .find(|case| &case.application_id == id)
            .cloned())
    }

    fn cases(&self) -> Result<Vec<CaseRecord>, RepositoryError> {
        Ok(lock(&self.cases)?.clone())
    }
}

/// Rules from `--rules`, then `CREDIT_RULES_PATH`, then the embedded rule set.
pub(crate) fn load_rules(
    override_path: Option<&Path>,
    config: &DecisioningConfig,
) -> Result<RuleSet, AppError> {
    let rules = match override_path.or(config.rules_path.as_deref()) {
        Some(path) => RuleSet::from_path(path)?,
        None => {
            let rules = RuleSet::standard()?;
            debug!(rules = rules.len(), "using embedded rule set");
            rules
        }
    };
    Ok(rules)
}

pub(crate) fn build_engine(
    override_path: Option<&Path>,
    config: &DecisioningConfig,
) -> Result<DecisionEngine, AppError> {
    let rules = load_rules(override_path, config)?;
    let scorecard = ReferenceScorecard::standard()?;
    Ok(DecisionEngine::new(Arc::new(rules), Arc::new(scorecard)))
}

pub(crate) fn build_simulator(engine: DecisionEngine, config: &DecisioningConfig) -> WhatIfSimulator {
    WhatIfSimulator::new(engine)
        .with_comparator(ScenarioComparator::new(config.moderate_score_delta))
        .with_max_suggestions(config.max_suggestions)
}

/// Read one application from a JSON file, validating it before use.
pub(crate) fn load_application(path: &Path) -> Result<CreditApplication, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let application: CreditApplication = serde_json::from_str(&raw)?;
    application
        .validate()
        .map_err(credit_decision::decisioning::DecisionError::from)?;
    Ok(application)
}

pub(crate) fn parse_language(raw: &str) -> Result<Language, String> {
    Language::parse(raw).ok_or_else(|| format!("unsupported language '{raw}' (expected th or en)"))
}

pub(crate) fn parse_style(raw: &str) -> Result<ExplanationStyle, String> {
    ExplanationStyle::parse(raw)
        .ok_or_else(|| format!("unsupported style '{raw}' (expected short, formal, or advisory)"))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use credit_decision::cases::{CaseQuery, CaseService, DecisionRequest};
    use credit_decision::decisioning::ExplanationFormatter;

    fn stored(id: &str) -> StoredApplication {
        StoredApplication {
            application_id: ApplicationId(id.to_string()),
            application: crate::demo::sample_applications()
                .into_iter()
                .next()
                .expect("sample application"),
            status: ApplicationStatus::Submitted,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_application_ids_conflict() {
        let repository = InMemoryCaseRepository::default();
        repository.insert_application(stored("APP1")).expect("first insert");

        let err = repository
            .insert_application(stored("APP1"))
            .expect_err("duplicate rejected");

        assert_eq!(err, RepositoryError::Conflict);
        assert_eq!(repository.application_count(), Ok(1));
    }

    #[test]
    fn status_update_requires_existing_application() {
        let repository = InMemoryCaseRepository::default();
        let id = ApplicationId("APP2".to_string());

        assert_eq!(
            repository.update_status(&id, ApplicationStatus::Decided),
            Err(RepositoryError::NotFound)
        );

        repository.insert_application(stored("APP2")).expect("insert");
        repository
            .update_status(&id, ApplicationStatus::Decided)
            .expect("update");
        let fetched = repository
            .fetch_application(&id)
            .expect("fetch")
            .expect("present");
        assert_eq!(fetched.status, ApplicationStatus::Decided);
    }

    #[test]
    fn cases_decided_at_the_same_instant_list_in_insertion_order() {
        let config = DecisioningConfig {
            rules_path: None,
            moderate_score_delta: 0.1,
            max_suggestions: 5,
            language: Language::English,
            style: ExplanationStyle::Short,
        };
        let repository = Arc::new(InMemoryCaseRepository::default());
        let service = CaseService::new(
            repository.clone(),
            build_engine(None, &config).expect("engine builds"),
            ExplanationFormatter::new(config.language, config.style),
        );

        let decided_at = Utc::now();
        for id in ["APP-Z", "APP-A", "APP-M"] {
            let mut application = crate::demo::sample_applications()
                .into_iter()
                .next()
                .expect("sample application");
            application.application_id = Some(id.to_string());
            service
                .decide(DecisionRequest::new(application))
                .expect("decides");
            let mut case = repository
                .fetch_case(&ApplicationId(id.to_string()))
                .expect("fetch")
                .expect("case stored");
            case.decided_at = decided_at;
            repository.store_case(case).expect("restamp");
        }

        let page = service.list(&CaseQuery::default()).expect("lists");
        let ids: Vec<&str> = page
            .cases
            .iter()
            .map(|case| case.application_id.0.as_str())
            .collect();

        assert_eq!(ids, ["APP-Z", "APP-A", "APP-M"]);
        assert_eq!(repository.cases().expect("cases").len(), 3);
    }

    #[test]
    fn value_parsers_accept_known_codes() {
        assert_eq!(parse_language("EN"), Ok(Language::English));
        assert!(parse_language("fr").is_err());
        assert_eq!(parse_style("advisory"), Ok(ExplanationStyle::Advisory));
        assert!(parse_style("casual").unwrap_err().contains("casual"));
    }
}
