use std::path::Path;

use clap::Args;
use credit_decision::cases::DecisionRequest;
use credit_decision::config::DecisioningConfig;
use credit_decision::decisioning::{CreditApplication, ExplanationStyle, Field, FieldValue, Language};
use credit_decision::error::AppError;
use credit_decision::whatif::{Modifications, Scenario};

use crate::commands::{case_service, print_decision_line, print_plan, print_scenario};
use crate::infra::{build_engine, build_simulator, parse_language, parse_style};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Explanation language for the demo output (defaults to EXPLANATION_LANGUAGE)
    #[arg(long, value_parser = parse_language)]
    pub(crate) language: Option<Language>,
    /// Explanation style for the demo output (defaults to EXPLANATION_STYLE)
    #[arg(long, value_parser = parse_style)]
    pub(crate) style: Option<ExplanationStyle>,
    /// Skip the what-if portion of the demo
    #[arg(long)]
    pub(crate) skip_what_if: bool,
}

pub(crate) fn run_demo(
    args: DemoArgs,
    rules: Option<&Path>,
    config: &DecisioningConfig,
) -> Result<(), AppError> {
    let DemoArgs {
        language,
        style,
        skip_what_if,
    } = args;

    println!("Credit decisioning demo");
    let service = case_service(rules, config)?;
    let applications = sample_applications();

    for application in &applications {
        let stored = service.submit(application.clone())?;
        let response = service.decide(DecisionRequest {
            application: stored.application,
            language,
            style,
        })?;
        println!("\n{}", response.explanation.render_text());
    }

    let stats = service.stats()?;
    println!(
        "\nCase book: {} decided | {} approved | {} rejected | {:.0}% approval rate",
        stats.total_decisions,
        stats.approved,
        stats.rejected,
        stats.approval_rate * 100.0
    );

    if skip_what_if {
        return Ok(());
    }

    let Some(borderline) = applications.get(1) else {
        return Ok(());
    };
    let simulator = build_simulator(build_engine(rules, config)?, config);
    let baseline = borderline.to_record();

    println!("\nWhat-if analysis for {}", borderline.application_id.as_deref().unwrap_or("-"));
    let results = simulator.batch_simulate(&baseline, &sample_scenarios())?;
    if let Some(first) = results.first() {
        print_decision_line("Baseline", &first.result.baseline);
    }
    for result in &results {
        print_scenario(result);
    }

    println!();
    let decision = simulator.engine().decide(&baseline)?;
    let plan = simulator.suggest_improvements(&baseline, &decision);
    print_plan(&simulator, &baseline, &decision, &plan);

    Ok(())
}

pub(crate) fn sample_applications() -> Vec<CreditApplication> {
    vec![
        CreditApplication {
            application_id: Some("APP-DEMO-001".to_string()),
            monthly_income: 85000.0,
            employment_years: 8,
            employment_type: "permanent".to_string(),
            debt_to_income: 0.25,
            existing_loans: 1,
            late_payment_count: 0,
            credit_utilization: 0.3,
            requested_amount: 400000.0,
            loan_purpose: "car".to_string(),
            age: 38,
            education_level: "master".to_string(),
            marital_status: "married".to_string(),
            dependents: 1,
            home_ownership: "own".to_string(),
            savings_balance: 600000.0,
            checking_balance: 80000.0,
            credit_history_length: 10,
            previous_defaults: 0,
        },
        CreditApplication {
            application_id: Some("APP-DEMO-002".to_string()),
            monthly_income: 25000.0,
            employment_years: 1,
            employment_type: "contract".to_string(),
            debt_to_income: 0.55,
            existing_loans: 3,
            late_payment_count: 2,
            credit_utilization: 0.75,
            requested_amount: 500000.0,
            loan_purpose: "personal".to_string(),
            age: 28,
            education_level: "bachelor".to_string(),
            marital_status: "single".to_string(),
            dependents: 0,
            home_ownership: "rent".to_string(),
            savings_balance: 50000.0,
            checking_balance: 10000.0,
            credit_history_length: 3,
            previous_defaults: 0,
        },
        CreditApplication {
            application_id: Some("APP-DEMO-003".to_string()),
            monthly_income: 40000.0,
            employment_years: 4,
            employment_type: "self_employed".to_string(),
            debt_to_income: 0.4,
            existing_loans: 2,
            late_payment_count: 1,
            credit_utilization: 0.5,
            requested_amount: 300000.0,
            loan_purpose: "business".to_string(),
            age: 45,
            education_level: "high_school".to_string(),
            marital_status: "divorced".to_string(),
            dependents: 2,
            home_ownership: "mortgage".to_string(),
            savings_balance: 120000.0,
            checking_balance: 30000.0,
            credit_history_length: 12,
            previous_defaults: 1,
        },
    ]
}

fn modifications(pairs: &[(Field, f64)]) -> Modifications {
    pairs
        .iter()
        .map(|(field, value)| (*field, FieldValue::Number(*value)))
        .collect()
}

pub(crate) fn sample_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::named(
            "Pay down debt",
            modifications(&[(Field::DebtToIncome, 0.3), (Field::LatePaymentCount, 0.0)]),
        ),
        Scenario::named(
            "Smaller loan",
            modifications(&[(Field::RequestedAmount, 200000.0)]),
        ),
        Scenario::named(
            "Debt, utilization, and amount together",
            modifications(&[
                (Field::DebtToIncome, 0.3),
                (Field::LatePaymentCount, 0.0),
                (Field::CreditUtilization, 0.4),
                (Field::RequestedAmount, 200000.0),
            ]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use credit_decision::decisioning::CreditDecision;

    fn config() -> DecisioningConfig {
        DecisioningConfig {
            rules_path: None,
            moderate_score_delta: 0.1,
            max_suggestions: 5,
            language: Language::English,
            style: ExplanationStyle::Formal,
        }
    }

    #[test]
    fn sample_applications_are_valid() {
        for application in sample_applications() {
            application.validate().expect("sample validates");
        }
    }

    #[test]
    fn samples_cover_approval_and_rejection() {
        let engine = build_engine(None, &config()).expect("engine builds");
        let decisions: Vec<CreditDecision> = sample_applications()
            .iter()
            .map(|application| {
                engine
                    .decide(&application.to_record())
                    .expect("decides")
                    .final_decision()
            })
            .collect();

        assert_eq!(
            decisions,
            [
                CreditDecision::Approved,
                CreditDecision::Rejected,
                CreditDecision::Rejected
            ]
        );
    }

    #[test]
    fn combined_scenario_turns_borderline_applicant_around() {
        let config = config();
        let simulator = build_simulator(build_engine(None, &config).expect("engine"), &config);
        let baseline = sample_applications()[1].to_record();

        let results = simulator
            .batch_simulate(&baseline, &sample_scenarios())
            .expect("simulates");

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].result.baseline.final_decision(), CreditDecision::Rejected);
        assert_eq!(results[2].result.variant.final_decision(), CreditDecision::Approved);
    }
}
