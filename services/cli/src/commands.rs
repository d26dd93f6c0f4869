use std::path::Path;
use std::sync::Arc;

use credit_decision::cases::{CaseQuery, CaseService, DecisionRequest};
use credit_decision::config::DecisioningConfig;
use credit_decision::decisioning::{ApplicationRecord, Decision, ExplanationFormatter};
use credit_decision::error::AppError;
use credit_decision::import::read_applications_from_path;
use credit_decision::whatif::{
    parse_assignment, ImprovementPlan, Modifications, Scenario, ScenarioResult, WhatIfSimulator,
};
use tracing::warn;

use crate::cli::{BatchArgs, DecideArgs, SuggestArgs, WhatIfArgs};
use crate::infra::{
    build_engine, build_simulator, load_application, print_json, InMemoryCaseRepository,
};

pub(crate) fn case_service(
    rules: Option<&Path>,
    config: &DecisioningConfig,
) -> Result<CaseService<InMemoryCaseRepository>, AppError> {
    Ok(CaseService::new(
        Arc::new(InMemoryCaseRepository::default()),
        build_engine(rules, config)?,
        ExplanationFormatter::new(config.language, config.style),
    ))
}

pub(crate) fn run_decide(
    args: DecideArgs,
    rules: Option<&Path>,
    config: &DecisioningConfig,
) -> Result<(), AppError> {
    let service = case_service(rules, config)?;
    let application = load_application(&args.input)?;

    let response = service.decide(DecisionRequest {
        application,
        language: args.language,
        style: args.style,
    })?;

    if args.json {
        print_json(&response)
    } else {
        println!("{}", response.explanation.render_text());
        Ok(())
    }
}

pub(crate) fn run_what_if(
    args: WhatIfArgs,
    rules: Option<&Path>,
    config: &DecisioningConfig,
) -> Result<(), AppError> {
    let simulator = build_simulator(build_engine(rules, config)?, config);
    let baseline = load_application(&args.input)?.to_record();

    let mut scenarios: Vec<Scenario> = match &args.scenarios {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };
    if !args.assignments.is_empty() {
        let modifications = args
            .assignments
            .iter()
            .map(|raw| parse_assignment(raw))
            .collect::<Result<Modifications, _>>()?;
        scenarios.push(Scenario {
            name: args.name,
            modifications,
        });
    }

    let results = simulator.batch_simulate(&baseline, &scenarios)?;
    if args.json {
        return print_json(&results);
    }

    if let Some(first) = results.first() {
        print_decision_line("Baseline", &first.result.baseline);
    }
    for result in &results {
        print_scenario(result);
    }
    Ok(())
}

pub(crate) fn run_suggest(
    args: SuggestArgs,
    rules: Option<&Path>,
    config: &DecisioningConfig,
) -> Result<(), AppError> {
    let simulator = build_simulator(build_engine(rules, config)?, config);
    let record = load_application(&args.input)?.to_record();
    let decision = simulator.engine().decide(&record)?;
    let plan = simulator.suggest_improvements(&record, &decision);

    if args.json {
        print_json(&plan)
    } else {
        print_plan(&simulator, &record, &decision, &plan);
        Ok(())
    }
}

pub(crate) fn run_batch(
    args: BatchArgs,
    rules: Option<&Path>,
    config: &DecisioningConfig,
) -> Result<(), AppError> {
    let service = case_service(rules, config)?;
    let applications = read_applications_from_path(&args.csv)?;

    let mut skipped = 0usize;
    for application in applications {
        let outcome = service
            .submit(application)
            .and_then(|stored| service.decide(DecisionRequest::new(stored.application)));
        if let Err(err) = outcome {
            skipped += 1;
            warn!(error = %err, "application skipped");
        }
    }

    let page = service.list(&CaseQuery {
        limit: args.limit,
        offset: args.offset,
        decision: args.decision,
    })?;
    let stats = service.stats()?;

    println!(
        "Cases {}-{} of {}",
        page.offset + usize::from(!page.cases.is_empty()),
        page.offset + page.cases.len(),
        page.total
    );
    for case in &page.cases {
        let risk = case.decision.risk_result();
        println!(
            "- {} | {} | score {:.3} | {} risk | {}",
            case.application_id,
            case.final_decision().label().to_ascii_uppercase(),
            risk.score,
            risk.risk_band,
            case.decision.decision_reason()
        );
    }

    println!(
        "\nTotals: {} applications | {} decided | {} approved | {} rejected | {:.1}% approval rate",
        stats.total_applications,
        stats.total_decisions,
        stats.approved,
        stats.rejected,
        stats.approval_rate * 100.0
    );
    if skipped > 0 {
        println!("Skipped {skipped} application(s) that failed validation or scoring");
    }
    Ok(())
}

pub(crate) fn print_decision_line(label: &str, decision: &Decision) {
    let risk = decision.risk_result();
    println!(
        "{label}: {} (score {:.3}, {} risk, {:.1}% confidence)",
        decision.final_decision().label().to_ascii_uppercase(),
        risk.score,
        risk.risk_band,
        decision.confidence() * 100.0
    );
}

pub(crate) fn print_scenario(result: &ScenarioResult) {
    let delta = &result.result.delta;
    println!("\n[{}] {}", result.scenario_id, result.scenario_name);
    for (field, value) in &result.result.modifications {
        println!("  set {field} = {value}");
    }
    print_decision_line("  Variant", &result.result.variant);
    let pct = delta
        .score_change_pct
        .map(|pct| format!("{pct:+.1}%"))
        .unwrap_or_else(|| "n/a".to_string());
    println!("  Score delta: {:+.3} ({pct})", delta.score_delta);
    println!("  {}", delta.impact_summary);
}

pub(crate) fn print_plan(
    simulator: &WhatIfSimulator,
    record: &ApplicationRecord,
    decision: &Decision,
    plan: &ImprovementPlan,
) {
    print_decision_line("Current decision", decision);
    match plan {
        ImprovementPlan::AlreadyApproved => println!("Application is already approved."),
        ImprovementPlan::Suggestions { suggestions } if suggestions.is_empty() => {
            println!("No field changes are known to address the triggered rules.")
        }
        ImprovementPlan::Suggestions { suggestions } => {
            println!("Suggested improvements:");
            for suggestion in suggestions {
                println!(
                    "  - [{:?}] {} ({}: {} -> {}) from {}",
                    suggestion.priority,
                    suggestion.reason,
                    suggestion.field,
                    suggestion.current_value,
                    suggestion.suggested_value,
                    suggestion.rule_id
                );
            }

            let modifications: Modifications = suggestions
                .iter()
                .map(|suggestion| (suggestion.field, suggestion.suggested_value.into()))
                .collect();
            match simulator.simulate(record, &modifications) {
                Ok(result) => {
                    print_decision_line("With all suggestions", &result.variant);
                    println!("  {}", result.delta.impact_summary);
                }
                Err(err) => warn!(error = %err, "could not simulate suggested changes"),
            }
        }
    }
}
