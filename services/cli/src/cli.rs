use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use credit_decision::config::AppConfig;
use credit_decision::decisioning::{CreditDecision, ExplanationStyle, Language};
use credit_decision::error::AppError;
use credit_decision::telemetry;
use tracing::info;

use crate::commands::{run_batch, run_decide, run_suggest, run_what_if};
use crate::demo::{run_demo, DemoArgs};
use crate::infra::{parse_language, parse_style};

#[derive(Parser, Debug)]
#[command(
    name = "credit-decision",
    about = "Decide, explain, and explore credit applications from the command line",
    version
)]
struct Cli {
    /// Rule file to use instead of CREDIT_RULES_PATH or the embedded rule set
    #[arg(long, global = true)]
    rules: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide one application and print its explanation
    Decide(DecideArgs),
    /// Compare the application against modified scenarios
    WhatIf(WhatIfArgs),
    /// Suggest field changes that could turn a rejection around
    Suggest(SuggestArgs),
    /// Decide every application in a CSV export and report the case book
    Batch(BatchArgs),
    /// Walk sample applications through decisioning and what-if analysis (default command)
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
pub(crate) struct DecideArgs {
    /// JSON file holding one credit application
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Explanation language (th or en); defaults to EXPLANATION_LANGUAGE
    #[arg(long, value_parser = parse_language)]
    pub(crate) language: Option<Language>,
    /// Explanation style (short, formal, advisory); defaults to EXPLANATION_STYLE
    #[arg(long, value_parser = parse_style)]
    pub(crate) style: Option<ExplanationStyle>,
    /// Print the full response as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct WhatIfArgs {
    /// JSON file holding the baseline application
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Field override as field=value; repeat for several fields
    #[arg(long = "set", value_name = "FIELD=VALUE", required_unless_present = "scenarios")]
    pub(crate) assignments: Vec<String>,
    /// Name for the scenario built from --set
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// JSON file with an array of scenarios to run against the same baseline
    #[arg(long)]
    pub(crate) scenarios: Option<PathBuf>,
    /// Print results as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SuggestArgs {
    /// JSON file holding one credit application
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Print the plan as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV export with one application per row
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Only list cases with this final decision
    #[arg(long, value_parser = parse_decision)]
    pub(crate) decision: Option<CreditDecision>,
    /// Maximum number of cases to list
    #[arg(long, default_value_t = credit_decision::cases::DEFAULT_PAGE_LIMIT)]
    pub(crate) limit: usize,
    /// Number of cases to skip before listing
    #[arg(long, default_value_t = 0)]
    pub(crate) offset: usize,
}

fn parse_decision(raw: &str) -> Result<CreditDecision, String> {
    CreditDecision::parse(raw)
        .ok_or_else(|| format!("unsupported decision '{raw}' (expected approved or rejected)"))
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    info!(?config.environment, "credit decisioning cli starting");

    let rules = cli.rules.as_deref();
    let decisioning = &config.decisioning;
    match cli.command.unwrap_or_else(|| Command::Demo(DemoArgs::default())) {
        Command::Decide(args) => run_decide(args, rules, decisioning),
        Command::WhatIf(args) => run_what_if(args, rules, decisioning),
        Command::Suggest(args) => run_suggest(args, rules, decisioning),
        Command::Batch(args) => run_batch(args, rules, decisioning),
        Command::Demo(args) => run_demo(args, rules, decisioning),
    }
}
