use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::decisioning::explanation::{ExplanationStyle, Language};

const DEFAULT_MODERATE_SCORE_DELTA: f64 = 0.1;
const DEFAULT_MAX_SUGGESTIONS: usize = 5;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub decisioning: DecisioningConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let rules_path = env::var("CREDIT_RULES_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let moderate_score_delta = match env::var("WHATIF_MODERATE_DELTA") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite() && *value >= 0.0)
                .ok_or(ConfigError::InvalidModerateDelta)?,
            Err(_) => DEFAULT_MODERATE_SCORE_DELTA,
        };

        let max_suggestions = match env::var("WHATIF_MAX_SUGGESTIONS") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidMaxSuggestions)?,
            Err(_) => DEFAULT_MAX_SUGGESTIONS,
        };

        let language = match env::var("EXPLANATION_LANGUAGE") {
            Ok(raw) => Language::parse(&raw).ok_or(ConfigError::InvalidLanguage(raw))?,
            Err(_) => Language::default(),
        };

        let style = match env::var("EXPLANATION_STYLE") {
            Ok(raw) => ExplanationStyle::parse(&raw).ok_or(ConfigError::InvalidStyle(raw))?,
            Err(_) => ExplanationStyle::default(),
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            decisioning: DecisioningConfig {
                rules_path,
                moderate_score_delta,
                max_suggestions,
                language,
                style,
            },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Rule source, what-if tuning, and explanation defaults.
#[derive(Debug, Clone)]
pub struct DecisioningConfig {
    /// Rule file to load instead of the embedded rule set.
    pub rules_path: Option<PathBuf>,
    /// Absolute score delta above which a scenario counts as a moderate impact.
    pub moderate_score_delta: f64,
    pub max_suggestions: usize,
    pub language: Language,
    pub style: ExplanationStyle,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidModerateDelta,
    InvalidMaxSuggestions,
    InvalidLanguage(String),
    InvalidStyle(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidModerateDelta => {
                write!(f, "WHATIF_MODERATE_DELTA must be a finite, non-negative number")
            }
            ConfigError::InvalidMaxSuggestions => {
                write!(f, "WHATIF_MAX_SUGGESTIONS must be a valid usize")
            }
            ConfigError::InvalidLanguage(value) => {
                write!(f, "EXPLANATION_LANGUAGE must be 'th' or 'en' (found '{value}')")
            }
            ConfigError::InvalidStyle(value) => write!(
                f,
                "EXPLANATION_STYLE must be 'short', 'formal', or 'advisory' (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serializes tests that read or mutate process environment variables.
#[cfg(test)]
pub(crate) fn env_guard() -> &'static std::sync::Mutex<()> {
    static GUARD: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| std::sync::Mutex::new(()))
}
