//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("App failed to start: {0}")]
    AppStartup(String),

    #[error("App readiness check failed after {0} attempts")]
    AppHealthCheck(usize),

    #[error("Playwright not found. Install with: npm i -D playwright @playwright/test && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Unknown page object call: {0}")]
    UnknownPageCall(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("API request to {endpoint} failed with status {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Session error: {0}")]
    Session(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error(transparent)]
    Common(#[from] conduit_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

impl E2eError {
    /// Errors that fail the scenario being run rather than the whole run
    pub fn is_scenario_failure(&self) -> bool {
        matches!(
            self,
            E2eError::StepFailed { .. }
                | E2eError::Api { .. }
                | E2eError::Session(_)
                | E2eError::Timeout(_)
                | E2eError::Playwright(_)
                | E2eError::UnknownPageCall(_)
                | E2eError::Http(_)
        )
    }
}
