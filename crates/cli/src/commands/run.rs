//! Run Commands

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use conduit_e2e::config::AppConfig;
use conduit_e2e::report::TestState;
use conduit_e2e::runner::SpecResult;
use conduit_e2e::server::AppHandle;
use conduit_e2e::{RunnerConfig, SpecFilter, TestRunner};

use crate::output::{print_error, print_list, print_success, print_value, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Run only spec files carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only the spec file with this title or file stem
    #[arg(short, long)]
    pub name: Option<String>,

    /// Show the browser; uses the open-mode retry count
    #[arg(long)]
    pub headed: bool,

    /// Keep per-spec reports instead of merging them
    #[arg(long)]
    pub no_merge: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Seconds to wait for the app
    #[arg(long, default_value = "5")]
    pub timeout: u64,
}

/// Per-spec row of a run summary
#[derive(Serialize)]
pub struct SpecRow {
    pub spec: String,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub duration_ms: u64,
}

impl From<&SpecResult> for SpecRow {
    fn from(result: &SpecResult) -> Self {
        let count = |state: TestState| result.scenarios.iter().filter(|s| s.state == state).count();
        Self {
            spec: result.name.clone(),
            passed: count(TestState::Passed),
            failed: count(TestState::Failed) + result.hook_failures.len(),
            pending: count(TestState::Pending),
            duration_ms: result.duration_ms,
        }
    }
}

impl TableDisplay for SpecRow {
    fn headers() -> Vec<&'static str> {
        vec!["Spec", "Passed", "Failed", "Pending", "Duration"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.spec.clone(),
            self.passed.to_string(),
            self.failed.to_string(),
            self.pending.to_string(),
            format!("{:.1}s", self.duration_ms as f64 / 1000.0),
        ]
    }
}

/// Run the suite; returns whether every scenario passed
pub async fn execute(args: RunArgs, mut config: RunnerConfig, format: OutputFormat) -> Result<bool> {
    if args.headed {
        config.browser.headless = false;
    }
    if args.no_merge {
        config.reporter.merge_after_run = false;
    }
    let filter = SpecFilter {
        tag: args.tag,
        name: args.name,
    };

    let mut runner = TestRunner::new(config)?;
    let summary = runner.run_all(&filter).await?;
    runner.write_summary(&summary)?;

    match format {
        OutputFormat::Table | OutputFormat::Plain => {
            let rows: Vec<SpecRow> = summary.specs.iter().map(SpecRow::from).collect();
            print_list(&rows, format)?;
        }
        _ => print_value(&summary, format)?,
    }

    if summary.success() {
        print_success(&format!("{} passed, {} pending", summary.passed, summary.pending));
    } else {
        print_error(&format!("{} of {} failed", summary.failed, summary.total));
    }
    Ok(summary.success())
}

/// Check whether the app answers at the configured base URL
pub async fn status(args: StatusArgs, config: &RunnerConfig) -> Result<bool> {
    let app = AppConfig {
        command: Vec::new(),
        ready_timeout_secs: args.timeout,
        ..config.app.clone()
    };
    match AppHandle::start(&app, &config.base_url).await {
        Ok(_) => {
            print_success(&format!("App is up at {}", config.base_url));
            Ok(true)
        }
        Err(e) => {
            print_error(&format!("App is not answering at {}: {}", config.base_url, e));
            Ok(false)
        }
    }
}
