//! Report Commands

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use conduit_e2e::{AggregateOutcome, ReportAggregator, RunnerConfig};

use crate::output::{print_error, print_info, print_success, print_value, print_warning, OutputFormat};

#[derive(Args)]
pub struct ReportArgs {
    /// Report directory; defaults to the configured one
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// Merge per-spec reports and render the HTML page
pub fn execute(args: ReportArgs, config: &RunnerConfig, format: OutputFormat) -> Result<bool> {
    let dir = args.dir.unwrap_or_else(|| config.reporter.report_dir.clone());
    let outcome = ReportAggregator::new(dir.clone()).aggregate();

    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        print_value(&outcome, format)?;
        return Ok(succeeded(&outcome));
    }

    match &outcome {
        AggregateOutcome::NoInput => print_info(&format!("No reports to merge in {}", dir.display())),
        AggregateOutcome::Rejected { reason } => print_warning(&format!("Reports left untouched: {}", reason)),
        AggregateOutcome::Rendered { html, removed, .. } => {
            print_success(&format!("Merged {} report(s) into {}", removed.len(), html.display()))
        }
        AggregateOutcome::RenderFailed { diagnostic, error } => {
            print_error(&format!("Rendering failed: {}", error));
            if let Some(path) = diagnostic {
                print_info(&format!("Diagnostic written to {}", path.display()));
            }
        }
        AggregateOutcome::Errored { error } => print_error(error),
    }
    Ok(succeeded(&outcome))
}

fn succeeded(outcome: &AggregateOutcome) -> bool {
    matches!(outcome, AggregateOutcome::NoInput | AggregateOutcome::Rendered { .. })
}
