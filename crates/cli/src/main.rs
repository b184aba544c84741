//! Conduit E2E CLI - Main Entry Point

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use conduit_e2e::RunnerConfig;
use conduit_e2e_cli::commands::{auth, report, run, specs, task};
use conduit_e2e_cli::output::{self, print_error};

/// Tools for the Conduit browser E2E suite
#[derive(Parser)]
#[command(name = "conduit-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Runner configuration file
    #[arg(short, long, default_value = "conduit-e2e.toml", global = true)]
    config: PathBuf,

    /// Override the app base URL
    #[arg(long, env = "CONDUIT_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the suite
    Run(run::RunArgs),

    /// List spec files
    Specs(specs::SpecsArgs),

    /// Merge per-spec reports into one HTML report
    Report(report::ReportArgs),

    /// Run a suite task, e.g. `task deleteUser e2e.bob@example.com`
    Task(task::TaskArgs),

    /// Log in or register through the app's API
    #[command(subcommand)]
    Auth(auth::AuthCommands),

    /// Check whether the app answers
    Status(run::StatusArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match dispatch(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            print_error(&format!("{:#}", e));
            std::process::exit(2);
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<bool> {
    let mut config = RunnerConfig::load(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    match cli.command {
        Commands::Run(args) => run::execute(args, config, cli.format).await,
        Commands::Specs(args) => specs::execute(args, &config, cli.format),
        Commands::Report(args) => report::execute(args, &config, cli.format),
        Commands::Task(args) => task::execute(args, &config, cli.format),
        Commands::Auth(cmd) => auth::execute(cmd, &config, cli.format).await,
        Commands::Status(args) => run::status(args, &config).await,
        Commands::Version => {
            println!("conduit-e2e v{}", env!("CARGO_PKG_VERSION"));
            Ok(true)
        }
    }
}
