//! Conduit E2E Test Framework
//!
//! A Rust-controlled browser suite for the Conduit article-publishing app:
//! - Attaches to (or spawns) the app and waits until it answers
//! - Parses declarative YAML specs with fixture placeholders
//! - Drives Playwright by generating one script per batch of browser steps
//! - Logs in through the tRPC API and caches sessions by identifier
//! - Seeds and cleans up database rows through named tasks
//! - Writes one mochawesome report per spec and merges them at the end
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_app() -> AppHandle                             │
//! │    ├── run_spec(spec) -> SpecResult                         │
//! │    │     ├── host steps: task, login, register, clear_*     │
//! │    │     └── browser steps -> PlaywrightHandle (node)       │
//! │    └── ReportAggregator::aggregate() -> AggregateOutcome    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SpecFile (YAML)                                            │
//! │    ├── before / before_each / after_each / after            │
//! │    └── scenarios: [{ name, steps }]                         │
//! │          ├── visit, click, type, fill, assert, assert_url   │
//! │          ├── intercept / wait_for, accept_dialog, reload    │
//! │          └── page: { call: "article.delete_article" }       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod locator;
pub mod pages;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod server;
pub mod session;
pub mod spec;
pub mod tasks;

pub use config::RunnerConfig;
pub use error::{E2eError, E2eResult};
pub use report::{AggregateOutcome, ReportAggregator};
pub use runner::{SpecFilter, SuiteSummary, TestRunner};
pub use spec::{SpecFile, TestStep};
pub use tasks::{TaskOutcome, TaskRunner};
