//! Main test runner that orchestrates the app, browser scripts, tasks and reports

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use conduit_common::Fixtures;

use crate::config::RunnerConfig;
use crate::error::{E2eError, E2eResult};
use crate::pages::expand_steps;
use crate::playwright::{PlaywrightHandle, ScriptContext, ScriptOutcome};
use crate::report::{AggregateOutcome, Report, ReportAggregator, SuiteResult, TestCase, TestState};
use crate::server::AppHandle;
use crate::session::{AuthClient, SessionStore};
use crate::spec::{RunWhen, Scenario, SpecFile, TestStep};
use crate::tasks::TaskRunner;

/// Executes one batch of browser steps
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn run_batch(&self, steps: &[TestStep], ctx: &ScriptContext) -> E2eResult<ScriptOutcome>;
}

#[async_trait]
impl BrowserDriver for PlaywrightHandle {
    async fn run_batch(&self, steps: &[TestStep], ctx: &ScriptContext) -> E2eResult<ScriptOutcome> {
        self.run_steps(steps, ctx).await
    }
}

/// Which spec files to run
#[derive(Debug, Clone, Default)]
pub struct SpecFilter {
    pub tag: Option<String>,
    /// Suite title or file stem
    pub name: Option<String>,
}

impl SpecFilter {
    pub fn matches(&self, spec: &SpecFile, suffix: &str) -> bool {
        let tag_ok = self.tag.as_ref().map_or(true, |t| spec.tags.contains(t));
        let name_ok = self
            .name
            .as_ref()
            .map_or(true, |n| &spec.name == n || spec.stem(suffix) == *n);
        tag_ok && name_ok
    }
}

/// Result of one scenario after retries
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub state: TestState,
    pub attempts: u32,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of one spec file
#[derive(Debug, Clone, Serialize)]
pub struct SpecResult {
    pub name: String,
    pub file: PathBuf,
    pub scenarios: Vec<ScenarioResult>,
    /// Failures of the `after` hook
    pub hook_failures: Vec<String>,
    pub duration_ms: u64,
    pub report_file: Option<PathBuf>,
}

impl SpecResult {
    fn count(&self, state: TestState) -> usize {
        self.scenarios.iter().filter(|s| s.state == state).count()
    }
}

/// Result of the whole run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub duration_ms: u64,
    pub specs: Vec<SpecResult>,
    pub aggregate: Option<AggregateOutcome>,
}

impl SuiteSummary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Per-spec execution state
struct SpecRun {
    stem: String,
    state_file: PathBuf,
    last_failed: bool,
}

/// Main E2E test runner
pub struct TestRunner<D: BrowserDriver = PlaywrightHandle> {
    config: RunnerConfig,
    fixtures: Fixtures,
    driver: D,
    sessions: SessionStore,
    tasks: TaskRunner,
    app: Option<AppHandle>,
}

impl TestRunner<PlaywrightHandle> {
    /// Runner driving a real browser through Playwright
    pub fn new(config: RunnerConfig) -> E2eResult<Self> {
        let driver = PlaywrightHandle::new(&config.output_dir.join("scripts"), config.timeouts.script())?;
        let fixtures = load_fixtures(&config.fixtures_dir)?;
        Self::with_driver(config, fixtures, driver)
    }
}

impl<D: BrowserDriver> TestRunner<D> {
    pub fn with_driver(config: RunnerConfig, fixtures: Fixtures, driver: D) -> E2eResult<Self> {
        let sessions = SessionStore::new(AuthClient::new(&config.base_url)?);
        let tasks = TaskRunner::new(config.database.resolve_url(), config.reporter.report_dir.clone());
        Ok(Self {
            config,
            fixtures,
            driver,
            sessions,
            tasks,
            app: None,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn tasks(&self) -> &TaskRunner {
        &self.tasks
    }

    /// Start (or attach to) the app under test
    pub async fn start_app(&mut self) -> E2eResult<()> {
        if self.app.is_some() {
            return Ok(());
        }
        self.app = Some(AppHandle::start(&self.config.app, &self.config.base_url).await?);
        Ok(())
    }

    /// Stop the app if this runner started it
    pub fn stop_app(&mut self) {
        if let Some(mut app) = self.app.take() {
            app.stop();
        }
    }

    /// Load the spec files selected by `filter`
    pub fn load_specs(&self, filter: &SpecFilter) -> E2eResult<Vec<SpecFile>> {
        let suffix = &self.config.spec_suffix;
        let specs = SpecFile::load_all(&self.config.specs_dir, suffix, &self.fixtures)?;
        Ok(specs.into_iter().filter(|s| filter.matches(s, suffix)).collect())
    }

    /// Run every selected spec file against the app
    pub async fn run_all(&mut self, filter: &SpecFilter) -> E2eResult<SuiteSummary> {
        let specs = self.load_specs(filter)?;
        if specs.is_empty() {
            warn!("No spec files matched in {}", self.config.specs_dir.display());
        }
        self.start_app().await?;
        self.run_specs(&specs).await
    }

    /// Run a list of spec files, then aggregate the reports
    pub async fn run_specs(&mut self, specs: &[SpecFile]) -> E2eResult<SuiteSummary> {
        let start = Instant::now();
        std::fs::create_dir_all(&self.config.reporter.report_dir)?;
        std::fs::create_dir_all(self.config.state_dir())?;

        info!("Running {} spec file(s)...", specs.len());

        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            results.push(self.run_spec(spec).await?);
        }

        let aggregate = if self.config.reporter.merge_after_run {
            Some(ReportAggregator::new(&self.config.reporter.report_dir).aggregate())
        } else {
            None
        };

        let passed = results.iter().map(|r| r.count(TestState::Passed)).sum();
        let pending = results.iter().map(|r| r.count(TestState::Pending)).sum();
        let failed = results
            .iter()
            .map(|r| r.count(TestState::Failed) + r.hook_failures.len())
            .sum();
        let total = results.iter().map(|r| r.scenarios.len()).sum();
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} pending ({} ms)",
            passed, failed, pending, duration_ms
        );

        Ok(SuiteSummary {
            total,
            passed,
            failed,
            pending,
            duration_ms,
            specs: results,
            aggregate,
        })
    }

    /// Write the run summary next to screenshots and videos
    pub fn write_summary(&self, summary: &SuiteSummary) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        std::fs::write(&path, serde_json::to_string_pretty(summary)?)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }

    /// Run one spec file and write its report
    pub async fn run_spec(&mut self, spec: &SpecFile) -> E2eResult<SpecResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let stem = spec.stem(&self.config.spec_suffix);
        info!("Spec: {} ({})", spec.name, spec.path.display());

        let mut run = SpecRun {
            state_file: self.config.state_dir().join(format!("{}.json", stem)),
            stem,
            last_failed: false,
        };

        reset_state(&run.state_file)?;
        let before_error = self
            .run_steps(&spec.before, &run, &format!("{} -- before all", spec.name))
            .await
            .err();
        if let Some(e) = &before_error {
            error!("✗ \"before all\" hook of {} - {}", spec.name, e);
        }

        let mut scenarios = Vec::with_capacity(spec.scenarios.len());
        let mut fatal = None;
        for scenario in &spec.scenarios {
            let result = match &before_error {
                Some(e) => ScenarioResult {
                    name: scenario.name.clone(),
                    state: TestState::Failed,
                    attempts: 0,
                    duration_ms: 0,
                    error: Some(format!("\"before all\" hook failed: {}", e)),
                },
                None => match self.run_scenario(spec, scenario, &run).await {
                    Ok(result) => result,
                    Err(e) => {
                        error!("✗ {} aborted the spec: {}", scenario.name, e);
                        scenarios.push(ScenarioResult {
                            name: scenario.name.clone(),
                            state: TestState::Failed,
                            attempts: 1,
                            duration_ms: 0,
                            error: Some(e.to_string()),
                        });
                        fatal = Some(e);
                        break;
                    }
                },
            };
            run.last_failed = result.state == TestState::Failed;
            scenarios.push(result);
        }

        let mut hook_failures = Vec::new();
        if let Err(e) = self
            .run_steps(&spec.after, &run, &format!("{} -- after all", spec.name))
            .await
        {
            error!("✗ \"after all\" hook of {} - {}", spec.name, e);
            hook_failures.push(e.to_string());
        }

        self.sessions.end_spec();
        self.sessions.deactivate();
        reset_state(&run.state_file)?;

        let mut result = SpecResult {
            name: spec.name.clone(),
            file: spec.path.clone(),
            scenarios,
            hook_failures,
            duration_ms: start.elapsed().as_millis() as u64,
            report_file: None,
        };
        result.report_file = self.write_spec_report(spec, &run.stem, &result, started_at);
        match fatal {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }

    async fn run_scenario(&mut self, spec: &SpecFile, scenario: &Scenario, run: &SpecRun) -> E2eResult<ScenarioResult> {
        if scenario.skip {
            info!("- {} (pending)", scenario.name);
            return Ok(ScenarioResult {
                name: scenario.name.clone(),
                state: TestState::Pending,
                attempts: 0,
                duration_ms: 0,
                error: None,
            });
        }

        let retries = self.config.retries();
        let start = Instant::now();
        let mut last_error = None;
        let mut attempts = 0;

        while attempts <= retries {
            attempts += 1;
            if attempts > 1 {
                warn!("Retrying '{}' (attempt {} of {})", scenario.name, attempts, retries + 1);
            }
            match self.run_attempt(spec, scenario, run, attempts).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) if e.is_scenario_failure() => last_error = Some(e.to_string()),
                Err(e) => return Err(e),
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let state = if last_error.is_none() {
            info!("✓ {} ({} ms)", scenario.name, duration_ms);
            TestState::Passed
        } else {
            error!("✗ {} - {}", scenario.name, last_error.as_deref().unwrap_or("unknown error"));
            TestState::Failed
        };

        Ok(ScenarioResult {
            name: scenario.name.clone(),
            state,
            attempts,
            duration_ms,
            error: last_error,
        })
    }

    /// One try: fresh browser state, hooks around the scenario steps
    async fn run_attempt(&mut self, spec: &SpecFile, scenario: &Scenario, run: &SpecRun, attempt: u32) -> E2eResult<()> {
        self.sessions.deactivate();
        reset_state(&run.state_file)?;

        let label = format!("{} -- {} (attempt {})", spec.name, scenario.name, attempt);
        let mut result = self.run_steps(&spec.before_each, run, &label).await;
        if result.is_ok() {
            result = self.run_steps(&scenario.steps, run, &label).await;
        }
        let after_each = self.run_steps(&spec.after_each, run, &label).await;
        result.and(after_each)
    }

    /// Run steps in order, batching consecutive browser steps into one script
    async fn run_steps(&mut self, steps: &[TestStep], run: &SpecRun, label: &str) -> E2eResult<()> {
        let steps = expand_steps(steps)?;
        let mut batch = Vec::new();

        for step in steps {
            if step.is_host() {
                self.flush_batch(&mut batch, run, label).await?;
                self.run_host_step(&step, run).await?;
            } else {
                batch.push(step);
            }
        }
        self.flush_batch(&mut batch, run, label).await
    }

    async fn flush_batch(&mut self, batch: &mut Vec<TestStep>, run: &SpecRun, label: &str) -> E2eResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let steps = std::mem::take(batch);
        debug!("Running {} browser step(s)", steps.len());

        let ctx = self.script_context(run, label);
        let outcome = self.driver.run_batch(&steps, &ctx).await?;
        if outcome.success {
            return Ok(());
        }

        let step = outcome
            .failed_step
            .and_then(|i| steps.get(i.saturating_sub(1)))
            .map(TestStep::describe)
            .unwrap_or_else(|| "browser".to_string());
        Err(E2eError::StepFailed {
            step,
            reason: outcome.error.unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    async fn run_host_step(&mut self, step: &TestStep, run: &SpecRun) -> E2eResult<()> {
        debug!("Host step: {}", step.describe());
        match step {
            TestStep::Task { task, arg, when } => {
                if *when == RunWhen::LastFailed && !run.last_failed {
                    debug!("Skipping task {}: last scenario did not fail", task);
                    return Ok(());
                }
                let outcome = self.tasks.run_named(task, arg.clone())?;
                debug!("Task {} result: {}", task, serde_json::to_string(&outcome)?);
            }
            TestStep::Login {
                session_id,
                email,
                password,
                share_across_specs,
            } => {
                let email = self
                    .sessions
                    .login(session_id, email, password, *share_across_specs)
                    .await?
                    .email
                    .clone();
                self.tasks.set_unique_value(email);
            }
            TestStep::Register {
                username,
                email,
                password,
            } => {
                let user = self.sessions.client().register(username, email, password).await?;
                info!("Registered {}", user.email);
                self.tasks.set_unique_value(user.email);
            }
            TestStep::ClearSessions => self.sessions.clear_all(),
            TestStep::ClearCookies => clear_storage_entry(&run.state_file, "cookies")?,
            TestStep::ClearLocalStorage => clear_storage_entry(&run.state_file, "origins")?,
            other => {
                return Err(E2eError::StepFailed {
                    step: other.describe(),
                    reason: "not a host step".to_string(),
                });
            }
        }
        Ok(())
    }

    fn script_context(&self, run: &SpecRun, label: &str) -> ScriptContext {
        let browser = &self.config.browser;
        ScriptContext {
            base_url: self.config.base_url.clone(),
            browser: browser.kind,
            headless: browser.headless,
            viewport: self.config.viewport,
            command_timeout_ms: self.config.timeouts.default_command_ms,
            page_load_timeout_ms: self.config.timeouts.page_load_ms,
            token: self.sessions.active_token().map(String::from),
            state_file: run.state_file.clone(),
            failure_screenshot: browser.screenshot_on_failure.then(|| {
                self.config
                    .screenshots_dir()
                    .join(&run.stem)
                    .join(format!("{} (failed).png", file_safe(label)))
            }),
            video_dir: browser.video.then(|| self.config.videos_dir().join(&run.stem)),
        }
    }

    fn write_spec_report(
        &self,
        spec: &SpecFile,
        stem: &str,
        result: &SpecResult,
        started_at: chrono::DateTime<Utc>,
    ) -> Option<PathBuf> {
        let mut tests: Vec<TestCase> = result
            .scenarios
            .iter()
            .map(|s| TestCase::new(&spec.name, &s.name, s.state, s.duration_ms, s.error.as_deref()))
            .collect();
        for failure in &result.hook_failures {
            tests.push(TestCase::new(&spec.name, "\"after all\" hook", TestState::Failed, 0, Some(failure)));
        }

        let report = Report::for_spec(SuiteResult::for_spec(&spec.path, &spec.name, tests), started_at, Utc::now());
        let path = self.config.reporter.report_dir.join(format!("mochawesome_{}.json", stem));
        match report.save(&path) {
            Ok(()) => {
                debug!("Report written to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Could not write report {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl<D: BrowserDriver> Drop for TestRunner<D> {
    fn drop(&mut self) {
        self.stop_app();
    }
}

/// Load fixtures, treating a missing directory as empty
pub fn load_fixtures(dir: &Path) -> E2eResult<Fixtures> {
    if !dir.is_dir() {
        warn!("Fixture directory {} not found, placeholders will not resolve", dir.display());
        return Ok(Fixtures::default());
    }
    Ok(Fixtures::load_dir(dir)?)
}

fn reset_state(state_file: &Path) -> E2eResult<()> {
    match std::fs::remove_file(state_file) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Empty one list of a Playwright storage-state file
fn clear_storage_entry(state_file: &Path, key: &str) -> E2eResult<()> {
    if !state_file.exists() {
        return Ok(());
    }
    let mut state: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(state_file)?)?;
    if let Some(map) = state.as_object_mut() {
        map.insert(key.to_string(), serde_json::Value::Array(Vec::new()));
    }
    std::fs::write(state_file, serde_json::to_string(&state)?)?;
    Ok(())
}

fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() || " -_()".contains(c) { c } else { '_' })
        .collect()
}
