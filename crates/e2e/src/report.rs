//! Mochawesome-format results and end-of-run report aggregation
//!
//! Each spec file writes one JSON document into the report directory. Once
//! all specs have run, [`ReportAggregator::aggregate`] merges them into
//! `merged-report.json`, renders `merged-report.html`, and removes the
//! per-spec inputs. Every failure along the way degrades to a logged
//! outcome; nothing here fails the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};

/// Stem shared by the merged JSON and HTML outputs
pub const MERGED_REPORT_STEM: &str = "merged-report";

/// Merged JSON output
pub const MERGED_REPORT_JSON: &str = "merged-report.json";

/// Rendered HTML output
pub const MERGED_REPORT_HTML: &str = "merged-report.html";

/// Written when no render path succeeds
pub const DIAGNOSTIC_FILE: &str = "report-diagnostic.json";

/// Top-level key stamped on merged output, listing the files it was built from
pub const MERGED_MARKER: &str = "mergedFrom";

// ============================================================================
// Report documents
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportStats {
    pub suites: u64,
    pub tests: u64,
    pub passes: u64,
    pub pending: u64,
    pub failures: u64,
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration: u64,
    pub tests_registered: u64,
    pub pass_percent: f64,
    pub pending_percent: f64,
    pub other: u64,
    pub has_other: bool,
    pub skipped: u64,
    pub has_skipped: bool,
}

/// Outcome of one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestState {
    Passed,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestCase {
    pub title: String,
    pub full_title: String,
    pub timed_out: Option<bool>,
    pub duration: u64,
    pub state: Option<TestState>,
    pub pass: bool,
    pub fail: bool,
    pub pending: bool,
    pub code: String,
    pub err: Value,
    pub uuid: String,
    #[serde(rename = "parentUUID")]
    pub parent_uuid: String,
    pub is_hook: bool,
    pub skipped: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestCase {
    pub fn new(suite: &str, title: &str, state: TestState, duration_ms: u64, error: Option<&str>) -> Self {
        let err = match error {
            Some(message) => serde_json::json!({ "message": message, "estack": message }),
            None => Value::Object(Map::new()),
        };
        Self {
            title: title.to_string(),
            full_title: format!("{} {}", suite, title),
            duration: duration_ms,
            state: Some(state),
            pass: state == TestState::Passed,
            fail: state == TestState::Failed,
            pending: state == TestState::Pending,
            err,
            uuid: uuid::Uuid::new_v4().to_string(),
            ..Default::default()
        }
    }

    /// Error message of a failed test
    pub fn error_message(&self) -> Option<&str> {
        self.err.get("message").and_then(Value::as_str)
    }
}

/// A suite; the top level of `results` holds one root suite per spec file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuiteResult {
    pub uuid: String,
    pub title: String,
    pub full_file: String,
    pub file: String,
    pub tests: Vec<TestCase>,
    pub suites: Vec<SuiteResult>,
    pub passes: Vec<String>,
    pub failures: Vec<String>,
    pub pending: Vec<String>,
    pub skipped: Vec<String>,
    pub duration: u64,
    pub root: bool,
    pub root_empty: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SuiteResult {
    /// Root suite for one spec file holding one `describe` suite
    pub fn for_spec(file: &Path, title: &str, tests: Vec<TestCase>) -> Self {
        let suite_uuid = uuid::Uuid::new_v4().to_string();
        let tests: Vec<TestCase> = tests
            .into_iter()
            .map(|mut t| {
                t.parent_uuid = suite_uuid.clone();
                t
            })
            .collect();
        let ids = |state: TestState| -> Vec<String> {
            tests
                .iter()
                .filter(|t| t.state == Some(state))
                .map(|t| t.uuid.clone())
                .collect()
        };

        let inner = SuiteResult {
            uuid: suite_uuid,
            title: title.to_string(),
            full_file: file.display().to_string(),
            file: file.display().to_string(),
            passes: ids(TestState::Passed),
            failures: ids(TestState::Failed),
            pending: ids(TestState::Pending),
            duration: tests.iter().map(|t| t.duration).sum(),
            tests,
            ..Default::default()
        };

        SuiteResult {
            uuid: uuid::Uuid::new_v4().to_string(),
            full_file: inner.full_file.clone(),
            file: inner.file.clone(),
            root: true,
            root_empty: true,
            suites: vec![inner],
            ..Default::default()
        }
    }

    fn all_tests(&self) -> Box<dyn Iterator<Item = &TestCase> + '_> {
        Box::new(self.tests.iter().chain(self.suites.iter().flat_map(|s| s.all_tests())))
    }

    fn count_suites(&self) -> u64 {
        let own = if self.root { 0 } else { 1 };
        own + self.suites.iter().map(|s| s.count_suites()).sum::<u64>()
    }
}

/// A complete mochawesome document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub stats: ReportStats,
    pub results: Vec<SuiteResult>,
    pub meta: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Report {
    /// Build a document for one spec file and compute its stats
    pub fn for_spec(suite: SuiteResult, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut report = Report {
            results: vec![suite],
            meta: serde_json::json!({
                "reporter": { "name": "conduit-e2e", "version": env!("CARGO_PKG_VERSION") }
            }),
            ..Default::default()
        };
        report.stats = compute_stats(&report.results, Some(start.to_rfc3339()), Some(end.to_rfc3339()), None);
        report
    }

    /// Read a document from disk
    pub fn load(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write a document to disk
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Merge documents: concatenate results and recompute the stats
pub fn merge_reports(reports: Vec<Report>) -> Report {
    let mut start: Option<DateTime<Utc>> = None;
    let mut end: Option<DateTime<Utc>> = None;
    let mut other = 0;
    let mut skipped = 0;
    let mut meta = Value::Null;
    let mut results = Vec::new();

    for report in reports {
        if let Some(s) = report.stats.start.as_deref().and_then(parse_time) {
            start = Some(start.map_or(s, |cur| cur.min(s)));
        }
        if let Some(e) = report.stats.end.as_deref().and_then(parse_time) {
            end = Some(end.map_or(e, |cur| cur.max(e)));
        }
        other += report.stats.other;
        skipped += report.stats.skipped;
        if meta.is_null() {
            meta = report.meta;
        }
        results.extend(report.results);
    }

    let mut stats = compute_stats(
        &results,
        start.map(|s| s.to_rfc3339()),
        end.map(|e| e.to_rfc3339()),
        None,
    );
    stats.other = other;
    stats.has_other = other > 0;
    stats.skipped = skipped;
    stats.has_skipped = skipped > 0;

    Report {
        stats,
        results,
        meta,
        extra: Map::new(),
    }
}

fn compute_stats(results: &[SuiteResult], start: Option<String>, end: Option<String>, duration: Option<u64>) -> ReportStats {
    let tests: Vec<&TestCase> = results.iter().flat_map(|r| r.all_tests()).collect();
    let count = |state: TestState| tests.iter().filter(|t| t.state == Some(state)).count() as u64;

    let passes = count(TestState::Passed);
    let failures = count(TestState::Failed);
    let pending = count(TestState::Pending);
    let registered = tests.len() as u64;

    let duration = duration.unwrap_or_else(|| {
        match (start.as_deref().and_then(parse_time), end.as_deref().and_then(parse_time)) {
            (Some(s), Some(e)) if e >= s => (e - s).num_milliseconds() as u64,
            _ => tests.iter().map(|t| t.duration).sum(),
        }
    });

    ReportStats {
        suites: results.iter().map(|r| r.count_suites()).sum(),
        tests: passes + failures,
        passes,
        pending,
        failures,
        start,
        end,
        duration,
        tests_registered: registered,
        pass_percent: percent(passes, registered.saturating_sub(pending)),
        pending_percent: percent(pending, registered),
        ..Default::default()
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        ((part as f64 / whole as f64) * 1000.0).round() / 10.0
    }
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|t| t.with_timezone(&Utc))
}

// ============================================================================
// Rendering
// ============================================================================

/// Turns a merged report into a browsable view
pub trait ReportRenderer {
    /// Render from the persisted merged file
    fn render_file(&self, merged_json: &Path, out: &Path) -> E2eResult<()>;

    /// Render from the in-memory merged document
    fn render_report(&self, report: &Report, out: &Path) -> E2eResult<()>;
}

/// Self-contained HTML page with inline styles
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    pub title: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            title: "Conduit E2E Report".to_string(),
        }
    }
}

impl ReportRenderer for HtmlRenderer {
    fn render_file(&self, merged_json: &Path, out: &Path) -> E2eResult<()> {
        let report = Report::load(merged_json)?;
        self.render_report(&report, out)
    }

    fn render_report(&self, report: &Report, out: &Path) -> E2eResult<()> {
        std::fs::write(out, self.to_html(report))?;
        Ok(())
    }
}

impl HtmlRenderer {
    pub fn to_html(&self, report: &Report) -> String {
        let stats = &report.stats;
        let mut body = String::new();
        for root in &report.results {
            render_suite(&mut body, root, 0);
        }

        format!(
            r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{title}</title>
    <style>
      body {{ font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial; padding: 18px; max-width: 1100px; margin: 0 auto; color: #111827; }}
      .stats {{ display: flex; gap: 12px; flex-wrap: wrap; }}
      .stat {{ border: 1px solid #e5e7eb; border-radius: 10px; padding: 10px 14px; min-width: 90px; }}
      .stat b {{ display: block; font-size: 22px; }}
      .suite {{ border: 1px solid #e5e7eb; border-radius: 10px; padding: 12px 16px; margin: 12px 0; }}
      .file {{ color: #6b7280; font-size: 12px; }}
      .test {{ padding: 6px 0; border-top: 1px solid #f3f4f6; }}
      .passed {{ color: #047857; }}
      .failed {{ color: #b91c1c; }}
      .pending {{ color: #6b7280; }}
      pre {{ background: #0b1020; color: #e5e7eb; padding: 12px; border-radius: 10px; overflow: auto; white-space: pre-wrap; }}
    </style>
  </head>
  <body>
    <h1>{title}</h1>
    <div class="stats">
      <div class="stat">Suites<b>{suites}</b></div>
      <div class="stat">Tests<b>{registered}</b></div>
      <div class="stat passed">Passed<b>{passes}</b></div>
      <div class="stat failed">Failed<b>{failures}</b></div>
      <div class="stat pending">Pending<b>{pending}</b></div>
      <div class="stat">Pass %<b>{pass_percent:.1}</b></div>
      <div class="stat">Duration<b>{duration} ms</b></div>
    </div>
    <p class="file">{start} &rarr; {end}</p>
{body}  </body>
</html>
"#,
            title = escape_html(&self.title),
            suites = stats.suites,
            registered = stats.tests_registered,
            passes = stats.passes,
            failures = stats.failures,
            pending = stats.pending,
            pass_percent = stats.pass_percent,
            duration = stats.duration,
            start = escape_html(stats.start.as_deref().unwrap_or("-")),
            end = escape_html(stats.end.as_deref().unwrap_or("-")),
            body = body,
        )
    }
}

fn render_suite(out: &mut String, suite: &SuiteResult, depth: usize) {
    let indent = "  ".repeat(depth + 2);
    if !suite.root {
        let _ = writeln!(out, "{}<div class=\"suite\">", indent);
        let _ = writeln!(out, "{}  <h2>{}</h2>", indent, escape_html(&suite.title));
        if !suite.file.is_empty() {
            let _ = writeln!(out, "{}  <div class=\"file\">{}</div>", indent, escape_html(&suite.file));
        }
    }

    for test in &suite.tests {
        let (class, mark) = match test.state {
            Some(TestState::Passed) => ("passed", "&#10003;"),
            Some(TestState::Failed) => ("failed", "&#10007;"),
            _ => ("pending", "&#8226;"),
        };
        let _ = writeln!(
            out,
            "{}  <div class=\"test {}\">{} {} <span class=\"file\">({} ms)</span></div>",
            indent,
            class,
            mark,
            escape_html(&test.title),
            test.duration
        );
        if let Some(message) = test.error_message() {
            let _ = writeln!(out, "{}  <pre>{}</pre>", indent, escape_html(message));
        }
    }

    for child in &suite.suites {
        render_suite(out, child, if suite.root { depth } else { depth + 1 });
    }

    if !suite.root {
        let _ = writeln!(out, "{}</div>", indent);
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// Aggregation
// ============================================================================

/// Which render attempt produced the HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPath {
    File,
    InMemory,
}

/// What an aggregation run did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AggregateOutcome {
    /// Directory missing or without eligible files
    NoInput,
    /// Inputs malformed or without results; nothing written
    Rejected { reason: String },
    /// Merged and rendered; inputs removed
    Rendered {
        merged: PathBuf,
        html: PathBuf,
        removed: Vec<PathBuf>,
        via: RenderPath,
    },
    /// Both render attempts failed; inputs kept
    RenderFailed {
        diagnostic: Option<PathBuf>,
        error: String,
    },
    /// Unexpected error, logged and swallowed
    Errored { error: String },
}

/// Record written when rendering fails for good
#[derive(Debug, Serialize, Deserialize)]
pub struct RenderDiagnostic {
    pub timestamp: String,
    pub report_dir: String,
    pub input_files: Vec<String>,
    pub merged_file: Option<String>,
    pub merged_size_bytes: Option<u64>,
    pub primary_error: String,
    pub last_error: String,
}

/// Whether a file in the report directory is a per-spec input.
///
/// Merged output, the diagnostic record and anything looking like an index
/// are never inputs.
pub fn is_report_input(file_name: &str) -> bool {
    file_name.ends_with(".json")
        && !file_name.contains(MERGED_REPORT_STEM)
        && file_name != DIAGNOSTIC_FILE
        && !file_name.to_lowercase().contains("index")
}

/// Merges per-spec documents of one directory into one rendered report
pub struct ReportAggregator<R = HtmlRenderer> {
    dir: PathBuf,
    renderer: R,
}

impl ReportAggregator<HtmlRenderer> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_renderer(dir, HtmlRenderer::default())
    }
}

impl<R: ReportRenderer> ReportAggregator<R> {
    pub fn with_renderer(dir: impl Into<PathBuf>, renderer: R) -> Self {
        Self {
            dir: dir.into(),
            renderer,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Per-spec inputs currently in the directory, sorted by name
    pub fn input_files(&self) -> E2eResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if is_report_input(&entry.file_name().to_string_lossy()) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Merge, render and clean up. Never fails; the outcome says what happened.
    pub fn aggregate(&self) -> AggregateOutcome {
        match self.try_aggregate() {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Report aggregation failed in {}: {}", self.dir.display(), e);
                AggregateOutcome::Errored { error: e.to_string() }
            }
        }
    }

    fn try_aggregate(&self) -> E2eResult<AggregateOutcome> {
        if !self.dir.is_dir() {
            debug!("Report directory {} does not exist, nothing to merge", self.dir.display());
            return Ok(AggregateOutcome::NoInput);
        }

        let inputs = self.input_files()?;
        if inputs.is_empty() {
            debug!("No per-spec reports in {}", self.dir.display());
            return Ok(AggregateOutcome::NoInput);
        }

        info!("Merging {} report file(s) from {}", inputs.len(), self.dir.display());

        let mut reports = Vec::with_capacity(inputs.len());
        let mut consumed = Vec::with_capacity(inputs.len());
        for path in inputs {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Report>(&content) {
                // A renamed merge output keeps its marker
                Ok(report) if report.extra.contains_key(MERGED_MARKER) => {
                    warn!("Skipping {}: already a merged report", path.display());
                }
                Ok(report) => {
                    reports.push(report);
                    consumed.push(path);
                }
                Err(e) => {
                    let reason = format!("malformed report {}: {}", path.display(), e);
                    warn!("Not writing a merged report: {}", reason);
                    return Ok(AggregateOutcome::Rejected { reason });
                }
            }
        }
        if consumed.is_empty() {
            return Ok(AggregateOutcome::NoInput);
        }
        let inputs = consumed;

        let mut merged = merge_reports(reports);
        if merged.results.is_empty() {
            let reason = "merged report has no results".to_string();
            warn!("Not writing a merged report: {}", reason);
            return Ok(AggregateOutcome::Rejected { reason });
        }

        let sources = inputs
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| Value::String(n.to_string_lossy().to_string()))
            .collect();
        merged.extra.insert(MERGED_MARKER.to_string(), Value::Array(sources));

        let merged_path = self.dir.join(MERGED_REPORT_JSON);
        let html_path = self.dir.join(MERGED_REPORT_HTML);
        merged.save(&merged_path)?;

        let via = match self.renderer.render_file(&merged_path, &html_path) {
            Ok(()) => RenderPath::File,
            Err(primary) => {
                warn!("Rendering from {} failed: {}; retrying from memory", merged_path.display(), primary);
                match self.renderer.render_report(&merged, &html_path) {
                    Ok(()) => RenderPath::InMemory,
                    Err(last) => {
                        let diagnostic = self.write_diagnostic(&inputs, &merged_path, &primary, &last);
                        error!("Report rendering failed, per-spec reports kept: {}", last);
                        return Ok(AggregateOutcome::RenderFailed {
                            diagnostic,
                            error: last.to_string(),
                        });
                    }
                }
            }
        };

        let mut removed = Vec::with_capacity(inputs.len());
        for path in inputs {
            match std::fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }

        let stale = self.dir.join(DIAGNOSTIC_FILE);
        match std::fs::remove_file(&stale) {
            Ok(()) => debug!("Removed diagnostic left by an earlier failed render"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", stale.display(), e),
        }

        info!("Report written to {}", html_path.display());
        Ok(AggregateOutcome::Rendered {
            merged: merged_path,
            html: html_path,
            removed,
            via,
        })
    }

    fn write_diagnostic(
        &self,
        inputs: &[PathBuf],
        merged_path: &Path,
        primary: &E2eError,
        last: &E2eError,
    ) -> Option<PathBuf> {
        let merged_size_bytes = std::fs::metadata(merged_path).ok().map(|m| m.len());
        let diagnostic = RenderDiagnostic {
            timestamp: Utc::now().to_rfc3339(),
            report_dir: self.dir.display().to_string(),
            input_files: inputs.iter().map(|p| p.display().to_string()).collect(),
            merged_file: merged_size_bytes.map(|_| merged_path.display().to_string()),
            merged_size_bytes,
            primary_error: primary.to_string(),
            last_error: last.to_string(),
        };

        let path = self.dir.join(DIAGNOSTIC_FILE);
        let written = serde_json::to_string_pretty(&diagnostic)
            .map_err(E2eError::from)
            .and_then(|json| std::fs::write(&path, json).map_err(E2eError::from));
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                error!("Could not write report diagnostic: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_case::test_case;

    struct FailingFileRenderer;

    impl ReportRenderer for FailingFileRenderer {
        fn render_file(&self, _: &Path, _: &Path) -> E2eResult<()> {
            Err(E2eError::Report("file render unavailable".to_string()))
        }

        fn render_report(&self, report: &Report, out: &Path) -> E2eResult<()> {
            HtmlRenderer::default().render_report(report, out)
        }
    }

    struct BrokenRenderer;

    impl ReportRenderer for BrokenRenderer {
        fn render_file(&self, _: &Path, _: &Path) -> E2eResult<()> {
            Err(E2eError::Report("file render unavailable".to_string()))
        }

        fn render_report(&self, _: &Report, _: &Path) -> E2eResult<()> {
            Err(E2eError::Report("object render unavailable".to_string()))
        }
    }

    fn spec_report(name: &str, states: &[TestState]) -> Report {
        let tests = states
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let error = (*s == TestState::Failed).then_some("expected <h1> to be visible");
                TestCase::new(name, &format!("case {}", i), *s, 100, error)
            })
            .collect();
        let start = Utc::now();
        Report::for_spec(
            SuiteResult::for_spec(Path::new(&format!("specs/{}.spec.yaml", name)), name, tests),
            start,
            start + Duration::milliseconds(250),
        )
    }

    fn write_spec_reports(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("mochawesome_{:03}.json", i));
                spec_report(&format!("spec{}", i), &[TestState::Passed, TestState::Failed])
                    .save(&path)
                    .unwrap();
                path
            })
            .collect()
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test_case("mochawesome.json", true ; "plain per-spec file")]
    #[test_case("mochawesome_002.json", true ; "numbered per-spec file")]
    #[test_case("merged-report.json", false ; "merged output")]
    #[test_case("old-merged-report.json", false ; "merged output substring")]
    #[test_case("report-diagnostic.json", false ; "diagnostic record")]
    #[test_case("Index.json", false ; "index artifact any case")]
    #[test_case("mochawesome.html", false ; "html artifact")]
    fn test_is_report_input(name: &str, expected: bool) {
        assert_eq!(is_report_input(name), expected);
    }

    #[test]
    fn test_missing_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("reports");
        let outcome = ReportAggregator::new(&missing).aggregate();
        assert!(matches!(outcome, AggregateOutcome::NoInput));
        assert!(!missing.exists());
    }

    #[test]
    fn test_empty_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let outcome = ReportAggregator::new(dir.path()).aggregate();
        assert!(matches!(outcome, AggregateOutcome::NoInput));
        assert_eq!(file_names(dir.path()), vec!["notes.txt"]);
    }

    #[test]
    fn test_merges_renders_and_removes_inputs() {
        let dir = tempfile::tempdir().unwrap();
        write_spec_reports(dir.path(), 3);

        match ReportAggregator::new(dir.path()).aggregate() {
            AggregateOutcome::Rendered { removed, via, .. } => {
                assert_eq!(removed.len(), 3);
                assert_eq!(via, RenderPath::File);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(file_names(dir.path()), vec![MERGED_REPORT_HTML, MERGED_REPORT_JSON]);

        let merged = Report::load(&dir.path().join(MERGED_REPORT_JSON)).unwrap();
        assert_eq!(merged.results.len(), 3);
        assert_eq!(merged.stats.suites, 3);
        assert_eq!(merged.stats.tests_registered, 6);
        assert_eq!(merged.stats.passes, 3);
        assert_eq!(merged.stats.failures, 3);
        assert_eq!(merged.stats.pass_percent, 50.0);

        let html = std::fs::read_to_string(dir.path().join(MERGED_REPORT_HTML)).unwrap();
        assert!(html.contains("spec2"));
        assert!(html.contains("expected &lt;h1&gt; to be visible"));
    }

    #[test]
    fn test_empty_results_abort_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let empty = Report::default();
        empty.save(&dir.path().join("mochawesome.json")).unwrap();

        let outcome = ReportAggregator::new(dir.path()).aggregate();
        assert!(matches!(outcome, AggregateOutcome::Rejected { .. }));
        assert_eq!(file_names(dir.path()), vec!["mochawesome.json"]);
    }

    #[test]
    fn test_malformed_input_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        write_spec_reports(dir.path(), 1);
        std::fs::write(dir.path().join("mochawesome_999.json"), "{ not json").unwrap();

        let outcome = ReportAggregator::new(dir.path()).aggregate();
        assert!(matches!(outcome, AggregateOutcome::Rejected { .. }));
        assert_eq!(file_names(dir.path()), vec!["mochawesome_000.json", "mochawesome_999.json"]);
    }

    #[test]
    fn test_fallback_render_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        write_spec_reports(dir.path(), 2);

        let outcome = ReportAggregator::with_renderer(dir.path(), FailingFileRenderer).aggregate();
        match outcome {
            AggregateOutcome::Rendered { via, removed, .. } => {
                assert_eq!(via, RenderPath::InMemory);
                assert_eq!(removed.len(), 2);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!dir.path().join(DIAGNOSTIC_FILE).exists());
        assert_eq!(file_names(dir.path()), vec![MERGED_REPORT_HTML, MERGED_REPORT_JSON]);
    }

    #[test]
    fn test_total_render_failure_keeps_inputs_and_writes_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_spec_reports(dir.path(), 2);

        let outcome = ReportAggregator::with_renderer(dir.path(), BrokenRenderer).aggregate();
        let diagnostic_path = match outcome {
            AggregateOutcome::RenderFailed { diagnostic, error } => {
                assert!(error.contains("object render unavailable"));
                diagnostic.unwrap()
            }
            other => panic!("unexpected outcome {:?}", other),
        };

        for input in &inputs {
            assert!(input.exists());
        }
        let diagnostic: RenderDiagnostic =
            serde_json::from_str(&std::fs::read_to_string(diagnostic_path).unwrap()).unwrap();
        assert!(parse_time(&diagnostic.timestamp).is_some());
        assert_eq!(diagnostic.input_files.len(), 2);
        assert!(diagnostic.merged_size_bytes.unwrap() > 0);
        assert!(diagnostic.primary_error.contains("file render unavailable"));
    }

    #[test]
    fn test_successful_render_clears_earlier_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        write_spec_reports(dir.path(), 2);

        let failed = ReportAggregator::with_renderer(dir.path(), BrokenRenderer).aggregate();
        assert!(matches!(failed, AggregateOutcome::RenderFailed { diagnostic: Some(_), .. }));
        assert!(dir.path().join(DIAGNOSTIC_FILE).exists());

        let outcome = ReportAggregator::new(dir.path()).aggregate();
        assert!(matches!(outcome, AggregateOutcome::Rendered { .. }));
        assert_eq!(file_names(dir.path()), vec![MERGED_REPORT_HTML, MERGED_REPORT_JSON]);
    }

    #[test]
    fn test_rerun_does_not_merge_own_output() {
        let dir = tempfile::tempdir().unwrap();
        write_spec_reports(dir.path(), 2);
        let aggregator = ReportAggregator::new(dir.path());
        assert!(matches!(aggregator.aggregate(), AggregateOutcome::Rendered { .. }));

        assert!(matches!(aggregator.aggregate(), AggregateOutcome::NoInput));
        let merged = Report::load(&dir.path().join(MERGED_REPORT_JSON)).unwrap();
        assert_eq!(merged.results.len(), 2);
    }

    #[test]
    fn test_renamed_merge_output_is_not_remerged() {
        let dir = tempfile::tempdir().unwrap();
        write_spec_reports(dir.path(), 2);
        assert!(matches!(
            ReportAggregator::new(dir.path()).aggregate(),
            AggregateOutcome::Rendered { .. }
        ));

        let merged = Report::load(&dir.path().join(MERGED_REPORT_JSON)).unwrap();
        assert_eq!(
            merged.extra[MERGED_MARKER],
            serde_json::json!(["mochawesome_000.json", "mochawesome_001.json"])
        );

        let renamed = dir.path().join("mochawesome_previous.json");
        std::fs::rename(dir.path().join(MERGED_REPORT_JSON), &renamed).unwrap();
        write_spec_reports(dir.path(), 1);

        assert!(matches!(
            ReportAggregator::new(dir.path()).aggregate(),
            AggregateOutcome::Rendered { .. }
        ));
        assert!(renamed.exists());
        let merged = Report::load(&dir.path().join(MERGED_REPORT_JSON)).unwrap();
        assert_eq!(merged.results.len(), 1);
    }

    #[test]
    fn test_merge_keeps_time_window_and_drops_top_level_extras() {
        let mut first = spec_report("a", &[TestState::Passed]);
        first.extra.insert("copyrightYear".to_string(), Value::from(2024));
        let mut second = spec_report("b", &[TestState::Pending]);
        second.stats.start = Some("2030-01-01T00:00:00+00:00".to_string());
        second.stats.end = Some("2030-01-01T00:00:01+00:00".to_string());

        let first_start = first.stats.start.clone();
        let merged = merge_reports(vec![first, second]);
        assert_eq!(merged.stats.start, first_start.as_deref().and_then(parse_time).map(|t| t.to_rfc3339()));
        assert_eq!(merged.stats.end.as_deref(), Some("2030-01-01T00:00:01+00:00"));
        assert_eq!(merged.stats.pending, 1);
        assert_eq!(merged.stats.pending_percent, 50.0);
        assert_eq!(merged.stats.pass_percent, 100.0);
        assert_eq!(merged.meta["reporter"]["name"], "conduit-e2e");
        assert!(!merged.extra.contains_key("copyrightYear"));
    }
}
