//! Playwright browser automation
//!
//! Browser steps are compiled into one Node script per batch and run with
//! `node`. Storage state (cookies, local storage) is written back to a file
//! at the end of every script so the next batch starts where this one left
//! off.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::config::Viewport;
use crate::error::{E2eError, E2eResult};
use crate::locator::js_string;
use crate::pages::resolve_target;
use crate::spec::TestStep;

/// Prefix of the line a script prints with its outcome
const RESULT_MARKER: &str = "__E2E_RESULT__";

/// Prefix of lines produced by `log` steps
const LOG_MARKER: &str = "[TEST] ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Everything a generated script needs besides its steps
#[derive(Debug, Clone)]
pub struct ScriptContext {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,
    pub command_timeout_ms: u64,
    pub page_load_timeout_ms: u64,
    /// Placed in `sessionStorage["token"]` before any page script runs
    pub token: Option<String>,
    /// Storage state read at start and written at the end
    pub state_file: PathBuf,
    /// Full-page screenshot taken when a step fails
    pub failure_screenshot: Option<PathBuf>,
    /// Directory receiving the recorded video
    pub video_dir: Option<PathBuf>,
}

/// What a script reported back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutcome {
    pub success: bool,
    /// One-based index of the failing step in the batch
    #[serde(default)]
    pub failed_step: Option<usize>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(skip)]
    pub logs: Vec<String>,
}

/// Runs generated scripts with node
pub struct PlaywrightHandle {
    /// Directory scripts are written to; node resolves modules from here upward
    work_dir: PathBuf,
    script_timeout: Duration,
}

impl PlaywrightHandle {
    /// Create a handle, verifying Playwright is available
    pub fn new(work_dir: &Path, script_timeout: Duration) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        std::fs::create_dir_all(work_dir)?;
        Ok(Self {
            work_dir: work_dir.to_path_buf(),
            script_timeout,
        })
    }

    /// Check if Playwright is installed
    pub fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Compile and run one batch of browser steps
    pub async fn run_steps(&self, steps: &[TestStep], ctx: &ScriptContext) -> E2eResult<ScriptOutcome> {
        let script = build_script(steps, ctx)?;
        self.run_script(&script).await
    }

    /// Execute a script and read back its outcome
    pub async fn run_script(&self, script: &str) -> E2eResult<ScriptOutcome> {
        let file = tempfile::Builder::new()
            .prefix("e2e-")
            .suffix(".cjs")
            .tempfile_in(&self.work_dir)?;
        std::fs::write(file.path(), script)?;

        debug!("Running Playwright script: {}", file.path().display());

        let child = TokioCommand::new("node")
            .arg(file.path())
            .current_dir(&self.work_dir)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.script_timeout, child)
            .await
            .map_err(|_| E2eError::Timeout(format!("Playwright script after {:?}", self.script_timeout)))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        match parse_output(&stdout)? {
            Some(outcome) => {
                for line in &outcome.logs {
                    info!("[TEST LOG] {}", line);
                }
                Ok(outcome)
            }
            None => {
                warn!("Playwright script exited with {} and no result", output.status);
                Err(E2eError::Playwright(format!(
                    "Script produced no result:\nstdout: {}\nstderr: {}",
                    stdout, stderr
                )))
            }
        }
    }
}

/// Find the result line and the log lines in script output
pub fn parse_output(stdout: &str) -> E2eResult<Option<ScriptOutcome>> {
    let marker = Regex::new(&format!(r"^{}\s+(\{{.*\}})\s*$", RESULT_MARKER))
        .map_err(|e| E2eError::Playwright(e.to_string()))?;

    let mut logs = Vec::new();
    let mut outcome = None;
    for line in stdout.lines() {
        if let Some(message) = line.strip_prefix(LOG_MARKER) {
            logs.push(message.to_string());
        } else if let Some(caps) = marker.captures(line) {
            outcome = Some(serde_json::from_str::<ScriptOutcome>(&caps[1])?);
        }
    }

    Ok(outcome.map(|mut o| {
        o.logs = logs;
        o
    }))
}

/// Build the Node script for a batch of browser steps
pub fn build_script(steps: &[TestStep], ctx: &ScriptContext) -> E2eResult<String> {
    let mut script = String::new();

    let state_file = js_string(&ctx.state_file.to_string_lossy());
    let video = ctx
        .video_dir
        .as_ref()
        .map(|dir| {
            format!(
                "\n    recordVideo: {{ dir: {}, size: {{ width: {}, height: {} }} }},",
                js_string(&dir.to_string_lossy()),
                ctx.viewport.width,
                ctx.viewport.height
            )
        })
        .unwrap_or_default();

    script.push_str(&format!(
        r#"const {{ chromium, firefox, webkit }} = require('playwright');
const {{ expect: baseExpect }} = require('@playwright/test');
const fs = require('fs');

const expect = baseExpect.configure({{ timeout: {command_timeout} }});
const escapeRegExp = (s) => s.replace(/[.*+?^${{}}()|[\]\\]/g, '\\$&');
const globToRegExp = (glob) => new RegExp('^' + glob.split('*').map(escapeRegExp).join('.*') + '$');
const urlMatches = (url, glob) => {{
  const re = globToRegExp(glob);
  const u = new URL(url);
  return re.test(url) || re.test(u.pathname + u.search) || re.test(u.pathname);
}};

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const stateFile = {state_file};
  const context = await browser.newContext({{
    baseURL: {base_url},
    viewport: {{ width: {width}, height: {height} }},
    storageState: fs.existsSync(stateFile) ? stateFile : undefined,{video}
  }});
  context.setDefaultTimeout({command_timeout});
  context.setDefaultNavigationTimeout({page_load_timeout});
"#,
        command_timeout = ctx.command_timeout_ms,
        page_load_timeout = ctx.page_load_timeout_ms,
        browser = ctx.browser.as_str(),
        headless = ctx.headless,
        state_file = state_file,
        base_url = js_string(&ctx.base_url),
        width = ctx.viewport.width,
        height = ctx.viewport.height,
        video = video,
    ));

    if let Some(token) = &ctx.token {
        script.push_str(&format!(
            "  await context.addInitScript((token) => {{ window.sessionStorage.setItem('token', token); }}, {});\n",
            js_string(token)
        ));
    }

    script.push_str(
        r#"  const page = await context.newPage();
  const waiters = {};
  const dialogErrors = [];
  let step = 0;

  try {
"#,
    );

    let mut aliases = HashSet::new();
    for (i, step) in steps.iter().enumerate() {
        script.push_str(&format!("\n    // Step {}: {}\n", i + 1, step.describe()));
        script.push_str(&format!("    step = {};\n", i + 1));
        script.push_str(&step_to_js(step, &mut aliases)?);
        script.push('\n');
    }

    let screenshot = ctx
        .failure_screenshot
        .as_ref()
        .map(|path| {
            format!(
                "    await page.screenshot({{ path: {}, fullPage: true }}).catch(() => {{}});\n",
                js_string(&path.to_string_lossy())
            )
        })
        .unwrap_or_default();

    script.push_str(&format!(
        r#"
    if (dialogErrors.length > 0) {{
      throw new Error(dialogErrors.join('; '));
    }}
    await context.storageState({{ path: stateFile }});
    console.log('{marker} ' + JSON.stringify({{ success: true }}));
  }} catch (error) {{
{screenshot}    await context.storageState({{ path: stateFile }}).catch(() => {{}});
    const message = error && error.message ? error.message : String(error);
    console.log('{marker} ' + JSON.stringify({{ success: false, failedStep: step, error: message }}));
  }} finally {{
    await context.close();
    await browser.close();
  }}
}})();
"#,
        marker = RESULT_MARKER,
        screenshot = screenshot,
    ));

    Ok(script)
}

/// Convert a browser step to JavaScript
fn step_to_js(step: &TestStep, aliases: &mut HashSet<String>) -> E2eResult<String> {
    let js = match step {
        TestStep::Visit { url } => format!("    await page.goto({});", js_string(url)),
        TestStep::Click { target } => {
            format!("    await {}.first().click();", resolve_target(target)?.to_js())
        }
        TestStep::Type { target, text } => {
            let locator = resolve_target(target)?.to_js();
            format!(
                "    await {locator}.first().click();\n    await {locator}.first().pressSequentially({text});",
                locator = locator,
                text = js_string(text)
            )
        }
        TestStep::Fill { target, value } => {
            format!("    await {}.first().fill({});", resolve_target(target)?.to_js(), js_string(value))
        }
        TestStep::Assert {
            target,
            visible,
            exists,
            text_contains,
            value,
            attribute,
        } => {
            let locator = resolve_target(target)?.to_js();
            let mut assertions = Vec::new();

            match visible {
                Some(true) => assertions.push(format!("    await expect({}.first()).toBeVisible();", locator)),
                Some(false) => assertions.push(format!("    await expect({}.first()).toBeHidden();", locator)),
                None => {}
            }
            match exists {
                Some(true) => assertions.push(format!("    await expect({}).not.toHaveCount(0);", locator)),
                Some(false) => assertions.push(format!("    await expect({}).toHaveCount(0);", locator)),
                None => {}
            }
            if let Some(text) = text_contains {
                assertions.push(format!(
                    "    await expect({}.first()).toContainText({});",
                    locator,
                    js_string(text)
                ));
            }
            if let Some(value) = value {
                assertions.push(format!(
                    "    await expect({}.first()).toHaveValue({});",
                    locator,
                    js_string(value)
                ));
            }
            if let Some(attr) = attribute {
                assertions.push(format!(
                    "    await expect({}.first()).toHaveAttribute({}, {});",
                    locator,
                    js_string(&attr.name),
                    js_string(&attr.value)
                ));
            }
            if assertions.is_empty() {
                assertions.push(format!("    await expect({}).not.toHaveCount(0);", locator));
            }
            assertions.join("\n")
        }
        TestStep::AssertUrl { includes, equals } => {
            let mut assertions = Vec::new();
            if let Some(part) = includes {
                assertions.push(format!(
                    "    await expect(page).toHaveURL(new RegExp(escapeRegExp({})));",
                    js_string(part)
                ));
            }
            if let Some(url) = equals {
                assertions.push(format!(
                    "    await expect(page).toHaveURL(new URL({}, page.url()).toString());",
                    js_string(url)
                ));
            }
            assertions.join("\n")
        }
        TestStep::AssertContains { text } => {
            format!("    await expect(page.getByText({}).first()).toBeVisible();", js_string(text))
        }
        TestStep::Intercept { method, url, alias } => {
            aliases.insert(alias.clone());
            format!(
                "    waiters[{alias}] = page.waitForResponse((r) => r.request().method() === {method} && urlMatches(r.url(), {url}));\n    waiters[{alias}].catch(() => {{}});",
                alias = js_string(alias),
                method = js_string(&method.to_uppercase()),
                url = js_string(url)
            )
        }
        TestStep::WaitFor { alias, status } => {
            if !aliases.contains(alias) {
                return Err(E2eError::StepFailed {
                    step: step.describe(),
                    reason: format!("no intercept aliased '{}' earlier in the same browser batch", alias),
                });
            }
            let check = status
                .map(|s| format!("\n      expect(response.status()).toBe({});", s))
                .unwrap_or_default();
            format!(
                "    {{\n      const response = await waiters[{}];{}\n    }}",
                js_string(alias),
                check
            )
        }
        TestStep::AcceptDialog { message } => {
            let check = match message {
                Some(expected) => format!(
                    "\n      if (dialog.message() !== {expected}) {{ dialogErrors.push('unexpected dialog: ' + dialog.message()); }}",
                    expected = js_string(expected)
                ),
                None => String::new(),
            };
            format!(
                "    page.once('dialog', async (dialog) => {{{}\n      await dialog.accept();\n    }});",
                check
            )
        }
        TestStep::Reload => "    await page.reload();".to_string(),
        TestStep::Log { message } => {
            format!("    console.log({});", js_string(&format!("{}{}", LOG_MARKER, message)))
        }
        TestStep::Page { call, .. } => {
            return Err(E2eError::UnknownPageCall(format!("'{}' must be expanded before scripting", call)));
        }
        host => {
            return Err(E2eError::StepFailed {
                step: host.describe(),
                reason: "runs on the host, not in the browser".to_string(),
            });
        }
    };
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    fn ctx() -> ScriptContext {
        ScriptContext {
            base_url: "http://localhost:3000".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            command_timeout_ms: 10_000,
            page_load_timeout_ms: 100_000,
            token: None,
            state_file: PathBuf::from("/tmp/state/articles.json"),
            failure_screenshot: None,
            video_dir: None,
        }
    }

    #[test]
    fn test_script_header_carries_context() {
        let mut context = ctx();
        context.token = Some("tok-'1'".to_string());
        context.video_dir = Some(PathBuf::from("/tmp/videos"));
        context.failure_screenshot = Some(PathBuf::from("/tmp/shots/fail.png"));

        let script = build_script(&[TestStep::Visit { url: "/".to_string() }], &context).unwrap();
        assert!(script.contains("chromium.launch({ headless: true })"));
        assert!(script.contains(r#"baseURL: "http://localhost:3000""#));
        assert!(script.contains("viewport: { width: 1920, height: 1080 }"));
        assert!(script.contains("context.setDefaultNavigationTimeout(100000)"));
        assert!(script.contains(r#"window.sessionStorage.setItem('token', token); }, "tok-'1'")"#));
        assert!(script.contains(r#"recordVideo: { dir: "/tmp/videos""#));
        assert!(script.contains(r#"page.screenshot({ path: "/tmp/shots/fail.png", fullPage: true })"#));
        assert!(script.contains(r#"await page.goto("/");"#));
    }

    #[test]
    fn test_no_token_means_no_init_script() {
        let script = build_script(&[TestStep::Reload], &ctx()).unwrap();
        assert!(!script.contains("addInitScript"));
        assert!(!script.contains("recordVideo"));
    }

    #[test]
    fn test_intercept_then_wait() {
        let steps = vec![
            TestStep::Intercept {
                method: "post".to_string(),
                url: "/api/trpc/articles.create*".to_string(),
                alias: "createArticle".to_string(),
            },
            TestStep::WaitFor {
                alias: "createArticle".to_string(),
                status: Some(200),
            },
        ];
        let script = build_script(&steps, &ctx()).unwrap();
        assert!(script.contains(r#"r.request().method() === "POST""#));
        assert!(script.contains(r#"urlMatches(r.url(), "/api/trpc/articles.create*")"#));
        assert!(script.contains("expect(response.status()).toBe(200);"));
    }

    #[test]
    fn test_wait_without_intercept_is_rejected() {
        let steps = vec![TestStep::WaitFor {
            alias: "missing".to_string(),
            status: None,
        }];
        assert!(matches!(build_script(&steps, &ctx()), Err(E2eError::StepFailed { .. })));
    }

    #[test]
    fn test_host_steps_are_not_scripted() {
        assert!(build_script(&[TestStep::ClearSessions], &ctx()).is_err());
        let call = TestStep::Page {
            call: "login.submit_login_form".to_string(),
            args: vec![],
        };
        assert!(matches!(build_script(&[call], &ctx()), Err(E2eError::UnknownPageCall(_))));
    }

    #[test]
    fn test_assertions_and_dialog() {
        let steps = vec![
            TestStep::AcceptDialog {
                message: Some("Are you sure you want to delete this article?".to_string()),
            },
            TestStep::Assert {
                target: Locator::with_text("h1", "E2E").into(),
                visible: None,
                exists: Some(false),
                text_contains: None,
                value: None,
                attribute: None,
            },
            TestStep::AssertUrl {
                includes: Some("/article/".to_string()),
                equals: None,
            },
        ];
        let script = build_script(&steps, &ctx()).unwrap();
        assert!(script.contains("page.once('dialog'"));
        assert!(script.contains(r#"dialog.message() !== "Are you sure you want to delete this article?""#));
        assert!(script.contains(r#"await expect(page.locator("h1").filter({ hasText: "E2E" })).toHaveCount(0);"#));
        assert!(script.contains(r#"toHaveURL(new RegExp(escapeRegExp("/article/")))"#));
    }

    #[test]
    fn test_log_message_is_escaped() {
        let script = build_script(
            &[TestStep::Log {
                message: "it's \"done\"".to_string(),
            }],
            &ctx(),
        )
        .unwrap();
        assert!(script.contains(r#"console.log("[TEST] it's \"done\"");"#));
    }

    #[test]
    fn test_parse_output_with_logs() {
        let stdout = "[TEST] Navigating to home page...\nnoise\n__E2E_RESULT__ {\"success\":false,\"failedStep\":3,\"error\":\"Timed out\"}\n";
        let outcome = parse_output(stdout).unwrap().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.failed_step, Some(3));
        assert_eq!(outcome.error.as_deref(), Some("Timed out"));
        assert_eq!(outcome.logs, vec!["Navigating to home page...".to_string()]);
    }

    #[test]
    fn test_parse_output_without_result() {
        assert!(parse_output("Error: Cannot find module 'playwright'\n").unwrap().is_none());
    }
}
