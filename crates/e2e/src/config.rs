//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::E2eResult;
use crate::playwright::Browser;

/// Runner configuration, loadable from `conduit-e2e.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Base URL of the application under test
    pub base_url: String,

    /// Directory searched recursively for spec files
    pub specs_dir: PathBuf,

    /// File name suffix identifying spec files
    pub spec_suffix: String,

    /// Directory holding JSON fixtures
    pub fixtures_dir: PathBuf,

    /// Directory for screenshots, videos and browser state
    pub output_dir: PathBuf,

    pub timeouts: Timeouts,
    pub viewport: Viewport,
    pub retries: RetryPolicy,
    pub browser: BrowserConfig,
    pub reporter: ReporterConfig,
    pub database: DatabaseConfig,
    pub app: AppConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            specs_dir: PathBuf::from("specs"),
            spec_suffix: ".spec.yaml".to_string(),
            fixtures_dir: PathBuf::from("fixtures"),
            output_dir: PathBuf::from("test-results"),
            timeouts: Timeouts::default(),
            viewport: Viewport::default(),
            retries: RetryPolicy::default(),
            browser: BrowserConfig::default(),
            reporter: ReporterConfig::default(),
            database: DatabaseConfig::default(),
            app: AppConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::E2eError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Rebase every relative directory onto `root`
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        rebase(&mut self.specs_dir);
        rebase(&mut self.fixtures_dir);
        rebase(&mut self.output_dir);
        rebase(&mut self.reporter.report_dir);
        self
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.output_dir.join("videos")
    }

    /// Where browser storage state is carried between scripts
    pub fn state_dir(&self) -> PathBuf {
        self.output_dir.join("state")
    }

    /// Number of retries for a failed scenario in the current mode
    pub fn retries(&self) -> u32 {
        if self.browser.headless {
            self.retries.run_mode
        } else {
            self.retries.open_mode
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Default timeout for element queries and actions
    pub default_command_ms: u64,
    /// Timeout for page navigations
    pub page_load_ms: u64,
    /// Timeout for one generated script to finish
    pub script_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_command_ms: 10_000,
            page_load_ms: 100_000,
            script_ms: 300_000,
        }
    }
}

impl Timeouts {
    pub fn script(&self) -> Duration {
        Duration::from_millis(self.script_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Retries per failed scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Headless runs
    pub run_mode: u32,
    /// Headed, interactive runs
    pub open_mode: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            run_mode: 1,
            open_mode: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: Browser,
    pub headless: bool,
    pub video: bool,
    pub screenshot_on_failure: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: Browser::Chromium,
            headless: true,
            video: true,
            screenshot_on_failure: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Directory receiving per-spec JSON and the merged report
    pub report_dir: PathBuf,
    /// Merge and render once all specs have run
    pub merge_after_run: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("reports/mochawesome"),
            merge_after_run: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Environment variable holding the connection string
    pub url_env: String,
    /// Explicit connection string, wins over the environment
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: conduit_common::DATABASE_URL_ENV.to_string(),
            url: None,
        }
    }
}

impl DatabaseConfig {
    pub fn resolve_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| conduit_common::db::database_url_from_env(&self.url_env))
    }
}

/// How to reach the application under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Command that starts the app; empty means it is already running
    pub command: Vec<String>,
    /// Path polled until the app answers
    pub ready_path: String,
    pub ready_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            ready_path: "/".to_string(),
            ready_timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_suite_settings() {
        let config = RunnerConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeouts.default_command_ms, 10_000);
        assert_eq!(config.timeouts.page_load_ms, 100_000);
        assert_eq!(config.viewport, Viewport { width: 1920, height: 1080 });
        assert_eq!(config.retries(), 1);
        assert!(config.browser.video);
        assert!(config.browser.screenshot_on_failure);
        assert_eq!(config.reporter.report_dir, PathBuf::from("reports/mochawesome"));
    }

    #[test]
    fn test_open_mode_uses_open_retries() {
        let mut config = RunnerConfig::default();
        config.browser.headless = false;
        assert_eq!(config.retries(), 0);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conduit-e2e.toml");
        std::fs::write(
            &path,
            r#"
base_url = "http://127.0.0.1:4000"

[viewport]
width = 1280

[database]
url = "file:./test.db"
"#,
        )
        .unwrap();

        let config = RunnerConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:4000");
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 1080);
        assert_eq!(config.database.resolve_url(), "file:./test.db");
        assert_eq!(config.retries.run_mode, 1);
    }

    #[test]
    fn test_missing_file_is_default_and_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/conduit-e2e.toml");
        let config = RunnerConfig::load(&path).unwrap();
        config.save(&path).unwrap();

        let reloaded = RunnerConfig::load(&path).unwrap();
        assert_eq!(reloaded.spec_suffix, ".spec.yaml");
    }

    #[test]
    fn test_rooted_at_rebases_relative_dirs() {
        let config = RunnerConfig::default().rooted_at(Path::new("/suite"));
        assert_eq!(config.specs_dir, PathBuf::from("/suite/specs"));
        assert_eq!(config.reporter.report_dir, PathBuf::from("/suite/reports/mochawesome"));
    }
}
