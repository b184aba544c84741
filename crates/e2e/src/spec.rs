//! Declarative YAML spec files
//!
//! A spec file mirrors one `describe` block: hooks plus an ordered list of
//! scenarios. String values may carry `{{fixture.path}}` placeholders which
//! are resolved against the loaded fixtures before the file is parsed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use conduit_common::Fixtures;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

/// One spec file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecFile {
    /// Suite title
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering spec files
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps run once before the first scenario
    #[serde(default)]
    pub before: Vec<TestStep>,

    /// Steps run before every scenario attempt
    #[serde(default)]
    pub before_each: Vec<TestStep>,

    /// Steps run after every scenario attempt
    #[serde(default)]
    pub after_each: Vec<TestStep>,

    /// Steps run once after the last scenario
    #[serde(default)]
    pub after: Vec<TestStep>,

    pub scenarios: Vec<Scenario>,

    /// File the spec was loaded from
    #[serde(skip)]
    pub path: PathBuf,
}

/// One `it` block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    /// Report as pending without running
    #[serde(default)]
    pub skip: bool,

    pub steps: Vec<TestStep>,
}

/// Element a browser step acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    /// A page-object getter, e.g. `{ page: article, get: article_title, args: [..] }`
    Page {
        page: String,
        get: String,
        #[serde(default, deserialize_with = "scalar_args")]
        args: Vec<String>,
    },
    /// A raw CSS selector
    Selector {
        selector: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        nth: Option<usize>,
    },
    /// An already-built locator
    Locator(Locator),
}

impl From<Locator> for Target {
    fn from(locator: Locator) -> Self {
        Target::Locator(locator)
    }
}

/// When a hook step runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunWhen {
    #[default]
    Always,
    /// Only when the last scenario of the file failed
    LastFailed,
}

/// A single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Visit { url: String },

    /// Click an element
    Click { target: Target },

    /// Type text key by key
    Type { target: Target, text: String },

    /// Replace the value of an input
    Fill { target: Target, value: String },

    /// Assert something about an element
    Assert {
        target: Target,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        exists: Option<bool>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        attribute: Option<AttributeAssertion>,
    },

    /// Assert on the current URL
    AssertUrl {
        #[serde(default)]
        includes: Option<String>,
        #[serde(default)]
        equals: Option<String>,
    },

    /// Assert some element on the page contains the text
    AssertContains { text: String },

    /// Start watching responses for requests matching a URL glob
    Intercept {
        #[serde(default = "default_method")]
        method: String,
        url: String,
        alias: String,
    },

    /// Wait for an intercepted response
    WaitFor {
        alias: String,
        #[serde(default)]
        status: Option<u16>,
    },

    /// Accept the next confirm dialog, optionally checking its message
    AcceptDialog {
        #[serde(default)]
        message: Option<String>,
    },

    /// Reload the page
    Reload,

    /// Log a message (for debugging)
    Log { message: String },

    /// Call a page-object action, e.g. `login.submit_login_form`
    Page {
        call: String,
        #[serde(default, deserialize_with = "scalar_args")]
        args: Vec<String>,
    },

    /// Run an out-of-band task
    Task {
        task: String,
        #[serde(default)]
        arg: serde_json::Value,
        #[serde(default)]
        when: RunWhen,
    },

    /// Log in through the API, reusing a cached session
    Login {
        session_id: String,
        email: String,
        password: String,
        #[serde(default = "default_share")]
        share_across_specs: bool,
    },

    /// Register a user through the API
    Register {
        username: String,
        email: String,
        password: String,
    },

    /// Drop every cached session
    ClearSessions,

    /// Drop cookies of the browser state
    ClearCookies,

    /// Drop local storage of the browser state
    ClearLocalStorage,
}

/// Page-object arguments; numbers and booleans are taken as their text
fn scalar_args<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<serde_yaml::Value> = Vec::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|value| match value {
            serde_yaml::Value::String(s) => Ok(s),
            serde_yaml::Value::Number(n) => Ok(n.to_string()),
            serde_yaml::Value::Bool(b) => Ok(b.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "page-object arguments must be scalars, got {:?}",
                other
            ))),
        })
        .collect()
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_share() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeAssertion {
    pub name: String,
    pub value: String,
}

impl TestStep {
    /// Steps executed by the runner itself rather than in the browser
    pub fn is_host(&self) -> bool {
        matches!(
            self,
            TestStep::Task { .. }
                | TestStep::Login { .. }
                | TestStep::Register { .. }
                | TestStep::ClearSessions
                | TestStep::ClearCookies
                | TestStep::ClearLocalStorage
        )
    }

    /// Short label for logs and reports
    pub fn describe(&self) -> String {
        match self {
            TestStep::Visit { url } => format!("visit:{}", url),
            TestStep::Click { target } => format!("click:{}", target.describe()),
            TestStep::Type { target, .. } => format!("type:{}", target.describe()),
            TestStep::Fill { target, .. } => format!("fill:{}", target.describe()),
            TestStep::Assert { target, .. } => format!("assert:{}", target.describe()),
            TestStep::AssertUrl { includes, equals } => format!(
                "assert_url:{}",
                equals.as_deref().or(includes.as_deref()).unwrap_or_default()
            ),
            TestStep::AssertContains { text } => format!("assert_contains:{}", text),
            TestStep::Intercept { method, url, alias } => format!("intercept:{} {} as @{}", method, url, alias),
            TestStep::WaitFor { alias, .. } => format!("wait:@{}", alias),
            TestStep::AcceptDialog { .. } => "accept_dialog".to_string(),
            TestStep::Reload => "reload".to_string(),
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
            TestStep::Page { call, .. } => format!("page:{}", call),
            TestStep::Task { task, .. } => format!("task:{}", task),
            TestStep::Login { session_id, .. } => format!("login:{}", session_id),
            TestStep::Register { email, .. } => format!("register:{}", email),
            TestStep::ClearSessions => "clear_sessions".to_string(),
            TestStep::ClearCookies => "clear_cookies".to_string(),
            TestStep::ClearLocalStorage => "clear_local_storage".to_string(),
        }
    }
}

impl Target {
    pub fn describe(&self) -> String {
        match self {
            Target::Page { page, get, args } if args.is_empty() => format!("{}.{}", page, get),
            Target::Page { page, get, args } => format!("{}.{}({})", page, get, args.join(", ")),
            Target::Selector { selector, .. } => selector.clone(),
            Target::Locator(locator) => locator.to_string(),
        }
    }
}

impl SpecFile {
    /// Parse a spec from YAML, resolving fixture placeholders first
    pub fn from_yaml(yaml: &str, fixtures: &Fixtures) -> E2eResult<Self> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        resolve_placeholders(&mut value, fixtures)?;
        serde_yaml::from_value(value).map_err(E2eError::from)
    }

    /// Parse a spec from a YAML file
    pub fn from_file(path: &Path, fixtures: &Fixtures) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut spec = Self::from_yaml(&content, fixtures)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))?;
        spec.path = path.to_path_buf();
        Ok(spec)
    }

    /// Load every spec file under a directory, ordered by path
    pub fn load_all(dir: &Path, suffix: &str, fixtures: &Fixtures) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().ends_with(suffix))
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p, fixtures)).collect()
    }

    /// File stem without the spec suffix, used to name report files
    pub fn stem(&self, suffix: &str) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.name.clone());
        let stem = file_name.strip_suffix(suffix).unwrap_or(&file_name);
        stem.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

fn resolve_placeholders(value: &mut serde_yaml::Value, fixtures: &Fixtures) -> E2eResult<()> {
    match value {
        serde_yaml::Value::String(text) if text.contains("{{") => {
            let resolved = fixtures.resolve(text)?;
            *value = serde_yaml::to_value(resolved)?;
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                resolve_placeholders(item, fixtures)?;
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                resolve_placeholders(item, fixtures)?;
            }
        }
        serde_yaml::Value::Tagged(tagged) => resolve_placeholders(&mut tagged.value, fixtures)?,
        _ => {}
    }
    Ok(())
}
