//! Out-of-band tasks callable from spec files
//!
//! Tasks run on the host, outside the browser: seeding and cleaning up
//! database rows, keeping one unique value for the run, and merging the
//! report. They answer with a [`TaskOutcome`] envelope and never raise.
//! Failures are logged and come back as `success: false`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use conduit_common::{Database, NewArticle, NewUser};

use crate::error::{E2eError, E2eResult};
use crate::report::ReportAggregator;

/// Envelope returned by every task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub success: bool,
    pub message: String,
    /// Rows created or removed
    pub affected: usize,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl TaskOutcome {
    pub fn ok(message: impl Into<String>, affected: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            affected,
            data: Value::Null,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            affected: 0,
            data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// A user given either by email or as an object with an `email` field
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserKey {
    Email(String),
    Object {
        #[serde(default)]
        email: String,
    },
}

impl UserKey {
    fn email(&self) -> &str {
        match self {
            UserKey::Email(email) | UserKey::Object { email } => email.trim(),
        }
    }
}

/// An article given either by title or as an object with a `title` field
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArticleKey {
    Title(String),
    Object {
        #[serde(default)]
        title: String,
    },
}

impl ArticleKey {
    fn title(&self) -> &str {
        match self {
            ArticleKey::Title(title) | ArticleKey::Object { title } => title,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedUserArgs {
    pub email: String,
    pub username: String,
    pub password: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeedArticleArgs {
    pub author_email: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag: Option<String>,
    pub tags: Vec<String>,
}

/// A parsed task invocation
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "task", content = "arg", rename_all = "camelCase")]
pub enum TaskCall {
    #[serde(alias = "setMyUniqueId")]
    SetMyUniqueValue(Option<String>),
    #[serde(alias = "getMyUniqueId")]
    GetMyUniqueValue,
    SeedUser(Option<SeedUserArgs>),
    DeleteUser(Option<UserKey>),
    SeedArticle(Option<SeedArticleArgs>),
    DeleteArticle(Option<ArticleKey>),
    DeleteArticlesMatching(Option<String>),
    GenerateReport,
}

impl TaskCall {
    /// Parse a task name and its argument as written in a spec file
    pub fn parse(name: &str, arg: Value) -> E2eResult<Self> {
        let call = serde_json::json!({ "task": name, "arg": arg });
        serde_json::from_value(call).map_err(|e| E2eError::StepFailed {
            step: format!("task:{}", name),
            reason: e.to_string(),
        })
    }

    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            TaskCall::SetMyUniqueValue(_) => "setMyUniqueValue",
            TaskCall::GetMyUniqueValue => "getMyUniqueValue",
            TaskCall::SeedUser(_) => "seedUser",
            TaskCall::DeleteUser(_) => "deleteUser",
            TaskCall::SeedArticle(_) => "seedArticle",
            TaskCall::DeleteArticle(_) => "deleteArticle",
            TaskCall::DeleteArticlesMatching(_) => "deleteArticlesMatching",
            TaskCall::GenerateReport => "generateReport",
        }
    }
}

/// Executes tasks for one run
pub struct TaskRunner {
    database_url: String,
    report_dir: PathBuf,
    unique_value: Option<String>,
}

impl TaskRunner {
    pub fn new(database_url: impl Into<String>, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: database_url.into(),
            report_dir: report_dir.into(),
            unique_value: None,
        }
    }

    pub fn unique_value(&self) -> Option<&str> {
        self.unique_value.as_deref()
    }

    pub fn set_unique_value(&mut self, value: impl Into<String>) {
        self.unique_value = Some(value.into());
    }

    /// Parse and run a task by name
    pub fn run_named(&mut self, name: &str, arg: Value) -> E2eResult<TaskOutcome> {
        let call = TaskCall::parse(name, arg)?;
        Ok(self.run(call))
    }

    /// Run a parsed task
    pub fn run(&mut self, call: TaskCall) -> TaskOutcome {
        let name = call.name();
        debug!("Running task {}", name);

        let outcome = match call {
            TaskCall::SetMyUniqueValue(value) => match value {
                Some(value) => {
                    self.unique_value = Some(value.clone());
                    TaskOutcome::ok("unique value stored", 0).with_data(Value::String(value))
                }
                None => TaskOutcome::failure("a value is required"),
            },
            TaskCall::GetMyUniqueValue => {
                let data = self.unique_value.clone().map(Value::String).unwrap_or(Value::Null);
                TaskOutcome::ok("unique value", 0).with_data(data)
            }
            TaskCall::SeedUser(args) => self.seed_user(args.unwrap_or_default()),
            TaskCall::DeleteUser(key) => self.delete_user(key),
            TaskCall::SeedArticle(args) => self.seed_article(args.unwrap_or_default()),
            TaskCall::DeleteArticle(key) => self.delete_article(key),
            TaskCall::DeleteArticlesMatching(pattern) => self.delete_articles_matching(pattern),
            TaskCall::GenerateReport => {
                let outcome = ReportAggregator::new(&self.report_dir).aggregate();
                let data = serde_json::to_value(&outcome).unwrap_or(Value::Null);
                TaskOutcome::ok("report aggregation finished", 0).with_data(data)
            }
        };

        if outcome.success {
            debug!("Task {} succeeded: {}", name, outcome.message);
        } else {
            warn!("Task {} failed: {}", name, outcome.message);
        }
        outcome
    }

    fn seed_user(&self, args: SeedUserArgs) -> TaskOutcome {
        let email = args.email.trim().to_string();
        if email.is_empty() {
            return TaskOutcome::failure("email is required");
        }

        self.with_database("seedUser", |db| {
            if let Some(existing) = db.find_user_by_email(&email)? {
                debug!("User {} already seeded", email);
                return Ok(TaskOutcome::ok(format!("user {} already exists", email), 0)
                    .with_data(serde_json::to_value(existing)?));
            }

            let user = db.create_user(&NewUser {
                email: &email,
                username: &args.username,
                password: &args.password,
                bio: args.bio.as_deref(),
            })?;
            Ok(TaskOutcome::ok(format!("user {} created", email), 1).with_data(serde_json::to_value(user)?))
        })
    }

    fn delete_user(&self, key: Option<UserKey>) -> TaskOutcome {
        let email = key.as_ref().map(UserKey::email).unwrap_or_default().to_string();
        if email.is_empty() {
            return TaskOutcome::failure("email is required");
        }

        self.with_database("deleteUser", |db| {
            let removed = db.delete_user_by_email(&email)?;
            let message = if removed == 0 {
                format!("no user with email {}", email)
            } else {
                format!("user {} deleted", email)
            };
            Ok(TaskOutcome::ok(message, removed))
        })
    }

    fn seed_article(&self, args: SeedArticleArgs) -> TaskOutcome {
        if args.title.trim().is_empty() {
            return TaskOutcome::failure("title is required");
        }
        let author_email = args.author_email.trim().to_string();
        if author_email.is_empty() {
            return TaskOutcome::failure("authorEmail is required");
        }

        let mut tags = args.tags.clone();
        if let Some(tag) = args.tag.as_ref().filter(|t| !t.trim().is_empty()) {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        self.with_database("seedArticle", |db| {
            let Some(author) = db.find_user_by_email(&author_email)? else {
                return Ok(TaskOutcome::failure(format!("no author with email {}", author_email)));
            };
            let article = db.create_article(
                &author.id,
                &NewArticle {
                    title: &args.title,
                    description: &args.description,
                    body: &args.body,
                    tags: &tags,
                },
            )?;
            Ok(TaskOutcome::ok(format!("article '{}' created", args.title), 1)
                .with_data(serde_json::to_value(article)?))
        })
    }

    fn delete_article(&self, key: Option<ArticleKey>) -> TaskOutcome {
        let title = key.as_ref().map(ArticleKey::title).unwrap_or_default().to_string();
        if title.trim().is_empty() {
            return TaskOutcome::failure("title is required");
        }

        self.with_database("deleteArticle", |db| {
            let removed = db.delete_articles_by_title(&title)?;
            Ok(TaskOutcome::ok(format!("{} article(s) titled '{}' deleted", removed, title), removed))
        })
    }

    fn delete_articles_matching(&self, pattern: Option<String>) -> TaskOutcome {
        let pattern = pattern.unwrap_or_default();
        if pattern.trim().is_empty() {
            return TaskOutcome::failure("a title pattern is required");
        }

        self.with_database("deleteArticlesMatching", |db| {
            let removed = db.delete_articles_matching(&pattern)?;
            Ok(TaskOutcome::ok(format!("{} article(s) matching '{}' deleted", removed, pattern), removed))
        })
    }

    /// Open a connection for the duration of one task
    fn with_database<F>(&self, task: &str, f: F) -> TaskOutcome
    where
        F: FnOnce(&Database) -> E2eResult<TaskOutcome>,
    {
        let result = Database::open_url(&self.database_url)
            .map_err(E2eError::from)
            .and_then(|db| f(&db));

        match result {
            Ok(outcome) => {
                if outcome.affected > 0 {
                    info!("Task {}: {}", task, outcome.message);
                }
                outcome
            }
            Err(e) => {
                error!("Task {} failed: {}", task, e);
                TaskOutcome::failure(e.to_string())
            }
        }
    }
}
