//! Task Commands
//!
//! Invoke a suite task by hand, e.g. to clean up after an aborted run.

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use conduit_e2e::{RunnerConfig, TaskOutcome, TaskRunner};

use crate::output::{print_item, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct TaskArgs {
    /// Task name, e.g. deleteUser
    pub name: String,

    /// Argument as JSON; anything that is not JSON is taken as a string
    pub arg: Option<String>,
}

impl TableDisplay for TaskOutcome {
    fn headers() -> Vec<&'static str> {
        vec!["Success", "Message", "Affected"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.success.to_string(), self.message.clone(), self.affected.to_string()]
    }
}

/// Parse a task argument from the command line
pub fn parse_arg(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
    }
}

pub fn execute(args: TaskArgs, config: &RunnerConfig, format: OutputFormat) -> Result<bool> {
    let mut tasks = TaskRunner::new(config.database.resolve_url(), config.reporter.report_dir.clone());
    let outcome = tasks.run_named(&args.name, parse_arg(args.arg.as_deref()))?;
    print_item(&outcome, format)?;
    Ok(outcome.success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg(None), Value::Null);
        assert_eq!(parse_arg(Some("e2e.bob@example.com")), json!("e2e.bob@example.com"));
        assert_eq!(parse_arg(Some(r#"{"email":"a@b.c"}"#)), json!({ "email": "a@b.c" }));
        assert_eq!(parse_arg(Some(r#""quoted""#)), json!("quoted"));
    }

    #[test]
    fn test_get_unique_value_before_any_set() {
        let config = RunnerConfig::default();
        let args = TaskArgs {
            name: "getMyUniqueValue".to_string(),
            arg: None,
        };
        // Nothing was stored in this process yet
        assert!(execute(args, &config, OutputFormat::Json).unwrap());
    }

    #[test]
    fn test_unknown_task_is_an_error() {
        let args = TaskArgs {
            name: "dropDatabase".to_string(),
            arg: None,
        };
        assert!(execute(args, &RunnerConfig::default(), OutputFormat::Plain).is_err());
    }
}
