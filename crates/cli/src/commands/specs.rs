//! Spec Commands

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use conduit_e2e::runner::load_fixtures;
use conduit_e2e::{RunnerConfig, SpecFile, SpecFilter};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct SpecsArgs {
    /// Only spec files carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Only the spec file with this title or file stem
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Spec file summary for display
#[derive(Serialize)]
pub struct SpecInfo {
    pub file: String,
    pub suite: String,
    pub tags: Vec<String>,
    pub scenarios: usize,
    pub skipped: usize,
    pub hooks: Vec<&'static str>,
}

impl SpecInfo {
    fn from_spec(spec: &SpecFile, suffix: &str) -> Self {
        let hooks = [
            ("before", spec.before.len()),
            ("before_each", spec.before_each.len()),
            ("after_each", spec.after_each.len()),
            ("after", spec.after.len()),
        ]
        .into_iter()
        .filter(|(_, steps)| *steps > 0)
        .map(|(name, _)| name)
        .collect();

        Self {
            file: spec.stem(suffix),
            suite: spec.name.clone(),
            tags: spec.tags.clone(),
            scenarios: spec.scenarios.len(),
            skipped: spec.scenarios.iter().filter(|s| s.skip).count(),
            hooks,
        }
    }
}

impl TableDisplay for SpecInfo {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Suite", "Tags", "Scenarios", "Hooks"]
    }

    fn row(&self) -> Vec<String> {
        let scenarios = if self.skipped > 0 {
            format!("{} ({} skipped)", self.scenarios, self.skipped)
        } else {
            self.scenarios.to_string()
        };
        vec![
            self.file.clone(),
            self.suite.clone(),
            self.tags.join(", "),
            scenarios,
            self.hooks.join(", "),
        ]
    }
}

/// Load and describe the spec files without running them
pub fn collect(args: &SpecsArgs, config: &RunnerConfig) -> Result<Vec<SpecInfo>> {
    let fixtures = load_fixtures(&config.fixtures_dir)?;
    let suffix = &config.spec_suffix;
    let filter = SpecFilter {
        tag: args.tag.clone(),
        name: args.name.clone(),
    };

    Ok(SpecFile::load_all(&config.specs_dir, suffix, &fixtures)?
        .iter()
        .filter(|spec| filter.matches(spec, suffix))
        .map(|spec| SpecInfo::from_spec(spec, suffix))
        .collect())
}

pub fn execute(args: SpecsArgs, config: &RunnerConfig, format: OutputFormat) -> Result<bool> {
    let specs = collect(&args, config)?;
    print_list(&specs, format)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let specs = dir.path().join("specs");
        std::fs::create_dir_all(&specs).unwrap();
        std::fs::write(
            specs.join("smoke.spec.yaml"),
            "name: Smoke test\ntags: [smoke]\nscenarios:\n  - name: home\n    steps:\n      - action: visit\n        url: /\n",
        )
        .unwrap();
        std::fs::write(
            specs.join("auth.spec.yaml"),
            concat!(
                "name: Auth\ntags: [auth]\n",
                "after:\n  - action: clear_cookies\n",
                "scenarios:\n",
                "  - name: a\n    steps: []\n",
                "  - name: b\n    skip: true\n    steps: []\n",
            ),
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_collect_lists_every_spec() {
        let dir = suite_dir();
        let config = RunnerConfig::default().rooted_at(dir.path());
        let args = SpecsArgs { tag: None, name: None };

        let specs = collect(&args, &config).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].file, "auth");
        assert_eq!(specs[0].skipped, 1);
        assert_eq!(specs[0].hooks, vec!["after"]);
        assert_eq!(specs[0].row()[3], "2 (1 skipped)");
    }

    #[test]
    fn test_collect_filters_by_tag() {
        let dir = suite_dir();
        let config = RunnerConfig::default().rooted_at(dir.path());
        let args = SpecsArgs {
            tag: Some("smoke".to_string()),
            name: None,
        };

        let specs = collect(&args, &config).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].suite, "Smoke test");
    }
}
