//! The shipped specs parse against the shipped fixtures and every browser
//! segment compiles to a script.

use std::path::{Path, PathBuf};

use conduit_e2e::config::Viewport;
use conduit_e2e::pages::expand_steps;
use conduit_e2e::playwright::{build_script, Browser, ScriptContext};
use conduit_e2e::runner::load_fixtures;
use conduit_e2e::{SpecFile, TestStep};

fn crate_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn shipped_specs() -> Vec<SpecFile> {
    let fixtures = load_fixtures(&crate_dir().join("fixtures")).unwrap();
    SpecFile::load_all(&crate_dir().join("specs"), ".spec.yaml", &fixtures).unwrap()
}

fn context(state_file: &Path) -> ScriptContext {
    ScriptContext {
        base_url: "http://localhost:3000".to_string(),
        browser: Browser::Chromium,
        headless: true,
        viewport: Viewport::default(),
        command_timeout_ms: 10_000,
        page_load_timeout_ms: 100_000,
        token: None,
        state_file: state_file.to_path_buf(),
        failure_screenshot: None,
        video_dir: None,
    }
}

/// Split expanded steps the way the runner batches them
fn browser_segments(steps: &[TestStep]) -> Vec<Vec<TestStep>> {
    let mut segments = vec![Vec::new()];
    for step in expand_steps(steps).unwrap() {
        if step.is_host() {
            segments.push(Vec::new());
        } else if let Some(last) = segments.last_mut() {
            last.push(step);
        }
    }
    segments.into_iter().filter(|s| !s.is_empty()).collect()
}

#[test]
fn test_shipped_specs_load() {
    let specs = shipped_specs();
    let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "E2E Articles CRUD Flow",
            "E2E: Profile Editing Flow",
            "E2E Auth Flow",
            "Smoke test",
        ]
    );
    assert!(specs.iter().all(|s| !s.scenarios.is_empty()));
}

#[test]
fn test_fixture_placeholders_are_resolved() {
    for spec in shipped_specs() {
        let yaml = serde_yaml::to_string(&spec).unwrap();
        assert!(!yaml.contains("{{"), "unresolved placeholder in {}", spec.name);
    }
}

#[test]
fn test_every_browser_segment_builds() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir.path().join("state.json"));

    for spec in shipped_specs() {
        let hooks = [&spec.before, &spec.before_each, &spec.after_each, &spec.after];
        let scenario_steps = spec.scenarios.iter().map(|s| &s.steps);

        for steps in hooks.into_iter().chain(scenario_steps) {
            for segment in browser_segments(steps) {
                let script = build_script(&segment, &ctx)
                    .unwrap_or_else(|e| panic!("{}: {}", spec.name, e));
                assert!(script.contains("__E2E_RESULT__"));
            }
        }
    }
}

#[test]
fn test_article_deletion_confirms_prompt() {
    let spec = shipped_specs()
        .into_iter()
        .find(|s| s.name == "E2E Articles CRUD Flow")
        .unwrap();
    let scenario = spec
        .scenarios
        .iter()
        .find(|s| s.name == "Deletes an article with a comment")
        .unwrap();

    let steps = expand_steps(&scenario.steps).unwrap();
    let dialog = steps
        .iter()
        .position(|s| matches!(s, TestStep::AcceptDialog { .. }))
        .unwrap();
    let wait = steps
        .iter()
        .position(|s| matches!(s, TestStep::WaitFor { alias, .. } if alias == "deleteArticle"))
        .unwrap();
    assert!(dialog < wait);
}
