//! Report aggregation over mochawesome documents as reporters write them

use std::path::Path;

use serde_json::{json, Value};

use conduit_e2e::report::{Report, MERGED_REPORT_HTML, MERGED_REPORT_JSON};
use conduit_e2e::{AggregateOutcome, ReportAggregator};

/// A document shaped like the output of the mochawesome reporter itself
fn mochawesome_doc(spec: &str, suite: &str, tests: Value, start: &str, end: &str) -> Value {
    let passes = tests.as_array().map_or(0, |t| t.iter().filter(|t| t["pass"] == true).count());
    let failures = tests.as_array().map_or(0, |t| t.iter().filter(|t| t["fail"] == true).count());
    let total = tests.as_array().map_or(0, Vec::len);
    json!({
        "stats": {
            "suites": 1,
            "tests": total,
            "passes": passes,
            "pending": 0,
            "failures": failures,
            "start": start,
            "end": end,
            "duration": 1500,
            "testsRegistered": total,
            "passPercent": 0,
            "pendingPercent": 0,
            "other": 0,
            "hasOther": false,
            "skipped": 0,
            "hasSkipped": false
        },
        "results": [{
            "uuid": format!("root-{}", spec),
            "title": "",
            "fullFile": format!("cypress/e2e/{}.cy.ts", spec),
            "file": format!("cypress/e2e/{}.cy.ts", spec),
            "beforeHooks": [],
            "afterHooks": [],
            "tests": [],
            "suites": [{
                "uuid": format!("suite-{}", spec),
                "title": suite,
                "fullFile": "",
                "file": "",
                "beforeHooks": [],
                "afterHooks": [],
                "tests": tests,
                "suites": [],
                "passes": [],
                "failures": [],
                "pending": [],
                "skipped": [],
                "duration": 1500,
                "root": false,
                "rootEmpty": false,
                "_timeout": 2000
            }],
            "passes": [],
            "failures": [],
            "pending": [],
            "skipped": [],
            "duration": 0,
            "root": true,
            "rootEmpty": true,
            "_timeout": 2000
        }],
        "meta": {
            "mocha": { "version": "7.2.0" },
            "mochawesome": { "options": { "quiet": false, "reportFilename": "mochawesome" }, "version": "7.1.3" },
            "marge": { "options": { "overwrite": false, "html": false, "json": true }, "version": "6.2.0" }
        }
    })
}

fn test_entry(title: &str, passed: bool) -> Value {
    json!({
        "title": title,
        "fullTitle": title,
        "timedOut": null,
        "duration": 750,
        "state": if passed { "passed" } else { "failed" },
        "speed": if passed { json!("fast") } else { Value::Null },
        "pass": passed,
        "fail": !passed,
        "pending": false,
        "context": null,
        "code": "cy.visit('/')",
        "err": if passed { json!({}) } else { json!({ "message": "AssertionError: expected", "estack": "at Context" }) },
        "uuid": format!("test-{}", title.replace(' ', "-")),
        "parentUUID": "suite",
        "isHook": false,
        "skipped": false
    })
}

fn write(dir: &Path, name: &str, doc: &Value) {
    std::fs::write(dir.join(name), serde_json::to_string_pretty(doc).unwrap()).unwrap();
}

#[test]
fn test_reporter_output_is_merged_and_rendered() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mochawesome.json",
        &mochawesome_doc(
            "smoke",
            "Smoke test",
            json!([test_entry("Visits the homepage and checks title", true)]),
            "2026-10-18T10:00:00.000Z",
            "2026-10-18T10:00:02.000Z",
        ),
    );
    write(
        dir.path(),
        "mochawesome_001.json",
        &mochawesome_doc(
            "articles",
            "E2E Articles CRUD Flow",
            json!([
                test_entry("Creates an article and verifies its display", true),
                test_entry("Adds and removes a like", false)
            ]),
            "2026-10-18T10:00:03.000Z",
            "2026-10-18T10:00:09.000Z",
        ),
    );

    let outcome = ReportAggregator::new(dir.path()).aggregate();
    let (merged, html, removed) = match outcome {
        AggregateOutcome::Rendered { merged, html, removed, .. } => (merged, html, removed),
        other => panic!("unexpected outcome {:?}", other),
    };

    assert_eq!(merged, dir.path().join(MERGED_REPORT_JSON));
    assert_eq!(html, dir.path().join(MERGED_REPORT_HTML));
    assert_eq!(removed.len(), 2);
    assert!(!dir.path().join("mochawesome.json").exists());
    assert!(!dir.path().join("mochawesome_001.json").exists());

    let report = Report::load(&merged).unwrap();
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.stats.tests, 3);
    assert_eq!(report.stats.passes, 2);
    assert_eq!(report.stats.failures, 1);
    assert_eq!(report.stats.suites, 2);
    assert_eq!(report.stats.start.as_deref().map(|s| s.starts_with("2026-10-18T10:00:00")), Some(true));
    assert_eq!(report.stats.end.as_deref().map(|s| s.starts_with("2026-10-18T10:00:09")), Some(true));

    // Fields this runner does not model survive the merge
    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&merged).unwrap()).unwrap();
    assert_eq!(raw["results"][0]["_timeout"], 2000);
    assert_eq!(raw["results"][1]["suites"][0]["tests"][0]["speed"], "fast");
    assert_eq!(raw["meta"]["mochawesome"]["version"], "7.1.3");

    let page = std::fs::read_to_string(&html).unwrap();
    assert!(page.contains("E2E Articles CRUD Flow"));
    assert!(page.contains("Adds and removes a like"));
    assert!(page.contains("AssertionError: expected"));
}

#[test]
fn test_second_run_ignores_previous_merge() {
    let dir = tempfile::tempdir().unwrap();
    let doc = mochawesome_doc(
        "smoke",
        "Smoke test",
        json!([test_entry("Visits the homepage and checks title", true)]),
        "2026-10-18T10:00:00.000Z",
        "2026-10-18T10:00:02.000Z",
    );

    write(dir.path(), "mochawesome.json", &doc);
    assert!(matches!(
        ReportAggregator::new(dir.path()).aggregate(),
        AggregateOutcome::Rendered { .. }
    ));

    // Only the merged output is left, which is never an input
    assert!(matches!(ReportAggregator::new(dir.path()).aggregate(), AggregateOutcome::NoInput));

    write(dir.path(), "mochawesome.json", &doc);
    let aggregator = ReportAggregator::new(dir.path());
    assert_eq!(aggregator.input_files().unwrap(), vec![dir.path().join("mochawesome.json")]);
    assert!(matches!(aggregator.aggregate(), AggregateOutcome::Rendered { .. }));

    let report = Report::load(&dir.path().join(MERGED_REPORT_JSON)).unwrap();
    assert_eq!(report.stats.tests, 1);
}

#[test]
fn test_outcome_serializes_with_tag() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = ReportAggregator::new(dir.path().join("missing")).aggregate();
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value, json!({ "outcome": "no_input" }));
}
