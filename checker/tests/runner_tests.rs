//! Full-pipeline runs over on-disk workspaces

use chrono::NaiveDate;
use evo_checker::{RunSummary, Runner};
use evo_core::Status;
use evo_test_utils::{
    add_proposal, entry, reflected_entry, remove_proposal, state, synthesis, TestWorkspace,
};
use pretty_assertions::assert_eq;

const DAY: &str = "2025-01-01";

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

async fn run(ws: &TestWorkspace) -> RunSummary {
    Runner::new(ws.root()).with_today(day()).run().await
}

fn status(summary: &RunSummary, step: &str) -> Status {
    summary.step(step).unwrap_or_else(|| panic!("no step {step}")).status
}

#[tokio::test]
async fn healthy_workspace_passes() {
    let ws = TestWorkspace::new();
    ws.write_experiences(
        DAY,
        &[
            entry("EXP-20250101-0001", "routine"),
            reflected_entry("EXP-20250101-0002", "notable"),
        ],
    );
    ws.write_significant(&[reflected_entry("EXP-20250101-0002", "notable")]);
    ws.write_synthesis(&synthesis(
        "REF-20250101-001",
        &["EXP-20250101-0001", "EXP-20250101-0002"],
        &["PROP-20250101-001"],
    ));
    ws.write_pending(&[add_proposal(
        "PROP-20250101-001",
        "- Uses gentle humor when it fits [MUTABLE]",
    )]);
    ws.write_state(&state(1, 2, 1));

    let summary = run(&ws).await;
    assert_eq!(summary.overall, Status::Pass, "{}", summary.generate_text());
    assert!(!summary.halted);
    let names: Vec<&str> = summary.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["workspace", "journal", "synthesis", "proposals", "soul", "state", "significance"]
    );
    assert!(summary.steps.iter().all(|s| s.status == Status::Pass));
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn missing_installation_marker_halts() {
    let ws = TestWorkspace::new();
    std::fs::remove_file(ws.root().join("evoclaw/SKILL.md")).unwrap();

    let summary = run(&ws).await;
    assert!(summary.halted);
    assert_eq!(summary.steps.len(), 1);
    assert_eq!(summary.overall, Status::Fail);
    assert_eq!(summary.exit_code(), 1);
    assert!(summary.generate_text().contains("WORKSPACE BOUNDARY VIOLATION"));
}

#[tokio::test]
async fn absent_optional_inputs_are_skipped() {
    let ws = TestWorkspace::new();
    ws.write_state(&state(0, 0, 0));

    let summary = run(&ws).await;
    assert_eq!(status(&summary, "journal"), Status::Skip);
    assert_eq!(status(&summary, "synthesis"), Status::Skip);
    assert_eq!(status(&summary, "proposals"), Status::Skip);
    assert_eq!(status(&summary, "significance"), Status::Skip);
    assert_eq!(status(&summary, "soul"), Status::Pass);
    assert_eq!(status(&summary, "state"), Status::Pass);
    assert_eq!(summary.overall, Status::Pass);
}

#[tokio::test]
async fn missing_state_fails_the_run() {
    let ws = TestWorkspace::new();
    let summary = run(&ws).await;
    assert_eq!(status(&summary, "state"), Status::Fail);
    assert_eq!(summary.overall, Status::Fail);
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test]
async fn core_removal_and_cross_file_duplicate_fail() {
    let ws = TestWorkspace::new();
    ws.write_experiences("2024-12-31", &[entry("EXP-20241231-0001", "routine")]);
    ws.write_experiences(DAY, &[entry("EXP-20241231-0001", "routine")]);
    ws.write_pending(&[remove_proposal(
        "PROP-20250101-001",
        "- Always act with integrity [CORE]",
    )]);
    ws.write_state(&state(1, 1, 0));

    let summary = run(&ws).await;
    let journal = &summary.step("journal").unwrap().reports[0];
    assert!(journal.has_error_containing("Duplicate ID: EXP-20241231-0001"));
    let proposals = &summary.step("proposals").unwrap().reports[0];
    assert!(proposals.critical_count() >= 1);
    assert_eq!(summary.overall, Status::Fail);

    let text = summary.generate_text();
    assert!(text.contains("ERROR DETAILS:"));
    assert!(text.contains("[proposals]"));
}

#[tokio::test]
async fn summary_serializes_uppercase_statuses() {
    let ws = TestWorkspace::new();
    ws.write_state(&state(0, 0, 0));

    let summary = run(&ws).await;
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["overall"], "PASS");
    assert_eq!(json["date"], DAY);
    assert_eq!(json["steps"][1]["name"], "journal");
    assert_eq!(json["steps"][1]["status"], "SKIP");
}
