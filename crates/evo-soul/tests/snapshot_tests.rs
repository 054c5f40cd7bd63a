use evo_core::{Severity, Status, ValidatorConfig};
use evo_soul::{validate_soul, ImmutableSnapshot, SnapshotMode, SoulDocument, ViolationKind};
use evo_test_utils::{write_file, TestWorkspace, SAMPLE_SOUL};
use pretty_assertions::assert_eq;

#[test]
fn save_then_check_unchanged_document_has_no_violations() {
    let ws = TestWorkspace::new();
    let snapshot = ws.root().join("soul_snapshot.json");
    let config = ValidatorConfig::default();

    let saved = validate_soul(&ws.soul_path(), SnapshotMode::Save(&snapshot), &config);
    assert_eq!(saved.status, Status::Pass);
    assert_eq!(saved.stats["action"], "snapshot_saved");
    assert_eq!(saved.stats["core_count"], 2);

    let checked = validate_soul(&ws.soul_path(), SnapshotMode::Check(&snapshot), &config);
    assert_eq!(checked.status, Status::Pass, "{:?}", checked.errors);
    assert!(checked.warnings.is_empty());
}

#[test]
fn removing_one_core_bullet_is_exactly_one_critical() {
    let ws = TestWorkspace::new();
    let snapshot = ws.root().join("soul_snapshot.json");
    let config = ValidatorConfig::default();
    let _ = validate_soul(&ws.soul_path(), SnapshotMode::Save(&snapshot), &config);

    let edited = SAMPLE_SOUL.replace("- Always act with integrity [CORE]\n", "");
    write_file(&ws.soul_path(), &edited);

    let report = validate_soul(&ws.soul_path(), SnapshotMode::Check(&snapshot), &config);
    assert_eq!(report.status, Status::Fail);
    assert_eq!(report.critical_count(), 1);
    assert!(report.has_error_containing("[CORE] bullet REMOVED"));
}

#[test]
fn rewording_a_core_bullet_reports_the_modification() {
    let saved = ImmutableSnapshot::capture(&SoulDocument::parse(SAMPLE_SOUL));
    let edited = SAMPLE_SOUL.replace(
        "- Never share private data without consent [CORE]",
        "- Never share private data without asking first [CORE]",
    );
    let current = ImmutableSnapshot::capture(&SoulDocument::parse(&edited));

    let violations = saved.compare(&current, 30);
    let kinds: Vec<ViolationKind> = violations.iter().map(|v| v.kind).collect();
    assert_eq!(
        kinds,
        vec![ViolationKind::Removed, ViolationKind::Added, ViolationKind::Modified]
    );
    let modified = &violations[2];
    assert_eq!(modified.severity(), Severity::Critical);
    assert!(modified.message().contains("Before:"));
}

#[test]
fn new_core_bullet_only_warns() {
    let saved = ImmutableSnapshot::capture(&SoulDocument::parse(SAMPLE_SOUL));
    let edited = format!("{SAMPLE_SOUL}- Protects the user's time [CORE]\n");
    let current = ImmutableSnapshot::capture(&SoulDocument::parse(&edited));

    let violations = saved.compare(&current, 30);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::Added);
    assert_eq!(violations[0].severity(), Severity::Warning);
}

#[test]
fn check_without_snapshot_fails() {
    let ws = TestWorkspace::new();
    let missing = ws.root().join("nowhere.json");
    let report = validate_soul(
        &ws.soul_path(),
        SnapshotMode::Check(&missing),
        &ValidatorConfig::default(),
    );
    assert_eq!(report.status, Status::Fail);
    assert!(report.has_error_containing("Snapshot file not found"));
}

#[test]
fn hand_edited_snapshot_is_rejected() {
    let ws = TestWorkspace::new();
    let snapshot = ws.root().join("soul_snapshot.json");
    ImmutableSnapshot::capture(&SoulDocument::parse(SAMPLE_SOUL))
        .save(&snapshot)
        .unwrap();

    let text = std::fs::read_to_string(&snapshot).unwrap();
    write_file(&snapshot, &text.replace("integrity", "honesty"));

    assert!(ImmutableSnapshot::load(&snapshot).is_err());
    let report = validate_soul(
        &ws.soul_path(),
        SnapshotMode::Check(&snapshot),
        &ValidatorConfig::default(),
    );
    assert!(report.has_error_containing("Unusable snapshot"));
}

#[test]
fn missing_document_fails() {
    let ws = TestWorkspace::new();
    let report = validate_soul(
        &ws.root().join("ABSENT.md"),
        SnapshotMode::Off,
        &ValidatorConfig::default(),
    );
    assert_eq!(report.status, Status::Fail);
    assert!(report.has_error_containing("File not found"));
}
