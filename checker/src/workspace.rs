//! Workspace layout and boundary guard
//!
//! Several agents may share a machine, each with its own workspace. Before
//! anything reads the stores, the guard confirms this workspace actually
//! runs the evolution pipeline, so that a misrouted scheduler never
//! validates (or later edits) another agent's document.

use chrono::NaiveDate;
use evo_core::{Finding, ValidationReport};
use evo_soul::{CORE_TAG, MUTABLE_TAG};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Standard file locations under a workspace root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    root: PathBuf,
}

impl WorkspacePaths {
    /// Layout rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspace root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `SOUL.md`
    #[must_use]
    pub fn soul(&self) -> PathBuf {
        self.root.join("SOUL.md")
    }

    /// `evoclaw/config.json`
    #[must_use]
    pub fn config(&self) -> PathBuf {
        self.root.join("evoclaw").join("config.json")
    }

    /// `evoclaw/SKILL.md`, the installation marker
    #[must_use]
    pub fn skill(&self) -> PathBuf {
        self.root.join("evoclaw").join("SKILL.md")
    }

    /// `evoclaw/validators/`
    #[must_use]
    pub fn validators(&self) -> PathBuf {
        self.root.join("evoclaw").join("validators")
    }

    /// `memory/`
    #[must_use]
    pub fn memory(&self) -> PathBuf {
        self.root.join("memory")
    }

    /// `memory/experiences/`
    #[must_use]
    pub fn experiences(&self) -> PathBuf {
        self.memory().join("experiences")
    }

    /// `memory/experiences/YYYY-MM-DD.jsonl`
    #[must_use]
    pub fn journal_for(&self, day: NaiveDate) -> PathBuf {
        self.experiences()
            .join(format!("{}.jsonl", day.format("%Y-%m-%d")))
    }

    /// `memory/significant/significant.jsonl`
    #[must_use]
    pub fn significant(&self) -> PathBuf {
        self.memory().join("significant").join("significant.jsonl")
    }

    /// `memory/reflections/`
    #[must_use]
    pub fn reflections(&self) -> PathBuf {
        self.memory().join("reflections")
    }

    /// `memory/proposals/`
    #[must_use]
    pub fn proposals(&self) -> PathBuf {
        self.memory().join("proposals")
    }

    /// `memory/proposals/pending.jsonl`
    #[must_use]
    pub fn pending(&self) -> PathBuf {
        self.proposals().join("pending.jsonl")
    }

    /// `memory/proposals/history.jsonl`
    #[must_use]
    pub fn history(&self) -> PathBuf {
        self.proposals().join("history.jsonl")
    }

    /// `memory/evoclaw-state.json`
    #[must_use]
    pub fn state(&self) -> PathBuf {
        self.memory().join("evoclaw-state.json")
    }

    fn name(&self) -> String {
        self.root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone())
            .file_name()
            .map_or_else(|| self.root.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// Check that the workspace is set up for the evolution pipeline
///
/// A missing installation marker stops immediately; every other problem is
/// collected.
#[must_use]
pub fn check_workspace(paths: &WorkspacePaths) -> ValidationReport {
    let name = paths.name();
    let mut report = ValidationReport::new(paths.root().display().to_string())
        .with_stat("workspace_name", name.clone());

    if !paths.skill().is_file() {
        report.push(
            Finding::error(format!(
                "evoclaw/SKILL.md not found in workspace \"{name}\" ({}). EvoClaw is NOT installed here. \
                 STOP: do not run the EvoClaw pipeline in this workspace. You may be running under the wrong agent.",
                paths.root().display()
            ))
            .field("evoclaw_installed"),
        );
        report.set_stat("evoclaw_installed", false);
        return report;
    }
    report.set_stat("evoclaw_installed", true);

    match std::fs::read_to_string(paths.config()) {
        Err(_) => report.push(Finding::error("evoclaw/config.json not found").field("config")),
        Ok(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(_)) => {}
            Ok(_) => report.push(
                Finding::error("evoclaw/config.json is not a valid JSON object").field("config"),
            ),
            Err(e) => report.push(
                Finding::error(format!("evoclaw/config.json is invalid JSON: {e}")).field("config"),
            ),
        },
    }

    match std::fs::read_to_string(paths.soul()) {
        Err(_) => report.push(
            Finding::error(format!(
                "SOUL.md not found in workspace \"{name}\". EvoClaw requires a SOUL.md file."
            ))
            .field("soul_exists"),
        ),
        Ok(soul) => {
            if !soul.contains(CORE_TAG) && !soul.contains(MUTABLE_TAG) {
                report.push(
                    Finding::error(format!(
                        "SOUL.md in \"{name}\" has no [CORE] or [MUTABLE] tags. This SOUL.md has not been set up \
                         for EvoClaw. STOP: you may be looking at the wrong agent's SOUL.md."
                    ))
                    .field("soul_tags"),
                );
            }
            let lower = soul.to_lowercase();
            if !lower.contains("evolution protocol") && !lower.contains("evoclaw") {
                report.push(
                    Finding::warning(
                        "SOUL.md does not mention \"Evolution protocol\" or \"EvoClaw\". This may not be the \
                         right agent. Proceed with caution.",
                    )
                    .field("evolution_protocol"),
                );
            }
        }
    }

    if !paths.memory().is_dir() {
        report.push(
            Finding::warning("memory/ directory not found (may need to be created on first run)")
                .field("memory_dir"),
        );
    }
    if !paths.validators().is_dir() {
        report.push(Finding::warning("evoclaw/validators/ directory not found").field("validators"));
    }

    tracing::info!("workspace {}: {}", paths.root().display(), report.status);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_core::Status;
    use evo_test_utils::{write_file, TestWorkspace};
    use pretty_assertions::assert_eq;

    #[test]
    fn installed_workspace_passes() {
        let ws = TestWorkspace::new();
        let report = check_workspace(&WorkspacePaths::new(ws.root()));
        assert_eq!(report.status, Status::Pass, "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert_eq!(report.stats["evoclaw_installed"], true);
    }

    #[test]
    fn missing_marker_stops_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let report = check_workspace(&WorkspacePaths::new(dir.path()));
        assert_eq!(report.status, Status::Fail);
        assert_eq!(report.errors.len(), 1);
        assert!(report.warnings.is_empty());
        assert!(report.has_error_containing("EvoClaw is NOT installed here"));
    }

    #[test]
    fn untagged_document_and_bad_config_fail() {
        let ws = TestWorkspace::new();
        write_file(&ws.soul_path(), "# Someone else\n- plain bullet\n");
        write_file(&ws.config_path(), "[1, 2]");
        std::fs::remove_dir_all(ws.root().join("evoclaw/validators")).unwrap();

        let report = check_workspace(&WorkspacePaths::new(ws.root()));
        assert!(report.has_error_containing("has no [CORE] or [MUTABLE] tags"));
        assert!(report.has_error_containing("not a valid JSON object"));
        assert!(report.has_warning_containing("does not mention"));
        assert!(report.has_warning_containing("evoclaw/validators/ directory not found"));
    }

    #[test]
    fn paths_follow_layout() {
        let paths = WorkspacePaths::new("/ws");
        let day = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(paths.journal_for(day), PathBuf::from("/ws/memory/experiences/2025-03-09.jsonl"));
        assert_eq!(paths.state(), PathBuf::from("/ws/memory/evoclaw-state.json"));
        assert_eq!(paths.history(), PathBuf::from("/ws/memory/proposals/history.jsonl"));
    }
}
