//! Counter reconciliation against the stores
//!
//! The cached counters may lag behind the stores between scheduled runs, so
//! a mismatch is only ever a warning.

use crate::record::CachedState;
use chrono::NaiveDate;
use evo_core::jsonl::count_records;
use evo_core::{Finding, ValidationReport, ValidatorConfig};
use evo_journal::synthesis_files;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Where the ground-truth stores live
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreLayout {
    /// Directory holding `experiences/` and `reflections/`
    pub memory_dir: Option<PathBuf>,
    /// Directory holding `pending.jsonl`
    pub proposals_dir: Option<PathBuf>,
}

impl StoreLayout {
    /// Standard layout under a memory directory
    #[must_use]
    pub fn from_memory_dir(memory_dir: impl Into<PathBuf>) -> Self {
        let memory_dir = memory_dir.into();
        Self {
            proposals_dir: Some(memory_dir.join("proposals")),
            memory_dir: Some(memory_dir),
        }
    }

    /// Journal file for a day
    #[must_use]
    pub fn journal_file(&self, day: NaiveDate) -> Option<PathBuf> {
        self.memory_dir
            .as_ref()
            .map(|dir| dir.join("experiences").join(format!("{}.jsonl", day.format("%Y-%m-%d"))))
    }
}

/// Freshly computed counts; `None` where a store was not available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroundTruth {
    /// Non-blank lines in today's journal file
    pub experiences_today: Option<usize>,
    /// `REF-*.json` files
    pub reflections: Option<usize>,
    /// Non-blank lines in `pending.jsonl`
    pub pending_proposals: Option<usize>,
}

impl GroundTruth {
    /// Count the stores described by `layout` for `today`
    #[must_use]
    pub fn compute(layout: &StoreLayout, today: NaiveDate) -> Self {
        let mut truth = Self::default();
        if let Some(memory_dir) = layout.memory_dir.as_deref().filter(|d| d.is_dir()) {
            truth.experiences_today = layout.journal_file(today).map(|f| count_records(&f));
            let reflections = memory_dir.join("reflections");
            if reflections.is_dir() {
                truth.reflections = match synthesis_files(&reflections) {
                    Ok(files) => Some(files.len()),
                    Err(e) => {
                        tracing::warn!("could not count synthesis records: {}", e);
                        None
                    }
                };
            }
        }
        if let Some(proposals_dir) = &layout.proposals_dir {
            truth.pending_proposals = Some(count_records(&proposals_dir.join("pending.jsonl")));
        }
        truth
    }
}

/// Compare cached counters with ground truth
#[must_use]
pub fn reconcile(state: &CachedState, truth: &GroundTruth, today: NaiveDate) -> Vec<Finding> {
    let mut findings = Vec::new();
    let day = today.format("%Y-%m-%d");

    if let (Some(claimed), Some(actual)) = (state.total_experiences_today, truth.experiences_today) {
        if claimed != actual as u64 {
            findings.push(
                Finding::warning(format!(
                    "total_experiences_today ({claimed}) != actual lines in {day}.jsonl ({actual})"
                ))
                .field("total_experiences_today"),
            );
        }
    }
    if let (Some(claimed), Some(actual)) = (state.total_reflections, truth.reflections) {
        if claimed != actual as u64 {
            findings.push(
                Finding::warning(format!(
                    "total_reflections ({claimed}) != actual reflection files ({actual})"
                ))
                .field("total_reflections"),
            );
        }
    }
    if let (Some(claimed), Some(actual)) = (state.pending_proposals_count, truth.pending_proposals) {
        if claimed != actual as u64 {
            findings.push(
                Finding::warning(format!(
                    "pending_proposals_count ({claimed}) != actual lines in pending.jsonl ({actual})"
                ))
                .field("pending_proposals_count"),
            );
        }
    }
    findings
}

/// Validate the state file and reconcile it with the stores in `layout`
///
/// `today` selects the journal file counted for `total_experiences_today`.
#[must_use]
pub fn validate_state(
    path: &Path,
    layout: &StoreLayout,
    today: NaiveDate,
    config: &ValidatorConfig,
) -> ValidationReport {
    let file = path.display().to_string();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ValidationReport::unreadable(file.clone(), format!("State file not found: {file}"))
        }
        Err(e) => return ValidationReport::unreadable(file, format!("Could not read state file: {e}")),
    };
    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => return ValidationReport::unreadable(file, format!("Invalid JSON: {e}")),
    };

    let mut report = ValidationReport::new(file);
    let (state, findings) = crate::record::CachedState::read(&value, config);
    report.extend(findings);

    let truth = GroundTruth::compute(layout, today);
    report.extend(reconcile(&state, &truth, today));
    if let Some(actual) = truth.experiences_today {
        report.set_stat("actual_experiences_today", actual);
    }
    if let Some(actual) = truth.reflections {
        report.set_stat("actual_reflections", actual);
    }
    if let Some(actual) = truth.pending_proposals {
        report.set_stat("actual_pending_proposals", actual);
    }
    tracing::info!(
        "state {}: {} ({} errors, {} warnings)",
        report.file,
        report.status,
        report.errors.len(),
        report.warnings.len()
    );
    report
}
