//! Pipeline orchestrator
//!
//! Runs every validator over a workspace in pipeline order. Validators are
//! synchronous; each one runs on a blocking task under a wall-clock budget
//! so that a hang or panic in one of them surfaces as an `ERROR` step
//! instead of taking the whole run down.

use crate::workspace::{check_workspace, WorkspacePaths};
use chrono::{Local, NaiveDate};
use evo_core::{Status, ValidationReport, ValidatorConfig};
use evo_journal::{check_significance, validate_synthesis_dir, JournalIndex};
use evo_proposal::validate_proposals;
use evo_soul::{validate_soul, SnapshotMode};
use evo_state::{validate_state, StoreLayout};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Synthesis records validated per run; older ones only feed duplicate checks
pub const DEFAULT_SYNTHESIS_WINDOW: usize = 5;

const RULE: &str = "============================================================";

/// Run `check` on a blocking task, bounded by `timeout`
///
/// # Errors
/// Returns an `ERROR` report named after `step` when the budget runs out or
/// the task panics. A timed-out task is detached, not killed.
pub async fn run_guarded<T, F>(step: &str, timeout: Duration, check: F) -> Result<T, ValidationReport>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(check)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join)) if join.is_panic() => {
            tracing::error!("validator {} panicked", step);
            Err(ValidationReport::errored(step, format!("Validator panicked: {step}")))
        }
        Ok(Err(_)) => Err(ValidationReport::errored(step, format!("Validator cancelled: {step}"))),
        Err(_) => {
            tracing::error!("validator {} exceeded {:?}", step, timeout);
            Err(ValidationReport::errored(
                step,
                format!("Validator timed out after {}s: {step}", timeout.as_secs_f32()),
            ))
        }
    }
}

/// Outcome of one pipeline step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Step name (`journal`, `synthesis`, ...)
    pub name: String,
    /// Worst status among the step's reports
    pub status: Status,
    /// One report per validated input
    pub reports: Vec<ValidationReport>,
}

impl StepResult {
    fn new(name: &str, reports: Vec<ValidationReport>) -> Self {
        let status = worst(reports.iter().map(|r| r.status));
        Self {
            name: name.to_string(),
            status,
            reports,
        }
    }

    fn single(name: &str, report: ValidationReport) -> Self {
        Self::new(name, vec![report])
    }

    fn errors(&self) -> usize {
        self.reports.iter().map(|r| r.errors.len()).sum()
    }

    fn warnings(&self) -> usize {
        self.reports.iter().map(|r| r.warnings.len()).sum()
    }
}

// ERROR outranks FAIL outranks PASS outranks SKIP; an empty step is a SKIP.
fn worst(statuses: impl Iterator<Item = Status>) -> Status {
    let rank = |s: Status| match s {
        Status::Skip => 0,
        Status::Pass => 1,
        Status::Fail => 2,
        Status::Error => 3,
    };
    statuses.max_by_key(|s| rank(*s)).unwrap_or(Status::Skip)
}

/// Aggregated result of a full run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Workspace root
    pub workspace: String,
    /// Journal day validated
    pub date: NaiveDate,
    /// `FAIL` if any step failed or errored, otherwise `PASS`
    pub overall: Status,
    /// Whether the workspace guard stopped the run
    pub halted: bool,
    /// Steps in the order they ran
    pub steps: Vec<StepResult>,
}

impl RunSummary {
    fn new(workspace: &Path, date: NaiveDate, steps: Vec<StepResult>, halted: bool) -> Self {
        let overall = if steps.iter().any(|s| s.status.is_failure()) {
            Status::Fail
        } else {
            Status::Pass
        };
        Self {
            workspace: workspace.display().to_string(),
            date,
            overall,
            halted,
            steps,
        }
    }

    /// Step by name
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Total errors across every report
    #[must_use]
    pub fn total_errors(&self) -> usize {
        self.steps.iter().map(StepResult::errors).sum()
    }

    /// Total warnings across every report
    #[must_use]
    pub fn total_warnings(&self) -> usize {
        self.steps.iter().map(StepResult::warnings).sum()
    }

    /// Process exit code: 2 when any validator could not complete
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.steps.iter().any(|s| s.status == Status::Error) {
            Status::Error.exit_code()
        } else {
            self.overall.exit_code()
        }
    }

    /// Human-readable summary
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "EVOCLAW VALIDATION REPORT");
        let _ = writeln!(out, "Workspace: {}", self.workspace);
        let _ = writeln!(out, "Date: {}", self.date);
        let _ = writeln!(out, "{RULE}");

        if self.halted {
            let _ = writeln!(out, "\n🚨 WORKSPACE BOUNDARY VIOLATION");
        }

        for step in &self.steps {
            for report in &step.reports {
                let label = if step.reports.len() > 1 {
                    let name = Path::new(&report.file)
                        .file_name()
                        .map_or_else(|| report.file.clone(), |n| n.to_string_lossy().into_owned());
                    format!("{}/{name}", step.name)
                } else {
                    step.name.clone()
                };
                let _ = write!(out, "  {} {label}: {}", icon(report.status), report.status);
                match (&report.message, report.status) {
                    (Some(message), Status::Skip) => {
                        let _ = writeln!(out, " ({message})");
                    }
                    _ => {
                        let _ = writeln!(
                            out,
                            " ({} errors, {} warnings)",
                            report.errors.len(),
                            report.warnings.len()
                        );
                    }
                }
            }
        }

        let _ = writeln!(out, "\n  Total: {} errors, {} warnings", self.total_errors(), self.total_warnings());
        let _ = writeln!(out, "  {} Overall: {}", icon(self.overall), self.overall);
        let _ = writeln!(out, "{RULE}");

        let failing: Vec<_> = self
            .steps
            .iter()
            .flat_map(|s| s.reports.iter().map(move |r| (s.name.as_str(), r)))
            .filter(|(_, r)| !r.errors.is_empty())
            .collect();
        if !failing.is_empty() {
            let _ = writeln!(out, "\nERROR DETAILS:");
            for (name, report) in failing {
                for finding in &report.errors {
                    let _ = writeln!(out, "  [{name}] {finding}");
                }
            }
        }
        out
    }
}

fn icon(status: Status) -> &'static str {
    match status {
        Status::Pass => "✅",
        Status::Fail => "❌",
        Status::Error => "💥",
        Status::Skip => "⏭️",
    }
}

/// Runs the validators over one workspace
#[derive(Debug, Clone)]
pub struct Runner {
    paths: WorkspacePaths,
    config: Arc<ValidatorConfig>,
    today: NaiveDate,
    synthesis_window: usize,
}

impl Runner {
    /// Runner for the workspace at `root`, configured from its `evoclaw/config.json`
    #[must_use]
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        let paths = WorkspacePaths::new(root);
        let config = ValidatorConfig::load_or_default(Some(&paths.config()));
        Self {
            paths,
            config: Arc::new(config),
            today: Local::now().date_naive(),
            synthesis_window: DEFAULT_SYNTHESIS_WINDOW,
        }
    }

    /// With explicit configuration
    #[must_use]
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// With the journal day to validate
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// With the number of recent synthesis records to validate
    #[must_use]
    pub fn with_synthesis_window(mut self, window: usize) -> Self {
        self.synthesis_window = window;
        self
    }

    /// Workspace layout
    #[must_use]
    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    /// Run the full pipeline
    pub async fn run(&self) -> RunSummary {
        let timeout = self.config.timeout;
        let mut steps = Vec::new();
        tracing::info!("validating workspace {} for {}", self.paths.root().display(), self.today);

        let paths = self.paths.clone();
        let guard = run_guarded("workspace", timeout, move || check_workspace(&paths))
            .await
            .unwrap_or_else(|errored| errored);
        let halted = guard.status == Status::Fail;
        steps.push(StepResult::single("workspace", guard));
        if halted {
            tracing::warn!("workspace guard failed, stopping");
            return RunSummary::new(self.paths.root(), self.today, steps, true);
        }

        // The whole journal is scanned once; later steps share the index.
        let (journal, index) = self.journal_step(timeout).await;
        steps.push(journal);

        steps.push(self.synthesis_step(timeout, index.clone()).await);
        steps.push(self.proposal_step(timeout).await);

        let soul = self.paths.soul();
        let config = Arc::clone(&self.config);
        let report = run_guarded("soul", timeout, move || validate_soul(&soul, SnapshotMode::Off, &config))
            .await
            .unwrap_or_else(|errored| errored);
        steps.push(StepResult::single("soul", report));

        let state = self.paths.state();
        let layout = StoreLayout::from_memory_dir(self.paths.memory());
        let (config, today) = (Arc::clone(&self.config), self.today);
        let report = run_guarded("state", timeout, move || validate_state(&state, &layout, today, &config))
            .await
            .unwrap_or_else(|errored| errored);
        steps.push(StepResult::single("state", report));

        steps.push(self.significance_step(timeout, index).await);

        let summary = RunSummary::new(self.paths.root(), self.today, steps, false);
        tracing::info!(
            "workspace {}: {} ({} errors, {} warnings)",
            summary.workspace,
            summary.overall,
            summary.total_errors(),
            summary.total_warnings()
        );
        summary
    }

    async fn journal_step(&self, timeout: Duration) -> (StepResult, Option<Arc<JournalIndex>>) {
        let dir = self.paths.experiences();
        let today_file = self.paths.journal_for(self.today);
        let config = Arc::clone(&self.config);

        let scanned = run_guarded("journal", timeout, move || JournalIndex::scan_dir(&dir, &config)).await;
        let index = match scanned {
            Ok(Ok(index)) => Arc::new(index),
            Ok(Err(e)) => {
                let report = ValidationReport::unreadable(today_file.display().to_string(), e.to_string());
                return (StepResult::single("journal", report), None);
            }
            Err(errored) => return (StepResult::single("journal", errored), None),
        };

        let report = index.report_for(&today_file).cloned().unwrap_or_else(|| {
            ValidationReport::skipped(
                today_file.display().to_string(),
                format!("No experience file for {}", self.today.format("%Y-%m-%d")),
            )
        });
        (StepResult::single("journal", report), Some(index))
    }

    async fn synthesis_step(&self, timeout: Duration, index: Option<Arc<JournalIndex>>) -> StepResult {
        let dir = self.paths.reflections();
        let label = dir.display().to_string();
        let window = self.synthesis_window;

        let outcome = run_guarded("synthesis", timeout, move || {
            validate_synthesis_dir(&dir, index.as_deref(), window)
        })
        .await;
        match outcome {
            Ok(Ok(reports)) if reports.is_empty() => {
                StepResult::single("synthesis", ValidationReport::skipped(label, "No reflection files found"))
            }
            Ok(Ok(reports)) => StepResult::new("synthesis", reports),
            Ok(Err(e)) if e.is_not_found() => {
                StepResult::single("synthesis", ValidationReport::skipped(label, "No reflection files found"))
            }
            Ok(Err(e)) => StepResult::single("synthesis", ValidationReport::unreadable(label, e.to_string())),
            Err(errored) => StepResult::single("synthesis", errored),
        }
    }

    async fn proposal_step(&self, timeout: Duration) -> StepResult {
        let pending = self.paths.pending();
        if !pending.is_file() {
            return StepResult::single(
                "proposals",
                ValidationReport::skipped(pending.display().to_string(), "No pending proposals"),
            );
        }
        let (soul, history) = (self.paths.soul(), self.paths.history());
        let config = Arc::clone(&self.config);
        let report = run_guarded("proposals", timeout, move || {
            validate_proposals(&pending, &soul, Some(&history), &config)
        })
        .await
        .unwrap_or_else(|errored| errored);
        StepResult::single("proposals", report)
    }

    async fn significance_step(&self, timeout: Duration, index: Option<Arc<JournalIndex>>) -> StepResult {
        let log = self.paths.significant();
        let Some(index) = index.filter(|i| !i.reports().is_empty()) else {
            return StepResult::single(
                "significance",
                ValidationReport::skipped(log.display().to_string(), "No experience files to check"),
            );
        };
        let config = Arc::clone(&self.config);
        let report = run_guarded("significance", timeout, move || check_significance(&index, &log, &config))
            .await
            .unwrap_or_else(|errored| errored);
        StepResult::single("significance", report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_outranks_fail() {
        assert_eq!(worst([Status::Pass, Status::Error, Status::Fail].into_iter()), Status::Error);
        assert_eq!(worst([Status::Skip, Status::Pass].into_iter()), Status::Pass);
        assert_eq!(worst(std::iter::empty()), Status::Skip);
    }

    #[tokio::test]
    async fn slow_validator_times_out() {
        let result = run_guarded("slow", Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
        })
        .await;
        let report = result.unwrap_err();
        assert_eq!(report.status, Status::Error);
        assert!(report.has_error_containing("timed out"));
        assert_eq!(report.exit_code(), 2);
    }

    #[tokio::test]
    async fn panicking_validator_is_an_error() {
        let result: Result<(), _> = run_guarded("boom", Duration::from_secs(5), || panic!("boom")).await;
        let report = result.unwrap_err();
        assert_eq!(report.status, Status::Error);
        assert_eq!(report.message.as_deref(), Some("Validator panicked: boom"));
    }

    #[tokio::test]
    async fn fast_validator_returns_value() {
        let value = run_guarded("quick", Duration::from_secs(5), || 42).await.unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn errored_step_sets_exit_code_two() {
        let steps = vec![
            StepResult::single("soul", ValidationReport::new("SOUL.md")),
            StepResult::single("state", ValidationReport::errored("state", "Validator timed out")),
        ];
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let summary = RunSummary::new(Path::new("/ws"), day, steps, false);
        assert_eq!(summary.overall, Status::Fail);
        assert_eq!(summary.exit_code(), 2);
        assert!(summary.generate_text().contains("💥 state: ERROR"));
    }
}
