//! Structured validation results
//!
//! Every validator produces a [`ValidationReport`]: an overall status, the
//! itemized errors and warnings, and component-specific statistics. The
//! JSON shape is the interface consumed by orchestrators:
//!
//! ```text
//! {"status": "PASS"|"FAIL"|"ERROR"|"SKIP", "file": "...",
//!  "errors": [...], "warnings": [...], "stats": {...}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Overall outcome of one validator run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// No errors
    Pass,
    /// At least one error or critical finding
    Fail,
    /// The validator could not complete (timeout, crash)
    Error,
    /// Nothing to validate
    Skip,
}

impl Status {
    /// Process exit code for this status
    #[inline]
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Pass | Status::Skip => 0,
            Status::Fail => 1,
            Status::Error => 2,
        }
    }

    /// Whether this status makes an aggregate run fail
    #[inline]
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Fail | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Error => "ERROR",
            Status::Skip => "SKIP",
        };
        f.write_str(s)
    }
}

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, never fails the run
    Warning,
    /// Fails the run
    Error,
    /// Fails the run; immutability breaches
    Critical,
}

impl Severity {
    /// Whether findings of this severity fail a report
    #[inline]
    #[must_use]
    pub fn is_failing(self) -> bool {
        !matches!(self, Severity::Warning)
    }
}

/// Where a finding was observed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File, when it differs from the report's own file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based line number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Field path (`proposal_decision.reasoning`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// One itemized error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Severity
    pub severity: Severity,
    /// Location hint
    #[serde(flatten)]
    pub location: Location,
    /// Human-readable message
    pub message: String,
}

impl Finding {
    /// Create finding with severity
    #[inline]
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            location: Location::default(),
            message: message.into(),
        }
    }

    /// Create error finding
    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create critical finding
    #[inline]
    #[must_use]
    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, message)
    }

    /// Create warning finding
    #[inline]
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// At line
    #[inline]
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.location.line = Some(line);
        self
    }

    /// At optional line
    #[inline]
    #[must_use]
    pub fn at(mut self, line: Option<usize>) -> Self {
        self.location.line = line;
        self
    }

    /// On field
    #[inline]
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.location.field = Some(field.into());
        self
    }

    /// In file
    #[inline]
    #[must_use]
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.location.file = Some(file.into());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.location.file {
            write!(f, "{file}: ")?;
        }
        if let Some(line) = self.location.line {
            write!(f, "line {line}: ")?;
        }
        if let Some(field) = &self.location.field {
            write!(f, "[{field}] ")?;
        }
        f.write_str(&self.message)
    }
}

/// Result of one validator over one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Overall status
    pub status: Status,
    /// Primary input
    pub file: String,
    /// Errors and critical findings
    pub errors: Vec<Finding>,
    /// Warnings
    pub warnings: Vec<Finding>,
    /// Component-specific statistics
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub stats: Map<String, Value>,
    /// Reason for SKIP/ERROR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationReport {
    /// Create passing report for file
    #[must_use]
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            status: Status::Pass,
            file: file.into(),
            errors: Vec::new(),
            warnings: Vec::new(),
            stats: Map::new(),
            message: None,
        }
    }

    /// FAIL report carrying one explanatory error
    #[must_use]
    pub fn unreadable(file: impl Into<String>, message: impl Into<String>) -> Self {
        let mut report = Self::new(file);
        report.push(Finding::error(message));
        report
    }

    /// SKIP report
    #[must_use]
    pub fn skipped(file: impl Into<String>, message: impl Into<String>) -> Self {
        let mut report = Self::new(file);
        report.status = Status::Skip;
        report.message = Some(message.into());
        report
    }

    /// ERROR report: the validator did not run to completion
    #[must_use]
    pub fn errored(file: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut report = Self::new(file);
        report.errors.push(Finding::error(message.clone()));
        report.status = Status::Error;
        report.message = Some(message);
        report
    }

    /// Record a finding, routing by severity
    pub fn push(&mut self, finding: Finding) {
        if finding.severity.is_failing() {
            self.errors.push(finding);
            if self.status == Status::Pass {
                self.status = Status::Fail;
            }
        } else {
            self.warnings.push(finding);
        }
    }

    /// Record many findings
    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        for finding in findings {
            self.push(finding);
        }
    }

    /// Set a statistic
    pub fn set_stat(&mut self, key: &str, value: impl Into<Value>) {
        self.stats.insert(key.to_string(), value.into());
    }

    /// Builder form of [`set_stat`](Self::set_stat)
    #[must_use]
    pub fn with_stat(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_stat(key, value);
        self
    }

    /// Whether status is PASS
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == Status::Pass
    }

    /// Number of critical findings
    #[must_use]
    pub fn critical_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count()
    }

    /// Whether any error message contains `needle`
    #[must_use]
    pub fn has_error_containing(&self, needle: &str) -> bool {
        self.errors.iter().any(|f| f.message.contains(needle))
    }

    /// Whether any warning message contains `needle`
    #[must_use]
    pub fn has_warning_containing(&self, needle: &str) -> bool {
        self.warnings.iter().any(|f| f.message.contains(needle))
    }

    /// Process exit code
    #[inline]
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

/// Shorten text for inclusion in a message, counting characters not bytes
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Last `max_chars` characters of text
#[must_use]
pub fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    match text.char_indices().nth(count - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn push_error_flips_status() {
        let mut report = ValidationReport::new("SOUL.md");
        report.push(Finding::warning("minor"));
        assert!(report.passed());

        report.push(Finding::critical("tampered").field("[CORE]"));
        assert_eq!(report.status, Status::Fail);
        assert_eq!(report.critical_count(), 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn errored_report_keeps_error_status() {
        let mut report = ValidationReport::errored("x", "timed out");
        report.push(Finding::error("late"));
        assert_eq!(report.status, Status::Error);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn skipped_report_passes_exit_code() {
        let report = ValidationReport::skipped("pending.jsonl", "No pending proposals");
        assert_eq!(report.exit_code(), 0);
        assert!(!report.status.is_failure());
    }

    #[test]
    fn report_serializes_flat_location() {
        let mut report = ValidationReport::new("a.jsonl");
        report.push(Finding::error("Duplicate ID: EXP-20250101-0001").at_line(2).field("id"));
        report.set_stat("total_entries", 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["errors"][0]["line"], 2);
        assert_eq!(json["errors"][0]["field"], "id");
        assert_eq!(json["errors"][0]["severity"], "error");
        assert!(json["errors"][0].get("file").is_none());
        assert_eq!(json["stats"]["total_entries"], 2);
    }

    #[test]
    fn finding_display_includes_location() {
        let finding = Finding::error("Content is empty").at_line(4).field("content");
        assert_eq!(finding.to_string(), "line 4: [content] Content is empty");
    }

    #[test]
    fn preview_is_char_safe() {
        assert_eq!(preview("héllo wörld", 4), "héll");
        assert_eq!(preview("short", 80), "short");
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 3), "ab");
    }
}
