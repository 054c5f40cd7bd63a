//! Journal scanning and the shared identifier index
//!
//! The journal is a directory of daily JSONL files. Identifiers must be
//! unique across the whole journal, so every file is validated against one
//! shared set of ids: a duplicate is reported on its later occurrence, with a
//! pointer to the first one.
//!
//! ```text
//! 2025-01-01.jsonl ─┐
//! 2025-01-02.jsonl ─┼→ JournalIndex::scan → per-file ValidationReport
//! 2025-01-03.jsonl ─┘                     → id index (for synthesis lookups)
//! ```

use chrono::{DateTime, Utc};
use evo_core::jsonl::{describe_parse_error, read_json_lines};
use evo_core::{
    EvoError, EvoResult, Finding, IdKind, RecordFields, Timestamp, ValidationReport,
    ValidatorConfig,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Fields every journal entry must carry
pub const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "timestamp",
    "source",
    "content",
    "significance",
    "significance_reason",
    "reflected",
];

/// Importance assigned to an observation when it was logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    /// Everyday observation, reflected in batches
    Routine,
    /// Worth promoting to the significant log
    Notable,
    /// Requires immediate reflection
    Pivotal,
}

impl Significance {
    /// Parse the stored name
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "routine" => Some(Self::Routine),
            "notable" => Some(Self::Notable),
            "pivotal" => Some(Self::Pivotal),
            _ => None,
        }
    }

    /// Whether entries of this level must be mirrored into the significant log
    #[inline]
    #[must_use]
    pub fn is_significant(self) -> bool {
        !matches!(self, Self::Routine)
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Routine => "routine",
            Self::Notable => "notable",
            Self::Pivotal => "pivotal",
        })
    }
}

/// Where an entry was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOrigin {
    /// Journal file
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
}

impl fmt::Display for EntryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .file
            .file_name()
            .map_or_else(|| self.file.display().to_string(), |n| n.to_string_lossy().into_owned());
        write!(f, "{name}:{}", self.line)
    }
}

/// Indexed view of one journal entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
    /// Entry id as written (not necessarily well-formed)
    pub id: String,
    /// First occurrence
    pub origin: EntryOrigin,
    /// Parsed significance, if valid
    pub significance: Option<Significance>,
    /// `reflected` flag, if boolean
    pub reflected: Option<bool>,
}

impl IndexedEntry {
    /// Whether this entry still awaits reflection
    #[inline]
    #[must_use]
    pub fn is_unreflected(&self) -> bool {
        self.reflected == Some(false)
    }
}

/// Validation results and id index over a set of journal files
#[derive(Debug, Default)]
pub struct JournalIndex {
    entries: IndexMap<String, IndexedEntry>,
    reports: Vec<(PathBuf, ValidationReport)>,
}

impl JournalIndex {
    /// Validate `files` in order against one shared id set
    #[must_use]
    pub fn scan<P: AsRef<Path>>(files: &[P], config: &ValidatorConfig) -> Self {
        Self::scan_at(files, config, Utc::now())
    }

    /// [`scan`](Self::scan) with an explicit clock for the future-timestamp check
    #[must_use]
    pub fn scan_at<P: AsRef<Path>>(files: &[P], config: &ValidatorConfig, now: DateTime<Utc>) -> Self {
        let mut index = Self::default();
        for file in files {
            let path = file.as_ref();
            let report = index.scan_file(path, config, now);
            tracing::info!(
                "journal {}: {} ({} errors, {} warnings)",
                path.display(),
                report.status,
                report.errors.len(),
                report.warnings.len()
            );
            index.reports.push((path.to_path_buf(), report));
        }
        index
    }

    /// Scan every `*.jsonl` file of a directory, ordered by file name
    ///
    /// # Errors
    /// Returns [`EvoError::Io`] if the directory cannot be listed.
    pub fn scan_dir(dir: &Path, config: &ValidatorConfig) -> EvoResult<Self> {
        let files = journal_files(dir)?;
        Ok(Self::scan(&files, config))
    }

    fn scan_file(&mut self, path: &Path, config: &ValidatorConfig, now: DateTime<Utc>) -> ValidationReport {
        let file = path.display().to_string();
        let lines = match read_json_lines(path) {
            Ok(lines) => lines,
            Err(e) if e.is_not_found() => {
                return ValidationReport::unreadable(file.clone(), format!("File not found: {file}"))
            }
            Err(e) => return ValidationReport::unreadable(file, e.to_string()),
        };

        let mut report = ValidationReport::new(file);
        let mut file_ids: HashSet<String> = HashSet::new();
        let mut significant_ids: Vec<String> = Vec::new();

        for json_line in &lines {
            let value = match &json_line.value {
                Ok(value) => value,
                Err(e) => {
                    report.push(Finding::error(describe_parse_error(e)).at_line(json_line.line));
                    continue;
                }
            };
            let origin = EntryOrigin {
                file: path.to_path_buf(),
                line: json_line.line,
            };
            if let Some(entry) = self.check_entry(value, origin, config, now, &mut report) {
                if entry.significance.is_some_and(Significance::is_significant) {
                    significant_ids.push(entry.id.clone());
                }
                file_ids.insert(entry.id.clone());
                self.entries.entry(entry.id.clone()).or_insert(entry);
            }
        }

        report.set_stat("total_entries", lines.len());
        report.set_stat("unique_ids", file_ids.len());
        report.set_stat("notable_pivotal_count", significant_ids.len());
        report.set_stat("notable_pivotal_ids", significant_ids);
        report
    }

    fn check_entry(
        &self,
        value: &Value,
        origin: EntryOrigin,
        config: &ValidatorConfig,
        now: DateTime<Utc>,
        report: &mut ValidationReport,
    ) -> Option<IndexedEntry> {
        let line = origin.line;
        let mut fields = match RecordFields::from_value(value, Some(line)) {
            Ok(fields) => fields,
            Err(finding) => {
                report.push(finding);
                return None;
            }
        };
        fields.allow_null(&["reflected"]);
        fields.require(REQUIRED_FIELDS);

        let id = fields.string("id");
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            if !IdKind::Experience.matches(id) {
                fields.report(
                    "id",
                    format!(
                        "Invalid ID format: \"{id}\" (expected {})",
                        IdKind::Experience.expected_format()
                    ),
                );
            }
            if let Some(first) = self.entries.get(id) {
                fields.report("id", format!("Duplicate ID: {id} (first seen at {})", first.origin));
            }
        }

        if let Some(ts) = fields.string("timestamp") {
            match Timestamp::parse(ts) {
                None => fields.report("timestamp", format!("Invalid ISO-8601 timestamp: \"{ts}\"")),
                Some(parsed) if parsed.is_future(now, config.future_skew) => {
                    fields.report("timestamp", format!("Timestamp is in the future: {ts}"));
                }
                Some(_) => {}
            }
        }

        if let Some(source) = fields.string("source") {
            if !source.is_empty() && !config.is_known_source(source) {
                let valid: Vec<&str> = config.sources.iter().map(String::as_str).collect();
                fields.report(
                    "source",
                    format!("Unknown source: \"{source}\" (valid: {})", valid.join(", ")),
                );
            }
        }

        let significance = fields.string("significance").and_then(|sig| {
            let parsed = Significance::parse(sig);
            if parsed.is_none() && !sig.is_empty() {
                fields.report(
                    "significance",
                    format!("Invalid significance: \"{sig}\" (valid: routine, notable, pivotal)"),
                );
            }
            parsed
        });

        if fields.string("content").is_some_and(|c| c.trim().is_empty()) {
            fields.report("content", "Content is empty");
        }
        if fields
            .string("significance_reason")
            .is_some_and(|r| r.trim().is_empty())
        {
            fields.report_finding(
                "significance_reason",
                Finding::warning("significance_reason is empty"),
            );
        }
        let reflected = fields.boolean("reflected");

        report.extend(fields.into_findings());

        id.filter(|id| !id.is_empty()).map(|id| IndexedEntry {
            id: id.to_string(),
            origin,
            significance,
            reflected,
        })
    }

    /// Whether an entry with this id was seen
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Entry by id (first occurrence)
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&IndexedEntry> {
        self.entries.get(id)
    }

    /// All entries in scan order
    pub fn entries(&self) -> impl Iterator<Item = &IndexedEntry> {
        self.entries.values()
    }

    /// Number of distinct ids
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were indexed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that must appear in the significant log
    pub fn significant_entries(&self) -> impl Iterator<Item = &IndexedEntry> {
        self.entries
            .values()
            .filter(|e| e.significance.is_some_and(Significance::is_significant))
    }

    /// Ids of notable and pivotal entries
    #[must_use]
    pub fn significant_ids(&self) -> Vec<&str> {
        self.significant_entries().map(|e| e.id.as_str()).collect()
    }

    /// Per-file reports in scan order
    #[must_use]
    pub fn reports(&self) -> &[(PathBuf, ValidationReport)] {
        &self.reports
    }

    /// Report for one scanned file
    #[must_use]
    pub fn report_for(&self, path: &Path) -> Option<&ValidationReport> {
        self.reports
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, report)| report)
    }

    /// Report for one file, consuming the index
    #[must_use]
    pub fn into_report_for(self, path: &Path) -> Option<ValidationReport> {
        self.reports
            .into_iter()
            .find(|(p, _)| p == path)
            .map(|(_, report)| report)
    }
}

/// `*.jsonl` files of a directory sorted by name; a missing directory is empty
///
/// # Errors
/// Returns [`EvoError::Io`] if the directory exists but cannot be listed.
pub fn journal_files(dir: &Path) -> EvoResult<Vec<PathBuf>> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EvoError::io(dir, e)),
    };
    let mut files = Vec::new();
    for entry in read {
        let path = entry.map_err(|e| EvoError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
            files.push(path);
        }
    }
    files.sort();
    tracing::debug!("found {} journal files in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use evo_core::Status;
    use evo_test_utils::{entry, to_jsonl, write_file};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap()
    }

    fn scan_text(text: &str) -> (JournalIndex, ValidationReport) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2025-01-01.jsonl");
        write_file(&path, text);
        let index = JournalIndex::scan_at(&[&path], &ValidatorConfig::default(), now());
        let report = index.report_for(&path).cloned().unwrap();
        (index, report)
    }

    #[test]
    fn valid_entries_pass_with_stats() {
        let (index, report) = scan_text(&to_jsonl(&[
            entry("EXP-20250101-0001", "routine"),
            entry("EXP-20250101-0002", "notable"),
        ]));
        assert_eq!(report.status, Status::Pass, "{:?}", report.errors);
        assert_eq!(report.stats["total_entries"], 2);
        assert_eq!(report.stats["unique_ids"], 2);
        assert_eq!(report.stats["notable_pivotal_ids"], json!(["EXP-20250101-0002"]));
        assert!(index.contains("EXP-20250101-0001"));
        assert_eq!(index.significant_ids(), vec!["EXP-20250101-0002"]);
    }

    #[test]
    fn malformed_line_does_not_stop_scan() {
        let text = format!(
            "{}{{not json\n{}",
            to_jsonl(&[entry("EXP-20250101-0001", "routine")]),
            to_jsonl(&[entry("EXP-20250101-0001", "routine")])
        );
        let (_, report) = scan_text(&text);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].location.line, Some(2));
        assert!(report.errors[0].message.starts_with("Invalid JSON"));
        assert_eq!(report.errors[1].location.line, Some(3));
        assert!(report.errors[1].message.starts_with("Duplicate ID: EXP-20250101-0001"));
    }

    #[test]
    fn field_errors_are_reported() {
        let mut bad = entry("EXP-2025-1", "huge");
        bad["source"] = json!("carrier-pigeon");
        bad["reflected"] = json!("no");
        bad["content"] = json!("  ");
        bad["significance_reason"] = json!("");
        bad["timestamp"] = json!("yesterday");
        let (_, report) = scan_text(&to_jsonl(&[bad]));

        assert!(report.has_error_containing("Invalid ID format: \"EXP-2025-1\""));
        assert!(report.has_error_containing("Unknown source: \"carrier-pigeon\""));
        assert!(report.has_error_containing("Invalid significance: \"huge\""));
        assert!(report.has_error_containing("reflected must be boolean, got string"));
        assert!(report.has_error_containing("Content is empty"));
        assert!(report.has_error_containing("Invalid ISO-8601 timestamp"));
        assert!(report.has_warning_containing("significance_reason is empty"));
    }

    #[test]
    fn missing_fields_and_future_timestamps() {
        let mut future = entry("EXP-20250101-0002", "routine");
        future["timestamp"] = json!("2030-01-01T00:00:00Z");
        let text = format!("{{\"id\": \"EXP-20250101-0001\"}}\n{}", to_jsonl(&[future]));
        let (_, report) = scan_text(&text);
        assert!(report.has_error_containing("Missing required field: content"));
        assert!(report.has_error_containing("Timestamp is in the future"));
    }

    #[test]
    fn non_object_line_is_rejected() {
        let (_, report) = scan_text("[1, 2]\n");
        assert!(report.has_error_containing("Expected JSON object, got array"));
    }

    #[test]
    fn configured_sources_are_accepted() {
        let mut e = entry("EXP-20250101-0001", "routine");
        e["source"] = json!("telegram");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("day.jsonl");
        write_file(&path, &to_jsonl(&[e]));
        let config = ValidatorConfig::default().with_sources(["telegram"]);
        let index = JournalIndex::scan_at(&[&path], &config, now());
        assert!(index.report_for(&path).unwrap().passed());
    }

    #[test]
    fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.jsonl");
        let index = JournalIndex::scan(&[&path], &ValidatorConfig::default());
        assert!(index.report_for(&path).unwrap().has_error_containing("File not found"));
    }

    #[test]
    fn journal_files_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("2025-01-02.jsonl"), "");
        write_file(&dir.path().join("2025-01-01.jsonl"), "");
        write_file(&dir.path().join("notes.txt"), "");
        let names: Vec<String> = journal_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["2025-01-01.jsonl", "2025-01-02.jsonl"]);
        assert!(journal_files(&dir.path().join("missing")).unwrap().is_empty());
    }
}
