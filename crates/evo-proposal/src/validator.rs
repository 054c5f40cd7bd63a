//! Proposal validation against the live document
//!
//! Every pending proposal is checked independently, in this order:
//!
//! 1. tag: `[CORE]` is blocked outright, anything but `[MUTABLE]` is malformed
//! 2. immutable targets: `[CORE]` text in `current_content` or `proposed_content`
//! 3. id format, uniqueness in the batch and against the history file
//! 4. change kind
//! 5. `proposed_content` is a bullet ending in `[MUTABLE]` (add/modify)
//! 6. `current_content` is exactly an existing bullet (modify/remove)
//! 7. target section and subsection exist
//! 8. reflection id format
//! 9. non-empty reason
//!
//! Rule 6 is the one that protects the apply step: an unmatched
//! `current_content` would make the edit silently miss or corrupt the
//! document, so it is reported as critical with a closest-match hint.

use crate::record::{ChangeKind, ProposalRecord};
use evo_core::jsonl::{collect_ids, describe_parse_error, read_json_lines, JsonLine};
use evo_core::report::{preview, tail};
use evo_core::{Finding, IdKind, RecordFields, ValidationReport, ValidatorConfig};
use evo_soul::{SoulDocument, BULLET_MARKER, CORE_TAG, MUTABLE_TAG};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Validates pending proposals against one parsed document
#[derive(Debug)]
pub struct ProposalValidator<'a> {
    doc: &'a SoulDocument,
    config: &'a ValidatorConfig,
    history: HashSet<String>,
}

impl<'a> ProposalValidator<'a> {
    /// Validator for `doc`
    #[must_use]
    pub fn new(doc: &'a SoulDocument, config: &'a ValidatorConfig) -> Self {
        Self {
            doc,
            config,
            history: HashSet::new(),
        }
    }

    /// Ids of already applied or rejected proposals
    #[must_use]
    pub fn with_history<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.history.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Validate a parsed pending batch
    #[must_use]
    pub fn validate_lines(&self, file: &str, lines: &[JsonLine]) -> ValidationReport {
        let mut report = ValidationReport::new(file);
        let mut seen: HashSet<String> = HashSet::new();
        let mut counts = [0usize; 3];

        for json_line in lines {
            match &json_line.value {
                Ok(value) => {
                    let (findings, kind) = self.validate_record(value, json_line.line, &mut seen);
                    if let Some(kind) = kind {
                        counts[kind as usize] += 1;
                    }
                    report.extend(findings);
                }
                Err(e) => report.push(Finding::error(describe_parse_error(e)).at_line(json_line.line)),
            }
        }

        let critical = report.critical_count();
        report.set_stat("total_proposals", lines.len());
        report.set_stat("add", counts[ChangeKind::Add as usize]);
        report.set_stat("modify", counts[ChangeKind::Modify as usize]);
        report.set_stat("remove", counts[ChangeKind::Remove as usize]);
        report.set_stat("critical", critical);
        report
    }

    /// Validate one proposal; returns its findings and parsed change kind
    pub fn validate_record(
        &self,
        value: &Value,
        line: usize,
        seen: &mut HashSet<String>,
    ) -> (Vec<Finding>, Option<ChangeKind>) {
        let mut fields = match RecordFields::from_value(value, Some(line)) {
            Ok(fields) => fields,
            Err(finding) => return (vec![finding], None),
        };
        let record = ProposalRecord::read(&mut fields);
        let pid = record.label(line);

        // 1. tag
        if let Some(tag) = record.tag.as_deref() {
            if tag == CORE_TAG {
                fields.report_finding(
                    "tag",
                    Finding::critical(format!(
                        "🚨 BLOCKED: Proposal {pid} attempts to modify [CORE]. This is NEVER allowed. tag must be [MUTABLE]."
                    )),
                );
            } else if tag != MUTABLE_TAG {
                fields.report("tag", format!("Invalid tag: \"{tag}\" (must be exactly \"[MUTABLE]\")"));
            }
        }

        // 2. immutable content
        let current = ProposalRecord::present(&record.current_content);
        let proposed = ProposalRecord::present(&record.proposed_content);
        if current.is_some_and(|c| c.contains(CORE_TAG)) {
            fields.report_finding(
                "current_content",
                Finding::critical(format!(
                    "🚨 BLOCKED: Proposal {pid} targets a [CORE] bullet. [CORE] bullets are immutable."
                )),
            );
        }
        if proposed.is_some_and(|p| p.contains(CORE_TAG)) {
            fields.report_finding(
                "proposed_content",
                Finding::critical(format!(
                    "🚨 BLOCKED: Proposal {pid} writes [CORE] content. Only users may add [CORE] bullets."
                )),
            );
        }

        // 3. id
        if let Some(id) = ProposalRecord::present(&record.id) {
            if !IdKind::Proposal.matches(id) {
                fields.report(
                    "id",
                    format!(
                        "Invalid ID format: \"{id}\" (expected {})",
                        IdKind::Proposal.expected_format()
                    ),
                );
            }
            if !seen.insert(id.to_string()) {
                fields.report("id", format!("Duplicate proposal ID: {id}"));
            }
            if self.history.contains(id) {
                fields.report("id", format!("Proposal ID already used in history: {id}"));
            }
        }

        // 4. change kind
        let kind = record.kind();
        if let Some(raw) = ProposalRecord::present(&record.change_type) {
            if kind.is_none() {
                fields.report(
                    "change_type",
                    format!("Invalid change_type: \"{raw}\" (valid: add, modify, remove)"),
                );
            }
        }

        if let Some(kind) = kind {
            // 5. proposed bullet
            if kind.writes_content() {
                match proposed {
                    Some(proposed) => Self::check_proposed(proposed, &mut fields),
                    None => fields.report(
                        "proposed_content",
                        format!("proposed_content is required for {kind} operations"),
                    ),
                }
            }
            // 6. current bullet
            if kind.targets_existing() {
                match current {
                    Some(current) => self.check_current(current, &mut fields),
                    None => fields.report(
                        "current_content",
                        format!(
                            "current_content is required for {kind} operations (must match exact line in SOUL.md)"
                        ),
                    ),
                }
            }
        }

        // 7. target
        if let Some(section) = ProposalRecord::present(&record.target_section) {
            match self.doc.subsections(section) {
                None => {
                    let existing: Vec<&str> = self.doc.sections().collect();
                    fields.report(
                        "target_section",
                        format!(
                            "Section not found in SOUL.md: \"{section}\" (existing: {})",
                            existing.join(", ")
                        ),
                    );
                }
                Some(subs) => {
                    if let Some(sub) = ProposalRecord::present(&record.target_subsection) {
                        if !subs.is_empty() && !subs.contains(sub) {
                            let existing: Vec<&str> = subs.iter().map(String::as_str).collect();
                            fields.report(
                                "target_subsection",
                                format!(
                                    "Subsection not found under {section}: \"{sub}\" (existing: {})",
                                    existing.join(", ")
                                ),
                            );
                        }
                    }
                }
            }
        }

        // 8. reflection back-reference
        if let Some(ref_id) = ProposalRecord::present(&record.reflection_id) {
            if !IdKind::Reflection.matches(ref_id) {
                fields.report("reflection_id", format!("Invalid reflection ID format: \"{ref_id}\""));
            }
        }

        // 9. reason
        if record.reason.as_deref().is_some_and(|r| r.trim().is_empty()) {
            fields.report("reason", "reason is empty: proposals must justify the change");
        }

        (fields.into_findings(), kind)
    }

    fn check_proposed(proposed: &str, fields: &mut RecordFields<'_>) {
        if !proposed.starts_with(BULLET_MARKER) {
            fields.report(
                "proposed_content",
                format!(
                    "proposed_content must start with \"{BULLET_MARKER}\" (bullet prefix). Got: \"{}...\"",
                    preview(proposed, 40)
                ),
            );
        }
        if !proposed.trim_end().ends_with(MUTABLE_TAG) {
            fields.report(
                "proposed_content",
                format!(
                    "proposed_content must end with {MUTABLE_TAG}. Got: \"...{}\"",
                    tail(proposed, 30)
                ),
            );
        }
    }

    fn check_current(&self, current: &str, fields: &mut RecordFields<'_>) {
        if self.doc.contains_bullet(current) {
            return;
        }
        let needle = current.trim();
        let hint = self
            .doc
            .closest_by_prefix(needle, self.config.match_prefix_len)
            .map(|b| format!(" Closest match: \"{}\"", b.text))
            .unwrap_or_default();
        fields.report_finding(
            "current_content",
            Finding::critical(format!(
                "🚨 CRITICAL: current_content not found in SOUL.md. This will FAIL during apply. Looking for: \"{}...\"{hint}",
                preview(needle, 60)
            )),
        );
    }
}

/// Validate a pending proposal file against a document file
///
/// A missing document fails; a missing pending file passes with a warning.
/// When `history` is given, ids already recorded there are rejected.
#[must_use]
pub fn validate_proposals(
    pending: &Path,
    soul: &Path,
    history: Option<&Path>,
    config: &ValidatorConfig,
) -> ValidationReport {
    let file = pending.display().to_string();
    let doc = match SoulDocument::load(soul) {
        Ok(doc) => doc,
        Err(e) if e.is_not_found() => {
            return ValidationReport::unreadable(file, format!("SOUL.md not found at: {}", soul.display()))
        }
        Err(e) => return ValidationReport::unreadable(file, e.to_string()),
    };

    let lines = match read_json_lines(pending) {
        Ok(lines) => lines,
        Err(e) if e.is_not_found() => {
            let mut report = ValidationReport::new(file.clone());
            report.push(Finding::warning(format!(
                "File not found (no pending proposals): {file}"
            )));
            return report;
        }
        Err(e) => return ValidationReport::unreadable(file, e.to_string()),
    };

    let history_ids = match history.map(read_json_lines) {
        Some(Ok(lines)) => collect_ids(&lines),
        Some(Err(e)) if !e.is_not_found() => {
            tracing::warn!("ignoring unreadable proposal history: {}", e);
            Vec::new()
        }
        _ => Vec::new(),
    };

    let report = ProposalValidator::new(&doc, config)
        .with_history(history_ids)
        .validate_lines(&file, &lines);
    tracing::info!(
        "proposals {}: {} ({} errors, {} critical)",
        file,
        report.status,
        report.errors.len(),
        report.critical_count()
    );
    report
}
