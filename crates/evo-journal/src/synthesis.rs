//! Synthesis record validation
//!
//! A synthesis record batches journal entries into a summary, insights and
//! an explicit decision about whether to propose a document edit. Besides
//! field checks, the decision must agree with what was produced:
//!
//! | should_propose | proposals | triggers_fired | verdict |
//! |----------------|-----------|----------------|---------|
//! | true           | empty     | any            | error   |
//! | true           | any       | empty          | error   |
//! | false          | non-empty | any            | error   |
//!
//! Records live one per file as `REF-*.json`; ids must be unique across
//! files.

use crate::index::JournalIndex;
use evo_core::{
    EvoError, EvoResult, Finding, IdKind, RecordFields, Timestamp, ValidationReport,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level fields every synthesis record must carry
pub const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "timestamp",
    "type",
    "experience_ids",
    "summary",
    "insights",
    "soul_relevance",
    "proposal_decision",
    "proposals",
];

/// Fields of the nested `proposal_decision` object
pub const DECISION_FIELDS: &[&str] = &["should_propose", "triggers_fired", "reasoning"];

/// What prompted a synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisKind {
    /// Scheduled batch of routine entries
    RoutineBatch,
    /// Batch of notable entries
    NotableBatch,
    /// Single pivotal entry, reflected immediately
    PivotalImmediate,
}

impl SynthesisKind {
    const NAMES: &'static str = "notable_batch, pivotal_immediate, routine_batch";

    /// Parse the stored name
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "routine_batch" => Some(Self::RoutineBatch),
            "notable_batch" => Some(Self::NotableBatch),
            "pivotal_immediate" => Some(Self::PivotalImmediate),
            _ => None,
        }
    }
}

/// Reason a synthesis decided to propose an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Something the document does not cover
    Gap,
    /// Behaviour drifting away from the document
    Drift,
    /// Document contradicts observed behaviour
    Contradiction,
    /// New capability or trait
    Growth,
    /// Wording can be sharpened
    Refinement,
}

impl Trigger {
    const NAMES: &'static str = "contradiction, drift, gap, growth, refinement";

    /// Parse the stored name
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "gap" => Some(Self::Gap),
            "drift" => Some(Self::Drift),
            "contradiction" => Some(Self::Contradiction),
            "growth" => Some(Self::Growth),
            "refinement" => Some(Self::Refinement),
            _ => None,
        }
    }
}

/// Validate one parsed synthesis record
///
/// Experience ids are resolved against `index` when one is supplied.
#[must_use]
pub fn validate_synthesis(value: &Value, file: &str, index: Option<&JournalIndex>) -> ValidationReport {
    let mut report = ValidationReport::new(file);
    let mut fields = match RecordFields::from_value(value, None) {
        Ok(fields) => fields,
        Err(finding) => {
            report.push(finding);
            return report;
        }
    };
    fields.require(REQUIRED_FIELDS);

    if let Some(id) = fields.string("id").filter(|id| !id.is_empty()) {
        if !IdKind::Reflection.matches(id) {
            fields.report(
                "id",
                format!(
                    "Invalid ID format: \"{id}\" (expected {})",
                    IdKind::Reflection.expected_format()
                ),
            );
        }
    }

    if let Some(ts) = fields.string("timestamp") {
        if Timestamp::parse(ts).is_none() {
            fields.report("timestamp", format!("Invalid ISO-8601 timestamp: \"{ts}\""));
        }
    }

    if let Some(kind) = fields.string("type").filter(|k| !k.is_empty()) {
        if SynthesisKind::parse(kind).is_none() {
            fields.report(
                "type",
                format!("Invalid type: \"{kind}\" (valid: {})", SynthesisKind::NAMES),
            );
        }
    }

    let experience_ids = fields.string_list("experience_ids");
    match &experience_ids {
        Some(ids) if ids.is_empty() => fields.report(
            "experience_ids",
            "experience_ids is empty: a synthesis must reference at least one experience",
        ),
        Some(ids) => {
            for eid in ids {
                if !IdKind::Experience.matches(eid) {
                    fields.report("experience_ids", format!("Invalid experience ID format: \"{eid}\""));
                }
            }
            if let Some(index) = index {
                for eid in ids.iter().filter(|eid| !index.contains(eid)) {
                    fields.report(
                        "experience_ids",
                        format!("Experience ID not found in experience files: {eid}"),
                    );
                }
            }
        }
        None => {}
    }

    let insights = fields.array("insights");
    if insights.is_some_and(Vec::is_empty) {
        fields.report(
            "insights",
            "insights is empty: every synthesis must produce at least one insight",
        );
    }

    if fields.string("summary").is_some_and(|s| s.trim().is_empty()) {
        fields.report("summary", "summary is empty");
    }

    let proposals = fields.string_list("proposals");
    for pid in proposals.iter().flatten() {
        if !IdKind::Proposal.matches(pid) {
            fields.report(
                "proposals",
                format!(
                    "Invalid proposal ID format: \"{pid}\" (expected {})",
                    IdKind::Proposal.expected_format()
                ),
            );
        }
    }

    let decision_findings = match fields.raw("proposal_decision") {
        None => {
            fields.report(
                "proposal_decision",
                "MISSING proposal_decision: every synthesis MUST include explicit proposal reasoning",
            );
            Vec::new()
        }
        Some(_) => match fields.object("proposal_decision") {
            Some(decision) => check_decision(decision, proposals.as_deref()),
            None => Vec::new(),
        },
    };

    report.extend(fields.into_findings());
    report.extend(decision_findings);
    report.set_stat("experience_ids", experience_ids.map_or(0, |ids| ids.len()));
    report.set_stat("insights", insights.map_or(0, Vec::len));
    report.set_stat("proposals", proposals.map_or(0, |p| p.len()));
    report
}

fn check_decision(decision: &serde_json::Map<String, Value>, proposals: Option<&[String]>) -> Vec<Finding> {
    let mut fields = RecordFields::nested(decision, None, "proposal_decision");
    fields.require(DECISION_FIELDS);

    let should = fields.boolean("should_propose");
    let triggers = fields.string_list("triggers_fired");
    for trigger in triggers.iter().flatten() {
        if Trigger::parse(trigger).is_none() {
            fields.report(
                "triggers_fired",
                format!("Invalid trigger: \"{trigger}\" (valid: {})", Trigger::NAMES),
            );
        }
    }

    if fields.string("reasoning").is_some_and(|r| r.trim().is_empty()) {
        fields.report(
            "reasoning",
            "reasoning is empty: must explain why proposing or not",
        );
    }

    // A null or missing list counts as empty here; its type error is reported above.
    let proposals = proposals.unwrap_or_default();
    let triggers = triggers.unwrap_or_default();
    let mut findings = fields.into_findings();
    if let Some(should) = should {
        if should && proposals.is_empty() {
            findings.push(
                Finding::error(
                    "INCONSISTENCY: proposal_decision.should_propose is TRUE but proposals array \
                     is EMPTY. If you decided to propose, you must create the proposal. Either \
                     create it or change should_propose to false with updated reasoning.",
                )
                .field("proposals"),
            );
        }
        if !should && !proposals.is_empty() {
            findings.push(
                Finding::error(
                    "INCONSISTENCY: proposal_decision.should_propose is FALSE but proposals array \
                     has entries. Either should_propose should be true, or proposals should be \
                     empty.",
                )
                .field("proposals"),
            );
        }
        if should && triggers.is_empty() {
            findings.push(
                Finding::error(
                    "INCONSISTENCY: should_propose is TRUE but no triggers_fired. At least one \
                     trigger (gap/drift/contradiction/growth/refinement) must be identified to \
                     justify a proposal.",
                )
                .field("proposal_decision.triggers_fired"),
            );
        }
    }
    findings
}

fn read_record(path: &Path) -> Result<Value, String> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        let err = EvoError::io(path, e);
        if err.is_not_found() {
            format!("File not found: {}", path.display())
        } else {
            err.to_string()
        }
    })?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid JSON: {e}"))
}

fn stored_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())
}

/// Validate one synthesis file
#[must_use]
pub fn validate_synthesis_file(path: &Path, index: Option<&JournalIndex>) -> ValidationReport {
    SynthesisBatch::new(index).validate(path)
}

/// Validates synthesis files one after another, tracking ids across files
#[derive(Debug)]
pub struct SynthesisBatch<'a> {
    index: Option<&'a JournalIndex>,
    seen: HashMap<String, PathBuf>,
}

impl<'a> SynthesisBatch<'a> {
    /// New batch resolving experience ids against `index`
    #[must_use]
    pub fn new(index: Option<&'a JournalIndex>) -> Self {
        Self {
            index,
            seen: HashMap::new(),
        }
    }

    /// Note the id of a file without validating it
    ///
    /// Used for older files outside the validation window so that a recent
    /// record reusing their id is still caught.
    pub fn register(&mut self, path: &Path) {
        match read_record(path) {
            Ok(value) => {
                if let Some(id) = stored_id(&value) {
                    self.seen
                        .entry(id.to_string())
                        .or_insert_with(|| path.to_path_buf());
                }
            }
            Err(e) => tracing::debug!("not registering {}: {}", path.display(), e),
        }
    }

    /// Validate a file and record its id
    pub fn validate(&mut self, path: &Path) -> ValidationReport {
        let file = path.display().to_string();
        let value = match read_record(path) {
            Ok(value) => value,
            Err(message) => return ValidationReport::unreadable(file, message),
        };

        let mut report = validate_synthesis(&value, &file, self.index);
        if let Some(id) = stored_id(&value) {
            let stem = path.file_stem().map(|s| s.to_string_lossy());
            if stem.as_deref() != Some(id) {
                report.push(
                    Finding::warning(format!(
                        "File name does not match id \"{id}\" (expected {id}.json)"
                    ))
                    .field("id"),
                );
            }
            match self.seen.get(id) {
                Some(first) => report.push(
                    Finding::error(format!(
                        "Duplicate synthesis ID: {id} (also in {})",
                        first.display()
                    ))
                    .field("id"),
                ),
                None => {
                    self.seen.insert(id.to_string(), path.to_path_buf());
                }
            }
        }
        tracing::info!(
            "synthesis {}: {} ({} errors)",
            file,
            report.status,
            report.errors.len()
        );
        report
    }
}

/// `REF-*.json` files of a directory sorted by name; a missing directory is empty
///
/// # Errors
/// Returns [`EvoError::Io`] if the directory exists but cannot be listed.
pub fn synthesis_files(dir: &Path) -> EvoResult<Vec<PathBuf>> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EvoError::io(dir, e)),
    };
    let mut files = Vec::new();
    for entry in read {
        let path = entry.map_err(|e| EvoError::io(dir, e))?.path();
        let is_record = path.file_name().and_then(|n| n.to_str()).is_some_and(|name| {
            name.starts_with(IdKind::Reflection.prefix())
                && Path::new(name).extension().is_some_and(|ext| ext == "json")
        });
        if is_record && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Validate the `limit` most recent synthesis files of a directory
///
/// Older files are only registered for duplicate-id detection. Returns an
/// empty list when there are no records.
///
/// # Errors
/// Returns [`EvoError::Io`] if the directory cannot be listed.
pub fn validate_synthesis_dir(
    dir: &Path,
    index: Option<&JournalIndex>,
    limit: usize,
) -> EvoResult<Vec<ValidationReport>> {
    let files = synthesis_files(dir)?;
    let split = files.len().saturating_sub(limit);
    let (older, recent) = files.split_at(split);

    let mut batch = SynthesisBatch::new(index);
    for path in older {
        batch.register(path);
    }
    Ok(recent.iter().map(|path| batch.validate(path)).collect())
}
