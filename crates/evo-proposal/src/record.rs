//! Typed proposal record

use evo_core::RecordFields;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields every proposal must carry
pub const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "tag",
    "change_type",
    "target_section",
    "reflection_id",
    "reason",
];

/// Fields that may be absent or null depending on the change kind
pub const OPTIONAL_FIELDS: &[&str] = &["target_subsection", "current_content", "proposed_content"];

/// Kind of edit a proposal makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Insert a new bullet
    Add,
    /// Replace an existing bullet
    Modify,
    /// Delete an existing bullet
    Remove,
}

impl ChangeKind {
    /// Parse the stored name
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "add" => Some(Self::Add),
            "modify" => Some(Self::Modify),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }

    /// Stored name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Modify => "modify",
            Self::Remove => "remove",
        }
    }

    /// Whether the edit introduces new text
    #[inline]
    #[must_use]
    pub fn writes_content(self) -> bool {
        matches!(self, Self::Add | Self::Modify)
    }

    /// Whether the edit targets an existing bullet
    #[inline]
    #[must_use]
    pub fn targets_existing(self) -> bool {
        matches!(self, Self::Modify | Self::Remove)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending proposal with every field explicitly optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalRecord {
    /// `PROP-YYYYMMDD-NNN`
    pub id: Option<String>,
    /// Originating synthesis record
    pub reflection_id: Option<String>,
    /// Protection tag claimed by the proposal
    pub tag: Option<String>,
    /// Raw change kind as stored
    pub change_type: Option<String>,
    /// Section header the edit applies to
    pub target_section: Option<String>,
    /// Optional subsection header
    pub target_subsection: Option<String>,
    /// Existing bullet (modify/remove)
    pub current_content: Option<String>,
    /// New bullet (add/modify)
    pub proposed_content: Option<String>,
    /// Justification
    pub reason: Option<String>,
}

impl ProposalRecord {
    /// Read the record, reporting missing fields and type mismatches into `fields`
    pub fn read(fields: &mut RecordFields<'_>) -> Self {
        fields.allow_null(OPTIONAL_FIELDS);
        fields.require(REQUIRED_FIELDS);
        let mut text = |name: &str| fields.string(name).map(str::to_string);
        Self {
            id: text("id"),
            reflection_id: text("reflection_id"),
            tag: text("tag"),
            change_type: text("change_type"),
            target_section: text("target_section"),
            target_subsection: text("target_subsection"),
            current_content: text("current_content"),
            proposed_content: text("proposed_content"),
            reason: text("reason"),
        }
    }

    /// Parsed change kind, if valid
    #[must_use]
    pub fn kind(&self) -> Option<ChangeKind> {
        self.change_type.as_deref().and_then(ChangeKind::parse)
    }

    /// Label used in messages: the id, or the line it came from
    #[must_use]
    pub fn label(&self, line: usize) -> String {
        match self.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => format!("<line {line}>"),
        }
    }

    /// Non-empty value of an optional text field
    pub(crate) fn present(field: &Option<String>) -> Option<&str> {
        field.as_deref().filter(|s| !s.is_empty())
    }
}
