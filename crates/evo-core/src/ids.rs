//! Record identifier formats
//!
//! - Journal entries: `EXP-YYYYMMDD-NNNN`
//! - Synthesis records: `REF-YYYYMMDD-NNN`
//! - Proposals: `PROP-YYYYMMDD-NNN`

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static EXPERIENCE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^EXP-\d{8}-\d{4}$").expect("experience id pattern"));
static REFLECTION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^REF-\d{8}-\d{3}$").expect("reflection id pattern"));
static PROPOSAL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^PROP-\d{8}-\d{3}$").expect("proposal id pattern"));

/// Kinds of record identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Journal entry (observation)
    Experience,
    /// Synthesis record
    Reflection,
    /// Proposed document edit
    Proposal,
}

impl IdKind {
    /// Check identifier format
    #[must_use]
    pub fn matches(self, id: &str) -> bool {
        match self {
            IdKind::Experience => EXPERIENCE_ID.is_match(id),
            IdKind::Reflection => REFLECTION_ID.is_match(id),
            IdKind::Proposal => PROPOSAL_ID.is_match(id),
        }
    }

    /// Human-readable expected format
    #[must_use]
    pub fn expected_format(self) -> &'static str {
        match self {
            IdKind::Experience => "EXP-YYYYMMDD-NNNN",
            IdKind::Reflection => "REF-YYYYMMDD-NNN",
            IdKind::Proposal => "PROP-YYYYMMDD-NNN",
        }
    }

    /// Glob-style file name prefix used in storage
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            IdKind::Experience => "EXP-",
            IdKind::Reflection => "REF-",
            IdKind::Proposal => "PROP-",
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IdKind::Experience => "experience",
            IdKind::Reflection => "reflection",
            IdKind::Proposal => "proposal",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experience_ids() {
        assert!(IdKind::Experience.matches("EXP-20250101-0001"));
        assert!(!IdKind::Experience.matches("EXP-20250101-001"));
        assert!(!IdKind::Experience.matches("EXP-2025011-0001"));
        assert!(!IdKind::Experience.matches(" EXP-20250101-0001"));
    }

    #[test]
    fn reflection_and_proposal_ids() {
        assert!(IdKind::Reflection.matches("REF-20250101-001"));
        assert!(!IdKind::Reflection.matches("REF-20250101-0001"));
        assert!(IdKind::Proposal.matches("PROP-20250101-001"));
        assert!(!IdKind::Proposal.matches("PROP-20250101-01"));
        assert!(!IdKind::Proposal.matches("REF-20250101-001"));
    }

    #[test]
    fn expected_formats() {
        assert_eq!(IdKind::Experience.expected_format(), "EXP-YYYYMMDD-NNNN");
        assert_eq!(IdKind::Reflection.prefix(), "REF-");
    }
}
