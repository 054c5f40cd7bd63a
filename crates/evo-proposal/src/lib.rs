//! Pending edit validation
//!
//! Proposals are candidate edits to the persona document produced by the
//! synthesis step. Before an external apply step touches the document, each
//! proposal is checked against the live document so that immutable content
//! stays untouched and every targeted bullet actually exists.
//!
//! # Example
//!
//! ```rust
//! use evo_core::jsonl::parse_json_lines;
//! use evo_core::ValidatorConfig;
//! use evo_proposal::ProposalValidator;
//! use evo_soul::SoulDocument;
//!
//! let doc = SoulDocument::parse("## Boundaries\n- Never lie [CORE]\n");
//! let config = ValidatorConfig::default();
//! let pending = parse_json_lines(
//!     r###"{"id":"PROP-20250101-001","tag":"[MUTABLE]","change_type":"remove","target_section":"## Boundaries","current_content":"- Never lie [CORE]","reflection_id":"REF-20250101-001","reason":"testing"}"###,
//! );
//! let report = ProposalValidator::new(&doc, &config).validate_lines("pending.jsonl", &pending);
//! assert_eq!(report.critical_count(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod record;
pub mod validator;

// Re-exports for convenience
pub use record::{ChangeKind, ProposalRecord};
pub use validator::{validate_proposals, ProposalValidator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
