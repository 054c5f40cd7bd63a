//! evo-check core
//!
//! Shared building blocks for the persona-document validators:
//! - [`ValidationReport`]: the structured PASS/FAIL result every validator returns
//! - [`IdKind`]: record identifier formats (`EXP-`, `REF-`, `PROP-`)
//! - [`RecordFields`]: typed extraction from loosely-shaped JSON records
//! - [`ValidatorConfig`]: immutable per-run configuration
//! - JSONL and ISO-8601 helpers
//!
//! # Example
//!
//! ```rust
//! use evo_core::{Finding, Status, ValidationReport};
//!
//! let mut report = ValidationReport::new("memory/proposals/pending.jsonl");
//! report.push(Finding::error("reason is empty").at_line(3).field("reason"));
//! assert_eq!(report.status, Status::Fail);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod fields;
pub mod ids;
pub mod jsonl;
pub mod report;
pub mod time;

// Re-exports for convenience
pub use config::ValidatorConfig;
pub use error::{EvoError, EvoResult};
pub use fields::RecordFields;
pub use ids::IdKind;
pub use report::{Finding, Location, Severity, Status, ValidationReport};
pub use time::Timestamp;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing validators
    pub use crate::config::ValidatorConfig;
    pub use crate::error::{EvoError, EvoResult};
    pub use crate::fields::RecordFields;
    pub use crate::ids::IdKind;
    pub use crate::report::{preview, Finding, Severity, Status, ValidationReport};
}
