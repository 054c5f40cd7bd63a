//! Persona document ("SOUL.md") support
//!
//! - [`document`]: line-oriented parser producing sections, subsections and
//!   tagged bullets
//! - [`structure`]: structural validation of a parsed document
//! - [`snapshot`]: capture and compare the set of `[CORE]` bullets to detect
//!   tampering across an apply step
//!
//! # Architecture
//!
//! ```text
//! SOUL.md → SoulDocument::parse → validate_structure → ValidationReport
//!                  │
//!                  └→ ImmutableSnapshot::capture → compare(saved) → violations
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod snapshot;
pub mod structure;

// Re-exports for convenience
pub use document::{
    Bullet, BulletTag, MisplacedHeader, SoulDocument, BULLET_MARKER, CORE_TAG, MUTABLE_TAG,
};
pub use snapshot::{ImmutableSnapshot, SnapshotViolation, ViolationKind};
pub use structure::{validate_soul, validate_structure, SnapshotMode};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
