//! Journal and synthesis record validation
//!
//! - [`index`]: scan daily journal files with one shared id set
//! - [`synthesis`]: validate synthesis records, resolving experience ids
//!   against a scanned journal
//! - [`significance`]: check that notable and pivotal entries are promoted
//!   and reflected
//!
//! # Architecture
//!
//! ```text
//! memory/experiences/*.jsonl → JournalIndex ─┬→ per-file reports
//!                                            ├→ SynthesisBatch (REF-*.json)
//!                                            └→ check_significance(significant.jsonl)
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod index;
pub mod significance;
pub mod synthesis;

// Re-exports for convenience
pub use index::{journal_files, EntryOrigin, IndexedEntry, JournalIndex, Significance};
pub use significance::check_significance;
pub use synthesis::{
    synthesis_files, validate_synthesis, validate_synthesis_dir, validate_synthesis_file,
    SynthesisBatch, SynthesisKind, Trigger,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
