//! Cached pipeline state
//!
//! The pipeline keeps a small JSON record of counters and timestamps
//! (`memory/evoclaw-state.json`). Its shape must always be right; its
//! counters may be stale, so drift from the stores is only a warning.
//!
//! - [`record`]: typed read of the state record with shape findings
//! - [`reconcile`]: ground-truth counts and drift warnings

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod reconcile;
pub mod record;

// Re-exports for convenience
pub use reconcile::{reconcile, validate_state, GroundTruth, StoreLayout};
pub use record::CachedState;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
