//! Workspace-level checks and orchestration
//!
//! - [`workspace`]: layout of a persona workspace and the boundary guard
//! - [`runner`]: runs every validator in pipeline order under a timeout
//!
//! ```no_run
//! # async fn demo() {
//! use evo_checker::Runner;
//!
//! let summary = Runner::new("/srv/agent").run().await;
//! println!("{}", summary.generate_text());
//! std::process::exit(summary.exit_code());
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod runner;
pub mod workspace;

pub use runner::{run_guarded, RunSummary, Runner, StepResult, DEFAULT_SYNTHESIS_WINDOW};
pub use workspace::{check_workspace, WorkspacePaths};
