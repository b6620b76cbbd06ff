//! engine
//!
//! Runs an update: edit the YAML file, commit it remotely, open the pull
//! request.
//!
//! # Architecture
//!
//! - [`commit`] builds a commit through the forge's object store and moves
//!   the branch to it
//! - [`publish`] opens the pull request and labels it
//! - [`runner`] sequences the stages and decides the [`RunOutcome`]
//!
//! The engine never talks to GitHub or the terminal directly. The forge
//! comes from a [`ForgeFactory`](crate::forge::ForgeFactory) and every
//! message goes through a [`Reporter`](crate::ui::output::Reporter), so a
//! whole run can be driven against [`MockForge`](crate::forge::mock::MockForge).

pub mod commit;
pub mod publish;
pub mod runner;

pub use commit::{CommitBuilder, CommitError};
pub use publish::PullRequestPublisher;
pub use runner::{Orchestrator, RunError, RunOutcome, Stage, StageError};

use std::path::PathBuf;

/// Execution context for a run.
///
/// Contains global settings derived from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}
