//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Verbosity-aware printing and the run [`Reporter`](output::Reporter)
//!
//! # Design
//!
//! All output goes through this module so that terminal runs and GitHub
//! Actions runs share one code path and differ only in the reporter.

pub mod output;
