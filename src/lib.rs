//! yaml-update - set a YAML property and propose it as a pull request
//!
//! Reads a YAML file, sets one dotted-path property to a new value, commits
//! the result to a GitHub branch through the Git Data API (no local clone),
//! and opens a pull request with optional labels.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses flags, drives a run)
//! - [`engine`] - Sequences mutate → write → commit → open PR
//! - [`yaml`] - Generic YAML tree and deep-path replacement
//! - [`core`] - Domain types and configuration
//! - [`forge`] - Abstraction over the remote forge (GitHub, mock)
//! - [`ui`] - Output and run reporting
//!
//! # Invariants
//!
//! 1. The parsed input tree is never mutated; replacement works on a copy
//! 2. Missing intermediate keys are created, scalar ones are rejected
//! 3. A new commit always has the branch tip it was built on as its parent
//! 4. An already-open pull request is not an error

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod ui;
pub mod yaml;
