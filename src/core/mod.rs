//! core
//!
//! Core domain types and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RepositoryCoordinates, ChangedFile, CommitRef
//! - [`config`] - Run inputs and their sources
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Inputs are validated once, when options are loaded

pub mod config;
pub mod types;
