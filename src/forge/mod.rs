//! forge
//!
//! Abstraction over the remote Git forge.
//!
//! # Architecture
//!
//! The `Forge` trait covers the two things a run needs from the remote:
//! the Git object store (refs, commits, trees, blobs) and pull requests.
//! The engine only sees `dyn Forge`, obtained from a [`ForgeFactory`] once
//! the token is known.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: In-memory implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use yaml_update::forge::github::GitHubForgeFactory;
//! use yaml_update::forge::{CreatePrRequest, ForgeFactory};
//!
//! let forge = GitHubForgeFactory.connect("https://api.github.com", token)?;
//! let pr = forge.create_pr(&coords, CreatePrRequest {
//!     head: "bump-image".to_string(),
//!     base: "main".to_string(),
//!     title: "Merge: bump image".to_string(),
//!     body: String::new(),
//! }).await?;
//!
//! println!("Created PR #{}: {}", pr.number, pr.url);
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
