//! core::types
//!
//! Strong types for the values that flow through a run.
//!
//! # Types
//!
//! - [`RepositoryCoordinates`] - Validated `owner/repo` pair
//! - [`ChangedFile`] - The single file being committed
//! - [`CommitRef`] - Head commit and tree of a branch
//!
//! # Validation
//!
//! Coordinates are validated at construction time, so a malformed
//! repository string is rejected before any remote call is made.
//!
//! # Examples
//!
//! ```
//! use yaml_update::core::types::RepositoryCoordinates;
//!
//! let coords = RepositoryCoordinates::parse("octocat/hello-world").unwrap();
//! assert_eq!(coords.owner, "octocat");
//! assert_eq!(coords.repo, "hello-world");
//!
//! assert!(RepositoryCoordinates::parse("invalid").is_err());
//! assert!(RepositoryCoordinates::parse("a/b/c").is_err());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// A repository string that is not of the form `owner/repo`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("repository must be in the form 'owner/repo', got '{0}'")]
pub struct FormatError(pub String);

/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryCoordinates {
    /// User or organization
    pub owner: String,
    /// Repository name
    pub repo: String,
}

impl RepositoryCoordinates {
    /// Parse an `owner/repo` string.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` unless the input contains exactly one `/`
    /// separating two non-empty parts.
    pub fn parse(repository: &str) -> Result<Self, FormatError> {
        let parts: Vec<&str> = repository.split('/').collect();
        match parts.as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(Self {
                owner: owner.to_string(),
                repo: repo.to_string(),
            }),
            _ => Err(FormatError(repository.to_string())),
        }
    }
}

impl FromStr for RepositoryCoordinates {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepositoryCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A file whose new content is committed to the remote.
///
/// `blob_sha` is empty until the commit builder has uploaded the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// Path inside the repository, used as the tree entry
    pub relative_path: String,
    /// Location on local disk
    pub absolute_path: PathBuf,
    /// Full new content
    pub content: String,
    /// Blob SHA, once created
    pub blob_sha: Option<String>,
}

impl ChangedFile {
    /// Create a changed file that has not been uploaded yet.
    pub fn new(
        relative_path: impl Into<String>,
        absolute_path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            absolute_path: absolute_path.into(),
            content: content.into(),
            blob_sha: None,
        }
    }
}

/// The current tip of a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    /// SHA of the head commit
    pub commit_sha: String,
    /// SHA of the tree that commit points to
    pub tree_sha: String,
}
