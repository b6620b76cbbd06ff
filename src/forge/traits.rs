//! forge::traits
//!
//! Forge trait definition for the remote object store and pull requests.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is a network call.
//! All methods return `Result` and errors pass through to the caller
//! untouched; there is no retry at this layer.
//!
//! The object-store methods mirror the Git Data API: refs point at commits,
//! commits point at trees, trees point at blobs. Each returns the SHA of
//! the object it read or created, so a caller can chain them.
//!
//! # Example
//!
//! ```ignore
//! use yaml_update::forge::{Forge, CreatePrRequest};
//!
//! async fn open(forge: &dyn Forge, coords: &RepositoryCoordinates) -> Result<(), ForgeError> {
//!     let pr = forge.create_pr(coords, CreatePrRequest {
//!         head: "bump-image".to_string(),
//!         base: "main".to_string(),
//!         title: "Merge: bump image".to_string(),
//!         body: String::new(),
//!     }).await?;
//!     println!("Created PR #{}: {}", pr.number, pr.url);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::RepositoryCoordinates;

/// Phrase GitHub uses when a pull request for the same head and base is
/// already open.
pub const PR_EXISTS_PHRASE: &str = "A pull request already exists";

/// Git file mode for a regular, non-executable file.
pub const FILE_MODE_REGULAR: &str = "100644";

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ForgeError {
    /// Check if this error reports an already-open pull request for the
    /// same head and base.
    ///
    /// Matched on the rendered message, since GitHub only signals this
    /// through validation error text.
    pub fn is_pull_request_exists(&self) -> bool {
        self.to_string().contains(PR_EXISTS_PHRASE)
    }
}

/// One entry overriding a path in a base tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the repository root
    pub path: String,
    /// Git file mode (e.g. `100644`)
    pub mode: String,
    /// Blob SHA the path should point to
    pub sha: String,
}

impl TreeEntry {
    /// Entry for a regular file.
    pub fn file(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE_REGULAR.to_string(),
            sha: sha.into(),
        }
    }
}

/// Request to create a tree on top of an existing one.
#[derive(Debug, Clone)]
pub struct CreateTreeRequest {
    /// Tree whose entries are inherited
    pub base_tree: String,
    /// Entries added or replaced
    pub entries: Vec<TreeEntry>,
}

/// Request to create a commit object.
#[derive(Debug, Clone)]
pub struct CreateCommitRequest {
    /// Commit message
    pub message: String,
    /// Tree SHA the commit records
    pub tree: String,
    /// Parent commit SHAs
    pub parents: Vec<String>,
}

/// Request to create a pull request.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    /// Head branch name (the branch with changes)
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: String,
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// PR title
    pub title: String,
    /// Full response object as returned by the forge
    pub raw: serde_json::Value,
}

/// The Forge trait for the remote Git object store and pull requests.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers decide what is
/// fatal; the only error given special meaning is the one for which
/// [`ForgeError::is_pull_request_exists`] holds.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Resolve a branch to the SHA of its head commit.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    async fn get_branch_head(
        &self,
        repo: &RepositoryCoordinates,
        branch: &str,
    ) -> Result<String, ForgeError>;

    /// Get the SHA of the tree a commit points to.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the commit does not exist
    async fn get_commit_tree(
        &self,
        repo: &RepositoryCoordinates,
        commit_sha: &str,
    ) -> Result<String, ForgeError>;

    /// Store file content as a blob and return its SHA.
    async fn create_blob(
        &self,
        repo: &RepositoryCoordinates,
        content: &str,
    ) -> Result<String, ForgeError>;

    /// Create a tree from a base tree plus overriding entries.
    ///
    /// # Errors
    ///
    /// - `ApiError` with status 422 if the base tree or a blob is unknown
    async fn create_tree(
        &self,
        repo: &RepositoryCoordinates,
        request: CreateTreeRequest,
    ) -> Result<String, ForgeError>;

    /// Create a commit object and return its SHA.
    async fn create_commit(
        &self,
        repo: &RepositoryCoordinates,
        request: CreateCommitRequest,
    ) -> Result<String, ForgeError>;

    /// Point a branch at a commit.
    ///
    /// With `force`, the update is applied even if it is not a
    /// fast-forward.
    async fn update_ref(
        &self,
        repo: &RepositoryCoordinates,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<(), ForgeError>;

    /// Create a new pull request.
    ///
    /// # Errors
    ///
    /// - `ApiError` with status 422 if validation fails, including when a
    ///   pull request for the same head and base is already open
    async fn create_pr(
        &self,
        repo: &RepositoryCoordinates,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError>;

    /// Add labels to a pull request.
    async fn add_labels(
        &self,
        repo: &RepositoryCoordinates,
        number: u64,
        labels: &[String],
    ) -> Result<(), ForgeError>;
}

/// Creates a connected [`Forge`] once the credential is known.
///
/// The orchestrator reads configuration before it can authenticate, so it
/// takes a factory rather than a ready client.
pub trait ForgeFactory: Send + Sync {
    /// Build a forge talking to `api_base`, authenticated with `token`.
    fn connect(&self, api_base: &str, token: &str) -> Result<Box<dyn Forge>, ForgeError>;
}
