//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! This module implements the `Forge` trait for GitHub. It uses:
//! - the Git Data API (`git/ref`, `git/commits`, `git/blobs`, `git/trees`,
//!   `git/refs`) to build commits without a working copy
//! - the Pulls API to open pull requests
//! - the Issues API to label them
//!
//! # Authentication
//!
//! A single static token (personal access token, `GITHUB_TOKEN`, or an App
//! installation token) is sent as a bearer token on every request.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation:
//! - Returns `ForgeError::RateLimited` when limits are hit
//! - Does not implement automatic retry (caller's responsibility)
//!
//! # Example
//!
//! ```ignore
//! use yaml_update::forge::github::GitHubForge;
//! use yaml_update::forge::Forge;
//! use yaml_update::core::types::RepositoryCoordinates;
//!
//! let forge = GitHubForge::new("ghp_xxx");
//! let coords = RepositoryCoordinates::parse("octocat/hello-world")?;
//! let head = forge.get_branch_head(&coords, "main").await?;
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{
    CreateCommitRequest, CreatePrRequest, CreateTreeRequest, Forge, ForgeError, ForgeFactory,
    PullRequest,
};
use crate::core::types::RepositoryCoordinates;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "yaml-update";

/// GitHub forge implementation.
///
/// Implements the `Forge` trait for GitHub using the REST API. The API base
/// is configurable for GitHub Enterprise Server and for tests.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token
    token: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &!self.token.is_empty())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Create a GitHub forge against `api.github.com`.
    ///
    /// # Example
    ///
    /// ```
    /// use yaml_update::forge::github::GitHubForge;
    ///
    /// let forge = GitHubForge::new("ghp_xxx");
    /// assert_eq!(forge.api_base(), "https://api.github.com");
    /// ```
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a GitHub forge with a custom API base URL.
    ///
    /// # Arguments
    ///
    /// * `token` - Personal access token or GitHub App token
    /// * `api_base` - Custom API base URL (e.g., `https://github.example.com/api/v3`)
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repo: &RepositoryCoordinates, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, repo.owner, repo.repo, path
        )
    }

    /// Attach headers, send, and decode the response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ForgeError> {
        let response = request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        // Primary rate limits come back as 403 with no remaining quota.
        let rate_limited = response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            .map(|remaining| remaining == "0")
            .unwrap_or(false);

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.describe(),
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limited => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_branch_head(
        &self,
        repo: &RepositoryCoordinates,
        branch: &str,
    ) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, &format!("git/ref/heads/{}", branch));
        let reference: GitHubRef = self.send(self.client.get(&url)).await?;
        Ok(reference.object.sha)
    }

    async fn get_commit_tree(
        &self,
        repo: &RepositoryCoordinates,
        commit_sha: &str,
    ) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, &format!("git/commits/{}", commit_sha));
        let commit: GitHubCommit = self.send(self.client.get(&url)).await?;
        Ok(commit.tree.sha)
    }

    async fn create_blob(
        &self,
        repo: &RepositoryCoordinates,
        content: &str,
    ) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, "git/blobs");
        let body = CreateBlobBody {
            content,
            encoding: "utf-8",
        };

        let blob: GitHubObject = self.send(self.client.post(&url).json(&body)).await?;
        Ok(blob.sha)
    }

    async fn create_tree(
        &self,
        repo: &RepositoryCoordinates,
        request: CreateTreeRequest,
    ) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, "git/trees");
        let body = CreateTreeBody {
            base_tree: &request.base_tree,
            tree: request
                .entries
                .iter()
                .map(|entry| TreeEntryBody {
                    path: &entry.path,
                    mode: &entry.mode,
                    kind: "blob",
                    sha: &entry.sha,
                })
                .collect(),
        };

        let tree: GitHubObject = self.send(self.client.post(&url).json(&body)).await?;
        Ok(tree.sha)
    }

    async fn create_commit(
        &self,
        repo: &RepositoryCoordinates,
        request: CreateCommitRequest,
    ) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, "git/commits");
        let body = CreateCommitBody {
            message: &request.message,
            tree: &request.tree,
            parents: &request.parents,
        };

        let commit: GitHubObject = self.send(self.client.post(&url).json(&body)).await?;
        Ok(commit.sha)
    }

    async fn update_ref(
        &self,
        repo: &RepositoryCoordinates,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &format!("git/refs/heads/{}", branch));
        let body = UpdateRefBody { sha, force };

        let _: GitHubRef = self.send(self.client.patch(&url).json(&body)).await?;
        Ok(())
    }

    async fn create_pr(
        &self,
        repo: &RepositoryCoordinates,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(repo, "pulls");
        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: &request.body,
        };

        let raw: serde_json::Value = self.send(self.client.post(&url).json(&body)).await?;
        pull_request_from_raw(raw)
    }

    async fn add_labels(
        &self,
        repo: &RepositoryCoordinates,
        number: u64,
        labels: &[String],
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &format!("issues/{}/labels", number));
        let body = AddLabelsBody { labels };

        let _: serde_json::Value = self.send(self.client.post(&url).json(&body)).await?;
        Ok(())
    }
}

/// Connects [`GitHubForge`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubForgeFactory;

impl ForgeFactory for GitHubForgeFactory {
    fn connect(&self, api_base: &str, token: &str) -> Result<Box<dyn Forge>, ForgeError> {
        if token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }
        Ok(Box::new(GitHubForge::with_api_base(token, api_base)))
    }
}

/// Split a pull request response into typed fields, keeping the raw object.
fn pull_request_from_raw(raw: serde_json::Value) -> Result<PullRequest, ForgeError> {
    let pr: GitHubPullRequest =
        serde_json::from_value(raw.clone()).map_err(|e| ForgeError::ApiError {
            status: StatusCode::CREATED.as_u16(),
            message: format!("Failed to parse response: {}", e),
        })?;

    Ok(PullRequest {
        number: pr.number,
        url: pr.html_url,
        head: pr.head.ref_name,
        base: pr.base.ref_name,
        title: pr.title,
        raw,
    })
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a blob.
#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: Vec<TreeEntryBody<'a>>,
}

/// One entry of a tree creation request.
#[derive(Serialize)]
struct TreeEntryBody<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    sha: &'a str,
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: &'a [String],
}

/// Request body for moving a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Request body for labelling an issue or PR.
#[derive(Serialize)]
struct AddLabelsBody<'a> {
    labels: &'a [String],
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
    /// Validation details (422 responses)
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl GitHubErrorResponse {
    /// Top-level message followed by any validation detail messages.
    ///
    /// Details are either objects with a `message` (or only a `code`) or
    /// plain strings.
    fn describe(&self) -> String {
        let details: Vec<String> = self
            .errors
            .iter()
            .filter_map(|detail| match detail {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Object(fields) => fields
                    .get("message")
                    .or_else(|| fields.get("code"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                _ => None,
            })
            .collect();

        if details.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.message, details.join("; "))
        }
    }
}

/// Object with only a SHA (blob, tree and commit creation responses).
#[derive(Deserialize)]
struct GitHubObject {
    sha: String,
}

/// Git reference response format.
#[derive(Deserialize)]
struct GitHubRef {
    object: GitHubObject,
}

/// Git commit response format.
#[derive(Deserialize)]
struct GitHubCommit {
    tree: GitHubObject,
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    head: GitHubBranchRef,
    base: GitHubBranchRef,
    title: String,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GitHubBranchRef {
    #[serde(rename = "ref")]
    ref_name: String,
}
