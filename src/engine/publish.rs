//! engine::publish
//!
//! Opens the pull request for a pushed branch and labels it.

use crate::core::types::RepositoryCoordinates;
use crate::forge::{CreatePrRequest, Forge, ForgeError, PullRequest};
use crate::ui::output::Reporter;

/// Name of the output carrying the created pull request.
pub const PULL_REQUEST_OUTPUT: &str = "pull_request";

/// Opens pull requests and applies labels.
pub struct PullRequestPublisher<'a> {
    forge: &'a dyn Forge,
    reporter: &'a dyn Reporter,
}

impl<'a> PullRequestPublisher<'a> {
    pub fn new(forge: &'a dyn Forge, reporter: &'a dyn Reporter) -> Self {
        Self { forge, reporter }
    }

    /// Open a pull request from `head` into `base`.
    ///
    /// On success the full pull request object is published as the
    /// `pull_request` output.
    ///
    /// # Errors
    ///
    /// Forge errors are returned unchanged. Use
    /// [`ForgeError::is_pull_request_exists`] to tell an already-open
    /// pull request apart from real failures.
    pub async fn open(
        &self,
        coords: &RepositoryCoordinates,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest, ForgeError> {
        let pr = self
            .forge
            .create_pr(
                coords,
                CreatePrRequest {
                    head: head.to_string(),
                    base: base.to_string(),
                    title: title.to_string(),
                    body: body.to_string(),
                },
            )
            .await?;

        self.reporter
            .info(&format!("Created PR #{}: {}", pr.number, pr.url));
        self.reporter
            .set_output(PULL_REQUEST_OUTPUT, &pr.raw.to_string());

        Ok(pr)
    }

    /// Apply `labels` to pull request `number`.
    ///
    /// Best-effort: a failure becomes a warning and the pull request is
    /// left as it is. Returns whether the labels were applied.
    pub async fn add_labels(
        &self,
        coords: &RepositoryCoordinates,
        number: u64,
        labels: &[String],
    ) -> bool {
        if labels.is_empty() {
            return false;
        }

        match self.forge.add_labels(coords, number, labels).await {
            Ok(()) => {
                self.reporter
                    .debug(&format!("Add Label: {}", labels.join(", ")));
                true
            }
            Err(e) => {
                self.reporter.warning(&format!(
                    "failed to add labels to PR #{}: {}",
                    number, e
                ));
                false
            }
        }
    }
}
