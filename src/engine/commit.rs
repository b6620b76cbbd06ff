//! engine::commit
//!
//! Turns one edited file into a new commit on a remote branch.
//!
//! # Sequence
//!
//! ```text
//! ref -> commit -> (base tree) ; blob -> tree -> commit -> ref
//! ```
//!
//! 1. Resolve `owner/repo`
//! 2. Read the branch head commit and its tree
//! 3. Store the file content as a blob
//! 4. Create a tree overriding the file's path in the base tree
//! 5. Create a commit with the branch head as its only parent
//! 6. Force-move the branch to the new commit
//!
//! Every step awaits the previous one. Remote errors are returned as-is;
//! nothing already created is cleaned up.

use thiserror::Error;

use crate::core::types::{ChangedFile, CommitRef, FormatError, RepositoryCoordinates};
use crate::forge::{CreateCommitRequest, CreateTreeRequest, Forge, ForgeError, TreeEntry};
use crate::ui::output::Reporter;

/// Errors from building a commit.
#[derive(Debug, Clone, Error)]
pub enum CommitError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Forge(#[from] ForgeError),
}

/// Builds commits through a forge's object store.
pub struct CommitBuilder<'a> {
    forge: &'a dyn Forge,
    reporter: &'a dyn Reporter,
}

impl<'a> CommitBuilder<'a> {
    pub fn new(forge: &'a dyn Forge, reporter: &'a dyn Reporter) -> Self {
        Self { forge, reporter }
    }

    /// Fetch the head commit of `branch` and the tree it records.
    pub async fn current_commit(
        &self,
        coords: &RepositoryCoordinates,
        branch: &str,
    ) -> Result<CommitRef, ForgeError> {
        let commit_sha = self.forge.get_branch_head(coords, branch).await?;
        let tree_sha = self.forge.get_commit_tree(coords, &commit_sha).await?;
        Ok(CommitRef {
            commit_sha,
            tree_sha,
        })
    }

    /// Commit `file` on top of `branch` and move the branch to it.
    ///
    /// Records the blob SHA on `file` and returns the new commit SHA.
    ///
    /// # Errors
    ///
    /// - `Format` if `repository` is not `owner/repo`
    /// - `Forge` for any remote failure, unchanged
    pub async fn commit_file(
        &self,
        repository: &str,
        branch: &str,
        file: &mut ChangedFile,
        message: &str,
    ) -> Result<String, CommitError> {
        let coords = RepositoryCoordinates::parse(repository)?;

        let base = self.current_commit(&coords, branch).await?;
        self.reporter.debug(&format!(
            "base commit {} with tree {} on {}",
            base.commit_sha, base.tree_sha, branch
        ));

        let blob_sha = self.forge.create_blob(&coords, &file.content).await?;
        self.reporter
            .debug(&format!("created blob {} for {}", blob_sha, file.relative_path));
        file.blob_sha = Some(blob_sha.clone());

        let tree_sha = self
            .forge
            .create_tree(
                &coords,
                CreateTreeRequest {
                    base_tree: base.tree_sha,
                    entries: vec![TreeEntry::file(file.relative_path.clone(), blob_sha)],
                },
            )
            .await?;
        self.reporter.debug(&format!("created tree {}", tree_sha));

        let commit_sha = self
            .forge
            .create_commit(
                &coords,
                CreateCommitRequest {
                    message: message.to_string(),
                    tree: tree_sha,
                    parents: vec![base.commit_sha],
                },
            )
            .await?;
        self.reporter.debug(&format!("created commit {}", commit_sha));

        self.forge
            .update_ref(&coords, branch, &commit_sha, true)
            .await?;

        Ok(commit_sha)
    }
}
