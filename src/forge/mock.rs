//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge keeps an in-memory Git object store (blobs, trees,
//! commits, branch refs) plus pull requests and labels. Object IDs are
//! content hashes, so identical content always yields the same SHA, the
//! same way a real object store behaves.
//!
//! Failure scenarios can be configured per operation, and every call is
//! recorded for verification.
//!
//! # Example
//!
//! ```
//! use yaml_update::core::types::RepositoryCoordinates;
//! use yaml_update::forge::mock::MockForge;
//! use yaml_update::forge::Forge;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let forge = MockForge::new();
//! let head = forge.seed_branch("main", &[("values.yaml", "image:\n  tag: '1.0'\n")]);
//!
//! let coords = RepositoryCoordinates::parse("mock/repo").unwrap();
//! let sha = forge.get_branch_head(&coords, "main").await.unwrap();
//! assert_eq!(sha, head.commit_sha);
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::traits::{
    CreateCommitRequest, CreatePrRequest, CreateTreeRequest, Forge, ForgeError, ForgeFactory,
    PullRequest, TreeEntry, PR_EXISTS_PHRASE,
};
use crate::core::types::{CommitRef, RepositoryCoordinates};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state,
/// which lets a test keep a handle while the code under test owns another.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    /// Blob content by SHA.
    blobs: HashMap<String, String>,
    /// Tree entries (path -> entry) by SHA.
    trees: HashMap<String, BTreeMap<String, TreeEntry>>,
    /// Commit objects by SHA.
    commits: HashMap<String, MockCommit>,
    /// Branch name -> commit SHA.
    refs: HashMap<String, String>,
    /// Created PRs, in creation order.
    prs: Vec<PullRequest>,
    /// Labels applied per PR number.
    labels: HashMap<u64, Vec<String>>,
    /// Tokens passed to `connect`.
    tokens: Vec<String>,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// A stored commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    /// Commit message
    pub message: String,
    /// Tree SHA
    pub tree: String,
    /// Parent commit SHAs
    pub parents: Vec<String>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail get_branch_head with the given error.
    GetBranchHead(ForgeError),
    /// Fail get_commit_tree with the given error.
    GetCommitTree(ForgeError),
    /// Fail create_blob with the given error.
    CreateBlob(ForgeError),
    /// Fail create_tree with the given error.
    CreateTree(ForgeError),
    /// Fail create_commit with the given error.
    CreateCommit(ForgeError),
    /// Fail update_ref with the given error.
    UpdateRef(ForgeError),
    /// Fail create_pr with the given error.
    CreatePr(ForgeError),
    /// Fail add_labels with the given error.
    AddLabels(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetBranchHead {
        repo: String,
        branch: String,
    },
    GetCommitTree {
        sha: String,
    },
    CreateBlob {
        content: String,
    },
    CreateTree {
        base_tree: String,
        paths: Vec<String>,
    },
    CreateCommit {
        message: String,
        tree: String,
        parents: Vec<String>,
    },
    UpdateRef {
        branch: String,
        sha: String,
        force: bool,
    },
    CreatePr {
        head: String,
        base: String,
        title: String,
    },
    AddLabels {
        number: u64,
        labels: Vec<String>,
    },
}

/// Content hash used as an object ID (40 hex chars, like a Git SHA-1).
fn object_id(kind: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(payload.as_bytes());
    hex::encode(&hasher.finalize()[..20])
}

/// Serialize tree entries deterministically for hashing.
fn tree_payload(entries: &BTreeMap<String, TreeEntry>) -> String {
    entries
        .values()
        .map(|e| format!("{} blob {}\t{}\n", e.mode, e.sha, e.path))
        .collect()
}

fn unprocessable(message: impl Into<String>) -> ForgeError {
    ForgeError::ApiError {
        status: 422,
        message: message.into(),
    }
}

impl MockForgeInner {
    fn store_blob(&mut self, content: &str) -> String {
        let sha = object_id("blob", content);
        self.blobs.insert(sha.clone(), content.to_string());
        sha
    }

    fn store_tree(&mut self, entries: BTreeMap<String, TreeEntry>) -> String {
        let sha = object_id("tree", &tree_payload(&entries));
        self.trees.insert(sha.clone(), entries);
        sha
    }

    fn store_commit(&mut self, commit: MockCommit) -> String {
        let payload = format!(
            "tree {}\nparents {}\n\n{}",
            commit.tree,
            commit.parents.join(" "),
            commit.message
        );
        let sha = object_id("commit", &payload);
        self.commits.insert(sha.clone(), commit);
        sha
    }

    /// Whether `ancestor` is reachable from `sha` through parent links.
    fn is_ancestor(&self, ancestor: &str, sha: &str) -> bool {
        let mut pending = vec![sha.to_string()];
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if let Some(commit) = self.commits.get(&current) {
                pending.extend(commit.parents.iter().cloned());
            }
        }
        false
    }
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner::default())),
        }
    }

    /// Create a root commit holding `files` and point `branch` at it.
    ///
    /// Returns the commit and tree SHAs of the new branch head.
    pub fn seed_branch(&self, branch: &str, files: &[(&str, &str)]) -> CommitRef {
        let mut inner = self.inner.lock().unwrap();

        let mut entries = BTreeMap::new();
        for (path, content) in files {
            let sha = inner.store_blob(content);
            entries.insert(path.to_string(), TreeEntry::file(*path, sha));
        }
        let tree_sha = inner.store_tree(entries);
        let commit_sha = inner.store_commit(MockCommit {
            message: format!("Initial commit on {}", branch),
            tree: tree_sha.clone(),
            parents: Vec::new(),
        });
        inner.refs.insert(branch.to_string(), commit_sha.clone());

        CommitRef {
            commit_sha,
            tree_sha,
        }
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use yaml_update::forge::mock::{MockForge, FailOn};
    /// use yaml_update::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreateBlob(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Commit SHA a branch points to.
    pub fn branch_head(&self, branch: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.refs.get(branch).cloned()
    }

    /// A stored commit.
    pub fn commit(&self, sha: &str) -> Option<MockCommit> {
        let inner = self.inner.lock().unwrap();
        inner.commits.get(sha).cloned()
    }

    /// Entries of a stored tree as `path -> blob SHA`.
    pub fn tree(&self, sha: &str) -> Option<BTreeMap<String, String>> {
        let inner = self.inner.lock().unwrap();
        inner.trees.get(sha).map(|entries| {
            entries
                .iter()
                .map(|(path, entry)| (path.clone(), entry.sha.clone()))
                .collect()
        })
    }

    /// Content of a stored blob.
    pub fn blob(&self, sha: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.blobs.get(sha).cloned()
    }

    /// Content of `path` at the head of `branch`.
    pub fn file_at(&self, branch: &str, path: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        let commit = inner.commits.get(inner.refs.get(branch)?)?;
        let entry = inner.trees.get(&commit.tree)?.get(path)?;
        inner.blobs.get(&entry.sha).cloned()
    }

    /// All created PRs, in creation order.
    pub fn all_prs(&self) -> Vec<PullRequest> {
        let inner = self.inner.lock().unwrap();
        inner.prs.clone()
    }

    /// Labels applied to a PR.
    pub fn labels(&self, number: u64) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.labels.get(&number).cloned().unwrap_or_default()
    }

    /// Tokens this mock was connected with, in order.
    pub fn tokens(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.tokens.clone()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        let inner = self.inner.lock().unwrap();
        let err = match &inner.fail_on {
            Some(FailOn::GetBranchHead(e)) if expected == "get_branch_head" => e,
            Some(FailOn::GetCommitTree(e)) if expected == "get_commit_tree" => e,
            Some(FailOn::CreateBlob(e)) if expected == "create_blob" => e,
            Some(FailOn::CreateTree(e)) if expected == "create_tree" => e,
            Some(FailOn::CreateCommit(e)) if expected == "create_commit" => e,
            Some(FailOn::UpdateRef(e)) if expected == "update_ref" => e,
            Some(FailOn::CreatePr(e)) if expected == "create_pr" => e,
            Some(FailOn::AddLabels(e)) if expected == "add_labels" => e,
            _ => return Ok(()),
        };
        Err(err.clone())
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_branch_head(
        &self,
        repo: &RepositoryCoordinates,
        branch: &str,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::GetBranchHead {
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
        self.check_fail("get_branch_head")?;

        self.branch_head(branch)
            .ok_or_else(|| ForgeError::NotFound("Not Found".into()))
    }

    async fn get_commit_tree(
        &self,
        _repo: &RepositoryCoordinates,
        commit_sha: &str,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::GetCommitTree {
            sha: commit_sha.to_string(),
        });
        self.check_fail("get_commit_tree")?;

        self.commit(commit_sha)
            .map(|c| c.tree)
            .ok_or_else(|| ForgeError::NotFound("Not Found".into()))
    }

    async fn create_blob(
        &self,
        _repo: &RepositoryCoordinates,
        content: &str,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateBlob {
            content: content.to_string(),
        });
        self.check_fail("create_blob")?;

        let mut inner = self.inner.lock().unwrap();
        Ok(inner.store_blob(content))
    }

    async fn create_tree(
        &self,
        _repo: &RepositoryCoordinates,
        request: CreateTreeRequest,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateTree {
            base_tree: request.base_tree.clone(),
            paths: request.entries.iter().map(|e| e.path.clone()).collect(),
        });
        self.check_fail("create_tree")?;

        let mut inner = self.inner.lock().unwrap();
        let mut entries = inner
            .trees
            .get(&request.base_tree)
            .cloned()
            .ok_or_else(|| unprocessable("Invalid tree info: base_tree not found"))?;

        for entry in request.entries {
            if !inner.blobs.contains_key(&entry.sha) {
                return Err(unprocessable(format!("Invalid tree info: {} not found", entry.sha)));
            }
            entries.insert(entry.path.clone(), entry);
        }

        Ok(inner.store_tree(entries))
    }

    async fn create_commit(
        &self,
        _repo: &RepositoryCoordinates,
        request: CreateCommitRequest,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateCommit {
            message: request.message.clone(),
            tree: request.tree.clone(),
            parents: request.parents.clone(),
        });
        self.check_fail("create_commit")?;

        let mut inner = self.inner.lock().unwrap();
        if !inner.trees.contains_key(&request.tree) {
            return Err(unprocessable("Tree SHA does not exist"));
        }
        if let Some(missing) = request.parents.iter().find(|p| !inner.commits.contains_key(*p)) {
            return Err(unprocessable(format!("Parent SHA does not exist: {}", missing)));
        }

        Ok(inner.store_commit(MockCommit {
            message: request.message,
            tree: request.tree,
            parents: request.parents,
        }))
    }

    async fn update_ref(
        &self,
        _repo: &RepositoryCoordinates,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::UpdateRef {
            branch: branch.to_string(),
            sha: sha.to_string(),
            force,
        });
        self.check_fail("update_ref")?;

        let mut inner = self.inner.lock().unwrap();
        if !inner.commits.contains_key(sha) {
            return Err(unprocessable("Object does not exist"));
        }
        let current = inner
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| unprocessable("Reference does not exist"))?;
        if !force && !inner.is_ancestor(&current, sha) {
            return Err(unprocessable("Update is not a fast forward"));
        }

        inner.refs.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn create_pr(
        &self,
        repo: &RepositoryCoordinates,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePr {
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
        });
        self.check_fail("create_pr")?;

        let mut inner = self.inner.lock().unwrap();
        if !inner.refs.contains_key(&request.head) {
            return Err(unprocessable("Validation Failed: head invalid"));
        }
        if inner
            .prs
            .iter()
            .any(|pr| pr.head == request.head && pr.base == request.base)
        {
            return Err(unprocessable(format!(
                "Validation Failed: {} for {}:{}.",
                PR_EXISTS_PHRASE, repo.owner, request.head
            )));
        }

        let number = inner.prs.len() as u64 + 1;
        let url = format!("https://github.com/{}/pull/{}", repo, number);
        let raw = serde_json::json!({
            "number": number,
            "html_url": url,
            "title": request.title,
            "body": request.body,
            "head": { "ref": request.head },
            "base": { "ref": request.base },
        });

        let pr = PullRequest {
            number,
            url,
            head: request.head,
            base: request.base,
            title: request.title,
            raw,
        };
        inner.prs.push(pr.clone());
        Ok(pr)
    }

    async fn add_labels(
        &self,
        _repo: &RepositoryCoordinates,
        number: u64,
        labels: &[String],
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::AddLabels {
            number,
            labels: labels.to_vec(),
        });
        self.check_fail("add_labels")?;

        let mut inner = self.inner.lock().unwrap();
        if !inner.prs.iter().any(|pr| pr.number == number) {
            return Err(ForgeError::NotFound(format!("Issue #{}", number)));
        }

        let applied = inner.labels.entry(number).or_default();
        for label in labels {
            if !applied.contains(label) {
                applied.push(label.clone());
            }
        }
        Ok(())
    }
}

impl ForgeFactory for MockForge {
    fn connect(&self, _api_base: &str, token: &str) -> Result<Box<dyn Forge>, ForgeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.tokens.push(token.to_string());
        drop(inner);
        Ok(Box::new(self.clone()))
    }
}
