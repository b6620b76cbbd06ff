//! Integration tests for the GitHub client.
//!
//! These tests run the real `GitHubForge` against a local wiremock server
//! standing in for the GitHub REST API.

use std::fs;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yaml_update::core::config::EnvConfig;
use yaml_update::core::types::RepositoryCoordinates;
use yaml_update::engine::{Context, Orchestrator, RunOutcome, Stage};
use yaml_update::forge::github::{GitHubForge, GitHubForgeFactory};
use yaml_update::forge::{
    CreateCommitRequest, CreatePrRequest, CreateTreeRequest, Forge, ForgeError, TreeEntry,
};
use yaml_update::ui::output::RecordingReporter;

const REPO: &str = "/repos/octocat/hello-world";

fn coords() -> RepositoryCoordinates {
    RepositoryCoordinates::parse("octocat/hello-world").unwrap()
}

fn forge(server: &MockServer) -> GitHubForge {
    GitHubForge::with_api_base("test-token", server.uri())
}

fn pr_json(number: u64) -> serde_json::Value {
    json!({
        "number": number,
        "html_url": format!("https://github.com/octocat/hello-world/pull/{}", number),
        "title": "Merge: Bump image",
        "state": "open",
        "head": { "ref": "bump", "sha": "c2" },
        "base": { "ref": "main", "sha": "c0" },
    })
}

// =============================================================================
// Endpoint Tests
// =============================================================================

mod endpoints {
    use super::*;

    #[tokio::test]
    async fn get_branch_head_sends_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/git/ref/heads/bump", REPO)))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("x-github-api-version", "2022-11-28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/bump",
                "object": { "sha": "c1", "type": "commit" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sha = forge(&server)
            .get_branch_head(&coords(), "bump")
            .await
            .unwrap();
        assert_eq!(sha, "c1");
    }

    #[tokio::test]
    async fn get_commit_tree() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/git/commits/c1", REPO)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "c1",
                "tree": { "sha": "t1" },
                "parents": [],
            })))
            .mount(&server)
            .await;

        let tree = forge(&server)
            .get_commit_tree(&coords(), "c1")
            .await
            .unwrap();
        assert_eq!(tree, "t1");
    }

    #[tokio::test]
    async fn create_blob_uses_utf8_encoding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/git/blobs", REPO)))
            .and(body_json(json!({ "content": "a: 1\n", "encoding": "utf-8" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "b1" })))
            .expect(1)
            .mount(&server)
            .await;

        let sha = forge(&server).create_blob(&coords(), "a: 1\n").await.unwrap();
        assert_eq!(sha, "b1");
    }

    #[tokio::test]
    async fn create_tree_sends_base_tree_and_blob_entry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/git/trees", REPO)))
            .and(body_json(json!({
                "base_tree": "t1",
                "tree": [{ "path": "values.yaml", "mode": "100644", "type": "blob", "sha": "b1" }],
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "t2" })))
            .expect(1)
            .mount(&server)
            .await;

        let sha = forge(&server)
            .create_tree(
                &coords(),
                CreateTreeRequest {
                    base_tree: "t1".into(),
                    entries: vec![TreeEntry::file("values.yaml", "b1")],
                },
            )
            .await
            .unwrap();
        assert_eq!(sha, "t2");
    }

    #[tokio::test]
    async fn create_commit_with_parent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/git/commits", REPO)))
            .and(body_json(json!({ "message": "Bump", "tree": "t2", "parents": ["c1"] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "c2" })))
            .expect(1)
            .mount(&server)
            .await;

        let sha = forge(&server)
            .create_commit(
                &coords(),
                CreateCommitRequest {
                    message: "Bump".into(),
                    tree: "t2".into(),
                    parents: vec!["c1".into()],
                },
            )
            .await
            .unwrap();
        assert_eq!(sha, "c2");
    }

    #[tokio::test]
    async fn update_ref_forces() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/git/refs/heads/bump", REPO)))
            .and(body_json(json!({ "sha": "c2", "force": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/bump",
                "object": { "sha": "c2" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        forge(&server)
            .update_ref(&coords(), "bump", "c2", true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_pr_keeps_raw_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/pulls", REPO)))
            .and(body_json(json!({
                "head": "bump",
                "base": "main",
                "title": "Merge: Bump image",
                "body": "",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(pr_json(7)))
            .expect(1)
            .mount(&server)
            .await;

        let pr = forge(&server)
            .create_pr(
                &coords(),
                CreatePrRequest {
                    head: "bump".into(),
                    base: "main".into(),
                    title: "Merge: Bump image".into(),
                    body: String::new(),
                },
            )
            .await
            .unwrap();

        assert_eq!(pr.number, 7);
        assert_eq!(pr.url, "https://github.com/octocat/hello-world/pull/7");
        assert_eq!(pr.head, "bump");
        assert_eq!(pr.base, "main");
        assert_eq!(pr.raw["state"], "open");
    }

    #[tokio::test]
    async fn add_labels() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/issues/7/labels", REPO)))
            .and(body_json(json!({ "labels": ["auto-merge", "deps"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "auto-merge" },
                { "name": "deps" },
            ])))
            .expect(1)
            .mount(&server)
            .await;

        forge(&server)
            .add_labels(&coords(), 7, &["auto-merge".into(), "deps".into()])
            .await
            .unwrap();
    }
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

mod errors {
    use super::*;

    async fn branch_head_error(response: ResponseTemplate) -> ForgeError {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/git/ref/heads/bump", REPO)))
            .respond_with(response)
            .mount(&server)
            .await;

        forge(&server)
            .get_branch_head(&coords(), "bump")
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn not_found() {
        let err = branch_head_error(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
        )
        .await;
        assert!(matches!(err, ForgeError::NotFound(ref m) if m == "Not Found"));
    }

    #[tokio::test]
    async fn unauthorized() {
        let err = branch_head_error(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .await;
        assert!(matches!(err, ForgeError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn rate_limited_403() {
        let err = branch_head_error(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Remaining", "0")
                .set_body_json(json!({ "message": "API rate limit exceeded" })),
        )
        .await;
        assert!(matches!(err, ForgeError::RateLimited));
    }

    #[tokio::test]
    async fn forbidden() {
        let err = branch_head_error(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "message": "Resource not accessible by integration" })),
        )
        .await;
        assert_eq!(
            err.to_string(),
            "authentication failed: Permission denied: Resource not accessible by integration"
        );
    }

    #[tokio::test]
    async fn server_error() {
        let err = branch_head_error(
            ResponseTemplate::new(502).set_body_json(json!({ "message": "Bad Gateway" })),
        )
        .await;
        assert!(matches!(err, ForgeError::ApiError { status: 502, .. }));
    }

    #[tokio::test]
    async fn existing_pull_request_detail_is_visible() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/pulls", REPO)))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "errors": [{
                    "resource": "PullRequest",
                    "code": "custom",
                    "message": "A pull request already exists for octocat:bump.",
                }],
            })))
            .mount(&server)
            .await;

        let err = forge(&server)
            .create_pr(
                &coords(),
                CreatePrRequest {
                    head: "bump".into(),
                    base: "main".into(),
                    title: "t".into(),
                    body: String::new(),
                },
            )
            .await
            .unwrap_err();

        assert!(err.is_pull_request_exists());
        assert_eq!(
            err.to_string(),
            "API error: 422 - Validation Failed: A pull request already exists for octocat:bump."
        );
    }
}

// =============================================================================
// Full Run Tests
// =============================================================================

mod full_run {
    use super::*;

    const VALUES: &str = "image:\n  repository: nginx\n  tag: '1.0'\n";
    const UPDATED: &str = "image:\n  repository: nginx\n  tag: '2.0'\n";

    async fn mount_commit_sequence(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(format!("{}/git/ref/heads/bump", REPO)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": "c1" },
            })))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/git/commits/c1", REPO)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "tree": { "sha": "t1" } })),
            )
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{}/git/blobs", REPO)))
            .and(body_json(json!({ "content": UPDATED, "encoding": "utf-8" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "b2" })))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{}/git/trees", REPO)))
            .and(body_json(json!({
                "base_tree": "t1",
                "tree": [{ "path": "values.yaml", "mode": "100644", "type": "blob", "sha": "b2" }],
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "t2" })))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{}/git/commits", REPO)))
            .and(body_json(json!({ "message": "Bump image", "tree": "t2", "parents": ["c1"] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "c2" })))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/git/refs/heads/bump", REPO)))
            .and(body_json(json!({ "sha": "c2", "force": true })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "object": { "sha": "c2" } })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn provider(server: &MockServer, extra: &[(&str, &str)]) -> EnvConfig {
        let mut vars: Vec<(String, String)> = [
            ("VALUE_FILE", "values.yaml"),
            ("VALUE_PATH", "image.tag"),
            ("VALUE", "2.0"),
            ("TOKEN", "test-token"),
            ("REPOSITORY", "octocat/hello-world"),
            ("BRANCH", "bump"),
            ("TARGET_BRANCH", "main"),
            ("MESSAGE", "Bump image"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        vars.push(("GITHUB_API_URL".into(), server.uri()));
        vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        EnvConfig::from_vars(vars)
    }

    #[tokio::test]
    async fn publishes_against_github_api() {
        let server = MockServer::start().await;
        mount_commit_sequence(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/pulls", REPO)))
            .respond_with(ResponseTemplate::new(201).set_body_json(pr_json(3)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{}/issues/3/labels", REPO)))
            .and(body_json(json!({ "labels": ["auto-merge"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("values.yaml"), VALUES).unwrap();
        let reporter = RecordingReporter::new();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Context::default()
        };

        let outcome = Orchestrator::new(&GitHubForgeFactory, &reporter, &ctx)
            .run(&provider(&server, &[("AUTOMERGE", "true")]))
            .await;

        assert!(matches!(outcome, RunOutcome::Published { ref commit, .. } if commit == "c2"));
        assert_eq!(reporter.output("commit"), Some("c2".into()));
        let pr: serde_json::Value =
            serde_json::from_str(&reporter.output("pull_request").unwrap()).unwrap();
        assert_eq!(pr, pr_json(3));
        assert_eq!(
            fs::read_to_string(dir.path().join("values.yaml")).unwrap(),
            UPDATED
        );
    }

    #[tokio::test]
    async fn existing_pull_request_is_skipped() {
        let server = MockServer::start().await;
        mount_commit_sequence(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/pulls", REPO)))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "errors": [{ "message": "A pull request already exists for octocat:bump." }],
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("values.yaml"), VALUES).unwrap();
        let reporter = RecordingReporter::new();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Context::default()
        };

        let outcome = Orchestrator::new(&GitHubForgeFactory, &reporter, &ctx)
            .run(&provider(&server, &[("LABELS", "deps")]))
            .await;

        assert!(matches!(outcome, RunOutcome::Skipped { ref commit } if commit == "c2"));
        assert_eq!(reporter.failure(), None);
    }

    #[tokio::test]
    async fn missing_branch_fails_at_commit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/git/ref/heads/bump", REPO)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("values.yaml"), VALUES).unwrap();
        let reporter = RecordingReporter::new();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Context::default()
        };

        let outcome = Orchestrator::new(&GitHubForgeFactory, &reporter, &ctx)
            .run(&provider(&server, &[]))
            .await;

        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                stage: Stage::Commit,
                ..
            }
        ));
        assert_eq!(reporter.failure(), Some("not found: Not Found".into()));
    }
}
