//! engine::runner
//!
//! Runs one update from configuration to pull request.
//!
//! # Lifecycle
//!
//! ```text
//! ReadConfig -> Mutate -> Write -> Commit -> OpenPr -> Done
//!      \__________\_________\_______\________\______-> Failure
//! ```
//!
//! Stages run strictly in order. A failure at `Write` only warns. An
//! already-open pull request at `OpenPr` ends the run as
//! [`RunOutcome::Skipped`]; any other error ends it as
//! [`RunOutcome::Failed`] after the message went to
//! [`Reporter::set_failed`]. Nothing is rolled back: a pushed commit stays
//! even if the pull request cannot be opened.
//!
//! # Example
//!
//! ```ignore
//! use yaml_update::core::config::ActionInputs;
//! use yaml_update::engine::{Context, Orchestrator};
//! use yaml_update::forge::github::GitHubForgeFactory;
//! use yaml_update::ui::output::ActionsReporter;
//!
//! let factory = GitHubForgeFactory;
//! let reporter = ActionsReporter::from_env();
//! let ctx = Context::default();
//!
//! let outcome = Orchestrator::new(&factory, &reporter, &ctx)
//!     .run(&ActionInputs::from_env())
//!     .await;
//! assert!(outcome.is_success());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::commit::{CommitBuilder, CommitError};
use super::publish::PullRequestPublisher;
use super::Context;
use crate::core::config::{ConfigError, ConfigProvider, Options};
use crate::core::types::{ChangedFile, FormatError, RepositoryCoordinates};
use crate::forge::{ForgeError, ForgeFactory, PullRequest};
use crate::ui::output::{group, Reporter};
use crate::yaml::{self, PropertyPath, YamlError};

/// Name of the output carrying the new commit SHA.
pub const COMMIT_OUTPUT: &str = "commit";

/// Log group around reading, editing and writing the file.
pub const UPDATE_GROUP: &str = "YamlUpdateAction";

/// Log group around the remote commit and pull request.
pub const REMOTE_GROUP: &str = "GitHub Actions";

/// Stages of a run, including the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadConfig,
    Mutate,
    Write,
    Commit,
    OpenPr,
    Done,
    Failure,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ReadConfig => "read-config",
            Stage::Mutate => "mutate",
            Stage::Write => "write",
            Stage::Commit => "commit",
            Stage::OpenPr => "open-pr",
            Stage::Done => "done",
            Stage::Failure => "failure",
        };
        write!(f, "{}", name)
    }
}

/// Underlying cause of a failed stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Yaml(#[from] YamlError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Forge(#[from] ForgeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A failure tagged with the stage it happened in.
///
/// Displays as the underlying message, unchanged.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct RunError {
    /// Stage that failed
    pub stage: Stage,
    /// What went wrong
    pub source: StageError,
}

fn at<E: Into<StageError>>(stage: Stage) -> impl FnOnce(E) -> RunError {
    move |e| RunError {
        stage,
        source: e.into(),
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Commit pushed and pull request opened
    Published {
        commit: String,
        pull_request: PullRequest,
    },
    /// Commit pushed; a pull request for the branch was already open
    Skipped { commit: String },
    /// The run stopped at `stage`
    Failed { stage: Stage, message: String },
}

impl RunOutcome {
    /// Whether the run counts as successful.
    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Failed { .. })
    }

    /// Terminal state: `Done` for published or skipped runs, `Failure`
    /// otherwise. The failing stage itself is on [`RunOutcome::Failed`].
    pub fn terminal(&self) -> Stage {
        match self {
            RunOutcome::Failed { .. } => Stage::Failure,
            RunOutcome::Published { .. } | RunOutcome::Skipped { .. } => Stage::Done,
        }
    }

    /// The pushed commit, if the run got that far.
    pub fn commit(&self) -> Option<&str> {
        match self {
            RunOutcome::Published { commit, .. } | RunOutcome::Skipped { commit } => Some(commit),
            RunOutcome::Failed { .. } => None,
        }
    }
}

/// Sequences one update run.
pub struct Orchestrator<'a> {
    factory: &'a dyn ForgeFactory,
    reporter: &'a dyn Reporter,
    ctx: &'a Context,
}

impl<'a> Orchestrator<'a> {
    pub fn new(factory: &'a dyn ForgeFactory, reporter: &'a dyn Reporter, ctx: &'a Context) -> Self {
        Self {
            factory,
            reporter,
            ctx,
        }
    }

    /// Run all stages with configuration from `provider`.
    ///
    /// Never returns an error: failures are reported through
    /// [`Reporter::set_failed`] and surface as [`RunOutcome::Failed`].
    pub async fn run(&self, provider: &dyn ConfigProvider) -> RunOutcome {
        match self.try_run(provider).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let message = err.to_string();
                self.reporter.set_failed(&message);
                RunOutcome::Failed {
                    stage: err.stage,
                    message,
                }
            }
        }
    }

    async fn try_run(&self, provider: &dyn ConfigProvider) -> Result<RunOutcome, RunError> {
        let options = Options::load(provider).map_err(at(Stage::ReadConfig))?;
        let cwd = self.working_directory().map_err(at(Stage::ReadConfig))?;

        let mut file = {
            let _group = group(self.reporter, UPDATE_GROUP);
            let file = self.update_file(&cwd, &options)?;
            if let Err(e) = self.write_file(&file) {
                self.reporter.warning(&format!(
                    "could not write {}: {}",
                    file.absolute_path.display(),
                    e
                ));
            }
            file
        };

        let _group = group(self.reporter, REMOTE_GROUP);
        let forge = self
            .factory
            .connect(&options.api_url, &options.token)
            .map_err(at(Stage::Commit))?;

        let commit = CommitBuilder::new(forge.as_ref(), self.reporter)
            .commit_file(&options.repository, &options.branch, &mut file, &options.message)
            .await
            .map_err(at(Stage::Commit))?;
        self.reporter.set_output(COMMIT_OUTPUT, &commit);

        let coords = RepositoryCoordinates::parse(&options.repository).map_err(at(Stage::OpenPr))?;
        let publisher = PullRequestPublisher::new(forge.as_ref(), self.reporter);
        let pull_request = match publisher
            .open(
                &coords,
                &options.branch,
                &options.target_branch,
                &options.title,
                &options.description,
            )
            .await
        {
            Ok(pr) => pr,
            Err(e) if e.is_pull_request_exists() => {
                self.reporter.info("Pull request already exists. Skipping.");
                return Ok(RunOutcome::Skipped { commit });
            }
            Err(e) => return Err(at(Stage::OpenPr)(e)),
        };

        publisher
            .add_labels(&coords, pull_request.number, &options.labels)
            .await;

        Ok(RunOutcome::Published {
            commit,
            pull_request,
        })
    }

    fn working_directory(&self) -> std::io::Result<PathBuf> {
        match &self.ctx.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => std::env::current_dir(),
        }
    }

    /// Read the value file, set the property and render the new text.
    fn update_file(&self, cwd: &Path, options: &Options) -> Result<ChangedFile, RunError> {
        let file_path = cwd.join(&options.work_dir).join(&options.value_file);
        self.reporter.info(&format!(
            "FilePath: {}, Parameter: {}",
            file_path.display(),
            serde_json::json!({
                "cwd": cwd.display().to_string(),
                "workDir": options.work_dir.display().to_string(),
                "valueFile": options.value_file,
            })
        ));

        let tree = yaml::load(&file_path).map_err(at(Stage::Mutate))?;
        self.reporter.debug(&format!(
            "Parsed JSON: {}",
            serde_json::to_string(tree.as_mapping()).unwrap_or_else(|e| e.to_string())
        ));

        let path = PropertyPath::new(&options.property_path).map_err(at(Stage::Mutate))?;
        let updated = yaml::replace(&options.value, &path, &tree).map_err(at(Stage::Mutate))?;
        let content = yaml::serialize(&updated).map_err(at(Stage::Mutate))?;
        self.reporter
            .info(&format!("Generated updated YAML\n\n{}\n", content));

        Ok(ChangedFile::new(
            options.value_file.clone(),
            file_path,
            content,
        ))
    }

    /// Write the new content back to disk.
    fn write_file(&self, file: &ChangedFile) -> Result<(), RunError> {
        std::fs::write(&file.absolute_path, &file.content).map_err(at(Stage::Write))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EnvConfig;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};
    use crate::ui::output::{RecordingReporter, ReportEvent};
    use std::fs;

    const VALUES: &str = "image:\n  repository: nginx\n  tag: '1.0'\n";

    fn vars(extra: &[(&'static str, &'static str)]) -> EnvConfig {
        let mut vars = vec![
            ("VALUE_FILE", "values.yaml"),
            ("VALUE_PATH", "image.tag"),
            ("VALUE", "2.0"),
            ("TOKEN", "ghp_test"),
            ("REPOSITORY", "octocat/hello-world"),
            ("BRANCH", "bump"),
            ("TARGET_BRANCH", "main"),
            ("MESSAGE", "Bump image"),
        ];
        for (k, v) in extra {
            vars.retain(|(key, _)| key != k);
            vars.push((*k, *v));
        }
        EnvConfig::from_vars(vars)
    }

    fn setup() -> (tempfile::TempDir, MockForge) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("values.yaml"), VALUES).unwrap();

        let forge = MockForge::new();
        forge.seed_branch("main", &[("values.yaml", VALUES)]);
        forge.seed_branch("bump", &[("values.yaml", VALUES)]);
        (dir, forge)
    }

    fn context(dir: &tempfile::TempDir) -> Context {
        Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Context::default()
        }
    }

    #[test]
    fn run_error_displays_message_verbatim() {
        let err = RunError {
            stage: Stage::Mutate,
            source: YamlError::InvalidPath {
                segment: "image".into(),
            }
            .into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid property path - image is not an object"
        );
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::ReadConfig.to_string(), "read-config");
        assert_eq!(Stage::OpenPr.to_string(), "open-pr");
        assert_eq!(Stage::Done.to_string(), "done");
    }

    #[test]
    fn outcome_terminal_state() {
        let skipped = RunOutcome::Skipped {
            commit: "abc".into(),
        };
        let failed = RunOutcome::Failed {
            stage: Stage::Commit,
            message: "boom".into(),
        };
        assert_eq!(skipped.terminal(), Stage::Done);
        assert_eq!(failed.terminal(), Stage::Failure);
    }

    mod success {
        use super::*;

        #[tokio::test]
        async fn publishes_commit_and_pull_request() {
            let (dir, forge) = setup();
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            let outcome = Orchestrator::new(&forge, &reporter, &ctx)
                .run(&vars(&[("LABELS", "deps"), ("AUTOMERGE", "true")]))
                .await;

            let (commit, pull_request) = match outcome.clone() {
                RunOutcome::Published {
                    commit,
                    pull_request,
                } => (commit, pull_request),
                other => panic!("expected published outcome, got {:?}", other),
            };

            assert_eq!(forge.branch_head("bump"), Some(commit.clone()));
            assert_eq!(
                forge.file_at("bump", "values.yaml").unwrap(),
                "image:\n  repository: nginx\n  tag: '2.0'\n"
            );
            assert_eq!(outcome.terminal(), Stage::Done);
            assert_eq!(pull_request.title, "Merge: Bump image");
            assert_eq!(forge.labels(pull_request.number), vec!["auto-merge", "deps"]);

            assert_eq!(reporter.output("commit"), Some(commit));
            assert!(reporter.output("pull_request").is_some());
            assert_eq!(reporter.failure(), None);
            assert_eq!(forge.tokens(), vec!["ghp_test".to_string()]);
        }

        #[tokio::test]
        async fn writes_file_locally() {
            let (dir, forge) = setup();
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            Orchestrator::new(&forge, &reporter, &ctx).run(&vars(&[])).await;

            let written = fs::read_to_string(dir.path().join("values.yaml")).unwrap();
            assert!(written.contains("tag: '2.0'"));
        }

        #[tokio::test]
        async fn work_dir_is_joined_but_tree_path_is_value_file() {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("charts/app")).unwrap();
            fs::write(dir.path().join("charts/app/values.yaml"), VALUES).unwrap();
            let forge = MockForge::new();
            forge.seed_branch("main", &[]);
            forge.seed_branch("bump", &[]);
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            let outcome = Orchestrator::new(&forge, &reporter, &ctx)
                .run(&vars(&[("WORK_DIR", "charts/app")]))
                .await;

            assert!(outcome.is_success());
            assert!(forge.file_at("bump", "values.yaml").is_some());
        }

        #[tokio::test]
        async fn groups_are_balanced() {
            let (dir, forge) = setup();
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            Orchestrator::new(&forge, &reporter, &ctx).run(&vars(&[])).await;

            let groups: Vec<_> = reporter
                .events()
                .into_iter()
                .filter(|e| matches!(e, ReportEvent::StartGroup(_) | ReportEvent::EndGroup))
                .collect();
            assert_eq!(
                groups,
                vec![
                    ReportEvent::StartGroup(UPDATE_GROUP.into()),
                    ReportEvent::EndGroup,
                    ReportEvent::StartGroup(REMOTE_GROUP.into()),
                    ReportEvent::EndGroup,
                ]
            );
        }

        #[tokio::test]
        async fn no_labels_call_without_labels() {
            let (dir, forge) = setup();
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            Orchestrator::new(&forge, &reporter, &ctx).run(&vars(&[])).await;

            assert!(!forge
                .operations()
                .iter()
                .any(|op| matches!(op, MockOperation::AddLabels { .. })));
        }
    }

    mod already_exists {
        use super::*;

        #[tokio::test]
        async fn second_run_is_skipped() {
            let (dir, forge) = setup();
            let ctx = context(&dir);

            let first = RecordingReporter::new();
            Orchestrator::new(&forge, &first, &ctx)
                .run(&vars(&[("VALUE", "2.0")]))
                .await;

            let second = RecordingReporter::new();
            let outcome = Orchestrator::new(&forge, &second, &ctx)
                .run(&vars(&[("VALUE", "3.0")]))
                .await;

            assert!(matches!(outcome, RunOutcome::Skipped { .. }));
            assert!(outcome.is_success());
            assert_eq!(outcome.terminal(), Stage::Done);
            assert_eq!(second.failure(), None);
            assert!(second
                .events()
                .contains(&ReportEvent::Info("Pull request already exists. Skipping.".into())));

            // The commit was still pushed.
            assert_eq!(forge.branch_head("bump").as_deref(), outcome.commit());
            assert_eq!(forge.all_prs().len(), 1);
        }
    }

    mod failure {
        use super::*;

        #[tokio::test]
        async fn missing_input_fails_at_read_config() {
            let (dir, forge) = setup();
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);
            let provider = EnvConfig::from_vars([("VALUE_FILE", "values.yaml")]);

            let outcome = Orchestrator::new(&forge, &reporter, &ctx).run(&provider).await;

            assert!(matches!(
                outcome,
                RunOutcome::Failed {
                    stage: Stage::ReadConfig,
                    ..
                }
            ));
            assert_eq!(outcome.terminal(), Stage::Failure);
            assert_eq!(
                reporter.failure(),
                Some("input required and not supplied: VALUE_PATH".into())
            );
            assert!(forge.operations().is_empty());
        }

        #[tokio::test]
        async fn missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let forge = MockForge::new();
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            let outcome = Orchestrator::new(&forge, &reporter, &ctx).run(&vars(&[])).await;

            assert!(!outcome.is_success());
            let expected = format!(
                "could not parse file with path: {}",
                dir.path().join(".").join("values.yaml").display()
            );
            assert_eq!(reporter.failure(), Some(expected));
        }

        #[tokio::test]
        async fn scalar_intermediate_fails_at_mutate() {
            let (dir, forge) = setup();
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            let outcome = Orchestrator::new(&forge, &reporter, &ctx)
                .run(&vars(&[("VALUE_PATH", "image.tag.major")]))
                .await;

            assert!(matches!(
                outcome,
                RunOutcome::Failed {
                    stage: Stage::Mutate,
                    ..
                }
            ));
            assert_eq!(
                reporter.failure(),
                Some("invalid property path - tag is not an object".into())
            );
            assert!(forge.operations().is_empty());
            // The group is closed before the failure is reported.
            let events = reporter.events();
            assert_eq!(events[events.len() - 2], ReportEvent::EndGroup);
        }

        #[tokio::test]
        async fn malformed_repository_fails_at_commit() {
            let (dir, forge) = setup();
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            let outcome = Orchestrator::new(&forge, &reporter, &ctx)
                .run(&vars(&[("REPOSITORY", "a/b/c")]))
                .await;

            assert!(matches!(
                outcome,
                RunOutcome::Failed {
                    stage: Stage::Commit,
                    ..
                }
            ));
            assert_eq!(
                reporter.failure(),
                Some("repository must be in the form 'owner/repo', got 'a/b/c'".into())
            );
        }

        #[tokio::test]
        async fn pr_failure_keeps_pushed_commit() {
            let (dir, forge) = setup();
            let forge = forge.fail_on(FailOn::CreatePr(ForgeError::ApiError {
                status: 422,
                message: "Validation Failed: No commits between main and bump".into(),
            }));
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            let outcome = Orchestrator::new(&forge, &reporter, &ctx).run(&vars(&[])).await;

            assert!(matches!(
                outcome,
                RunOutcome::Failed {
                    stage: Stage::OpenPr,
                    ..
                }
            ));
            let commit = reporter.output("commit").unwrap();
            assert_eq!(forge.branch_head("bump"), Some(commit));
            assert_eq!(
                reporter.failure(),
                Some("API error: 422 - Validation Failed: No commits between main and bump".into())
            );
        }

        #[test]
        fn write_failure_is_tagged_with_write_stage() {
            let (dir, forge) = setup();
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            // The target is a directory, so it cannot be written as a file.
            let file = ChangedFile::new("values.yaml", dir.path(), "a: 1\n");
            let err = Orchestrator::new(&forge, &reporter, &ctx)
                .write_file(&file)
                .unwrap_err();

            assert_eq!(err.stage, Stage::Write);
            assert!(matches!(err.source, StageError::Io(_)));
        }

        #[tokio::test]
        async fn label_failure_is_not_fatal() {
            let (dir, forge) = setup();
            let forge = forge.fail_on(FailOn::AddLabels(ForgeError::RateLimited));
            let reporter = RecordingReporter::new();
            let ctx = context(&dir);

            let outcome = Orchestrator::new(&forge, &reporter, &ctx)
                .run(&vars(&[("LABELS", "deps")]))
                .await;

            assert!(matches!(outcome, RunOutcome::Published { .. }));
            assert_eq!(reporter.warnings().len(), 1);
        }
    }
}
