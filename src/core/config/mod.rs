//! core::config
//!
//! Run configuration and where it comes from.
//!
//! # Overview
//!
//! A run is configured by a fixed set of named [`Input`]s. Where those
//! values live is hidden behind [`ConfigProvider`]:
//!
//! - [`ActionInputs`] reads GitHub Actions inputs (`INPUT_<NAME>` variables)
//! - [`EnvConfig`] reads plain environment variables (`VALUE_FILE`, ...)
//!
//! [`Options::load`] turns any provider into validated [`Options`], applying
//! defaults and reporting missing required inputs.
//!
//! # Example
//!
//! ```
//! use yaml_update::core::config::{EnvConfig, Options};
//!
//! let provider = EnvConfig::from_vars([
//!     ("VALUE_FILE", "values.yaml"),
//!     ("VALUE_PATH", "image.tag"),
//!     ("VALUE", "2.0"),
//!     ("TOKEN", "ghp_xxx"),
//!     ("REPOSITORY", "octocat/hello-world"),
//!     ("BRANCH", "bump-image"),
//!     ("TARGET_BRANCH", "main"),
//!     ("MESSAGE", "Bump image tag"),
//!     ("LABELS", "deps, helm"),
//!     ("AUTOMERGE", "true"),
//! ]);
//!
//! let options = Options::load(&provider).unwrap();
//! assert_eq!(options.title, "Merge: Bump image tag");
//! assert_eq!(options.labels, vec!["auto-merge", "deps", "helm"]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::forge::github::DEFAULT_API_BASE;
use crate::yaml::ScalarValue;

/// Label added when automerge is requested.
pub const AUTO_MERGE_LABEL: &str = "auto-merge";

/// Errors from configuration loading.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("input required and not supplied: {0}")]
    MissingInput(String),

    #[error("invalid value for {input}: {message}")]
    InvalidValue { input: String, message: String },
}

/// Every named input a run accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    WorkDir,
    ValueFile,
    PropertyPath,
    Value,
    ValueType,
    Token,
    Repository,
    Branch,
    TargetBranch,
    Message,
    Title,
    Description,
    Labels,
    Automerge,
    ApiUrl,
}

impl Input {
    /// Name of the input in an action definition.
    pub fn action_name(self) -> &'static str {
        match self {
            Input::WorkDir => "workDir",
            Input::ValueFile => "valueFile",
            Input::PropertyPath => "propertyPath",
            Input::Value => "value",
            Input::ValueType => "valueType",
            Input::Token => "token",
            Input::Repository => "repository",
            Input::Branch => "branch",
            Input::TargetBranch => "targetBranch",
            Input::Message => "message",
            Input::Title => "title",
            Input::Description => "description",
            Input::Labels => "labels",
            Input::Automerge => "automerge",
            Input::ApiUrl => "apiUrl",
        }
    }

    /// Name of the plain environment variable.
    pub fn env_name(self) -> &'static str {
        match self {
            Input::WorkDir => "WORK_DIR",
            Input::ValueFile => "VALUE_FILE",
            Input::PropertyPath => "VALUE_PATH",
            Input::Value => "VALUE",
            Input::ValueType => "VALUE_TYPE",
            Input::Token => "TOKEN",
            Input::Repository => "REPOSITORY",
            Input::Branch => "BRANCH",
            Input::TargetBranch => "TARGET_BRANCH",
            Input::Message => "MESSAGE",
            Input::Title => "TITLE",
            Input::Description => "DESCRIPTION",
            Input::Labels => "LABELS",
            Input::Automerge => "AUTOMERGE",
            Input::ApiUrl => "GITHUB_API_URL",
        }
    }
}

/// Source of raw input values.
///
/// Implementations return `None` for inputs that are unset or empty.
pub trait ConfigProvider {
    /// Raw value of an input.
    fn get(&self, input: Input) -> Option<String>;

    /// Name of the input as the user would spell it in this source.
    fn describe(&self, input: Input) -> String;
}

/// Reads GitHub Actions inputs.
///
/// The runner exposes input `foo bar` as `INPUT_FOO_BAR`; values are
/// trimmed and empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct ActionInputs {
    vars: HashMap<String, String>,
}

impl ActionInputs {
    /// Snapshot the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit variables.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Environment variable holding an action input.
    pub fn variable_name(input: Input) -> String {
        format!(
            "INPUT_{}",
            input.action_name().replace(' ', "_").to_uppercase()
        )
    }
}

impl ConfigProvider for ActionInputs {
    fn get(&self, input: Input) -> Option<String> {
        non_empty(self.vars.get(&Self::variable_name(input)))
    }

    fn describe(&self, input: Input) -> String {
        input.action_name().to_string()
    }
}

/// Reads plain environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    vars: HashMap<String, String>,
}

impl EnvConfig {
    /// Snapshot the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit variables.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl ConfigProvider for EnvConfig {
    fn get(&self, input: Input) -> Option<String> {
        non_empty(self.vars.get(input.env_name()))
    }

    fn describe(&self, input: Input) -> String {
        input.env_name().to_string()
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// How the raw `value` input is turned into a YAML scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    /// Always a string
    #[default]
    String,
    /// Integer or decimal number
    Number,
    /// `true` or `false`
    Boolean,
    /// Boolean, then number, then string
    Auto,
}

impl ValueType {
    /// Parse a value type name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(ValueType::String),
            "number" => Some(ValueType::Number),
            "boolean" | "bool" => Some(ValueType::Boolean),
            "auto" => Some(ValueType::Auto),
            _ => None,
        }
    }

    /// Interpret raw input text as a scalar of this type.
    pub fn interpret(self, raw: &str) -> Option<ScalarValue> {
        match self {
            ValueType::String => Some(ScalarValue::from(raw)),
            ValueType::Number => ScalarValue::parse_number(raw),
            ValueType::Boolean => ScalarValue::parse_bool(raw),
            ValueType::Auto => Some(ScalarValue::infer(raw)),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Number => write!(f, "number"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Auto => write!(f, "auto"),
        }
    }
}

/// Validated configuration for one run.
#[derive(Clone, PartialEq)]
pub struct Options {
    /// Directory containing the value file, relative to the working directory
    pub work_dir: PathBuf,
    /// YAML file to update, relative to `work_dir`
    pub value_file: String,
    /// Dotted path of the property to set
    pub property_path: String,
    /// New value of the property
    pub value: ScalarValue,
    /// Credential for the forge API
    pub token: String,
    /// `owner/repo`
    pub repository: String,
    /// Branch the commit is pushed to
    pub branch: String,
    /// Base branch of the pull request
    pub target_branch: String,
    /// Commit message
    pub message: String,
    /// Pull request title
    pub title: String,
    /// Pull request body
    pub description: String,
    /// Labels for the pull request
    pub labels: Vec<String>,
    /// Forge API base URL
    pub api_url: String,
}

// Custom Debug to avoid exposing the token
impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("work_dir", &self.work_dir)
            .field("value_file", &self.value_file)
            .field("property_path", &self.property_path)
            .field("value", &self.value)
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("target_branch", &self.target_branch)
            .field("message", &self.message)
            .field("title", &self.title)
            .field("labels", &self.labels)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl Options {
    /// Load and validate options from a provider.
    ///
    /// # Errors
    ///
    /// - `MissingInput` if a required input is unset
    /// - `InvalidValue` if `value` does not match `valueType`
    pub fn load(provider: &dyn ConfigProvider) -> Result<Self, ConfigError> {
        let required = |input: Input| {
            provider
                .get(input)
                .ok_or_else(|| ConfigError::MissingInput(provider.describe(input)))
        };

        let value_file = required(Input::ValueFile)?;
        let property_path = required(Input::PropertyPath)?;

        let value_type = match provider.get(Input::ValueType) {
            None => ValueType::default(),
            Some(name) => ValueType::parse(&name).ok_or_else(|| ConfigError::InvalidValue {
                input: provider.describe(Input::ValueType),
                message: format!("'{}' is not one of string, number, boolean, auto", name),
            })?,
        };

        let raw_value = provider.get(Input::Value).unwrap_or_default();
        let value = value_type
            .interpret(&raw_value)
            .ok_or_else(|| ConfigError::InvalidValue {
                input: provider.describe(Input::Value),
                message: format!("'{}' is not a valid {}", raw_value, value_type),
            })?;

        let token = required(Input::Token)?;
        let repository = required(Input::Repository)?;
        let branch = required(Input::Branch)?;
        let target_branch = required(Input::TargetBranch)?;
        let message = required(Input::Message)?;
        let title = provider
            .get(Input::Title)
            .unwrap_or_else(|| format!("Merge: {}", message));

        Ok(Self {
            work_dir: PathBuf::from(provider.get(Input::WorkDir).unwrap_or_else(|| ".".into())),
            value_file,
            property_path,
            value,
            token,
            repository,
            branch,
            target_branch,
            message,
            title,
            description: provider.get(Input::Description).unwrap_or_default(),
            labels: parse_labels(
                provider.get(Input::Labels).as_deref(),
                provider.get(Input::Automerge).as_deref() == Some("true"),
            ),
            api_url: provider
                .get(Input::ApiUrl)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }
}

/// Split a comma-separated label list.
///
/// Labels are trimmed and empty entries dropped. With `automerge`, the
/// `auto-merge` label comes first.
pub fn parse_labels(labels: Option<&str>, automerge: bool) -> Vec<String> {
    let mut result = Vec::new();
    if automerge {
        result.push(AUTO_MERGE_LABEL.to_string());
    }

    result.extend(
        labels
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string),
    );
    result
}
