//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Flags
//!
//! - `--inputs <action|env>`: Where run inputs are read from
//! - `--reporter <auto|console|actions>`: How progress is reported
//! - `--cwd <path>`: Run as if started in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Set a property in a YAML file, commit it through the GitHub API, and
/// open a pull request
#[derive(Parser, Debug)]
#[command(name = "yaml-update")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    # Inside a GitHub Actions step (inputs come from INPUT_* variables)
    yaml-update

    # From a shell, with plain environment variables
    VALUE_FILE=values.yaml VALUE_PATH=image.tag VALUE=2.0 \\
    TOKEN=$GITHUB_TOKEN REPOSITORY=octocat/hello-world \\
    BRANCH=bump-image TARGET_BRANCH=main MESSAGE='Bump image' \\
        yaml-update --inputs env")]
pub struct Cli {
    /// Where to read inputs from [default: action under GitHub Actions, else env]
    #[arg(long, value_enum)]
    pub inputs: Option<InputSource>,

    /// How to report progress
    #[arg(long, value_enum, default_value_t = ReporterKind::Auto)]
    pub reporter: ReporterKind,

    /// Run as if yaml-update was started in this directory
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Input source, falling back to detection from the environment.
    pub fn input_source(&self) -> InputSource {
        self.inputs.unwrap_or_else(InputSource::detect)
    }

    /// Reporter kind with `auto` resolved.
    pub fn reporter_kind(&self) -> ReporterKind {
        match self.reporter {
            ReporterKind::Auto if running_in_actions() => ReporterKind::Actions,
            ReporterKind::Auto => ReporterKind::Console,
            other => other,
        }
    }
}

/// Source of run inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputSource {
    /// GitHub Actions inputs (`INPUT_<NAME>`)
    Action,
    /// Plain environment variables (`VALUE_FILE`, `TOKEN`, ...)
    Env,
}

impl InputSource {
    /// `Action` when running under GitHub Actions, else `Env`.
    pub fn detect() -> Self {
        if running_in_actions() {
            InputSource::Action
        } else {
            InputSource::Env
        }
    }
}

/// Output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReporterKind {
    /// Actions when running under GitHub Actions, else console
    Auto,
    /// Plain terminal output
    Console,
    /// GitHub Actions workflow commands
    Actions,
}

fn running_in_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}
