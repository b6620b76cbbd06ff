//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line flags
//! - Pick the input source and reporter
//! - Drive one [`Orchestrator`] run on a tokio runtime
//!
//! The CLI layer is thin; everything observable happens in [`crate::engine`].

pub mod args;

pub use args::{Cli, InputSource, ReporterKind};

use std::process::ExitCode;

use anyhow::Result;

use crate::core::config::{ActionInputs, ConfigProvider, EnvConfig};
use crate::engine::{self, Orchestrator};
use crate::forge::github::GitHubForgeFactory;
use crate::ui::output::{ActionsReporter, ConsoleReporter, Reporter, Verbosity};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    let ctx = engine::Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };

    let provider: Box<dyn ConfigProvider> = match cli.input_source() {
        InputSource::Action => Box::new(ActionInputs::from_env()),
        InputSource::Env => Box::new(EnvConfig::from_env()),
    };

    let reporter: Box<dyn Reporter> = match cli.reporter_kind() {
        ReporterKind::Actions => Box::new(ActionsReporter::from_env()),
        ReporterKind::Console | ReporterKind::Auto => Box::new(ConsoleReporter::new(
            Verbosity::from_flags(ctx.quiet, ctx.debug),
        )),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(
        Orchestrator::new(&GitHubForgeFactory, reporter.as_ref(), &ctx).run(provider.as_ref()),
    );

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
