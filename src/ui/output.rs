//! ui::output
//!
//! Output formatting and run reporting.
//!
//! # Design
//!
//! Everything a run wants to tell its environment goes through the
//! [`Reporter`] trait: log lines at three levels, collapsible groups,
//! named outputs, and the final failure message. Two implementations are
//! provided:
//!
//! - [`ConsoleReporter`] for terminals, honoring the quiet and debug flags
//! - [`ActionsReporter`] for GitHub Actions, speaking workflow commands and
//!   writing outputs to `$GITHUB_OUTPUT`
//!
//! [`RecordingReporter`] captures events in memory for tests.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Sink for everything a run reports to its environment.
pub trait Reporter: Send + Sync {
    /// Detail useful only when diagnosing a run.
    fn debug(&self, message: &str);

    /// Progress information.
    fn info(&self, message: &str);

    /// Something went wrong but the run continues.
    fn warning(&self, message: &str);

    /// Open a named group of log lines.
    fn start_group(&self, name: &str);

    /// Close the current group.
    fn end_group(&self);

    /// Publish a named output value.
    fn set_output(&self, name: &str, value: &str);

    /// Report the message that made the run fail.
    fn set_failed(&self, message: &str);
}

/// Open a group that is closed when the returned guard is dropped.
///
/// Closing on drop keeps groups balanced when a stage bails out early.
pub fn group<'a>(reporter: &'a dyn Reporter, name: &str) -> Group<'a> {
    reporter.start_group(name);
    Group { reporter }
}

/// Guard returned by [`group`].
#[must_use = "the group closes as soon as the guard is dropped"]
pub struct Group<'a> {
    reporter: &'a dyn Reporter,
}

impl Drop for Group<'_> {
    fn drop(&mut self) {
        self.reporter.end_group();
    }
}

/// Reporter for interactive terminals.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    verbosity: Verbosity,
}

impl ConsoleReporter {
    /// Create a console reporter.
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl Reporter for ConsoleReporter {
    fn debug(&self, message: &str) {
        debug(message, self.verbosity);
    }

    fn info(&self, message: &str) {
        print(message, self.verbosity);
    }

    fn warning(&self, message: &str) {
        warn(message, self.verbosity);
    }

    fn start_group(&self, name: &str) {
        print(format!("==> {}", name), self.verbosity);
    }

    fn end_group(&self) {}

    fn set_output(&self, name: &str, value: &str) {
        // Outputs are the result of the run, so quiet mode still shows them.
        println!("{}={}", name, value);
    }

    fn set_failed(&self, message: &str) {
        error(message);
    }
}

/// Reporter speaking GitHub Actions workflow commands.
#[derive(Debug, Clone)]
pub struct ActionsReporter {
    /// File named by `$GITHUB_OUTPUT`
    output_file: Option<PathBuf>,
}

impl ActionsReporter {
    /// Create a reporter writing outputs to `output_file`.
    pub fn new(output_file: Option<PathBuf>) -> Self {
        Self { output_file }
    }

    /// Create a reporter from the `GITHUB_OUTPUT` environment variable.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("GITHUB_OUTPUT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        )
    }

    fn append_output(&self, path: &Path, name: &str, value: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(format_output_entry(name, value).as_bytes())
    }
}

impl Reporter for ActionsReporter {
    fn debug(&self, message: &str) {
        println!("::debug::{}", escape_data(message));
    }

    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        println!("::warning::{}", escape_data(message));
    }

    fn start_group(&self, name: &str) {
        println!("::group::{}", escape_data(name));
    }

    fn end_group(&self) {
        println!("::endgroup::");
    }

    fn set_output(&self, name: &str, value: &str) {
        match &self.output_file {
            Some(path) => {
                if let Err(e) = self.append_output(path, name, value) {
                    self.warning(&format!(
                        "failed to write output '{}' to {}: {}",
                        name,
                        path.display(),
                        e
                    ));
                }
            }
            None => println!("{}={}", name, value),
        }
    }

    fn set_failed(&self, message: &str) {
        println!("::error::{}", escape_data(message));
    }
}

/// Escape a workflow command message.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Format one entry of a `$GITHUB_OUTPUT` file.
///
/// Single-line values use `name=value`; multi-line values use the
/// heredoc form with a delimiter that does not occur in the value.
pub fn format_output_entry(name: &str, value: &str) -> String {
    if !value.contains('\n') && !value.contains('\r') {
        return format!("{}={}\n", name, value);
    }

    let digest = hex::encode(Sha256::digest(format!("{}\0{}", name, value).as_bytes()));
    let mut delimiter = format!("ghadelimiter_{}", &digest[..16]);
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    format!("{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter)
}

/// One event captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Debug(String),
    Info(String),
    Warning(String),
    StartGroup(String),
    EndGroup,
    Output { name: String, value: String },
    Failed(String),
}

/// Reporter that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events, in order.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Value of the last output set under `name`.
    pub fn output(&self, name: &str) -> Option<String> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                ReportEvent::Output { name: n, value } if n == name => Some(value),
                _ => None,
            })
    }

    /// The failure message, if the run failed.
    pub fn failure(&self) -> Option<String> {
        self.events().into_iter().find_map(|event| match event {
            ReportEvent::Failed(message) => Some(message),
            _ => None,
        })
    }

    /// All warning messages.
    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Warning(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn debug(&self, message: &str) {
        self.push(ReportEvent::Debug(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.push(ReportEvent::Info(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.push(ReportEvent::Warning(message.to_string()));
    }

    fn start_group(&self, name: &str) {
        self.push(ReportEvent::StartGroup(name.to_string()));
    }

    fn end_group(&self) {
        self.push(ReportEvent::EndGroup);
    }

    fn set_output(&self, name: &str, value: &str) {
        self.push(ReportEvent::Output {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn set_failed(&self, message: &str) {
        self.push(ReportEvent::Failed(message.to_string()));
    }
}
