//! Centralized console output.
//!
//! The Shell owns every user-facing line anvil prints:
//! - Status messages with a 12-column right-aligned verb
//! - The command trace (`Running ...`) for each external step
//! - Timed spans that report how long a step took
//! - A spinner for network waits (via indicatif)
//!
//! Subprocess output is never captured by the Shell; build tools write to
//! the inherited stdout/stderr so failures are attributable in real time.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::util::process::ProcessBuilder;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors and failures only
    Quiet,
    /// Default: status messages, command trace, spinners
    #[default]
    Normal,
    /// --verbose: also environment overlays and skipped cells, no spinners
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Recorded,
    Finished,
    Activated,
    Cloned,

    // In-progress statuses (cyan)
    Fetching,
    Installing,
    Cleaning,
    Testing,
    Building,
    Running,

    // Info statuses (blue)
    Info,

    // Warning statuses (yellow)
    Skipped,
    Failed,
    Warning,

    // Error status (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Recorded => "Recorded",
            Status::Finished => "Finished",
            Status::Activated => "Activated",
            Status::Cloned => "Cloned",
            Status::Fetching => "Fetching",
            Status::Installing => "Installing",
            Status::Cleaning => "Cleaning",
            Status::Testing => "Testing",
            Status::Building => "Building",
            Status::Running => "Running",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Failed => "Failed",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Recorded | Status::Finished | Status::Activated | Status::Cloned => {
                "\x1b[1;32m"
            }
            Status::Fetching
            | Status::Installing
            | Status::Cleaning
            | Status::Testing
            | Status::Building
            | Status::Running => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Failed | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }

    /// Failures are shown even in quiet mode.
    fn always_shown(&self) -> bool {
        matches!(self, Status::Error | Status::Failed)
    }
}

const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };
        Shell {
            verbosity,
            use_color,
        }
    }

    /// Create a shell from CLI flags; quiet wins over verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Shell::new(verbosity, color)
    }

    /// A shell that prints only failures, for tests and embedding.
    pub fn quiet() -> Self {
        Shell::new(Verbosity::Quiet, ColorChoice::Never)
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message: `{status:>12} {message}`.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && !status.always_shown() {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    /// Print only in verbose mode.
    pub fn verbose(&self, status: Status, msg: impl Display) {
        if self.is_verbose() {
            self.status(status, msg);
        }
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Echo a command before it runs.
    pub fn command(&self, cmd: &ProcessBuilder) {
        self.status(Status::Running, format!("`{}`", cmd.display_command()));
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Start a timed span. The start line prints immediately; the finish
    /// line with the elapsed time prints on [`Span::finish`] or on drop.
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        let message = msg.to_string();
        self.status(status, &message);
        Span {
            shell: Arc::clone(self),
            message,
            start: Instant::now(),
            finished: false,
        }
    }

    /// A spinner for waits with no subprocess output. No-op unless the shell
    /// is in normal mode on a terminal.
    pub fn spinner(&self, msg: impl Display) -> Spinner {
        let pb = if self.verbosity == Verbosity::Normal && io::stderr().is_terminal() {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
            {
                pb.set_style(style);
            }
            pb.set_message(msg.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };
        Spinner { pb }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// A timed step.
pub struct Span {
    shell: Arc<Shell>,
    message: String,
    start: Instant,
    finished: bool,
}

impl Span {
    /// Finish the span, reporting `msg` with the elapsed time.
    pub fn finish_with_message(mut self, msg: impl Display) {
        self.finished = true;
        self.shell.status(
            Status::Finished,
            format!("{} in {}", msg, format_duration(self.start.elapsed())),
        );
    }

    /// Finish the span as a failure.
    pub fn fail(mut self, msg: impl Display) {
        self.finished = true;
        self.shell.status(
            Status::Failed,
            format!("{} after {}", msg, format_duration(self.start.elapsed())),
        );
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.finished {
            self.shell.status(
                Status::Finished,
                format!("{} in {}", self.message, format_duration(self.start.elapsed())),
            );
        }
    }
}

/// Spinner wrapper that respects shell mode.
pub struct Spinner {
    pb: Option<ProgressBar>,
}

impl Spinner {
    pub fn set_message(&self, msg: impl Display) {
        if let Some(pb) = &self.pb {
            pb.set_message(msg.to_string());
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Format a duration in a human-readable way.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
