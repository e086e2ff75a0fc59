//! User-friendly diagnostic messages.
//!
//! Every fatal error is reported with the failing step, the cell it happened
//! in, and a suggested next step.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no config file is found.
    pub const NO_CONFIG: &str = "Create an `anvil.toml` next to the project or pass `--config`";

    /// Suggestion when the installer cannot be downloaded.
    pub const FETCH_FAILED: &str =
        "Check your network connection or add a mirror to `installer.endpoints`";

    /// Suggestion when a compiler cannot be activated.
    pub const ACTIVATION_FAILED: &str =
        "Check that the compiler name and `--pin` version exist for the installer";

    /// Suggestion when a gating phase fails.
    pub const BUILD_FAILED: &str = "Run again with `--verbose` to trace every command";

    /// Suggestion for unknown subcommands.
    pub const UNKNOWN_COMMAND: &str = "Run `anvil --help` to list commands";

    /// Suggestion for configuration errors.
    pub const CONFIG: &str = "Fix the offending key in `anvil.toml`";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  -> {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            if self.suggestions.len() == 1 {
                output.push_str(&format!("{}: {}\n", help_prefix, self.suggestions[0]));
            } else {
                output.push_str(&format!("{}: consider:\n", help_prefix));
                for (i, suggestion) in self.suggestions.iter().enumerate() {
                    output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
                }
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("tests failed for `kameloso-ldc-dev`")
            .with_context("exit code 1")
            .with_suggestion("Run again with `--verbose`")
            .with_suggestion("Check the compiler version");

        let output = diag.format(false);
        assert!(output.contains("error: tests failed"));
        assert!(output.contains("-> exit code 1"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("2. Check the compiler version"));
    }

    #[test]
    fn test_single_suggestion_inline() {
        let output = Diagnostic::warning("no config")
            .with_location("anvil.toml")
            .with_suggestion(suggestions::NO_CONFIG)
            .format(false);
        assert!(output.starts_with("warning: no config"));
        assert!(output.contains("--> anvil.toml"));
        assert!(output.contains("help: Create an `anvil.toml`"));
    }
}
