//! Error taxonomy for matrix runs.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Errors raised by the fetch/activate/run pipeline.
///
/// Everything except [`AnvilError::SoftBuildFailed`] is fatal: it aborts the
/// run and becomes the process exit status. Soft failures are caught by the
/// matrix runner and turned into `.failed` markers.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum AnvilError {
    #[error("failed to fetch installer after {attempts} attempt(s) across {} endpoint(s)", endpoints.len())]
    #[diagnostic(code(anvil::fetch::exhausted))]
    FetchExhausted {
        attempts: u32,
        endpoints: Vec<String>,
        /// Last error seen per endpoint, in endpoint order.
        last_errors: Vec<String>,
    },

    #[error("failed to activate `{compiler}`: {reason}")]
    #[diagnostic(code(anvil::toolchain::activation))]
    ActivationFailed { compiler: String, reason: String },

    #[error("tests failed for `{cell}`")]
    #[diagnostic(code(anvil::matrix::test_failed))]
    TestPhaseFailed { cell: String, code: Option<i32> },

    #[error("debug build failed for `{cell}`")]
    #[diagnostic(code(anvil::matrix::debug_failed))]
    DebugBuildFailed { cell: String, code: Option<i32> },

    #[error("build failed for `{cell}`")]
    #[diagnostic(code(anvil::matrix::soft_failed))]
    SoftBuildFailed { cell: String, code: Option<i32> },

    #[error("artifact `{name}` was already recorded in this run")]
    #[diagnostic(code(anvil::artifact::duplicate))]
    DuplicateArtifact { name: String },

    #[error("unknown command `{name}`")]
    #[diagnostic(
        code(anvil::cli::unknown_command),
        help("expected `install-deps`, `plan`, or `build-<toolchain>`")
    )]
    UnknownCommand { name: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(anvil::config::invalid))]
    InvalidConfig { message: String },
}

impl AnvilError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        AnvilError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AnvilError::SoftBuildFailed { .. })
    }

    /// Process exit code for this error.
    ///
    /// Phase failures propagate the failing command's own exit code when it
    /// had one.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnvilError::TestPhaseFailed { code, .. }
            | AnvilError::DebugBuildFailed { code, .. }
            | AnvilError::SoftBuildFailed { code, .. } => match code {
                Some(c) if *c != 0 => *c,
                _ => 1,
            },
            AnvilError::UnknownCommand { .. } => 2,
            _ => 1,
        }
    }

    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            AnvilError::FetchExhausted {
                endpoints,
                last_errors,
                ..
            } => {
                let mut diag = diag;
                for (endpoint, err) in endpoints.iter().zip(last_errors) {
                    diag = diag.with_context(format!("{}: {}", endpoint, err));
                }
                diag.with_suggestion(suggestions::FETCH_FAILED)
            }
            AnvilError::ActivationFailed { .. } => {
                diag.with_suggestion(suggestions::ACTIVATION_FAILED)
            }
            AnvilError::TestPhaseFailed { code, .. } | AnvilError::DebugBuildFailed { code, .. } => {
                let diag = match code {
                    Some(c) => diag.with_context(format!("exit code {}", c)),
                    None => diag.with_context("terminated without an exit code"),
                };
                diag.with_context("no further cells were run")
                    .with_suggestion(suggestions::BUILD_FAILED)
            }
            AnvilError::UnknownCommand { .. } => {
                diag.with_suggestion(suggestions::UNKNOWN_COMMAND)
            }
            AnvilError::InvalidConfig { .. } => diag.with_suggestion(suggestions::CONFIG),
            _ => diag,
        }
    }
}
