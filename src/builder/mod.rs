//! Build tool interface.
//!
//! The matrix runner never talks to a build tool directly; it goes through
//! [`BuildTool`], which knows how to clean, test and build the project for
//! one compiler, architecture, configuration and build mode.

use std::path::PathBuf;
use std::process::ExitStatus;

use anyhow::Result;

use crate::core::matrix::{CellGroup, MatrixCell};
use crate::toolchain::ActivatedCompiler;

pub mod dub;

pub use dub::Dub;

/// How a build-tool invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    Passed,
    Failed { code: Option<i32> },
}

impl PhaseStatus {
    pub fn passed(&self) -> bool {
        matches!(self, PhaseStatus::Passed)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            PhaseStatus::Passed => Some(0),
            PhaseStatus::Failed { code } => *code,
        }
    }
}

impl From<ExitStatus> for PhaseStatus {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            PhaseStatus::Passed
        } else {
            PhaseStatus::Failed {
                code: status.code(),
            }
        }
    }
}

/// A project build tool.
///
/// `Err` means the tool could not be run at all; the runner treats that the
/// same as a failed phase.
pub trait BuildTool {
    /// Tool name for messages.
    fn name(&self) -> &str;

    /// Remove prior build state.
    fn clean(&self, group: &CellGroup, compiler: &ActivatedCompiler) -> Result<PhaseStatus>;

    /// Run the project's test suite.
    fn test(&self, group: &CellGroup, compiler: &ActivatedCompiler) -> Result<PhaseStatus>;

    /// Build one cell.
    fn build(&self, cell: &MatrixCell, compiler: &ActivatedCompiler) -> Result<PhaseStatus>;

    /// Where a successful build leaves its binary.
    fn output_binary(&self) -> PathBuf;
}
