//! High-level operations.
//!
//! This module contains the implementation of anvil commands and the matrix
//! engine they drive.

pub mod build;
pub mod install_deps;
pub mod matrix_run;
pub mod plan;
pub mod record;

pub use build::{build, BuildOptions, BuildSummary};
pub use install_deps::{install_deps, InstallReport};
pub use matrix_run::MatrixRunner;
pub use plan::{format_plan, format_plan_json, plan, FailurePolicy, PlanEntry};
pub use record::ArtifactRecorder;
