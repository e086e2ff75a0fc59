//! Core data structures for anvil.
//!
//! This module contains the foundational types used throughout anvil:
//! - Compiler specifications
//! - Matrix axes, cells and their enumeration order
//! - Artifact identities and records
//! - The error taxonomy

pub mod artifact;
pub mod compiler;
pub mod error;
pub mod matrix;

pub use artifact::{ArtifactRecord, CellIdentity, Outcome, RecordedOutcome};
pub use compiler::CompilerSpec;
pub use error::AnvilError;
pub use matrix::{BuildMode, CellFilter, CellGroup, MatrixAxes, MatrixCell};
