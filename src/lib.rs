//! anvil - a build-matrix orchestrator for D projects
//!
//! This crate provides the core library functionality for anvil: installer
//! download with mirror failover, compiler activation, matrix execution with
//! test-before-build gating, and artifact recording.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod toolchain;
pub mod util;

/// Test doubles for anvil unit tests.
///
/// Scripted implementations of the HTTP transport, the backoff sleeper and
/// the build tool.
#[cfg(test)]
pub mod test_support;

pub use core::{AnvilError, ArtifactRecord, CellIdentity, CompilerSpec, MatrixAxes};
pub use util::context::GlobalContext;
