//! Command implementations

pub mod build;
pub mod install_deps;
pub mod plan;
