//! Auxiliary sources.
//!
//! Repositories the project expects next to it (e.g. unpublished
//! dependencies), cloned by `install-deps`.

pub mod git;

pub use git::GitSource;
