//! Compiler acquisition.
//!
//! Acquiring a compiler is two steps:
//! 1. [`fetch`] downloads the installer script with mirror failover and
//!    exponential backoff.
//! 2. [`activate`] runs it to install the requested compiler and captures
//!    the environment overlay that makes the compiler callable by name.

pub mod activate;
pub mod fetch;

pub use activate::{ActivatedCompiler, EnvOverlay, ToolchainActivator};
pub use fetch::{
    FetchOptions, HttpTransport, InstallerFetcher, RetryState, Sleeper, ThreadSleeper, Transport,
};
