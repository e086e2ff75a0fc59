//! Test doubles for anvil unit tests.
//!
//! Provides scripted implementations of the seams the orchestrator talks
//! through: the HTTP [`Transport`], the backoff [`Sleeper`] and the
//! [`BuildTool`]. All of them are cheap to clone and share their state, so a
//! test can hand one clone to the code under test and inspect the other.
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = ScriptedTransport::new().respond_after("https://a/install.sh", 2, b"ok");
//! let sleeper = RecordingSleeper::default();
//! // ... run the fetcher ...
//! assert_eq!(sleeper.total(), Duration::from_secs(3));
//! ```

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};

use crate::builder::{BuildTool, PhaseStatus};
use crate::core::matrix::{BuildMode, CellGroup, MatrixCell};
use crate::toolchain::{ActivatedCompiler, Sleeper, Transport};

#[derive(Debug, Default)]
struct Route {
    /// Requests to fail before the body is served
    failures_left: usize,
    body: Vec<u8>,
}

/// Transport that serves canned bodies per URL.
///
/// URLs without a route always fail, as if the host were unreachable.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for every request to `url`.
    pub fn respond(self, url: &str, body: &[u8]) -> Self {
        self.respond_after(url, 0, body)
    }

    /// Fail the first `failures` requests to `url`, then serve `body`.
    pub fn respond_after(self, url: &str, failures: usize, body: &[u8]) -> Self {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route {
                failures_left: failures,
                body: body.to_vec(),
            },
        );
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            None => bail!("connection refused: {}", url),
            Some(route) if route.failures_left > 0 => {
                route.failures_left -= 1;
                bail!("connection timed out: {}", url)
            }
            Some(route) => Ok(route.body.clone()),
        }
    }
}

/// Sleeper that records requested durations instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

#[derive(Debug, Default)]
struct BuildScript {
    failing_tests: HashSet<(String, String)>,
    failing_builds: HashSet<(String, String, BuildMode)>,
    silent_builds: HashSet<(String, String, BuildMode)>,
    calls: Vec<String>,
}

/// Build tool whose phases pass unless scripted to fail.
///
/// Successful builds write the output binary into the project directory, the
/// way a real build would. Calls are logged as `clean <arch>/<config>`,
/// `test <arch>/<config>` and `build <arch>/<config>/<mode>`.
#[derive(Debug, Clone)]
pub struct ScriptedBuildTool {
    project_dir: PathBuf,
    binary: String,
    script: Arc<Mutex<BuildScript>>,
}

impl ScriptedBuildTool {
    pub fn new(project_dir: impl Into<PathBuf>, binary: impl Into<String>) -> Self {
        ScriptedBuildTool {
            project_dir: project_dir.into(),
            binary: binary.into(),
            script: Arc::default(),
        }
    }

    /// Make the test phase of (`arch`, `configuration`) exit 1.
    pub fn fail_test(self, arch: &str, configuration: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .failing_tests
            .insert((arch.to_string(), configuration.to_string()));
        self
    }

    /// Make one build cell exit 1.
    pub fn fail_build(self, arch: &str, configuration: &str, mode: BuildMode) -> Self {
        self.script.lock().unwrap().failing_builds.insert((
            arch.to_string(),
            configuration.to_string(),
            mode,
        ));
        self
    }

    /// Make one build cell exit 0 without producing a binary.
    pub fn build_without_output(self, arch: &str, configuration: &str, mode: BuildMode) -> Self {
        self.script.lock().unwrap().silent_builds.insert((
            arch.to_string(),
            configuration.to_string(),
            mode,
        ));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }
}

impl BuildTool for ScriptedBuildTool {
    fn name(&self) -> &str {
        "scripted"
    }

    fn clean(&self, group: &CellGroup, _compiler: &ActivatedCompiler) -> Result<PhaseStatus> {
        let mut script = self.script.lock().unwrap();
        script
            .calls
            .push(format!("clean {}/{}", group.architecture, group.configuration));
        Ok(PhaseStatus::Passed)
    }

    fn test(&self, group: &CellGroup, _compiler: &ActivatedCompiler) -> Result<PhaseStatus> {
        let mut script = self.script.lock().unwrap();
        script
            .calls
            .push(format!("test {}/{}", group.architecture, group.configuration));
        let key = (group.architecture.clone(), group.configuration.clone());
        if script.failing_tests.contains(&key) {
            return Ok(PhaseStatus::Failed { code: Some(1) });
        }
        Ok(PhaseStatus::Passed)
    }

    fn build(&self, cell: &MatrixCell, _compiler: &ActivatedCompiler) -> Result<PhaseStatus> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(format!(
            "build {}/{}/{}",
            cell.architecture, cell.configuration, cell.build_mode
        ));
        let key = (
            cell.architecture.clone(),
            cell.configuration.clone(),
            cell.build_mode.clone(),
        );
        if script.failing_builds.contains(&key) {
            return Ok(PhaseStatus::Failed { code: Some(1) });
        }
        if !script.silent_builds.contains(&key) {
            std::fs::write(
                self.output_binary(),
                format!("{} {}", cell.configuration, cell.build_mode),
            )?;
        }
        Ok(PhaseStatus::Passed)
    }

    fn output_binary(&self) -> PathBuf {
        self.project_dir.join(&self.binary)
    }
}
