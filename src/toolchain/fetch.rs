//! Installer download with mirror failover and exponential backoff.
//!
//! One attempt walks the endpoint list in declared order (primary first, then
//! mirrors) and returns the first good body. When a whole attempt fails and
//! attempts remain, the fetcher sleeps `2^attempt` seconds before walking the
//! list again. There is no sleep after the final attempt, so `max_attempts = 5`
//! waits `1 + 2 + 4 + 8` seconds in total before giving up.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};

use crate::core::error::AnvilError;
use crate::util::config::Config;
use crate::util::fs::write_executable;
use crate::util::shell::{Shell, Status};

/// File name of the downloaded installer in the scratch directory.
pub const INSTALLER_FILE: &str = "install.sh";

/// Performs one HTTP GET.
pub trait Transport {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Suspends the fetcher between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Real sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Blocking reqwest transport with a fixed user agent.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("failed to build HTTP client")?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            bail!("HTTP {}", response.status());
        }

        let body = response
            .bytes()
            .with_context(|| format!("failed to read response body from {}", url))?;
        Ok(body.to_vec())
    }
}

/// Attempt bookkeeping for one fetch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempt_index: u32,
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        RetryState {
            attempt_index: 0,
            max_attempts,
        }
    }

    /// Whether another attempt is allowed after the current one.
    pub fn has_next(&self) -> bool {
        self.attempt_index + 1 < self.max_attempts
    }

    /// Backoff to wait after the current attempt fails: `2^attempt` seconds.
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(1u64 << self.attempt_index.min(16))
    }

    pub fn advance(&mut self) {
        self.attempt_index += 1;
    }
}

/// Where and how to fetch the installer.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Ordered endpoints: primary first, then mirrors
    pub endpoints: Vec<String>,
    pub max_attempts: u32,
    pub timeout: Duration,
    /// Expected SHA-256 of the body, lowercase hex
    pub sha256: Option<String>,
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Result<Self, AnvilError> {
        config.validate_installer()?;
        Ok(FetchOptions {
            endpoints: config.endpoints(),
            max_attempts: config.max_attempts(),
            timeout: config.timeout(),
            sha256: config.installer.sha256.as_ref().map(|s| s.to_lowercase()),
        })
    }
}

/// Downloads the installer script.
pub struct InstallerFetcher<T, S = ThreadSleeper> {
    transport: T,
    sleeper: S,
    shell: Arc<Shell>,
}

impl<T: Transport> InstallerFetcher<T, ThreadSleeper> {
    pub fn new(transport: T, shell: Arc<Shell>) -> Self {
        InstallerFetcher {
            transport,
            sleeper: ThreadSleeper,
            shell,
        }
    }
}

impl<T: Transport, S: Sleeper> InstallerFetcher<T, S> {
    /// Replace the sleeper (tests observe backoff without waiting).
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> InstallerFetcher<T, S2> {
        InstallerFetcher {
            transport: self.transport,
            sleeper,
            shell: self.shell,
        }
    }

    /// Fetch the installer body.
    pub fn fetch(&self, opts: &FetchOptions) -> Result<Vec<u8>, AnvilError> {
        if opts.endpoints.is_empty() || opts.max_attempts == 0 {
            return Err(AnvilError::invalid_config(
                "installer needs at least one endpoint and one attempt",
            ));
        }

        let mut state = RetryState::new(opts.max_attempts);
        let mut last_errors = vec![String::new(); opts.endpoints.len()];

        loop {
            for (i, endpoint) in opts.endpoints.iter().enumerate() {
                let spinner = self.shell.spinner(format!("Fetching {}", endpoint));
                self.shell.verbose(
                    Status::Fetching,
                    format!(
                        "{} (attempt {}/{})",
                        endpoint,
                        state.attempt_index + 1,
                        state.max_attempts
                    ),
                );
                let result = self
                    .transport
                    .get(endpoint, opts.timeout)
                    .and_then(|body| check_body(body, opts.sha256.as_deref()));
                spinner.finish();

                match result {
                    Ok(body) => {
                        tracing::info!(
                            "fetched installer from {} ({} bytes, attempt {})",
                            endpoint,
                            body.len(),
                            state.attempt_index + 1
                        );
                        self.shell
                            .status(Status::Fetching, format!("installer from {}", endpoint));
                        return Ok(body);
                    }
                    Err(e) => {
                        tracing::warn!("fetching {} failed: {:#}", endpoint, e);
                        last_errors[i] = format!("{:#}", e);
                    }
                }
            }

            if !state.has_next() {
                break;
            }

            let backoff = state.backoff();
            self.shell.warn(format!(
                "all installer endpoints failed (attempt {}/{}), retrying in {}s",
                state.attempt_index + 1,
                state.max_attempts,
                backoff.as_secs()
            ));
            self.sleeper.sleep(backoff);
            state.advance();
        }

        Err(AnvilError::FetchExhausted {
            attempts: opts.max_attempts,
            endpoints: opts.endpoints.clone(),
            last_errors,
        })
    }

    /// Fetch the installer and write it to `dir/install.sh`.
    pub fn fetch_to(&self, opts: &FetchOptions, dir: &Path) -> Result<PathBuf> {
        let body = self.fetch(opts)?;
        let path = write_executable(dir, INSTALLER_FILE, &body)?;
        tracing::debug!("installer written to {}", path.display());
        Ok(path)
    }
}

fn check_body(body: Vec<u8>, sha256: Option<&str>) -> Result<Vec<u8>> {
    if body.is_empty() {
        bail!("empty response body");
    }
    if let Some(expected) = sha256 {
        let actual = hex::encode(Sha256::digest(&body));
        if actual != expected {
            bail!(
                "installer hash mismatch:\n  expected: {}\n  actual:   {}",
                expected,
                actual
            );
        }
    }
    Ok(body)
}
