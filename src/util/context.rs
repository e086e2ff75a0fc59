//! Global context for anvil operations.
//!
//! Provides centralized access to the working directory, the scratch
//! directory the installer is downloaded into, and config discovery.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::util::config::{global_config_path, load_config, Config, CONFIG_NAME};
use crate::util::diagnostic::suggestions;

/// Project directories for anvil
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "anvil", "anvil"));

/// Global context containing paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Cache directory for downloaded installers
    home: PathBuf,

    /// Explicit `--config` path
    config_override: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.cache_dir().to_path_buf()
        } else {
            std::env::temp_dir().join("anvil")
        };

        Ok(GlobalContext {
            cwd,
            home,
            config_override: None,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Use an explicit config file instead of searching for one.
    pub fn with_config(mut self, path: Option<PathBuf>) -> Self {
        self.config_override = path.map(|p| self.cwd.join(p));
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the anvil cache directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Directory the installer script is written to.
    pub fn scratch_dir(&self) -> PathBuf {
        self.home.join("installer")
    }

    /// Find `anvil.toml`, starting from cwd and searching upward.
    pub fn find_config(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config_override {
            if !path.is_file() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            return Ok(path.clone());
        }

        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(CONFIG_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                anyhow::bail!(
                    "could not find `{}` in {} or any parent directory\n{}",
                    CONFIG_NAME,
                    self.cwd.display(),
                    suggestions::NO_CONFIG
                );
            }
        }
    }

    /// Find and load the merged configuration.
    pub fn load_config(&self) -> Result<Config> {
        let project = self.find_config()?;
        tracing::debug!("using config {}", project.display());
        load_config(global_config_path().as_deref(), &project)
    }
}
