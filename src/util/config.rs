//! Configuration file support for anvil.
//!
//! anvil reads two configuration files:
//! - Global: `~/.anvil/config.toml` - user-wide defaults (mirrors, timeouts)
//! - Project: `anvil.toml` - the matrix, build tool and artifact layout
//!
//! Project config takes precedence over global config. Every matrix axis is
//! plain data here so cells can be toggled with `[[matrix.disabled]]` instead
//! of code changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::AnvilError;
use crate::core::matrix::{BuildMode, CellFilter, MatrixAxes};
use crate::util::diagnostic::{emit, Diagnostic};
use crate::util::fs::read_to_string;

/// Name of the project configuration file.
pub const CONFIG_NAME: &str = "anvil.toml";

/// Installer endpoints used when none are configured. The first is primary.
pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://dlang.org/install.sh",
    "https://nightlies.dlang.org/install.sh",
];

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_BUILD_TOOL: &str = "dub";
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// anvil configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub installer: InstallerConfig,
    pub build_tool: BuildToolConfig,
    pub matrix: MatrixConfig,
    pub deps: DepsConfig,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,
}

/// The project being built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name, used as the artifact name prefix
    pub name: Option<String>,

    /// File the build tool leaves in the project directory (defaults to name)
    pub binary: Option<String>,

    /// Project directory (defaults to the config file's directory)
    pub dir: Option<PathBuf>,

    /// Where artifacts and `.failed` markers go
    pub artifacts_dir: Option<PathBuf>,
}

/// Installer download settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Ordered endpoints: primary first, then mirrors
    pub endpoints: Vec<String>,

    pub max_attempts: Option<u32>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,

    pub user_agent: Option<String>,

    /// Expected SHA-256 of the installer script (hex)
    pub sha256: Option<String>,

    /// Where the installer puts compilers (installer default when unset)
    pub install_root: Option<PathBuf>,
}

/// Build tool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildToolConfig {
    pub program: Option<String>,
}

/// Matrix axes as written in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Native architecture (defaults to the host architecture)
    pub default_arch: Option<String>,

    /// Defaults to `[default_arch]`
    pub architectures: Vec<String>,

    /// Defaults to `["debug", "plain", "release"]`
    pub build_modes: Vec<BuildMode>,

    pub configurations: Vec<String>,

    /// Extra build-tool arguments per configuration
    pub extra_args: BTreeMap<String, Vec<String>>,

    /// Cells to skip
    pub disabled: Vec<CellFilter>,
}

/// System dependencies and auxiliary sources for `install-deps`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DepsConfig {
    /// Install command prefix, e.g. `["sudo", "apt-get", "install", "-y"]`
    pub package_manager: Vec<String>,

    pub packages: Vec<String>,

    pub sources: Vec<AuxSource>,
}

/// An auxiliary source repository cloned next to the project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxSource {
    pub url: String,

    /// Clone destination, relative to the project directory
    pub dest: PathBuf,

    pub branch: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Load configuration with fallback to defaults if the file is missing
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::debug!("ignoring {}: {:#}", path.display(), e);
                emit(
                    &Diagnostic::warning("ignoring unreadable config file")
                        .with_location(path)
                        .with_context(format!("{:#}", e)),
                    false,
                );
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Project settings
        if other.project.name.is_some() {
            self.project.name = other.project.name;
        }
        if other.project.binary.is_some() {
            self.project.binary = other.project.binary;
        }
        if other.project.dir.is_some() {
            self.project.dir = other.project.dir;
        }
        if other.project.artifacts_dir.is_some() {
            self.project.artifacts_dir = other.project.artifacts_dir;
        }

        // Installer settings
        if !other.installer.endpoints.is_empty() {
            self.installer.endpoints = other.installer.endpoints;
        }
        if other.installer.max_attempts.is_some() {
            self.installer.max_attempts = other.installer.max_attempts;
        }
        if other.installer.timeout_secs.is_some() {
            self.installer.timeout_secs = other.installer.timeout_secs;
        }
        if other.installer.user_agent.is_some() {
            self.installer.user_agent = other.installer.user_agent;
        }
        if other.installer.sha256.is_some() {
            self.installer.sha256 = other.installer.sha256;
        }
        if other.installer.install_root.is_some() {
            self.installer.install_root = other.installer.install_root;
        }

        if other.build_tool.program.is_some() {
            self.build_tool.program = other.build_tool.program;
        }

        // Matrix: lists are replaced, not concatenated
        if other.matrix.default_arch.is_some() {
            self.matrix.default_arch = other.matrix.default_arch;
        }
        if !other.matrix.architectures.is_empty() {
            self.matrix.architectures = other.matrix.architectures;
        }
        if !other.matrix.build_modes.is_empty() {
            self.matrix.build_modes = other.matrix.build_modes;
        }
        if !other.matrix.configurations.is_empty() {
            self.matrix.configurations = other.matrix.configurations;
        }
        self.matrix.extra_args.extend(other.matrix.extra_args);
        if !other.matrix.disabled.is_empty() {
            self.matrix.disabled = other.matrix.disabled;
        }

        // Deps
        if !other.deps.package_manager.is_empty() {
            self.deps.package_manager = other.deps.package_manager;
        }
        if !other.deps.packages.is_empty() {
            self.deps.packages = other.deps.packages;
        }
        if !other.deps.sources.is_empty() {
            self.deps.sources = other.deps.sources;
        }

        if !other.root.as_os_str().is_empty() {
            self.root = other.root;
        }
    }

    /// Project name; required.
    pub fn project_name(&self) -> Result<&str, AnvilError> {
        self.project
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AnvilError::invalid_config("project.name is required"))
    }

    /// File name the build tool produces.
    pub fn binary_name(&self) -> Result<String, AnvilError> {
        match &self.project.binary {
            Some(b) => Ok(b.clone()),
            None => self.project_name().map(|n| {
                if cfg!(windows) {
                    format!("{}.exe", n)
                } else {
                    n.to_string()
                }
            }),
        }
    }

    /// Absolute-ish project directory.
    pub fn project_dir(&self) -> PathBuf {
        match &self.project.dir {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }

    /// Artifacts directory, relative to the project directory.
    pub fn artifacts_dir(&self) -> PathBuf {
        let dir = self
            .project
            .artifacts_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACTS_DIR));
        self.project_dir().join(dir)
    }

    pub fn endpoints(&self) -> Vec<String> {
        if self.installer.endpoints.is_empty() {
            DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect()
        } else {
            self.installer.endpoints.clone()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.installer.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.installer.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn user_agent(&self) -> String {
        self.installer
            .user_agent
            .clone()
            .unwrap_or_else(|| concat!("anvil/", env!("CARGO_PKG_VERSION")).to_string())
    }

    pub fn build_tool_program(&self) -> &str {
        self.build_tool
            .program
            .as_deref()
            .unwrap_or(DEFAULT_BUILD_TOOL)
    }

    /// Resolve and validate the matrix axes.
    pub fn axes(&self) -> Result<MatrixAxes, AnvilError> {
        let default_arch = self
            .matrix
            .default_arch
            .clone()
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());

        let architectures = if self.matrix.architectures.is_empty() {
            vec![default_arch.clone()]
        } else {
            self.matrix.architectures.clone()
        };

        let build_modes = if self.matrix.build_modes.is_empty() {
            vec![BuildMode::Debug, BuildMode::Plain, BuildMode::Release]
        } else {
            self.matrix.build_modes.clone()
        };

        for key in self.matrix.extra_args.keys() {
            if !self.matrix.configurations.contains(key) {
                tracing::warn!("matrix.extra_args.{} names an undeclared configuration", key);
            }
        }

        let axes = MatrixAxes {
            default_arch,
            architectures,
            build_modes,
            configurations: self.matrix.configurations.clone(),
            extra_args: self.matrix.extra_args.clone(),
            disabled: self.matrix.disabled.clone(),
        };
        axes.validate()?;
        Ok(axes)
    }

    /// Validate installer settings without touching the network.
    pub fn validate_installer(&self) -> Result<(), AnvilError> {
        if self.max_attempts() == 0 {
            return Err(AnvilError::invalid_config(
                "installer.max_attempts must be at least 1",
            ));
        }
        for endpoint in self.endpoints() {
            url::Url::parse(&endpoint).map_err(|e| {
                AnvilError::invalid_config(format!(
                    "installer endpoint `{}` is not a valid URL: {}",
                    endpoint, e
                ))
            })?;
        }
        if let Some(sha) = &self.installer.sha256 {
            if sha.len() != 64 || hex::decode(sha).is_err() {
                return Err(AnvilError::invalid_config(
                    "installer.sha256 must be 64 hex characters",
                ));
            }
        }
        Ok(())
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`anvil.toml`)
/// 2. Global config (`~/.anvil/config.toml`)
/// 3. Defaults
///
/// A broken global config is warned about and ignored; a broken project
/// config is an error.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            let mut global = Config::load_or_default(global_path);
            // global paths never anchor project-relative settings
            global.root = PathBuf::new();
            config.merge(global);
        }
    }

    let project = Config::load(project_path)?;
    config.merge(project);

    Ok(config)
}

/// Get the global anvil config directory (~/.anvil).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".anvil"))
}

/// Get the global config path (~/.anvil/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROJECT: &str = r#"
[project]
name = "kameloso"
artifacts_dir = "out"

[installer]
max_attempts = 3
sha256 = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"

[matrix]
default_arch = "x86_64"
architectures = ["x86_64", "x86"]
configurations = ["dev", "twitch"]

[matrix.extra_args]
twitch = ["--d-version=TwitchSupport"]

[[matrix.disabled]]
arch = "x86"
mode = "release"

[deps]
package_manager = ["apt-get", "install", "-y"]
packages = ["libcurl4-openssl-dev"]

[[deps.sources]]
url = "https://github.com/zorael/dialect.git"
dest = "../dialect"
enabled = false
"#;

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_NAME);
        std::fs::write(&path, PROJECT).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.project_name().unwrap(), "kameloso");
        assert_eq!(config.root, tmp.path());
        assert_eq!(config.artifacts_dir(), tmp.path().join("out"));
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.deps.sources.len(), 1);
        assert!(!config.deps.sources[0].enabled);
        assert!(config.validate_installer().is_ok());

        let axes = config.axes().unwrap();
        assert_eq!(axes.architectures, vec!["x86_64", "x86"]);
        assert_eq!(
            axes.build_modes,
            vec![BuildMode::Debug, BuildMode::Plain, BuildMode::Release]
        );
        assert_eq!(axes.disabled[0].mode, Some(BuildMode::Release));
        assert_eq!(axes.extra_args["twitch"], vec!["--d-version=TwitchSupport"]);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.endpoints().len(), DEFAULT_ENDPOINTS.len());
        assert_eq!(config.endpoints()[0], "https://dlang.org/install.sh");
        assert_eq!(config.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.build_tool_program(), "dub");
        assert!(config.user_agent().starts_with("anvil/"));
        assert!(config.project_name().is_err());
        // no configurations declared
        assert!(config.axes().is_err());
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.installer.endpoints = vec!["https://mirror.example/install.sh".into()];
        base.installer.timeout_secs = Some(20);

        let mut project = Config::default();
        project.installer.timeout_secs = Some(10);
        project.project.name = Some("kameloso".into());

        base.merge(project);

        assert_eq!(base.installer.timeout_secs, Some(10));
        assert_eq!(base.endpoints(), vec!["https://mirror.example/install.sh"]);
        assert_eq!(base.project.name.as_deref(), Some("kameloso"));
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("proj").join(CONFIG_NAME);
        std::fs::create_dir_all(project.parent().unwrap()).unwrap();

        std::fs::write(
            &global,
            r#"
[installer]
endpoints = ["https://mirror.example/install.sh"]
timeout_secs = 30
"#,
        )
        .unwrap();
        std::fs::write(
            &project,
            r#"
[project]
name = "kameloso"

[installer]
timeout_secs = 8

[matrix]
configurations = ["dev"]
"#,
        )
        .unwrap();

        let config = load_config(Some(&global), &project).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(8));
        assert_eq!(config.endpoints(), vec!["https://mirror.example/install.sh"]);
        assert_eq!(config.project_dir(), tmp.path().join("proj"));
    }

    #[test]
    fn test_invalid_installer_settings() {
        let mut config = Config::default();
        config.installer.max_attempts = Some(0);
        assert!(config.validate_installer().is_err());

        let mut config = Config::default();
        config.installer.endpoints = vec!["not a url".into()];
        assert!(config.validate_installer().is_err());

        let mut config = Config::default();
        config.installer.sha256 = Some("abc".into());
        assert!(config.validate_installer().is_err());
    }

    #[test]
    fn test_broken_project_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join(CONFIG_NAME);
        std::fs::write(&project, "[matrix\n").unwrap();
        assert!(load_config(None, &project).is_err());
    }
}
