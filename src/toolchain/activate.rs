//! Compiler activation.
//!
//! The installer installs a compiler and prints the path of an activation
//! script. Sourcing that script in a child shell and diffing its environment
//! against ours yields an [`EnvOverlay`]; the overlay is merged into every
//! build-tool invocation instead of mutating this process's environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::compiler::CompilerSpec;
use crate::core::error::AnvilError;
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Shell, Status};

/// Variables a shell sets on its own; never part of an overlay.
const SHELL_BOOKKEEPING: &[&str] = &["_", "SHLVL", "PWD", "OLDPWD", "PS1"];

/// Environment variables added or changed by an activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay(BTreeMap<String, String>);

impl EnvOverlay {
    pub fn new() -> Self {
        EnvOverlay(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Diff a NUL-separated `env -0` dump against `base`.
    ///
    /// Variables the dump removes are ignored; activation scripts only add
    /// and prepend.
    pub fn from_env_dump(dump: &[u8], base: &BTreeMap<String, String>) -> Self {
        let mut overlay = EnvOverlay::new();
        for entry in dump.split(|b| *b == 0) {
            let entry = String::from_utf8_lossy(entry);
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            if key.is_empty() || SHELL_BOOKKEEPING.contains(&key) {
                continue;
            }
            if base.get(key).map(String::as_str) != Some(value) {
                overlay.insert(key, value);
            }
        }
        overlay
    }
}

/// A compiler made callable by name through its overlay.
#[derive(Debug, Clone)]
pub struct ActivatedCompiler {
    pub spec: CompilerSpec,
    /// Name (or path) to pass to the build tool as the compiler
    pub binary: String,
    pub overlay: EnvOverlay,
}

impl ActivatedCompiler {
    /// A compiler that needs no activation (already on PATH).
    pub fn from_path(spec: CompilerSpec) -> Self {
        let binary = spec.default_binary().to_string();
        ActivatedCompiler {
            spec,
            binary,
            overlay: EnvOverlay::new(),
        }
    }

    /// Label used in artifact names: the compiler family.
    pub fn label(&self) -> &str {
        &self.spec.name
    }
}

/// Runs the fetched installer to install and activate compilers.
pub struct ToolchainActivator {
    installer: PathBuf,
    install_root: Option<PathBuf>,
    shell: Arc<Shell>,
}

impl ToolchainActivator {
    pub fn new(installer: impl Into<PathBuf>, shell: Arc<Shell>) -> Self {
        ToolchainActivator {
            installer: installer.into(),
            install_root: None,
            shell,
        }
    }

    /// Install compilers under `root` instead of the installer's default.
    pub fn with_install_root(mut self, root: Option<PathBuf>) -> Self {
        self.install_root = root;
        self
    }

    /// Install `spec` and capture its activation environment.
    pub fn activate(&self, spec: &CompilerSpec) -> Result<ActivatedCompiler, AnvilError> {
        let compiler = spec.installer_id();
        let failed = |reason: String| AnvilError::ActivationFailed {
            compiler: compiler.clone(),
            reason,
        };

        let span = self.shell.span(Status::Installing, &compiler);
        let result = self.install(&compiler).and_then(|script| {
            let overlay = self.capture_overlay(&script)?;
            let binary = overlay
                .get("DC")
                .map(str::to_string)
                .unwrap_or_else(|| spec.default_binary().to_string());
            let resolved = resolve_binary(&binary, &overlay).ok_or_else(|| {
                format!(
                    "activation did not put `{}` on PATH ({})",
                    binary,
                    script.display()
                )
            })?;
            Ok((overlay, binary, resolved))
        });

        let (overlay, binary, resolved) = match result {
            Ok(activated) => activated,
            Err(reason) => {
                span.fail(format!("activating {}", compiler));
                return Err(failed(reason));
            }
        };

        span.finish_with_message(format!("activating {}", compiler));
        self.shell.status(
            Status::Activated,
            format!("{} ({})", binary, resolved.display()),
        );
        for (key, value) in overlay.iter() {
            self.shell.verbose(Status::Info, format!("{}={}", key, value));
        }
        tracing::debug!("{} overlay has {} variable(s)", compiler, overlay.len());

        Ok(ActivatedCompiler {
            spec: spec.clone(),
            binary,
            overlay,
        })
    }

    /// Run `install <compiler> -a` and return the activation script path.
    fn install(&self, compiler: &str) -> Result<PathBuf, String> {
        let mut cmd = ProcessBuilder::new("bash")
            .arg(&self.installer)
            .args(["install", compiler, "-a"]);
        if let Some(root) = &self.install_root {
            cmd = cmd.arg("-p").arg(root);
        }
        self.shell.command(&cmd);

        let output = cmd.exec().map_err(|e| format!("{:#}", e))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!("installer stderr:\n{}", stderr.trim_end());
        }
        if !output.status.success() {
            return Err(format!(
                "installer exited with {:?}: {}",
                output.status.code(),
                last_line(&stderr).unwrap_or("no output")
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let script = last_line(&stdout)
            .map(PathBuf::from)
            .ok_or_else(|| "installer printed no activation script".to_string())?;
        if !script.is_file() {
            return Err(format!(
                "activation script {} does not exist",
                script.display()
            ));
        }
        Ok(script)
    }

    /// Source the activation script in a child shell and diff its
    /// environment against ours.
    fn capture_overlay(&self, script: &Path) -> Result<EnvOverlay, String> {
        let cmd = ProcessBuilder::new("bash")
            .args(["-c", ". \"$1\" >/dev/null && env -0", "anvil-activate"])
            .arg(script);
        self.shell.command(&cmd);

        let output = cmd.exec_and_check().map_err(|e| format!("{:#}", e))?;
        let base: BTreeMap<String, String> = std::env::vars_os()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
            .collect();
        Ok(EnvOverlay::from_env_dump(&output.stdout, &base))
    }
}

/// Look `binary` up on the overlay's PATH, falling back to ours.
fn resolve_binary(binary: &str, overlay: &EnvOverlay) -> Option<PathBuf> {
    let search_path = overlay
        .get("PATH")
        .map(str::to_string)
        .or_else(|| std::env::var("PATH").ok())?;
    let cwd = std::env::current_dir().ok()?;
    which::which_in(binary, Some(search_path), cwd).ok()
}

fn last_line(s: &str) -> Option<&str> {
    s.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}
