//! Implementation of `anvil install-deps`.
//!
//! Installs system packages through the configured package manager and
//! clones enabled auxiliary sources. Both are pass-through: anvil only looks
//! at whether the step succeeded.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::core::error::AnvilError;
use crate::sources::GitSource;
use crate::util::config::Config;
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Shell, Status};

/// What `install-deps` did.
#[derive(Debug, Default)]
pub struct InstallReport {
    /// Number of packages handed to the package manager
    pub packages: usize,
    pub cloned: Vec<PathBuf>,
    /// Sources left alone: disabled, or destination already present
    pub skipped: Vec<PathBuf>,
}

/// Install system packages and clone auxiliary sources.
pub fn install_deps(config: &Config, shell: &Arc<Shell>) -> Result<InstallReport> {
    let mut report = InstallReport::default();
    let deps = &config.deps;

    if !deps.packages.is_empty() {
        let cmd = package_command(&deps.package_manager, &deps.packages)?;
        let span = shell.span(Status::Installing, deps.packages.join(", "));
        shell.command(&cmd);
        let status = cmd.status()?;
        if !status.success() {
            span.fail("system packages");
            bail!(
                "`{}` failed with exit code {:?}",
                cmd.display_command(),
                status.code()
            );
        }
        span.finish_with_message(format!("{} package(s)", deps.packages.len()));
        report.packages = deps.packages.len();
    } else {
        tracing::debug!("no system packages configured");
    }

    let project_dir = config.project_dir();
    for source in &deps.sources {
        let git = GitSource::from_config(source, &project_dir)?;
        if !source.enabled {
            shell.verbose(Status::Skipped, format!("{} (disabled)", git.remote()));
            report.skipped.push(git.dest().to_path_buf());
            continue;
        }
        if git.is_present() {
            shell.status(
                Status::Skipped,
                format!("{} ({} already exists)", git.remote(), git.dest().display()),
            );
            report.skipped.push(git.dest().to_path_buf());
            continue;
        }

        git.checkout()?;
        shell.status(
            Status::Cloned,
            format!("{} into {}", git.remote(), git.dest().display()),
        );
        report.cloned.push(git.dest().to_path_buf());
    }

    Ok(report)
}

/// `<package manager...> <packages...>`
fn package_command(manager: &[String], packages: &[String]) -> Result<ProcessBuilder, AnvilError> {
    let Some((program, args)) = manager.split_first() else {
        return Err(AnvilError::invalid_config(
            "deps.packages is set but deps.package_manager is empty",
        ));
    };
    Ok(ProcessBuilder::new(program).args(args).args(packages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::git::tests::init_repo;
    use crate::util::config::AuxSource;
    use tempfile::TempDir;

    fn config(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.root = root.to_path_buf();
        config
    }

    #[test]
    fn test_nothing_configured() {
        let tmp = TempDir::new().unwrap();
        let report = install_deps(&config(tmp.path()), &Arc::new(Shell::quiet())).unwrap();
        assert_eq!(report.packages, 0);
        assert!(report.cloned.is_empty());
    }

    #[test]
    fn test_package_command() {
        let cmd = package_command(
            &["sudo".into(), "apt-get".into(), "install".into(), "-y".into()],
            &["libcurl4-openssl-dev".into()],
        )
        .unwrap();
        assert_eq!(
            cmd.display_command(),
            "sudo apt-get install -y libcurl4-openssl-dev"
        );

        let err = package_command(&[], &["libcurl4-openssl-dev".into()]).unwrap_err();
        assert!(matches!(err, AnvilError::InvalidConfig { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_package_manager_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(tmp.path());
        config.deps.package_manager = vec!["false".into()];
        config.deps.packages = vec!["libcurl4-openssl-dev".into()];

        let err = install_deps(&config, &Arc::new(Shell::quiet())).unwrap_err();
        assert!(err.to_string().contains("false libcurl4-openssl-dev"));
    }

    #[cfg(unix)]
    #[test]
    fn test_package_manager_success() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(tmp.path());
        config.deps.package_manager = vec!["true".into()];
        config.deps.packages = vec!["a".into(), "b".into()];

        let report = install_deps(&config, &Arc::new(Shell::quiet())).unwrap();
        assert_eq!(report.packages, 2);
    }

    #[test]
    fn test_sources_cloned_or_skipped() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream");
        std::fs::create_dir(&upstream).unwrap();
        init_repo(&upstream);
        let project = tmp.path().join("kameloso");
        std::fs::create_dir(&project).unwrap();
        std::fs::create_dir(tmp.path().join("present")).unwrap();

        let source = |dest: &str, enabled: bool| AuxSource {
            url: upstream.to_string_lossy().into_owned(),
            dest: PathBuf::from(dest),
            branch: None,
            enabled,
        };
        let mut config = config(&project);
        config.deps.sources = vec![
            source("../dialect", true),
            source("../present", true),
            source("../lu", false),
        ];

        let report = install_deps(&config, &Arc::new(Shell::quiet())).unwrap();

        assert_eq!(report.cloned, [project.join("../dialect")]);
        assert_eq!(report.skipped.len(), 2);
        assert!(project.join("../dialect/dub.sdl").is_file());
        assert!(!project.join("../lu").exists());
    }
}
