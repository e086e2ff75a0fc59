//! Artifact identities and records.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::matrix::{BuildMode, CellGroup, MatrixCell};

/// Suffix of the sentinel file written for a failed build cell.
pub const FAILED_SUFFIX: &str = ".failed";

/// Deterministic artifact name for a cell.
///
/// Format: `<project>-<compiler>[-<arch>][-<mode>]-<configuration>`. The
/// architecture is left out on the default architecture and the mode is left
/// out for debug builds, so the gating debug artifact of a native cell reads
/// `kameloso-dmd-dev`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CellIdentity(String);

impl CellIdentity {
    pub fn new(project: &str, cell: &MatrixCell, default_arch: &str) -> Self {
        Self::compose(
            project,
            &cell.compiler,
            &cell.architecture,
            Some(&cell.build_mode),
            &cell.configuration,
            default_arch,
        )
    }

    /// Identity used in diagnostics for a group's clean/test phases.
    pub fn for_group(project: &str, group: &CellGroup, default_arch: &str) -> Self {
        Self::compose(
            project,
            &group.compiler,
            &group.architecture,
            None,
            &group.configuration,
            default_arch,
        )
    }

    /// The part of a cell's name after `<project>-<compiler>-`.
    ///
    /// Every cell of a run shares the prefix, so two cells clash exactly when
    /// their suffixes do.
    pub fn suffix(cell: &MatrixCell, default_arch: &str) -> String {
        name_suffix(
            &cell.architecture,
            Some(&cell.build_mode),
            &cell.configuration,
            default_arch,
        )
    }

    fn compose(
        project: &str,
        compiler: &str,
        arch: &str,
        mode: Option<&BuildMode>,
        configuration: &str,
        default_arch: &str,
    ) -> Self {
        CellIdentity(format!(
            "{}-{}-{}",
            project,
            compiler,
            name_suffix(arch, mode, configuration, default_arch)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this cell's failure sentinel.
    pub fn failed_marker(&self) -> String {
        format!("{}{}", self.0, FAILED_SUFFIX)
    }
}

fn name_suffix(
    arch: &str,
    mode: Option<&BuildMode>,
    configuration: &str,
    default_arch: &str,
) -> String {
    let mut parts = Vec::new();
    if arch != default_arch {
        parts.push(arch);
    }
    if let Some(mode) = mode.filter(|m| **m != BuildMode::Debug) {
        parts.push(mode.as_str());
    }
    parts.push(configuration);
    parts.join("-")
}

impl fmt::Display for CellIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one build invocation, before recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The build succeeded and left a binary at this path.
    Success(PathBuf),
    /// The build failed.
    Failure(String),
}

/// Recorded state of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordedOutcome {
    Success,
    BuildFailed,
}

/// What the recorder left in the artifacts directory for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub identity: CellIdentity,
    pub outcome: RecordedOutcome,
    /// The moved binary, or the `.failed` sentinel
    pub output_path: PathBuf,
}

impl ArtifactRecord {
    pub fn is_success(&self) -> bool {
        self.outcome == RecordedOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(arch: &str, mode: BuildMode, config: &str) -> MatrixCell {
        MatrixCell {
            compiler: "dmd".into(),
            architecture: arch.into(),
            build_mode: mode,
            configuration: config.into(),
            extra_args: Vec::new(),
        }
    }

    #[test]
    fn test_default_arch_omitted() {
        let id = CellIdentity::new("kameloso", &cell("x86_64", BuildMode::Debug, "dev"), "x86_64");
        assert_eq!(id.as_str(), "kameloso-dmd-dev");

        let id = CellIdentity::new("kameloso", &cell("x86_64", BuildMode::Plain, "dev"), "x86_64");
        assert_eq!(id.as_str(), "kameloso-dmd-plain-dev");
    }

    #[test]
    fn test_non_default_arch_included_verbatim() {
        let id = CellIdentity::new("kameloso", &cell("x86", BuildMode::Release, "twitch"), "x86_64");
        assert_eq!(id.as_str(), "kameloso-dmd-x86-release-twitch");
        assert_eq!(id.failed_marker(), "kameloso-dmd-x86-release-twitch.failed");
    }

    #[test]
    fn test_identities_unique_across_modes() {
        let modes = [
            BuildMode::Debug,
            BuildMode::Plain,
            BuildMode::Release,
            BuildMode::Other("release-debug".into()),
        ];
        let ids: std::collections::HashSet<_> = modes
            .iter()
            .map(|m| CellIdentity::new("p", &cell("x86_64", m.clone(), "dev"), "x86_64"))
            .collect();
        assert_eq!(ids.len(), modes.len());
    }
}
