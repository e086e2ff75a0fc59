//! Matrix axes and cell enumeration.
//!
//! A run covers the cross-product of architectures × configurations × build
//! modes for one compiler. Cells are grouped per (architecture, configuration)
//! because the project is cleaned and tested once per group before its build
//! modes run.
//!
//! Execution order is part of the contract: architecture outer,
//! configuration middle, build mode inner, with build modes sorted
//! debug → plain → release → others.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::artifact::CellIdentity;
use crate::core::error::AnvilError;

/// A build type understood by the build tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BuildMode {
    Debug,
    Plain,
    Release,
    /// Any other build type the build tool accepts (e.g. `release-debug`)
    Other(String),
}

impl BuildMode {
    pub fn as_str(&self) -> &str {
        match self {
            BuildMode::Debug => "debug",
            BuildMode::Plain => "plain",
            BuildMode::Release => "release",
            BuildMode::Other(s) => s,
        }
    }

    /// Debug builds gate the run; everything else is best-effort.
    pub fn is_hard_fail(&self) -> bool {
        matches!(self, BuildMode::Debug)
    }

    fn priority(&self) -> u8 {
        match self {
            BuildMode::Debug => 0,
            BuildMode::Plain => 1,
            BuildMode::Release => 2,
            BuildMode::Other(_) => 3,
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err("build mode cannot be empty".to_string()),
            "debug" => Ok(BuildMode::Debug),
            "plain" => Ok(BuildMode::Plain),
            "release" => Ok(BuildMode::Release),
            other => Ok(BuildMode::Other(other.to_string())),
        }
    }
}

impl TryFrom<String> for BuildMode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BuildMode> for String {
    fn from(mode: BuildMode) -> String {
        mode.as_str().to_string()
    }
}

/// Selects cells to skip. Omitted fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellFilter {
    pub arch: Option<String>,
    pub configuration: Option<String>,
    pub mode: Option<BuildMode>,
}

impl CellFilter {
    pub fn matches(&self, arch: &str, configuration: &str, mode: &BuildMode) -> bool {
        self.arch.as_deref().map_or(true, |a| a == arch)
            && self
                .configuration
                .as_deref()
                .map_or(true, |c| c == configuration)
            && self.mode.as_ref().map_or(true, |m| m == mode)
    }
}

/// One concrete combination to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCell {
    pub compiler: String,
    pub architecture: String,
    pub build_mode: BuildMode,
    pub configuration: String,
    pub extra_args: Vec<String>,
}

/// All enabled cells sharing an (architecture, configuration) pair.
#[derive(Debug, Clone)]
pub struct CellGroup {
    pub compiler: String,
    pub architecture: String,
    pub configuration: String,
    pub extra_args: Vec<String>,
    /// Enabled build cells, in execution order
    pub cells: Vec<MatrixCell>,
}

/// The statically declared axes of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixAxes {
    /// Native architecture; cells on it omit the arch from artifact names
    pub default_arch: String,
    pub architectures: Vec<String>,
    pub build_modes: Vec<BuildMode>,
    pub configurations: Vec<String>,
    /// Extra build-tool arguments keyed by configuration
    pub extra_args: BTreeMap<String, Vec<String>>,
    pub disabled: Vec<CellFilter>,
}

impl MatrixAxes {
    /// Reject empty axes, duplicate values and enabled cells whose artifact
    /// names would collide.
    pub fn validate(&self) -> Result<(), AnvilError> {
        check_axis("architectures", self.architectures.iter().map(String::as_str))?;
        check_axis("build_modes", self.build_modes.iter().map(BuildMode::as_str))?;
        check_axis("configurations", self.configurations.iter().map(String::as_str))?;
        if self.default_arch.trim().is_empty() {
            return Err(AnvilError::invalid_config("matrix.default_arch cannot be empty"));
        }
        self.check_artifact_names()
    }

    /// `dev` built in plain mode and `plain-dev` built in debug mode are both
    /// named `<project>-<compiler>-plain-dev`; such a pair must never reach the
    /// recorder.
    fn check_artifact_names(&self) -> Result<(), AnvilError> {
        let describe = |cell: &MatrixCell| {
            format!(
                "{}/{}/{}",
                cell.architecture, cell.configuration, cell.build_mode
            )
        };

        let mut seen: HashMap<String, String> = HashMap::new();
        for cell in self.groups("").iter().flat_map(|g| &g.cells) {
            let suffix = CellIdentity::suffix(cell, &self.default_arch);
            if let Some(other) = seen.get(&suffix) {
                return Err(AnvilError::invalid_config(format!(
                    "cells {} and {} would both produce the artifact `<project>-<compiler>-{}`",
                    other,
                    describe(cell),
                    suffix
                )));
            }
            seen.insert(suffix, describe(cell));
        }
        Ok(())
    }

    /// Restrict the axes to the given values. Empty selections keep the axis.
    ///
    /// Selecting a value the axis doesn't declare is an error: axes are never
    /// extended from the command line.
    pub fn narrow(
        &mut self,
        architectures: &[String],
        configurations: &[String],
        modes: &[BuildMode],
    ) -> Result<(), AnvilError> {
        narrow_axis("architecture", &mut self.architectures, architectures)?;
        narrow_axis("configuration", &mut self.configurations, configurations)?;
        narrow_axis("build mode", &mut self.build_modes, modes)?;
        Ok(())
    }

    /// Build modes in execution order.
    pub fn ordered_modes(&self) -> Vec<BuildMode> {
        let mut modes = self.build_modes.clone();
        // stable: `Other` modes keep their declared order
        modes.sort_by_key(BuildMode::priority);
        modes
    }

    pub fn is_disabled(&self, arch: &str, configuration: &str, mode: &BuildMode) -> bool {
        self.disabled
            .iter()
            .any(|f| f.matches(arch, configuration, mode))
    }

    /// Enumerate groups in execution order. Groups with no enabled cells are
    /// dropped entirely.
    pub fn groups(&self, compiler: &str) -> Vec<CellGroup> {
        let modes = self.ordered_modes();
        let mut groups = Vec::new();

        for arch in &self.architectures {
            for configuration in &self.configurations {
                let extra_args = self
                    .extra_args
                    .get(configuration)
                    .cloned()
                    .unwrap_or_default();

                let cells: Vec<MatrixCell> = modes
                    .iter()
                    .filter(|mode| !self.is_disabled(arch, configuration, mode))
                    .map(|mode| MatrixCell {
                        compiler: compiler.to_string(),
                        architecture: arch.clone(),
                        build_mode: mode.clone(),
                        configuration: configuration.clone(),
                        extra_args: extra_args.clone(),
                    })
                    .collect();

                if cells.is_empty() {
                    tracing::debug!("all cells disabled for {} / {}", arch, configuration);
                    continue;
                }

                groups.push(CellGroup {
                    compiler: compiler.to_string(),
                    architecture: arch.clone(),
                    configuration: configuration.clone(),
                    extra_args,
                    cells,
                });
            }
        }

        groups
    }

    /// Total number of cells (enabled and disabled).
    pub fn cell_count(&self) -> usize {
        self.architectures.len() * self.configurations.len() * self.build_modes.len()
    }
}

fn check_axis<'a>(name: &str, values: impl Iterator<Item = &'a str>) -> Result<(), AnvilError> {
    let mut seen = HashSet::new();
    let mut any = false;
    for value in values {
        any = true;
        if value.trim().is_empty() {
            return Err(AnvilError::invalid_config(format!(
                "matrix.{} contains an empty value",
                name
            )));
        }
        if !seen.insert(value) {
            return Err(AnvilError::invalid_config(format!(
                "matrix.{} lists `{}` more than once",
                name, value
            )));
        }
    }
    if !any {
        return Err(AnvilError::invalid_config(format!(
            "matrix.{} cannot be empty",
            name
        )));
    }
    Ok(())
}

fn narrow_axis<T>(name: &str, axis: &mut Vec<T>, selected: &[T]) -> Result<(), AnvilError>
where
    T: PartialEq + fmt::Display,
{
    if selected.is_empty() {
        return Ok(());
    }
    if let Some(missing) = selected.iter().find(|s| !axis.contains(s)) {
        return Err(AnvilError::invalid_config(format!(
            "{} `{}` is not declared in the matrix",
            name, missing
        )));
    }
    axis.retain(|v| selected.contains(v));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes() -> MatrixAxes {
        MatrixAxes {
            default_arch: "x86_64".into(),
            architectures: vec!["x86_64".into(), "x86".into()],
            build_modes: vec![BuildMode::Release, BuildMode::Debug, BuildMode::Plain],
            configurations: vec!["dev".into(), "twitch".into()],
            extra_args: BTreeMap::from([("twitch".into(), vec!["--nodeps".into()])]),
            disabled: Vec::new(),
        }
    }

    #[test]
    fn test_build_mode_parse() {
        assert_eq!("debug".parse::<BuildMode>().unwrap(), BuildMode::Debug);
        assert_eq!("Release".parse::<BuildMode>().unwrap(), BuildMode::Release);
        assert_eq!(
            "release-debug".parse::<BuildMode>().unwrap(),
            BuildMode::Other("release-debug".into())
        );
        assert!("".parse::<BuildMode>().is_err());
    }

    #[test]
    fn test_modes_ordered_debug_first() {
        let mut a = axes();
        a.build_modes.push(BuildMode::Other("profile".into()));
        a.build_modes.insert(0, BuildMode::Other("cov".into()));
        let modes: Vec<_> = a.ordered_modes().iter().map(|m| m.to_string()).collect();
        assert_eq!(modes, ["debug", "plain", "release", "cov", "profile"]);
    }

    #[test]
    fn test_groups_order() {
        let groups = axes().groups("dmd");
        let order: Vec<_> = groups
            .iter()
            .map(|g| format!("{}/{}", g.architecture, g.configuration))
            .collect();
        assert_eq!(order, ["x86_64/dev", "x86_64/twitch", "x86/dev", "x86/twitch"]);
        assert_eq!(groups[1].extra_args, vec!["--nodeps"]);
        assert_eq!(groups[1].cells[0].extra_args, vec!["--nodeps"]);
        assert_eq!(groups[0].cells[0].build_mode, BuildMode::Debug);
    }

    #[test]
    fn test_disabled_cells_skipped() {
        let mut a = axes();
        a.disabled.push(CellFilter {
            arch: Some("x86".into()),
            configuration: None,
            mode: Some(BuildMode::Release),
        });
        a.disabled.push(CellFilter {
            arch: None,
            configuration: Some("twitch".into()),
            mode: None,
        });

        let groups = a.groups("ldc");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].architecture, "x86");
        let modes: Vec<_> = groups[1].cells.iter().map(|c| c.build_mode.clone()).collect();
        assert_eq!(modes, vec![BuildMode::Debug, BuildMode::Plain]);
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        let mut a = axes();
        a.configurations.push("dev".into());
        assert!(a.validate().is_err());

        let mut a = axes();
        a.architectures.clear();
        assert!(a.validate().is_err());

        assert!(axes().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_colliding_artifact_names() {
        // `dev` in plain mode vs `plain-dev` in debug mode
        let mut a = axes();
        a.architectures = vec!["x86_64".into()];
        a.build_modes = vec![BuildMode::Debug, BuildMode::Plain];
        a.configurations = vec!["dev".into(), "plain-dev".into()];
        let err = a.validate().unwrap_err().to_string();
        assert!(err.contains("x86_64/dev/plain"), "{}", err);
        assert!(err.contains("x86_64/plain-dev/debug"), "{}", err);
        assert!(err.contains("-plain-dev`"), "{}", err);

        // non-default arch + `dev` vs default arch + `x86-dev`
        let mut a = axes();
        a.build_modes = vec![BuildMode::Debug];
        a.configurations = vec!["dev".into(), "x86-dev".into()];
        assert!(a.validate().is_err());
    }

    #[test]
    fn test_disabled_cell_cannot_collide() {
        let mut a = axes();
        a.architectures = vec!["x86_64".into()];
        a.build_modes = vec![BuildMode::Debug, BuildMode::Plain];
        a.configurations = vec!["dev".into(), "plain-dev".into()];
        a.disabled.push(CellFilter {
            arch: None,
            configuration: Some("dev".into()),
            mode: Some(BuildMode::Plain),
        });
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_narrow() {
        let mut a = axes();
        a.narrow(&["x86".into()], &[], &[BuildMode::Debug]).unwrap();
        assert_eq!(a.architectures, vec!["x86"]);
        assert_eq!(a.configurations.len(), 2);
        assert_eq!(a.build_modes, vec![BuildMode::Debug]);

        let mut a = axes();
        assert!(a.narrow(&["arm".into()], &[], &[]).is_err());
    }
}
