//! Implementation of `anvil plan`.
//!
//! A dry run of the matrix: every enabled cell in execution order, the
//! artifact name it would produce and whether its failure aborts the run.

use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;

use crate::core::artifact::CellIdentity;
use crate::core::matrix::{BuildMode, MatrixAxes};

/// Whether a failing cell stops the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Hard,
    Soft,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Hard => "hard",
            FailurePolicy::Soft => "soft",
        }
    }
}

/// One planned build cell.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub artifact: CellIdentity,
    pub compiler: String,
    pub architecture: String,
    pub configuration: String,
    pub build_mode: BuildMode,
    pub policy: FailurePolicy,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

/// List the enabled cells for `compiler` in execution order.
pub fn plan(project: &str, compiler: &str, axes: &MatrixAxes) -> Vec<PlanEntry> {
    axes.groups(compiler)
        .into_iter()
        .flat_map(|group| group.cells)
        .map(|cell| PlanEntry {
            artifact: CellIdentity::new(project, &cell, &axes.default_arch),
            policy: if cell.build_mode.is_hard_fail() {
                FailurePolicy::Hard
            } else {
                FailurePolicy::Soft
            },
            compiler: cell.compiler,
            architecture: cell.architecture,
            configuration: cell.configuration,
            build_mode: cell.build_mode,
            extra_args: cell.extra_args,
        })
        .collect()
}

/// One line per cell: `<artifact>  <arch> <config> <mode> (<policy>)`.
pub fn format_plan(entries: &[PlanEntry]) -> String {
    let width = entries
        .iter()
        .map(|e| e.artifact.as_str().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for entry in entries {
        let _ = write!(
            out,
            "{:<width$}  {} {} {} ({})",
            entry.artifact.as_str(),
            entry.architecture,
            entry.configuration,
            entry.build_mode,
            entry.policy.as_str(),
            width = width
        );
        if !entry.extra_args.is_empty() {
            let _ = write!(out, " [{}]", entry.extra_args.join(" "));
        }
        out.push('\n');
    }
    out
}

/// One JSON object per line.
pub fn format_plan_json(entries: &[PlanEntry]) -> Result<String> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&serde_json::to_string(entry)?);
        out.push('\n');
    }
    Ok(out)
}
