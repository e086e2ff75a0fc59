//! Matrix execution for one activated compiler.
//!
//! For every (architecture, configuration) group the project is cleaned and
//! tested; then each enabled build mode is built in order and handed to the
//! [`ArtifactRecorder`]. A failing test phase or debug build aborts the run
//! before any later cell starts. Other build modes only leave a `.failed`
//! marker behind.

use std::sync::Arc;

use anyhow::Result;

use crate::builder::{BuildTool, PhaseStatus};
use crate::core::artifact::{ArtifactRecord, CellIdentity, Outcome};
use crate::core::error::AnvilError;
use crate::core::matrix::{CellGroup, MatrixAxes, MatrixCell};
use crate::ops::record::ArtifactRecorder;
use crate::toolchain::ActivatedCompiler;
use crate::util::fs::remove_file_if_exists;
use crate::util::shell::{Shell, Status};

/// Runs the build matrix through a [`BuildTool`].
pub struct MatrixRunner<'a> {
    project: String,
    axes: MatrixAxes,
    tool: &'a dyn BuildTool,
    recorder: ArtifactRecorder,
    shell: Arc<Shell>,
}

impl<'a> MatrixRunner<'a> {
    pub fn new(
        project: impl Into<String>,
        axes: MatrixAxes,
        tool: &'a dyn BuildTool,
        recorder: ArtifactRecorder,
        shell: Arc<Shell>,
    ) -> Self {
        MatrixRunner {
            project: project.into(),
            axes,
            tool,
            recorder,
            shell,
        }
    }

    /// Run every enabled cell for `compiler`.
    ///
    /// Returns the records of all attempted cells, or the first fatal error.
    pub fn run(&mut self, compiler: &ActivatedCompiler) -> Result<Vec<ArtifactRecord>> {
        self.report_disabled(compiler);

        let mut records = Vec::new();
        for group in self.axes.groups(compiler.label()) {
            self.run_group(&group, compiler, &mut records)?;
        }
        Ok(records)
    }

    fn run_group(
        &mut self,
        group: &CellGroup,
        compiler: &ActivatedCompiler,
        records: &mut Vec<ArtifactRecord>,
    ) -> Result<()> {
        let group_id = CellIdentity::for_group(&self.project, group, &self.axes.default_arch);
        tracing::debug!(
            "group {} / {}: {} cell(s)",
            group.architecture,
            group.configuration,
            group.cells.len()
        );

        self.shell.status(Status::Cleaning, &group_id);
        let clean = self.phase("clean", self.tool.clean(group, compiler));
        if !clean.passed() {
            self.shell.warn(format!(
                "`{} clean` failed for {}; continuing",
                self.tool.name(),
                group_id
            ));
        }

        let span = self.shell.span(Status::Testing, &group_id);
        let test = self.phase("test", self.tool.test(group, compiler));
        if !test.passed() {
            span.fail(format!("tests for {}", group_id));
            return Err(AnvilError::TestPhaseFailed {
                cell: group_id.to_string(),
                code: test.code(),
            }
            .into());
        }
        span.finish_with_message(format!("tests for {}", group_id));

        for cell in &group.cells {
            records.push(self.build_cell(cell, compiler)?);
        }
        Ok(())
    }

    /// Build and record one cell. Fails only when a hard-fail cell did not
    /// produce an artifact.
    fn build_cell(
        &mut self,
        cell: &MatrixCell,
        compiler: &ActivatedCompiler,
    ) -> Result<ArtifactRecord> {
        let id = CellIdentity::new(&self.project, cell, &self.axes.default_arch);
        let binary = self.tool.output_binary();
        // a failed build must never pick up the previous cell's output
        remove_file_if_exists(&binary)?;

        let span = self.shell.span(Status::Building, &id);
        let status = self.phase("build", self.tool.build(cell, compiler));
        let outcome = if status.passed() {
            span.finish_with_message(id.to_string());
            Outcome::Success(binary)
        } else {
            span.fail(id.to_string());
            Outcome::Failure(self.describe(&status))
        };

        let record = self.recorder.record(&id, outcome)?;
        if record.is_success() {
            return Ok(record);
        }

        let code = match status {
            PhaseStatus::Passed => None,
            PhaseStatus::Failed { code } => code,
        };
        let err = if cell.build_mode.is_hard_fail() {
            AnvilError::DebugBuildFailed {
                cell: id.to_string(),
                code,
            }
        } else {
            AnvilError::SoftBuildFailed {
                cell: id.to_string(),
                code,
            }
        };
        if err.is_fatal() {
            return Err(err.into());
        }
        tracing::warn!("{}; continuing", err);
        Ok(record)
    }

    /// Collapse a phase result; a tool that cannot be run counts as failed.
    fn phase(&self, what: &str, result: Result<PhaseStatus>) -> PhaseStatus {
        match result {
            Ok(status) => status,
            Err(e) => {
                self.shell
                    .error(format!("could not run `{} {}`: {:#}", self.tool.name(), what, e));
                PhaseStatus::Failed { code: None }
            }
        }
    }

    fn describe(&self, status: &PhaseStatus) -> String {
        match status.code() {
            Some(code) => format!("{} exited with code {}", self.tool.name(), code),
            None => format!("{} did not exit normally", self.tool.name()),
        }
    }

    fn report_disabled(&self, compiler: &ActivatedCompiler) {
        for arch in &self.axes.architectures {
            for configuration in &self.axes.configurations {
                for mode in self.axes.ordered_modes() {
                    if !self.axes.is_disabled(arch, configuration, &mode) {
                        continue;
                    }
                    let cell = MatrixCell {
                        compiler: compiler.label().to_string(),
                        architecture: arch.clone(),
                        build_mode: mode,
                        configuration: configuration.clone(),
                        extra_args: Vec::new(),
                    };
                    let id = CellIdentity::new(&self.project, &cell, &self.axes.default_arch);
                    self.shell.verbose(Status::Skipped, format!("{} (disabled)", id));
                    tracing::info!("skipping disabled cell {}", id);
                }
            }
        }
    }
}
