//! dub build tool.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use super::{BuildTool, PhaseStatus};
use crate::core::matrix::{CellGroup, MatrixCell};
use crate::toolchain::ActivatedCompiler;
use crate::util::process::ProcessBuilder;
use crate::util::shell::Shell;

/// Drives `dub` in the project directory.
pub struct Dub {
    program: PathBuf,
    project_dir: PathBuf,
    binary: String,
    shell: Arc<Shell>,
}

impl Dub {
    pub fn new(
        program: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
        binary: impl Into<String>,
        shell: Arc<Shell>,
    ) -> Self {
        Dub {
            program: program.into(),
            project_dir: project_dir.into(),
            binary: binary.into(),
            shell,
        }
    }

    pub fn clean_command(&self, compiler: &ActivatedCompiler) -> ProcessBuilder {
        self.base(compiler).arg("clean")
    }

    pub fn test_command(&self, group: &CellGroup, compiler: &ActivatedCompiler) -> ProcessBuilder {
        self.base(compiler)
            .arg("test")
            .arg(format!("--compiler={}", compiler.binary))
            .arg(format!("--arch={}", group.architecture))
            .args(["-c", group.configuration.as_str()])
            .args(&group.extra_args)
    }

    pub fn build_command(&self, cell: &MatrixCell, compiler: &ActivatedCompiler) -> ProcessBuilder {
        self.base(compiler)
            .arg("build")
            .arg(format!("--compiler={}", compiler.binary))
            .arg(format!("--arch={}", cell.architecture))
            .arg(format!("--build={}", cell.build_mode))
            .args(["-c", cell.configuration.as_str()])
            .args(&cell.extra_args)
    }

    fn base(&self, compiler: &ActivatedCompiler) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
            .cwd(&self.project_dir)
            .envs(compiler.overlay.iter())
    }

    fn run(&self, cmd: ProcessBuilder) -> Result<PhaseStatus> {
        self.shell.command(&cmd);
        let status = cmd.status()?;
        Ok(PhaseStatus::from(status))
    }
}

impl BuildTool for Dub {
    fn name(&self) -> &str {
        "dub"
    }

    fn clean(&self, _group: &CellGroup, compiler: &ActivatedCompiler) -> Result<PhaseStatus> {
        self.run(self.clean_command(compiler))
    }

    fn test(&self, group: &CellGroup, compiler: &ActivatedCompiler) -> Result<PhaseStatus> {
        self.run(self.test_command(group, compiler))
    }

    fn build(&self, cell: &MatrixCell, compiler: &ActivatedCompiler) -> Result<PhaseStatus> {
        self.run(self.build_command(cell, compiler))
    }

    fn output_binary(&self) -> PathBuf {
        self.project_dir.join(&self.binary)
    }
}
