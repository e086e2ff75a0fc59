//! Implementation of `anvil build-<toolchain>`.
//!
//! Fetch the installer, activate the compiler, then run the matrix and
//! record artifacts.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::builder::Dub;
use crate::core::artifact::ArtifactRecord;
use crate::core::compiler::CompilerSpec;
use crate::core::matrix::BuildMode;
use crate::ops::matrix_run::MatrixRunner;
use crate::ops::record::ArtifactRecorder;
use crate::toolchain::{
    ActivatedCompiler, FetchOptions, HttpTransport, InstallerFetcher, ToolchainActivator,
};
use crate::util::config::Config;
use crate::util::context::GlobalContext;
use crate::util::fs::expand_home;
use crate::util::process::require_executable;
use crate::util::shell::Shell;

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub compiler: CompilerSpec,

    /// Restrict to these architectures (empty = all)
    pub architectures: Vec<String>,

    /// Restrict to these configurations (empty = all)
    pub configurations: Vec<String>,

    /// Restrict to these build modes (empty = all)
    pub modes: Vec<BuildMode>,

    /// Use the compiler already on PATH instead of installing it
    pub no_install: bool,
}

impl BuildOptions {
    pub fn new(compiler: CompilerSpec) -> Self {
        BuildOptions {
            compiler,
            architectures: Vec::new(),
            configurations: Vec::new(),
            modes: Vec::new(),
            no_install: false,
        }
    }
}

/// Result of a finished run.
#[derive(Debug)]
pub struct BuildSummary {
    pub compiler: String,
    pub records: Vec<ArtifactRecord>,
}

impl BuildSummary {
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.succeeded()
    }
}

/// Run the full pipeline for one compiler.
pub fn build(
    ctx: &GlobalContext,
    config: &Config,
    opts: &BuildOptions,
    shell: &Arc<Shell>,
) -> Result<BuildSummary> {
    let project = config.project_name()?;
    let binary = config.binary_name()?;

    let mut axes = config.axes()?;
    axes.narrow(&opts.architectures, &opts.configurations, &opts.modes)?;

    let compiler = if opts.no_install {
        let compiler = ActivatedCompiler::from_path(opts.compiler.clone());
        require_executable(&compiler.binary)?;
        compiler
    } else {
        activate(ctx, config, &opts.compiler, shell)?
    };

    let program = config.build_tool_program();
    require_executable(program)
        .with_context(|| format!("build tool `{}` is required to run the matrix", program))?;

    let tool = Dub::new(program, config.project_dir(), &binary, Arc::clone(shell));
    let recorder =
        ArtifactRecorder::new(config.artifacts_dir(), Path::new(&binary), Arc::clone(shell))?;
    let records =
        MatrixRunner::new(project, axes, &tool, recorder, Arc::clone(shell)).run(&compiler)?;

    Ok(BuildSummary {
        compiler: compiler.spec.to_string(),
        records,
    })
}

/// Download the installer into the scratch directory and activate `spec`.
fn activate(
    ctx: &GlobalContext,
    config: &Config,
    spec: &CompilerSpec,
    shell: &Arc<Shell>,
) -> Result<ActivatedCompiler> {
    let fetch_opts = FetchOptions::from_config(config)?;
    let transport = HttpTransport::new(&config.user_agent())?;
    let installer = InstallerFetcher::new(transport, Arc::clone(shell))
        .fetch_to(&fetch_opts, &ctx.scratch_dir())?;

    let install_root = config
        .installer
        .install_root
        .as_deref()
        .map(expand_home);
    let compiler = ToolchainActivator::new(installer, Arc::clone(shell))
        .with_install_root(install_root)
        .activate(spec)?;
    Ok(compiler)
}
