//! `anvil build-<toolchain>` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::BuildArgs;
use anvil::core::CompilerSpec;
use anvil::ops::{build, BuildOptions};
use anvil::util::shell::{Shell, Status};
use anvil::util::GlobalContext;

pub fn execute(
    ctx: &GlobalContext,
    compiler: CompilerSpec,
    args: BuildArgs,
    shell: &Arc<Shell>,
) -> Result<()> {
    let config = ctx.load_config()?;

    let opts = BuildOptions {
        compiler,
        architectures: args.matrix.arch,
        configurations: args.matrix.configuration,
        modes: args.matrix.mode,
        no_install: args.no_install,
    };

    let summary = build(ctx, &config, &opts, shell)?;

    for record in &summary.records {
        shell.verbose(Status::Info, record.output_path.display());
    }
    shell.status(
        Status::Finished,
        format!(
            "{}: {} artifact(s), {} failed build(s)",
            summary.compiler,
            summary.succeeded(),
            summary.failed()
        ),
    );
    Ok(())
}
