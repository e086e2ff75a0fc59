//! `anvil install-deps` command

use std::sync::Arc;

use anyhow::Result;

use anvil::ops::install_deps;
use anvil::util::shell::{Shell, Status};
use anvil::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, shell: &Arc<Shell>) -> Result<()> {
    let config = ctx.load_config()?;
    let report = install_deps(&config, shell)?;

    shell.status(
        Status::Finished,
        format!(
            "{} package(s), {} source(s) cloned, {} skipped",
            report.packages,
            report.cloned.len(),
            report.skipped.len()
        ),
    );
    Ok(())
}
