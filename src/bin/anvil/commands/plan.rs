//! `anvil plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use anvil::core::CompilerSpec;
use anvil::ops::{format_plan, format_plan_json, plan};
use anvil::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: PlanArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let project = config.project_name()?;
    let compiler: CompilerSpec = args
        .compiler
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid --compiler: {}", e))?;

    let mut axes = config.axes()?;
    axes.narrow(&args.matrix.arch, &args.matrix.configuration, &args.matrix.mode)?;

    let entries = plan(project, &compiler.name, &axes);
    if args.json {
        print!("{}", format_plan_json(&entries)?);
    } else {
        print!("{}", format_plan(&entries));
        let disabled = axes.cell_count() - entries.len();
        if disabled > 0 {
            eprintln!("({} disabled cell(s) not shown)", disabled);
        }
    }
    Ok(())
}
