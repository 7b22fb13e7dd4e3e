use anyhow::Context;

use crate::cli::{CliContext, SetRootArgs};
use crate::error::{CliError, CliResult};

pub(crate) fn handle_config_show(ctx: &CliContext) -> CliResult<()> {
    let config = ctx.store.load()?;
    let rendered = serde_json::to_string_pretty(&config.masked())
        .context("failed to render configuration")
        .map_err(CliError::failure)?;
    println!("# {}", ctx.store.path().display());
    println!("{rendered}");
    Ok(())
}

pub(crate) fn handle_config_set_root(ctx: &CliContext, args: &SetRootArgs) -> CliResult<()> {
    if !args.path.is_dir() {
        return Err(CliError::validation(format!(
            "{} is not a directory",
            args.path.display()
        )));
    }

    let mut config = ctx.store.load()?;
    config.replays_root = Some(args.path.clone());
    ctx.store.save(&config)?;
    println!("replays root set to {}", args.path.display());
    Ok(())
}
