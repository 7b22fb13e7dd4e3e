use rsu_config::{mask_api_key, valid_api_key};

use crate::cli::{CliContext, LoginArgs};
use crate::error::{CliError, CliResult};

pub(crate) fn handle_login(ctx: &CliContext, args: &LoginArgs) -> CliResult<()> {
    let key = args.api_key.trim();
    if !valid_api_key(key) {
        return Err(CliError::validation(
            "API key must look like <40 hex>;<40 hex>;<account id>; copy it from your sc2replaystats settings",
        ));
    }

    let mut config = ctx.store.load()?;
    config.api_key = Some(key.to_string());
    ctx.store.save(&config)?;

    println!(
        "API key {} saved to {}",
        mask_api_key(key),
        ctx.store.path().display()
    );
    Ok(())
}
