//! Argument parsing and command dispatch for `rsu`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rsu_config::ConfigStore;
use rsu_telemetry::LogFormat;

use crate::commands::config::{handle_config_set_root, handle_config_show};
use crate::commands::login::handle_login;
use crate::commands::run::handle_run;
use crate::error::CliResult;

/// Parses CLI arguments and executes the requested command. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

pub(crate) async fn dispatch(cli: Cli) -> CliResult<()> {
    let ctx = CliContext::from_cli(&cli)?;
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => handle_run(&ctx).await,
        Command::Login(args) => handle_login(&ctx, &args),
        Command::Config(ConfigCommand::Show) => handle_config_show(&ctx),
        Command::Config(ConfigCommand::SetRoot(args)) => handle_config_set_root(&ctx, &args),
    }
}

/// Settings shared by every command handler.
#[derive(Debug, Clone)]
pub(crate) struct CliContext {
    pub(crate) store: ConfigStore,
    pub(crate) log_level: Option<String>,
    pub(crate) log_format: Option<LogFormat>,
}

impl CliContext {
    fn from_cli(cli: &Cli) -> CliResult<Self> {
        Ok(Self {
            store: ConfigStore::locate(cli.config.clone())?,
            log_level: cli.log_level.clone(),
            log_format: cli.log_format,
        })
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "rsu",
    version,
    about = "Watches StarCraft II replay folders and uploads new replays to sc2replaystats"
)]
pub(crate) struct Cli {
    /// Path of the configuration file.
    #[arg(long, global = true, env = "RSU_CONFIG")]
    pub(crate) config: Option<PathBuf>,
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "RSU_LOG_LEVEL")]
    pub(crate) log_level: Option<String>,
    /// Log output format (json, pretty or compact).
    #[arg(long, global = true, env = "RSU_LOG_FORMAT", value_parser = parse_log_format)]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Watch for new replays and upload them (default).
    Run,
    /// Store the sc2replaystats API key.
    Login(LoginArgs),
    /// Inspect or change the configuration file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub(crate) enum ConfigCommand {
    /// Print the configuration with the API key masked.
    Show,
    /// Set the replays root used to find account folders.
    SetRoot(SetRootArgs),
}

#[derive(Args, Debug)]
pub(crate) struct LoginArgs {
    /// API key from the sc2replaystats account settings page.
    pub(crate) api_key: String,
}

#[derive(Args, Debug)]
pub(crate) struct SetRootArgs {
    /// Installation `Accounts` directory.
    pub(crate) path: PathBuf,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse().map_err(|_| {
        format!("unknown log format '{value}', expected one of: json, pretty, compact")
    })
}
