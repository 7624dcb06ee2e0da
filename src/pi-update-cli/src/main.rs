//! pi-update - terminal front end for the pi update checker.
//!
//! - `update` - check the registry now and offer to install
//! - `session-start` / `session-switch` - the passive checks a pi session runs
//! - `status` / `dismiss` - inspect and edit the version cache

mod cli;
mod terminal_ui;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, LogLevel, dispatch_command};

/// Environment variable overriding the log level
const LOG_LEVEL_ENV: &str = "PI_UPDATE_LOG";

/// Install the stderr log subscriber.
fn init_logging(cli: &Cli) {
    let log_level = if cli.global.verbose {
        LogLevel::Debug
    } else if let Ok(env_level) = std::env::var(LOG_LEVEL_ENV) {
        LogLevel::from_str_loose(&env_level).unwrap_or(cli.global.log_level)
    } else {
        cli.global.log_level
    };

    // RUST_LOG wins when set; otherwise quiet dependencies and apply the level to our crates.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "warn,pi_update={},pi_update_cli={}",
            log_level.as_filter_str(),
            log_level.as_filter_str()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    dispatch_command(cli).await
}
