//! CLI argument structures and command dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use pi_update::{
    HookContext, LifecycleEvent, UpdateConfig, UpdateController, UpdateOutcome, UpdateUi,
    UpgradeDecision,
};

use crate::terminal_ui::TerminalUi;

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors
    Warn,
    /// Show informational messages, warnings, and errors (default)
    #[default]
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Check for and install pi updates.
#[derive(Debug, Parser)]
#[command(name = "pi-update", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Version cache file (default: ~/.pi/agent/update-cache.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_path: Option<PathBuf>,

    /// npm registry base URL
    #[arg(long, global = true, value_name = "URL")]
    pub registry_url: Option<String>,

    /// Pretend this version is installed
    #[arg(long, global = true, value_name = "VERSION")]
    pub current_version: Option<String>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Shorthand for --log-level debug
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Build the update config: defaults, then environment, then flags.
    pub fn to_config(&self) -> UpdateConfig {
        let mut config = UpdateConfig::from_env();
        if let Some(path) = &self.cache_path {
            config = config.with_cache_path(path.clone());
        }
        if let Some(url) = &self.registry_url {
            config = config.with_registry_url(url.clone());
        }
        if let Some(version) = &self.current_version {
            config = config.with_current_version(version.clone());
        }
        config
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check the registry now and offer to install a newer version
    Update,

    /// Run the session-start check (answers from cache, refreshes it)
    SessionStart(LifecycleArgs),

    /// Run the session-switch check
    SessionSwitch(LifecycleArgs),

    /// Show the cached version and whether a prompt would be shown
    Status,

    /// Stop prompting for a version
    Dismiss {
        /// Version to skip
        version: String,
    },
}

#[derive(Debug, Args)]
pub struct LifecycleArgs {
    /// Behave like a non-interactive session
    #[arg(long)]
    pub no_ui: bool,
}

/// Dispatch the parsed command.
pub async fn dispatch_command(cli: Cli) -> Result<()> {
    let config = cli.global.to_config();
    tracing::debug!("Using update cache at {}", config.cache_path.display());
    let controller = Arc::new(UpdateController::new(config));

    match cli.command {
        Commands::Update => {
            let ui = TerminalUi::new();
            let outcome = controller.run_update_command(&ui).await;
            tracing::debug!(?outcome, "Update command finished");
            if outcome == UpdateOutcome::Unreachable {
                std::process::exit(1);
            }
        }
        Commands::SessionStart(args) => {
            run_lifecycle(&controller, LifecycleEvent::SessionStart, &args).await?;
        }
        Commands::SessionSwitch(args) => {
            run_lifecycle(&controller, LifecycleEvent::SessionSwitch, &args).await?;
        }
        Commands::Status => print_status(&controller),
        Commands::Dismiss { version } => {
            if controller.cache().read().is_none() {
                println!("No update cache yet; nothing to dismiss.");
            } else {
                controller.dismiss(&version);
                println!("Will not prompt for {} again.", version);
            }
        }
    }

    Ok(())
}

async fn run_lifecycle(
    controller: &Arc<UpdateController>,
    event: LifecycleEvent,
    args: &LifecycleArgs,
) -> Result<()> {
    let ctx = if args.no_ui {
        HookContext::headless()
    } else {
        let ui: Arc<dyn UpdateUi> = Arc::new(TerminalUi::new());
        HookContext::with_ui(ui)
    };

    if let Some(prompt) = controller.handle_lifecycle(event, &ctx) {
        let outcome = prompt.await.context("Update prompt task failed")?;
        tracing::debug!(?outcome, "Update prompt finished");
    }

    // This process is about to exit; let the cache refresh land first.
    controller.wait_for_background().await;
    Ok(())
}

fn print_status(controller: &UpdateController) {
    let config = controller.config();
    println!("Current version: {}", config.current_version);
    println!("Cache file:      {}", controller.cache().path().display());

    match controller.cache().read() {
        Some(cache) => {
            println!("Latest known:    {}", cache.latest_version);
            if let Some(dismissed) = &cache.dismissed_version {
                println!("Dismissed:       {}", dismissed);
            }
        }
        None => println!("Latest known:    (no cache)"),
    }

    println!("Installed via:   {}", controller.package_manager());

    match controller.decide() {
        UpgradeDecision::Prompt(version) => {
            println!("\n→ Update available: {} → {}", config.current_version, version);
            println!("  {}", controller.install_command(&version));
        }
        UpgradeDecision::Dismissed(version) => {
            println!("\n{} is available but was dismissed.", version);
        }
        UpgradeDecision::UpToDate => println!("\n✓ Up to date."),
        UpgradeDecision::NoCache => {
            println!("\nNo version information yet. Run `pi-update update` to check.");
        }
    }
}
