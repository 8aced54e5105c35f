//! bigswitchd — the big-switch deploy button daemon.
//!
//! Assembles the appliance:
//! - Release-manager client (status + promotion)
//! - Drift watcher, one task per configured service
//! - Confirmation pipeline fed by the button
//! - Log-backed notifier standing in for the lamp and display
//!
//! # Usage
//!
//! ```text
//! bigswitchd start --config /etc/big-switch/big-switch.toml
//! kill -HUP $(pidof bigswitchd)   # press the button
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod button;
mod commands;
mod notifier;
mod restart;

#[derive(Parser)]
#[command(
    name = "bigswitchd",
    about = "big-switch production deployer",
    version,
    propagate_version = true
)]
struct Cli {
    /// Turn on debug logging.
    #[arg(long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start watching the configured services and wait for the button.
    Start {
        /// Path to the config file.
        #[arg(short, long, default_value = "big-switch.toml")]
        config: PathBuf,
    },
    /// Print the current dev/prod artifacts of every configured service.
    Status {
        #[arg(short, long, default_value = "big-switch.toml")]
        config: PathBuf,
    },
    /// Validate the config file and print what would be watched.
    CheckConfig {
        #[arg(short, long, default_value = "big-switch.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.log_json)?;

    match cli.command {
        Command::Start { config } => commands::start::run(&config).await,
        Command::Status { config } => commands::status::run(&config).await,
        Command::CheckConfig { config } => commands::check::run(&config),
    }
}

fn init_tracing(debug: bool, json: bool) -> anyhow::Result<()> {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| "info,bigswitch=debug".parse())?
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
