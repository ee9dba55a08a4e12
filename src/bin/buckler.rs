//! Command-line client for the Buckler's Boot Camp portal
//!
//! Logs in with the configured account and prints portal data as JSON.
//!
//! # Usage
//!
//! ```bash
//! buckler login
//! buckler fetch --sid 3012345678 --page 2
//! buckler card --sid 3012345678
//! buckler export-session
//! ```
//!
//! Credentials come from the configuration file or `CAPCOM_EMAIL` /
//! `CAPCOM_PASSWORD`. With `BUCKLER_COOKIE_ENC_KEY` set, the session is
//! restored before and saved after every command.

use buckler_client::cli::{self, Command, GlobalArgs};
use clap::Parser;

/// Buckler's Boot Camp portal client
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "buckler")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match cli::load_settings(&cli.global) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Logs go to stderr so stdout stays machine-readable
    let level = if cli.global.verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    cli::init_logging(level);
    tracing::debug!("buckler v{}", buckler_client::utils::get_version());

    if let Err(e) = cli::run(settings, cli.command).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
