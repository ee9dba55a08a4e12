//! Subcommands of the `buckler` tool

use super::output::{MatchPageSummary, SessionStatus};
use crate::{
    BucklerClient, CallContext, ConfigLoader, FileSessionStore, Settings,
    config::loader::default_session_path, session::envelope,
};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Options shared by every subcommand
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Encrypted session file (used when a cookie key is configured)
    #[arg(long, global = true, value_name = "FILE")]
    pub session_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in and report whether the portal session is established
    Login {
        /// Drop any restored session and log in from scratch
        #[arg(long)]
        force: bool,
    },
    /// Fetch one page of a player's custom-room battlelog
    Fetch {
        /// Player short id
        #[arg(long)]
        sid: String,
        /// Page number (values below 1 mean 1)
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,
    },
    /// Fetch a player's profile card
    Card {
        /// Player short id
        #[arg(long)]
        sid: String,
    },
    /// Print the current session: encrypted when a cookie key is set,
    /// otherwise as plain JSON envelopes
    ExportSession,
}

/// Settings from file and environment with command-line overrides applied
pub fn load_settings(args: &GlobalArgs) -> crate::Result<Settings> {
    let mut settings = ConfigLoader::new().load_unvalidated(args.config.as_deref())?;
    if let Some(timeout) = args.timeout {
        settings.network.timeout_secs = timeout;
    }
    if let Some(path) = &args.session_file {
        settings.session.store_path = Some(path.clone());
    }
    if args.verbose {
        settings.logging.debug = true;
    }
    settings.validate()?;
    Ok(settings)
}

/// Run one subcommand; its output goes to stdout
pub async fn run(settings: Settings, command: Command) -> Result<()> {
    let store = settings.session.cookie_key.as_ref().and_then(|_| {
        settings
            .session
            .store_path
            .clone()
            .or_else(default_session_path)
            .map(FileSessionStore::new)
    });
    let client = BucklerClient::new(settings).context("failed to build client")?;

    if let Some(store) = &store {
        match client.restore_session(store).await {
            Ok(true) => tracing::info!("Restored session from {}", store.path().display()),
            Ok(false) => {}
            Err(e) => tracing::warn!("Ignoring stored session: {}", e),
        }
    }

    let ctx = CallContext::background();
    let output = match command {
        Command::Login { force } => {
            if force {
                client.session().clear_cookies();
            }
            client.ensure_login(&ctx).await?;
            serde_json::to_string_pretty(&SessionStatus::from_client(&client))?
        }
        Command::Fetch { sid, page } => {
            let result = client.fetch_match_page(&ctx, &sid, page).await?;
            serde_json::to_string_pretty(&MatchPageSummary::new(&sid, &result))?
        }
        Command::Card { sid } => {
            let card = client.fetch_profile_card(&ctx, &sid).await?;
            serde_json::to_string_pretty(&card)?
        }
        Command::ExportSession => export_session(&client)?,
    };

    if let Some(store) = &store {
        client
            .persist_session(store)
            .await
            .context("failed to persist session")?;
    }

    println!("{}", output);
    Ok(())
}

fn export_session(client: &BucklerClient) -> Result<String> {
    let settings = client.settings();
    let bundle = vec![
        client.export_session(&settings.portal.base_url)?,
        client.export_session(&settings.identity.base_url)?,
    ];
    match settings.session.cookie_key.as_deref() {
        Some(raw) => {
            let key = crate::EnvelopeKey::parse(raw)?;
            Ok(envelope::seal(&key, &bundle)?)
        }
        None => Ok(serde_json::to_string_pretty(&bundle)?),
    }
}
