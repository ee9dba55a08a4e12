//! Buckler client - Rust Implementation
//!
//! An authenticated session client for the Buckler's Boot Camp portal. The
//! portal has no public API: this crate reproduces the browser login through
//! the external identity provider, keeps the resulting cookies, and uses them
//! to read battlelog pages and profile cards.
//!
//! # Architecture
//!
//! - [`session`]: HTTP transport with a shared cookie jar, manual redirect
//!   walking, build identifier cache, encrypted cookie envelopes
//! - [`auth`]: the login state machine and its portal-side fallbacks
//! - [`retrieval`]: battlelog pages and profile cards
//! - [`BucklerClient`]: the facade tying them together, safe to share between
//!   concurrent callers
//!
//! # Usage
//!
//! ```bash
//! CAPCOM_EMAIL=me@example.com CAPCOM_PASSWORD=... buckler fetch --sid 3012345678 --page 1
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use buckler_client::{BucklerClient, CallContext, ConfigLoader};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = ConfigLoader::new().load(None)?;
//! let client = BucklerClient::new(settings)?;
//!
//! let ctx = CallContext::with_timeout(Duration::from_secs(60));
//! let page = client.fetch_match_page(&ctx, "3012345678", 1).await?;
//! println!("{} matches on page {}", page.replay_list.len(), page.current_page);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod retrieval;
pub mod session;
pub mod types;
pub mod utils;

pub use client::BucklerClient;
pub use config::{ConfigLoader, Settings};
pub use error::{Error, Result};
pub use session::{
    CallContext, EnvelopeKey, FileSessionStore, SessionStore, decrypt_envelope, encrypt_envelope,
};
pub use types::{BattlelogPage, CookieEnvelope, MatchRecord, ProfileCard};
