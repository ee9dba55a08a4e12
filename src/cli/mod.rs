//! Command-line tool logic
//!
//! The `buckler` binary parses arguments and hands them to [`run`]. Keeping
//! the logic in the library lets it be tested without spawning a process.

pub mod commands;
pub mod output;

pub use commands::{Command, GlobalArgs, load_settings, run};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr log subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
