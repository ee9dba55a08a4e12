//! Type definitions for the Buckler client
//!
//! This module contains the data structures returned by data retrieval and
//! the serializable session envelope.

pub mod battlelog;
pub mod card;
pub mod envelope;
pub mod serde_helpers;

pub use battlelog::{
    BattlelogPage, BattlelogResponse, MatchOutcome, MatchRecord, Player, PlayerInfo,
};
pub use card::ProfileCard;
pub use envelope::{CookieEnvelope, CookieRecord};
