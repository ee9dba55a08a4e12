//! Data retrieval against the logged-in portal
//!
//! Battlelog pages live behind build-identifier-qualified data URLs; the
//! profile card is a plain REST endpoint. Both log in first when needed.

pub mod battlelog;
pub mod build_id;
pub mod card;

pub use battlelog::battlelog_path;
