//! Utility functions and helpers
//!
//! This module contains utility functions used throughout the application.

pub mod random;
pub mod version;

pub use random::random_state;
pub use version::get_version;
