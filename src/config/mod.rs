//! Configuration management for the Buckler client
//!
//! This module handles loading and managing configuration settings
//! for the library client and the command-line tool.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::Settings;
