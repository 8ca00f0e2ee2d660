//! Configuration module for Immo-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has built-in defaults, so an empty file (or no file at all)
//! yields the stock set of private-sale categories.
//!
//! # Example
//!
//! ```no_run
//! use immo_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Scanning {} categories", config.categories.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CategoryEntry, Config, DelayWindow, HttpConfig, PacingConfig, ScannerConfig, SelectorConfig,
    SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
