//! Configuration management for spotreg
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use spotreg::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Refreshing every {}s", config.exporter.refresh_interval_seconds);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `SPOTREG__<section>__<key>`
//!
//! Examples:
//! - `SPOTREG__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `SPOTREG__EXPORTER__REFRESH_INTERVAL_SECONDS=60`
//! - `SPOTREG__MODBUS__ENABLED=false`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/spotreg.toml`.
//! This can be overridden using the `SPOTREG_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{
    Config, EntryConfig, ExporterConfig, ModbusConfig, PricesConfig, RegistersConfig,
    ServerConfig,
};
pub use validation::ValidationError;

use crate::registers::{AddressMap, ConfigurationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`SPOTREG__*`)
    /// 2. TOML file (default: `config/spotreg.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (bad register width, colliding addresses, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Build the address map described by `[registers]`
    pub fn address_map(&self) -> Result<AddressMap, ConfigurationError> {
        AddressMap::from_config(&self.registers)
    }
}
