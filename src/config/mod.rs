//! Configuration module
//!
//! Settings file handling: backend selection, session storage location,
//! logging and output format.

pub mod config;

pub use config::{
    ApiConfig, Config, DisplayConfig, Environment, HostsConfig, LoggingConfig,
    SessionExpiryPolicy, StorageConfig,
};
