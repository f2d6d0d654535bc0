//! # Runtime Error Types
//!
//! Only boundary operations fail: loading configuration and hosting a loop
//! on a thread. Simulation calls normalise bad input instead of erroring.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its allowed range.
    #[error("invalid configuration: {field} {reason}")]
    Invalid {
        /// Dotted key of the offending value, e.g. `tick.target_tps`.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Errors raised by the threaded loop driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The driver thread could not be started.
    #[error("failed to spawn driver thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The driver thread is gone and can no longer take commands.
    #[error("driver thread disconnected")]
    Disconnected,

    /// The driver thread panicked.
    #[error("driver thread panicked: {0}")]
    Panicked(String),
}

/// Result of configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result of driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
