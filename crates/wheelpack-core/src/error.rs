//! Errors that abort a run before any requirement is processed.
//!
//! Per-attempt failures live in [`crate::fetch::FetchError`]; they are
//! recorded and never propagate past the driver.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain the requirement list.
#[derive(Error, Debug)]
pub enum RequirementsError {
    /// The requirements file does not exist (or is not a regular file).
    #[error("Requirements file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The requirements file exists but could not be read.
    #[error("Failed to read requirements file {}: {source}", path.display())]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Failure to load a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or does not match the schema.
    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Deserialization error.
        #[source]
        source: toml::de::Error,
    },
}

/// Failure to prepare the destination root.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The destination root could not be created.
    #[error("Failed to create base directory {}: {source}", path.display())]
    CreateDest {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
