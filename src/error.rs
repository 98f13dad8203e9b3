// src/error.rs

use thiserror::Error;

/// Core error types for elprofile
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The installed package list could not be produced
    #[error("Could not list installed packages: {0}")]
    EnumerationError(String),

    /// The package database has no such package
    #[error("Package not installed: {0}")]
    NotInstalled(String),

    /// A single attribute query failed (spawn failure, timeout, bad output)
    #[error("Query failed: {0}")]
    QueryError(String),

    /// Profile file could not be read
    #[error("Could not open profile file: {0}")]
    ProfileReadError(String),

    /// Profile file is not a valid profile document
    #[error("Could not parse profile: {0}")]
    ProfileParseError(String),

    /// Profile could not be serialized
    #[error("Could not write profile: {0}")]
    ProfileWriteError(String),
}

/// Result type alias using elprofile's Error type
pub type Result<T> = std::result::Result<T, Error>;
