//! Error types for the dvdsalvage core library

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for copy and repair runs
///
/// Only setup and output failures are errors. A sector that cannot be read is
/// recorded in the ledger and reported in the run summary instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Source path does not exist
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// The disc or its `VIDEO_TS` directory could not be opened
    #[error("Error opening device {path}: {reason}")]
    DeviceOpen {
        /// Device or directory that was opened
        path: PathBuf,
        /// Why it failed
        reason: String,
    },

    /// The logical file list could not be obtained
    #[error("Inventory unavailable: {0}")]
    Inventory(String),

    /// A duplicate must be linked to a file that was never written
    #[error("Must link {link} to {original}, but the latter doesn't exist")]
    BrokenDuplicate {
        /// Path the hard link would be created at
        link: PathBuf,
        /// Path of the original file
        original: PathBuf,
    },

    /// A duplicate's destination exists and is a different file
    #[error("{link} exists and isn't a hard link to {original}. You must remove it to proceed")]
    LinkConflict {
        /// Path of the conflicting file
        link: PathBuf,
        /// Path the file should have been linked to
        original: PathBuf,
    },

    /// IO error on the destination
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Platform layer failure (identity lookup, linking)
    #[error(transparent)]
    Platform(#[from] dvdsalvage_platform::PlatformError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The bad-sector ledger could not be read or appended to
    #[error("Ledger error for {path}: {source}")]
    Ledger {
        /// Ledger path
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },
}

/// Result type alias using the dvdsalvage error type
pub type Result<T> = std::result::Result<T, Error>;
