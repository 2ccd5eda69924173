use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Unified error type for pdf-unlocker-core
///
/// Every failure a run can hit ends up here:
/// - Opening the source (missing file, not a PDF, wrong password)
/// - Copying pages through the document library
/// - Saving the unlocked copy
/// - Loading configuration
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse the source PDF
    #[error("failed to open PDF: {0}")]
    Open(String),

    /// The source is encrypted and the password was rejected
    #[error("failed to decrypt PDF: {0}")]
    Password(String),

    /// No output name can be derived from the source path
    #[error("not a file path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Failed to write the unlocked copy
    #[error("failed to save PDF: {0}")]
    Save(String),

    /// Any other failure raised by the document library mid-copy
    #[error("unexpected PDF error: {0}")]
    Unexpected(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Source missing, corrupt, or password mismatch
    Open,
    /// Destination not writable
    Save,
    /// Anything else
    Unexpected,
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Open(_) | Self::Password(_) | Self::InvalidPath(_) => ErrorKind::Open,
            Self::Save(_) => ErrorKind::Save,
            Self::Unexpected(_)
            | Self::ConfigLoad(_)
            | Self::ConfigInvalid { .. }
            | Self::Io(_) => ErrorKind::Unexpected,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Save => "save",
            Self::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
