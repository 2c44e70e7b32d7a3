use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    // Fatal startup errors. These abort the run before any track is processed.
    #[error("Cannot reach the Plex server: {0}")]
    Connection(String),
    #[error("Plex rejected the configured token: {0}")]
    Auth(String),
    #[error("Music library does not exist: {name}")]
    LibraryNotFound { name: String },
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },
    #[error("Failed to decode configuration file ({}): {message}", path.display())]
    ConfigDecode { path: PathBuf, message: String },
    #[error("Missing key {key} in configuration file ({})", path.display())]
    ConfigMissingKey { key: String, path: PathBuf },
    #[error("Invalid value for {key} in configuration file ({}): {message}", path.display())]
    ConfigInvalidValue { key: String, path: PathBuf, message: String },

    // Per-track errors. Caught at the reconciler boundary and classified into
    // a sync outcome; they never abort the run.
    #[error("File not found: {}", path.display())]
    PathNotFound { path: PathBuf },
    #[error("Not a supported audio format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("Failed to read tags from {}: {message}", path.display())]
    TagRead { path: PathBuf, message: String },
    #[error("Failed to write tags to {}: {message}", path.display())]
    TagWrite { path: PathBuf, message: String },
    #[error("Rating verification failed for {}: wrote {expected}, read back {actual}", path.display())]
    VerificationMismatch { path: PathBuf, expected: String, actual: String },
    #[error("Plex write failed: {0}")]
    CatalogWrite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
