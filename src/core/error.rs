use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VolumapperError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Environment variable error: {0}")]
    EnvVarError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// A snapshot the store itself reported could not be read back.
    #[error("Snapshot store corrupted at {path}: {reason}")]
    StoreCorrupted { path: PathBuf, reason: String },
    #[error("Failed to write snapshot {path}: {source}")]
    SnapshotWriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
