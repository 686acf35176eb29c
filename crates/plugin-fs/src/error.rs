//! Error types for plugin-fs

use std::path::PathBuf;

/// Result type for plugin-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in plugin-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} settings at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} settings for {path}: {message}")]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Invalid settings entry '{entry}': {reason}")]
    InvalidSetting { entry: String, reason: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("'{name}' is not a single path component")]
    UnsafeName { name: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The path the error refers to, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. }
            | Self::ConfigParse { path, .. }
            | Self::ConfigSerialize { path, .. }
            | Self::LockFailed { path } => Some(path),
            Self::InvalidSetting { .. } | Self::UnsafeName { .. } => None,
        }
    }
}
