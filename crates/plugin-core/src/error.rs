//! Error types for plugin-core

use std::path::PathBuf;

/// Result type for plugin-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the plugin manager.
///
/// Everything except [`Error::NotInitialized`] and [`Error::MissingBinding`]
/// is recoverable and funnels through the [`crate::ErrorChannel`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A persisted list could not be read or written.
    #[error("could not {action} list {path}: {source}")]
    ListIo {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: plugin_fs::Error,
    },

    /// Copying or deleting package files failed.
    #[error("plugin I/O failed at {path}: {message}")]
    PluginIo { path: PathBuf, message: String },

    /// No registered packer accepts the input.
    #[error("unable to find a packer for {path}")]
    Packer { path: PathBuf },

    /// No data format accepts the unpacked directory, or it is corrupt.
    #[error("package data error at {path}: {reason}")]
    PackageData { path: PathBuf, reason: String },

    /// A record line could not be parsed into a pointer.
    #[error("invalid package record '{record}': {reason}")]
    InvalidRecord { record: String, reason: String },

    /// A version string could not be parsed.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// A package name is empty or contains a reserved character.
    #[error("invalid package name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A candidate extension could not be constructed.
    #[error("could not instantiate extension '{type_name}': {reason}")]
    TypeInstantiation { type_name: String, reason: String },

    /// A package payload could not be located or loaded.
    #[error("could not load module {path}: {reason}")]
    ModuleLoad { path: PathBuf, reason: String },

    /// An update check failed.
    #[error("update of '{package}' failed: {reason}")]
    Update { package: String, reason: String },

    /// Filesystem layer error outside of list handling.
    #[error(transparent)]
    Fs(#[from] plugin_fs::Error),

    /// The system was used after teardown.
    #[error("the plugin system is not initialized")]
    NotInitialized,

    /// An extension has no binding record although it was expected to.
    #[error("no binding for extension '{extension}' on host '{host}'")]
    MissingBinding { host: String, extension: String },
}

impl Error {
    /// Stable kind name, matched against the ignore list.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ListIo { .. } => "list-io",
            Self::PluginIo { .. } => "plugin-io",
            Self::Packer { .. } => "packer",
            Self::PackageData { .. } => "package-data",
            Self::InvalidRecord { .. } => "invalid-record",
            Self::InvalidVersion { .. } => "invalid-version",
            Self::InvalidName { .. } => "invalid-name",
            Self::TypeInstantiation { .. } => "type-instantiation",
            Self::ModuleLoad { .. } => "module-load",
            Self::Update { .. } => "update",
            Self::Fs(_) => "fs",
            Self::NotInitialized => "not-initialized",
            Self::MissingBinding { .. } => "missing-binding",
        }
    }

    /// Contract violations by the caller; never routed through the channel.
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::MissingBinding { .. })
    }

    pub(crate) fn plugin_io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::PluginIo {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misuse_kinds() {
        assert!(Error::NotInitialized.is_misuse());
        assert!(
            Error::MissingBinding {
                host: "h".into(),
                extension: "e".into()
            }
            .is_misuse()
        );
        assert!(!Error::Packer { path: "x".into() }.is_misuse());
    }

    #[test]
    fn kind_names_are_kebab_case() {
        let err = Error::PackageData {
            path: "dir".into(),
            reason: "corrupt".into(),
        };
        assert_eq!(err.kind(), "package-data");
    }
}
