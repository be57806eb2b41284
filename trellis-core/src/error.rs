//! Error types for trellis-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors a [`Loader`](crate::loader::Loader) can report.
///
/// A loader error is never fatal on its own: the loader set moves on to the
/// next loader and only reports "not found" once every loader has failed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No template with this name is known to the loader.
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// The name would resolve outside the loader's base directories.
    #[error("invalid template name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The name's extension is not in the loader's allow-list.
    #[error("template '{name}' has an extension outside the allow-list")]
    DisallowedExtension { name: String },

    /// Underlying I/O failure while reading a template file.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub(crate) fn not_found(name: &str) -> Self {
        LoadError::NotFound { name: name.to_owned() }
    }
}

/// Errors raised while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Convenience constructor for [`LoadError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LoadError {
    LoadError::Io {
        path: path.into(),
        source,
    }
}
