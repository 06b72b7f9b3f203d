//! Error types for docsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can be wrong with a run's configuration.
///
/// All variants are fatal and are raised before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required option was supplied by neither flag, environment, nor file.
    #[error("{option} not provided (set --{option} or ${env})")]
    Missing {
        option: &'static str,
        env: &'static str,
    },

    /// The local document root does not exist or is not a directory.
    #[error("document folder not found at {path}")]
    FolderNotFound { path: PathBuf },

    /// The remote root identifier is not a page id, UUID, or page URL.
    #[error("malformed root page identifier '{value}': expected a page id or a url ending in \"-<page-id>\"")]
    MalformedRootId { value: String },

    /// The ignore pattern is not a valid glob.
    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidIgnore {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// The link base URL is not an absolute http(s) URL.
    #[error("invalid base url '{value}': must start with http:// or https://")]
    InvalidBaseUrl { value: String },

    /// Unknown failure policy name.
    #[error("unknown failure policy '{value}'; expected: ignore, strict")]
    InvalidPolicy { value: String },

    /// An explicitly requested config file does not exist.
    #[error("config file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Reading the config file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
