//! Error types for docsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use docsync_core::{ConfigError, PageId, Title};

use crate::mutator::Operation;
use crate::remote::RemoteError;

/// All errors that can abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid or missing configuration; raised before any remote call.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The remote root container could not be retrieved (missing, not
    /// shared with the integration, or bad credential).
    #[error("root page {root} could not be retrieved: {source}")]
    RootNotFound {
        root: PageId,
        #[source]
        source: RemoteError,
    },

    /// Listing the root container's entries failed.
    #[error("failed to list remote entries under {root}: {source}")]
    RemoteInventory {
        root: PageId,
        #[source]
        source: RemoteError,
    },

    /// Reading an update candidate's stored fingerprint failed (strict policy).
    #[error("failed to read fingerprint of '{title}': {source}")]
    Fingerprint {
        title: Title,
        #[source]
        source: RemoteError,
    },

    /// A per-item remote mutation failed.
    #[error("{op} failed for '{title}': {source}")]
    Mutation {
        op: Operation,
        title: Title,
        #[source]
        source: RemoteError,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed below the document root.
    #[error("failed to enumerate documents under {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Mutation`].
pub(crate) fn mutation_err(op: Operation, title: &Title, source: RemoteError) -> SyncError {
    SyncError::Mutation {
        op,
        title: title.clone(),
        source,
    }
}
