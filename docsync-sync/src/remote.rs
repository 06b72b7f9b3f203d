//! Remote store seam.
//!
//! The engine only needs five calls from the hierarchical store; the
//! production implementation is [`crate::notion::NotionClient`], tests use
//! [`crate::memory::MemoryStore`]. Every call is a blocking request/response.

use thiserror::Error;

use docsync_core::PageId;
use docsync_render::Block;

/// Errors surfaced by a [`RemoteStore`] call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("remote rejected request (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("{resource} still has children after {passes} delete passes")]
    Incomplete { resource: String, passes: usize },
}

/// Kind of a child block, as far as the engine cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildKind {
    /// A child page: a native child-page reference and a mutable entry.
    Page,
    /// A titled database; has an identity but no page handle.
    Database,
    /// Any content block (paragraph, heading, …) by remote type name.
    Content(String),
}

impl ChildKind {
    pub fn from_remote(kind: &str) -> Self {
        match kind {
            "child_page" => ChildKind::Page,
            "child_database" => ChildKind::Database,
            other => ChildKind::Content(other.to_string()),
        }
    }

    pub fn as_remote(&self) -> &str {
        match self {
            ChildKind::Page => "child_page",
            ChildKind::Database => "child_database",
            ChildKind::Content(kind) => kind,
        }
    }
}

/// Summary of one child of a container, in remote order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub id: PageId,
    pub kind: ChildKind,
    /// Title of child pages and databases.
    pub title: Option<String>,
    /// Concatenated text of text-bearing content blocks.
    pub plain_text: Option<String>,
}

/// A retrieved or newly created page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePage {
    pub id: PageId,
    pub title: Option<String>,
}

/// The hierarchical remote store.
///
/// Implementations may retry transient transport failures internally; the
/// engine never issues two calls concurrently.
pub trait RemoteStore {
    fn retrieve_page(&self, id: &PageId) -> Result<RemotePage, RemoteError>;

    /// All children of `id`, oldest first.
    fn list_children(&self, id: &PageId) -> Result<Vec<ChildRef>, RemoteError>;

    fn create_page(&self, parent: &PageId, title: &str) -> Result<RemotePage, RemoteError>;

    /// Append `blocks` after the existing children of `id`, returning the
    /// ids of the appended top-level blocks in order.
    fn append_children(&self, id: &PageId, blocks: &[Block]) -> Result<Vec<PageId>, RemoteError>;

    fn delete_block(&self, id: &PageId) -> Result<(), RemoteError>;
}

impl<T: RemoteStore + ?Sized> RemoteStore for &T {
    fn retrieve_page(&self, id: &PageId) -> Result<RemotePage, RemoteError> {
        (**self).retrieve_page(id)
    }

    fn list_children(&self, id: &PageId) -> Result<Vec<ChildRef>, RemoteError> {
        (**self).list_children(id)
    }

    fn create_page(&self, parent: &PageId, title: &str) -> Result<RemotePage, RemoteError> {
        (**self).create_page(parent, title)
    }

    fn append_children(&self, id: &PageId, blocks: &[Block]) -> Result<Vec<PageId>, RemoteError> {
        (**self).append_children(id, blocks)
    }

    fn delete_block(&self, id: &PageId) -> Result<(), RemoteError> {
        (**self).delete_block(id)
    }
}
