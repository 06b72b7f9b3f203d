//! Content fingerprints persisted inside the remote content itself.
//!
//! Every created or replaced entry ends with one paragraph whose text is
//! exactly `md5:<lowercase hex digest of the document's raw bytes>`. Reading
//! that last child back is the only state the engine needs across runs.

use md5::{Digest, Md5};
use serde::Serialize;

use docsync_render::Block;

use crate::remote::{ChildKind, ChildRef};

pub const MARKER_PREFIX: &str = "md5:";

/// Lowercase hex MD5 of `raw`.
pub fn digest(raw: &[u8]) -> String {
    hex::encode(Md5::digest(raw))
}

pub fn marker_text(digest: &str) -> String {
    format!("{MARKER_PREFIX}{digest}")
}

pub fn marker_block(digest: &str) -> Block {
    Block::paragraph(marker_text(digest))
}

/// Append the marker so it is always the last block.
pub fn with_marker(mut blocks: Vec<Block>, digest: &str) -> Vec<Block> {
    blocks.push(marker_block(digest));
    blocks
}

/// The digest embedded in `text`, if `text` is a well-formed marker.
pub fn parse_marker(text: &str) -> Option<&str> {
    let hex = text.strip_prefix(MARKER_PREFIX)?;
    let well_formed = hex.len() == 32
        && hex
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    well_formed.then_some(hex)
}

/// Why an update candidate must be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// The entry has no children or its last child is not text.
    MissingMarker,
    /// The last child is text but not `md5:<32 hex>`.
    MalformedMarker,
    /// The stored digest differs from the local one.
    DigestMismatch,
    /// The stored marker could not be read.
    Unreadable,
}

impl std::fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ChangeReason::MissingMarker => "no fingerprint",
            ChangeReason::MalformedMarker => "malformed fingerprint",
            ChangeReason::DigestMismatch => "content changed",
            ChangeReason::Unreadable => "fingerprint unreadable",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Unchanged,
    Changed(ChangeReason),
}

/// Compare the trailing marker of `children` against `local_digest`.
pub fn compare(children: &[ChildRef], local_digest: &str) -> Freshness {
    let Some(last) = children.last() else {
        return Freshness::Changed(ChangeReason::MissingMarker);
    };
    let text = match (&last.kind, last.plain_text.as_deref()) {
        (ChildKind::Content(_), Some(text)) => text.trim(),
        _ => return Freshness::Changed(ChangeReason::MissingMarker),
    };
    match parse_marker(text) {
        Some(stored) if stored == local_digest => Freshness::Unchanged,
        Some(_) => Freshness::Changed(ChangeReason::DigestMismatch),
        None => Freshness::Changed(ChangeReason::MalformedMarker),
    }
}
