//! Link-target classification and rewriting.
//!
//! | Target                                  | Rewritten to                    |
//! |-----------------------------------------|---------------------------------|
//! | any `scheme:` (`https:`, `mailto:`, …)  | unchanged                       |
//! | `#anchor`                               | `<base>` (fragment discarded)   |
//! | anything else                           | `<base>/blob/main/<path>`       |
//!
//! Without a base URL, anchor and relative targets cannot be expressed on the
//! remote: links are dropped (their text is kept) and images become a
//! paragraph naming the path.

use crate::block::{Block, RichText};
use crate::visit::{walk_block, BlockVisitor};

/// Path segment inserted between the base URL and a relative target.
pub const RELATIVE_LINK_SEGMENT: &str = "/blob/main/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Absolute,
    Anchor,
    Relative,
}

impl LinkTarget {
    pub fn classify(url: &str) -> Self {
        let url = url.trim();
        if has_scheme(url) {
            LinkTarget::Absolute
        } else if url.starts_with('#') {
            LinkTarget::Anchor
        } else {
            LinkTarget::Relative
        }
    }
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"` before any path,
/// query or fragment delimiter (RFC 3986, section 3.1).
fn has_scheme(url: &str) -> bool {
    let Some(end) = url.find([':', '/', '?', '#']) else {
        return false;
    };
    let scheme = &url[..end];
    url[end..].starts_with(':')
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPolicy {
    base_url: Option<String>,
}

impl LinkPolicy {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url.map(|b| b.trim().trim_end_matches('/').to_string()),
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The rewritten target, or `None` when it cannot be expressed.
    pub fn rewrite(&self, url: &str) -> Option<String> {
        match LinkTarget::classify(url) {
            LinkTarget::Absolute => Some(url.trim().to_string()),
            LinkTarget::Anchor => self.base_url.clone(),
            LinkTarget::Relative => {
                let base = self.base_url.as_deref()?;
                let path = url.trim().trim_start_matches("./").trim_start_matches('/');
                Some(format!("{base}{RELATIVE_LINK_SEGMENT}{path}"))
            }
        }
    }
}

/// Applies a [`LinkPolicy`] to every link and image in a block tree.
pub struct LinkRewriter<'a> {
    policy: &'a LinkPolicy,
}

impl<'a> LinkRewriter<'a> {
    pub fn new(policy: &'a LinkPolicy) -> Self {
        Self { policy }
    }
}

impl BlockVisitor for LinkRewriter<'_> {
    fn visit_block(&mut self, block: &mut Block) {
        if let Block::Image { url } = block {
            match self.policy.rewrite(url) {
                Some(rewritten) => *url = rewritten,
                None => *block = Block::paragraph(url.clone()),
            }
            return;
        }
        walk_block(self, block);
    }

    fn visit_rich_text(&mut self, text: &mut RichText) {
        if let Some(url) = text.link.take() {
            text.link = self.policy.rewrite(&url);
        }
    }
}
