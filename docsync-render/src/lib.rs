//! # docsync-render
//!
//! Content Transformer: converts one markdown document into an ordered
//! sequence of typed remote content [`Block`]s and rewrites link targets
//! according to a [`LinkPolicy`].
//!
//! ## Usage
//!
//! ```rust
//! use docsync_render::{LinkPolicy, Transformer};
//!
//! let transformer = Transformer::new(LinkPolicy::new(Some("https://github.com/acme/docs")));
//! let blocks = transformer.to_blocks("# Title\n\nSee [setup](guide/setup.md).\n");
//! assert_eq!(blocks.len(), 2);
//! ```

pub mod block;
pub mod links;
pub mod markdown;
pub mod visit;

pub use block::{
    Annotations, Block, RichText, TableRow, MAX_BLOCKS_PER_REQUEST, MAX_INLINE_DEPTH,
};
pub use links::{LinkPolicy, LinkRewriter, LinkTarget};
pub use visit::{walk_block, walk_blocks, BlockVisitor};

/// Markdown → blocks, with link rewriting applied.
#[derive(Debug, Clone)]
pub struct Transformer {
    policy: LinkPolicy,
}

impl Transformer {
    pub fn new(policy: LinkPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    /// Convert raw document text into blocks.
    pub fn to_blocks(&self, raw: &str) -> Vec<Block> {
        let mut blocks = markdown::parse(raw);
        let mut rewriter = LinkRewriter::new(&self.policy);
        walk_blocks(&mut rewriter, &mut blocks);
        blocks
    }
}
