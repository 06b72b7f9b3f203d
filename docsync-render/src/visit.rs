//! Typed visitor over arbitrarily nested [`Block`] trees.
//!
//! Implementors override the hooks they care about; the `walk_*` functions
//! provide the default traversal and may be called from an override to keep
//! descending.

use crate::block::{Block, RichText};

pub trait BlockVisitor {
    fn visit_block(&mut self, block: &mut Block) {
        walk_block(self, block);
    }

    fn visit_rich_text(&mut self, _text: &mut RichText) {}
}

/// Visit every rich-text run, table cell and child of `block`.
pub fn walk_block<V: BlockVisitor + ?Sized>(visitor: &mut V, block: &mut Block) {
    match block {
        Block::Heading { text, .. } | Block::Paragraph { text } | Block::Code { text, .. } => {
            text.iter_mut().for_each(|t| visitor.visit_rich_text(t));
        }
        Block::BulletedListItem { text, children }
        | Block::NumberedListItem { text, children }
        | Block::ToDo { text, children, .. }
        | Block::Quote { text, children } => {
            text.iter_mut().for_each(|t| visitor.visit_rich_text(t));
            walk_blocks(visitor, children);
        }
        Block::Table { rows, .. } => {
            for cell in rows.iter_mut().flat_map(|row| row.cells.iter_mut()) {
                cell.iter_mut().for_each(|t| visitor.visit_rich_text(t));
            }
        }
        Block::TableRow { row, .. } => {
            for cell in row.cells.iter_mut() {
                cell.iter_mut().for_each(|t| visitor.visit_rich_text(t));
            }
        }
        Block::Divider | Block::Image { .. } => {}
    }
}

pub fn walk_blocks<V: BlockVisitor + ?Sized>(visitor: &mut V, blocks: &mut [Block]) {
    for block in blocks {
        visitor.visit_block(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::TableRow;

    #[derive(Default)]
    struct Upper {
        seen: usize,
    }

    impl BlockVisitor for Upper {
        fn visit_rich_text(&mut self, text: &mut RichText) {
            self.seen += 1;
            text.content = text.content.to_uppercase();
        }
    }

    fn item(text: &str, children: Vec<Block>) -> Block {
        Block::BulletedListItem {
            text: vec![RichText::plain(text)],
            children,
        }
    }

    #[test]
    fn reaches_deeply_nested_children() {
        let mut blocks = vec![item("a", vec![item("b", vec![item("c", vec![])])])];
        let mut visitor = Upper::default();
        walk_blocks(&mut visitor, &mut blocks);
        assert_eq!(visitor.seen, 3);

        let Block::BulletedListItem { children, .. } = &blocks[0] else {
            panic!("expected list item");
        };
        assert_eq!(children[0].children()[0].plain_text(), "C");
    }

    #[test]
    fn reaches_table_cells() {
        let mut blocks = vec![Block::Table {
            width: 2,
            has_column_header: false,
            rows: vec![TableRow {
                cells: vec![vec![RichText::plain("x")], vec![RichText::plain("y")]],
            }],
        }];
        let mut visitor = Upper::default();
        walk_blocks(&mut visitor, &mut blocks);
        assert_eq!(visitor.seen, 2);
    }
}
