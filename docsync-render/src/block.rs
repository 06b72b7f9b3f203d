//! Typed content blocks and their Notion JSON rendering.

use serde::Serialize;
use serde_json::{json, Value};

/// Maximum characters in one remote rich-text object.
pub const MAX_TEXT_CHARS: usize = 2000;

/// Nesting levels the remote accepts below a top-level block in one request.
pub const MAX_INLINE_DEPTH: usize = 2;

/// Entries the remote accepts in one `children` array.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;

/// Inline styling of a rich-text run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

/// A run of text with uniform styling and an optional link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichText {
    pub content: String,
    pub link: Option<String>,
    pub annotations: Annotations,
}

impl RichText {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: None,
            annotations: Annotations::default(),
        }
    }

    pub fn link(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: Some(url.into()),
            annotations: Annotations::default(),
        }
    }

    /// One or more remote rich-text objects; long content is split.
    pub fn to_notion(&self) -> Vec<Value> {
        split_chars(&self.content, MAX_TEXT_CHARS)
            .into_iter()
            .map(|chunk| {
                let link = self.link.as_ref().map(|url| json!({ "url": url }));
                json!({
                    "type": "text",
                    "text": { "content": chunk, "link": link },
                    "annotations": {
                        "bold": self.annotations.bold,
                        "italic": self.annotations.italic,
                        "strikethrough": self.annotations.strikethrough,
                        "underline": false,
                        "code": self.annotations.code,
                        "color": "default",
                    },
                })
            })
            .collect()
    }
}

/// One row of a [`Block::Table`]; each cell is a rich-text sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableRow {
    pub cells: Vec<Vec<RichText>>,
}

/// A remote content node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Levels 1–3.
    Heading { level: u8, text: Vec<RichText> },
    Paragraph { text: Vec<RichText> },
    BulletedListItem { text: Vec<RichText>, children: Vec<Block> },
    NumberedListItem { text: Vec<RichText>, children: Vec<Block> },
    ToDo { text: Vec<RichText>, checked: bool, children: Vec<Block> },
    Quote { text: Vec<RichText>, children: Vec<Block> },
    Code { language: String, text: Vec<RichText> },
    Divider,
    /// External image.
    Image { url: String },
    Table {
        width: usize,
        has_column_header: bool,
        rows: Vec<TableRow>,
    },
    /// A row appended to an existing table of the given width.
    TableRow { width: usize, row: TableRow },
}

impl Block {
    pub fn paragraph(content: impl Into<String>) -> Self {
        Block::Paragraph {
            text: vec![RichText::plain(content)],
        }
    }

    /// Rich text directly owned by this block (not its children).
    pub fn rich_text(&self) -> &[RichText] {
        match self {
            Block::Heading { text, .. }
            | Block::Paragraph { text }
            | Block::BulletedListItem { text, .. }
            | Block::NumberedListItem { text, .. }
            | Block::ToDo { text, .. }
            | Block::Quote { text, .. }
            | Block::Code { text, .. } => text,
            Block::Divider
            | Block::Image { .. }
            | Block::Table { .. }
            | Block::TableRow { .. } => &[],
        }
    }

    pub fn children(&self) -> &[Block] {
        match self {
            Block::BulletedListItem { children, .. }
            | Block::NumberedListItem { children, .. }
            | Block::ToDo { children, .. }
            | Block::Quote { children, .. } => children,
            _ => &[],
        }
    }

    /// Concatenated text content of this block, excluding children.
    pub fn plain_text(&self) -> String {
        self.rich_text().iter().map(|t| t.content.as_str()).collect()
    }

    /// Remote block type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { level: 1, .. } => "heading_1",
            Block::Heading { level: 2, .. } => "heading_2",
            Block::Heading { .. } => "heading_3",
            Block::Paragraph { .. } => "paragraph",
            Block::BulletedListItem { .. } => "bulleted_list_item",
            Block::NumberedListItem { .. } => "numbered_list_item",
            Block::ToDo { .. } => "to_do",
            Block::Quote { .. } => "quote",
            Block::Code { .. } => "code",
            Block::Divider => "divider",
            Block::Image { .. } => "image",
            Block::Table { .. } => "table",
            Block::TableRow { .. } => "table_row",
        }
    }

    /// Whether this block's whole subtree fits in one request when placed
    /// `depth` levels above the deepest level allowed.
    fn fits_inline(&self, depth: usize) -> bool {
        match self {
            Block::Table { rows, .. } => {
                rows.is_empty() || (depth >= 1 && rows.len() <= MAX_BLOCKS_PER_REQUEST)
            }
            _ => {
                let children = self.children();
                children.is_empty()
                    || (depth >= 1
                        && children.len() <= MAX_BLOCKS_PER_REQUEST
                        && children.iter().all(|c| c.fits_inline(depth - 1)))
            }
        }
    }

    /// Children sent inside this block's own request, and children that
    /// must be appended under the block's id afterwards.
    ///
    /// A subtree deeper than [`MAX_INLINE_DEPTH`] or wider than
    /// [`MAX_BLOCKS_PER_REQUEST`] at any level is sent without children;
    /// tables keep their first rows inline since the remote needs at least
    /// one at creation.
    pub fn split_children(&self) -> (Vec<Block>, Vec<Block>) {
        let whole = self.fits_inline(MAX_INLINE_DEPTH);
        match self {
            Block::Table { width, rows, .. } => {
                let keep = if whole { rows.len() } else { MAX_BLOCKS_PER_REQUEST };
                let as_block = |row: &TableRow| Block::TableRow {
                    width: *width,
                    row: row.clone(),
                };
                (
                    rows.iter().take(keep).map(as_block).collect(),
                    rows.iter().skip(keep).map(as_block).collect(),
                )
            }
            _ if whole => (self.children().to_vec(), Vec::new()),
            _ => (Vec::new(), self.children().to_vec()),
        }
    }

    /// Render as a remote block object for one append request.
    ///
    /// Never nests deeper than [`MAX_INLINE_DEPTH`] nor carries more than
    /// [`MAX_BLOCKS_PER_REQUEST`] children per level; whatever is left out
    /// is returned by [`Block::split_children`].
    pub fn to_notion(&self) -> Value {
        self.render(self.fits_inline(MAX_INLINE_DEPTH))
    }

    fn render(&self, whole: bool) -> Value {
        let kind = self.kind();
        let children: &[Block] = if whole { self.children() } else { &[] };
        let body = match self {
            Block::Heading { text, .. } | Block::Paragraph { text } => {
                json!({ "rich_text": rich_text_json(text) })
            }
            Block::BulletedListItem { text, .. }
            | Block::NumberedListItem { text, .. }
            | Block::Quote { text, .. } => with_children(
                json!({ "rich_text": rich_text_json(text) }),
                children,
            ),
            Block::ToDo { text, checked, .. } => with_children(
                json!({ "rich_text": rich_text_json(text), "checked": checked }),
                children,
            ),
            Block::Code { language, text } => json!({
                "rich_text": rich_text_json(text),
                "language": remote_language(language),
            }),
            Block::Divider => json!({}),
            Block::Image { url } => json!({ "type": "external", "external": { "url": url } }),
            Block::Table {
                width,
                has_column_header,
                rows,
            } => {
                let keep = if whole { rows.len() } else { MAX_BLOCKS_PER_REQUEST };
                json!({
                    "table_width": width,
                    "has_column_header": has_column_header,
                    "has_row_header": false,
                    "children": rows
                        .iter()
                        .take(keep)
                        .map(|row| table_row_json(row, *width))
                        .collect::<Vec<_>>(),
                })
            }
            Block::TableRow { width, row } => json!({ "cells": row_cells(row, *width) }),
        };
        json!({ "object": "block", "type": kind, kind: body })
    }
}

fn rich_text_json(text: &[RichText]) -> Vec<Value> {
    text.iter().flat_map(RichText::to_notion).collect()
}

fn with_children(mut body: Value, children: &[Block]) -> Value {
    if !children.is_empty() {
        body["children"] = Value::Array(children.iter().map(|c| c.render(true)).collect());
    }
    body
}

fn table_row_json(row: &TableRow, width: usize) -> Value {
    json!({
        "object": "block",
        "type": "table_row",
        "table_row": { "cells": row_cells(row, width) },
    })
}

fn row_cells(row: &TableRow, width: usize) -> Vec<Value> {
    let mut cells: Vec<Value> = row
        .cells
        .iter()
        .map(|cell| Value::Array(rich_text_json(cell)))
        .collect();
    // The remote requires every row to be exactly `table_width` wide.
    cells.resize(width, Value::Array(Vec::new()));
    cells
}

/// Map a fenced-code info string to a language the remote accepts.
fn remote_language(info: &str) -> &'static str {
    match info.trim().to_ascii_lowercase().as_str() {
        "rust" | "rs" => "rust",
        "sh" | "bash" | "shell" | "zsh" | "console" => "shell",
        "js" | "javascript" | "node" => "javascript",
        "ts" | "typescript" => "typescript",
        "py" | "python" => "python",
        "go" | "golang" => "go",
        "java" => "java",
        "c" => "c",
        "cpp" | "c++" => "c++",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        "md" | "markdown" => "markdown",
        "diff" => "diff",
        "docker" | "dockerfile" => "docker",
        "ruby" | "rb" => "ruby",
        "xml" => "xml",
        _ => "plain text",
    }
}

fn split_chars(content: &str, max: usize) -> Vec<String> {
    if content.chars().count() <= max {
        return vec![content.to_string()];
    }
    let chars: Vec<char> = content.chars().collect();
    chars.chunks(max).map(|c| c.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_json_shape() {
        let value = Block::paragraph("hello").to_notion();
        assert_eq!(value["type"], "paragraph");
        assert_eq!(value["paragraph"]["rich_text"][0]["text"]["content"], "hello");
        assert!(value["paragraph"]["rich_text"][0]["text"]["link"].is_null());
    }

    #[test]
    fn link_json_shape() {
        let block = Block::Paragraph {
            text: vec![RichText::link("docs", "https://example.com")],
        };
        let value = block.to_notion();
        assert_eq!(
            value["paragraph"]["rich_text"][0]["text"]["link"]["url"],
            "https://example.com"
        );
    }

    #[test]
    fn long_text_is_split() {
        let long = "x".repeat(MAX_TEXT_CHARS * 2 + 5);
        let parts = RichText::plain(long).to_notion();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts[2]["text"]["content"].as_str().map(|s| s.chars().count()),
            Some(5)
        );
    }

    #[test]
    fn list_children_only_when_present() {
        let leaf = Block::BulletedListItem {
            text: vec![RichText::plain("a")],
            children: vec![],
        };
        assert!(leaf.to_notion()["bulleted_list_item"].get("children").is_none());

        let parent = Block::BulletedListItem {
            text: vec![RichText::plain("a")],
            children: vec![leaf],
        };
        assert_eq!(
            parent.to_notion()["bulleted_list_item"]["children"][0]["type"],
            "bulleted_list_item"
        );
    }

    #[test]
    fn table_rows_are_padded_to_width() {
        let table = Block::Table {
            width: 3,
            has_column_header: true,
            rows: vec![TableRow {
                cells: vec![vec![RichText::plain("a")]],
            }],
        };
        let value = table.to_notion();
        let cells = &value["table"]["children"][0]["table_row"]["cells"];
        assert_eq!(cells.as_array().map(Vec::len), Some(3));
    }

    fn item(text: &str, children: Vec<Block>) -> Block {
        Block::BulletedListItem {
            text: vec![RichText::plain(text)],
            children,
        }
    }

    /// `- l0` nested `levels` deep.
    fn chain(levels: usize) -> Block {
        (1..levels)
            .rev()
            .fold(item(&format!("l{}", levels - 1), vec![]), |inner, n| {
                item(&format!("l{}", n - 1), vec![inner])
            })
    }

    fn json_depth(value: &Value) -> usize {
        let kind = value["type"].as_str().unwrap_or_default();
        value[kind]["children"]
            .as_array()
            .map(|children| 1 + children.iter().map(json_depth).max().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Texts reached by sending `block` and then, recursively, its deferred
    /// children.
    fn delivered(block: &Block, out: &mut Vec<String>) {
        fn from_json(value: &Value, out: &mut Vec<String>) {
            let kind = value["type"].as_str().unwrap_or_default();
            if let Some(text) = value[kind]["rich_text"][0]["text"]["content"].as_str() {
                out.push(text.to_string());
            }
            for child in value[kind]["children"].as_array().into_iter().flatten() {
                from_json(child, out);
            }
        }
        from_json(&block.to_notion(), out);
        for child in block.split_children().1 {
            delivered(&child, out);
        }
    }

    #[test]
    fn deep_lists_never_exceed_inline_depth() {
        for levels in 1..=7 {
            let block = chain(levels);
            assert!(json_depth(&block.to_notion()) <= MAX_INLINE_DEPTH, "{levels} levels");
            for child in block.split_children().1 {
                assert!(json_depth(&child.to_notion()) <= MAX_INLINE_DEPTH);
            }
        }
    }

    #[test]
    fn three_levels_go_in_one_request() {
        let block = chain(3);
        assert_eq!(json_depth(&block.to_notion()), 2);
        assert!(block.split_children().1.is_empty());
    }

    #[test]
    fn deeper_content_is_deferred_not_lost() {
        let block = chain(6);
        let (inline, deferred) = block.split_children();
        assert!(inline.is_empty());
        assert_eq!(deferred.len(), 1);

        let mut texts = Vec::new();
        delivered(&block, &mut texts);
        let expected: Vec<String> = (0..6).map(|n| format!("l{n}")).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn wide_children_are_deferred() {
        let children = (0..MAX_BLOCKS_PER_REQUEST + 1)
            .map(|n| item(&n.to_string(), vec![]))
            .collect();
        let block = item("parent", children);
        assert!(block.to_notion()["bulleted_list_item"].get("children").is_none());
        assert_eq!(block.split_children().1.len(), MAX_BLOCKS_PER_REQUEST + 1);
    }

    #[test]
    fn large_table_sends_first_rows_and_defers_the_rest() {
        let rows = (0..250)
            .map(|n| TableRow {
                cells: vec![vec![RichText::plain(n.to_string())]],
            })
            .collect();
        let table = Block::Table {
            width: 2,
            has_column_header: false,
            rows,
        };
        let value = table.to_notion();
        assert_eq!(
            value["table"]["children"].as_array().map(Vec::len),
            Some(MAX_BLOCKS_PER_REQUEST)
        );

        let (inline, deferred) = table.split_children();
        assert_eq!(inline.len(), MAX_BLOCKS_PER_REQUEST);
        assert_eq!(deferred.len(), 150);
        let first = deferred[0].to_notion();
        assert_eq!(first["type"], "table_row");
        assert_eq!(first["table_row"]["cells"][0][0]["text"]["content"], "100");
        assert_eq!(first["table_row"]["cells"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn unknown_code_language_maps_to_plain_text() {
        let block = Block::Code {
            language: "brainfuck".into(),
            text: vec![RichText::plain("+++")],
        };
        assert_eq!(block.to_notion()["code"]["language"], "plain text");
    }
}
