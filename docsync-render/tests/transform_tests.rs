//! End-to-end markdown → blocks with link rewriting.

use docsync_render::{Block, LinkPolicy, Transformer};

const BASE: &str = "https://github.com/acme/docs";

const DOC: &str = "\
# Setup

Read the [overview](#overview) and the [guide](guide/setup.md), or visit
[the site](https://acme.dev).

- step one, see [notes](./notes.md)
  - nested [anchor](#deep)

| file | link |
|------|------|
| a | [b](b.md) |

![diagram](img/flow.png)
";

fn links(blocks: &[Block]) -> Vec<String> {
    let mut out = Vec::new();
    for block in blocks {
        out.extend(block.rich_text().iter().filter_map(|t| t.link.clone()));
        if let Block::Table { rows, .. } = block {
            for cell in rows.iter().flat_map(|r| r.cells.iter()) {
                out.extend(cell.iter().filter_map(|t| t.link.clone()));
            }
        }
        out.extend(links(block.children()));
    }
    out
}

#[test]
fn links_are_rewritten_at_every_depth() {
    let transformer = Transformer::new(LinkPolicy::new(Some(BASE)));
    let blocks = transformer.to_blocks(DOC);

    assert_eq!(
        links(&blocks),
        vec![
            BASE.to_string(),
            format!("{BASE}/blob/main/guide/setup.md"),
            "https://acme.dev".to_string(),
            format!("{BASE}/blob/main/notes.md"),
            BASE.to_string(),
            format!("{BASE}/blob/main/b.md"),
        ]
    );

    let image = blocks.iter().find_map(|b| match b {
        Block::Image { url } => Some(url.clone()),
        _ => None,
    });
    assert_eq!(image, Some(format!("{BASE}/blob/main/img/flow.png")));
}

#[test]
fn without_base_only_absolute_links_remain() {
    let transformer = Transformer::new(LinkPolicy::default());
    let blocks = transformer.to_blocks(DOC);
    assert_eq!(links(&blocks), vec!["https://acme.dev".to_string()]);
    assert!(
        !blocks.iter().any(|b| matches!(b, Block::Image { .. })),
        "relative image cannot be expressed without a base url"
    );
}

#[test]
fn block_order_follows_document() {
    let blocks = Transformer::new(LinkPolicy::default()).to_blocks(DOC);
    let kinds: Vec<&str> = blocks.iter().map(Block::kind).collect();
    assert_eq!(
        kinds,
        vec!["heading_1", "paragraph", "bulleted_list_item", "table", "paragraph"]
    );
}

#[test]
fn rendered_json_is_appendable() {
    let blocks = Transformer::new(LinkPolicy::new(Some(BASE))).to_blocks(DOC);
    for block in &blocks {
        let value = block.to_notion();
        assert_eq!(value["object"], "block");
        let kind = value["type"].as_str().expect("type");
        assert!(value.get(kind).is_some(), "missing body for {kind}");
    }
}
