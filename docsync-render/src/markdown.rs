//! Markdown → [`Block`] conversion on top of pulldown-cmark's event stream.
//!
//! Container blocks (list items, quotes) are tracked on an explicit frame
//! stack; the first paragraph of a container becomes the container's own
//! text, later content becomes its children.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::block::{Annotations, Block, RichText, TableRow};

/// Parse `raw` markdown into top-level blocks, in document order.
pub fn parse(raw: &str) -> Vec<Block> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut converter = Converter::new();
    for event in Parser::new_ext(raw, options) {
        converter.handle(event);
    }
    converter.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Root,
    Item { ordered: bool },
    Quote,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    text: Vec<RichText>,
    children: Vec<Block>,
    checked: Option<bool>,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            text: Vec::new(),
            children: Vec::new(),
            checked: None,
        }
    }

    fn into_block(self) -> Option<Block> {
        let Frame {
            kind,
            text,
            children,
            checked,
        } = self;
        match (kind, checked) {
            (FrameKind::Root, _) => None,
            (FrameKind::Item { .. }, Some(checked)) => Some(Block::ToDo {
                text,
                checked,
                children,
            }),
            (FrameKind::Item { ordered: true }, None) => {
                Some(Block::NumberedListItem { text, children })
            }
            (FrameKind::Item { ordered: false }, None) => {
                Some(Block::BulletedListItem { text, children })
            }
            (FrameKind::Quote, _) => Some(Block::Quote { text, children }),
        }
    }
}

#[derive(Debug, Default)]
struct TableBuilder {
    rows: Vec<TableRow>,
    current: TableRow,
    has_header: bool,
}

struct Converter {
    frames: Vec<Frame>,
    lists: Vec<bool>,
    pending: Vec<RichText>,
    style: Annotations,
    emphasis: usize,
    strong: usize,
    strike: usize,
    link: Option<String>,
    code: Option<(String, String)>,
    image: Option<String>,
    heading: Option<u8>,
    table: Option<TableBuilder>,
    /// Images met inside a heading or table, emitted once it closes.
    held_images: Vec<String>,
}

impl Converter {
    fn new() -> Self {
        Self {
            frames: vec![Frame::new(FrameKind::Root)],
            lists: Vec::new(),
            pending: Vec::new(),
            style: Annotations::default(),
            emphasis: 0,
            strong: 0,
            strike: 0,
            link: None,
            code: None,
            image: None,
            heading: None,
            table: None,
            held_images: Vec::new(),
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text, false),
            Event::Code(text) => self.text(&text, true),
            Event::SoftBreak => self.text(" ", false),
            Event::HardBreak => self.text("\n", false),
            Event::Rule => {
                self.flush_loose_text();
                self.push_block(Block::Divider);
            }
            Event::TaskListMarker(checked) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.checked = Some(checked);
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { level, .. } => {
                self.flush_loose_text();
                self.heading = Some(heading_level(level));
            }
            Tag::BlockQuote => {
                self.flush_loose_text();
                self.frames.push(Frame::new(FrameKind::Quote));
            }
            Tag::CodeBlock(kind) => {
                self.flush_loose_text();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => {
                self.flush_loose_text();
                self.lists.push(start.is_some());
            }
            Tag::Item => {
                self.flush_loose_text();
                let ordered = self.lists.last().copied().unwrap_or(false);
                self.frames.push(Frame::new(FrameKind::Item { ordered }));
            }
            Tag::Table(_) => {
                self.flush_loose_text();
                self.table = Some(TableBuilder::default());
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.current = TableRow::default();
                }
            }
            Tag::TableCell => self.pending.clear(),
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link { dest_url, .. } => self.link = Some(dest_url.to_string()),
            Tag::Image { dest_url, .. } => self.image = Some(dest_url.to_string()),
            _ => {}
        }
        self.refresh_style();
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_loose_text(),
            TagEnd::Heading(_) => {
                let level = self.heading.take().unwrap_or(1);
                let text = std::mem::take(&mut self.pending);
                self.push_block(Block::Heading { level, text });
                self.release_images();
            }
            TagEnd::BlockQuote | TagEnd::Item => {
                self.flush_loose_text();
                if self.frames.len() > 1 {
                    if let Some(block) = self.frames.pop().and_then(Frame::into_block) {
                        self.push_block(block);
                    }
                }
            }
            TagEnd::CodeBlock => {
                if let Some((language, body)) = self.code.take() {
                    let body = body.strip_suffix('\n').unwrap_or(&body).to_string();
                    self.push_block(Block::Code {
                        language,
                        text: vec![RichText::plain(body)],
                    });
                }
            }
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.pending);
                if let Some(table) = self.table.as_mut() {
                    table.current.cells.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.current);
                    table.rows.push(row);
                    table.has_header = true;
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.current);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    let width = table.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
                    if width > 0 {
                        self.push_block(Block::Table {
                            width,
                            has_column_header: table.has_header,
                            rows: table.rows,
                        });
                    }
                }
                self.release_images();
            }
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::Link => self.link = None,
            TagEnd::Image => {
                if let Some(url) = self.image.take() {
                    if self.heading.is_some() || self.table.is_some() {
                        self.held_images.push(url);
                    } else {
                        // Images are blocks remotely; split the surrounding paragraph.
                        self.flush_loose_text();
                        self.push_block(Block::Image { url });
                    }
                }
            }
            _ => {}
        }
        self.refresh_style();
    }

    fn refresh_style(&mut self) {
        self.style = Annotations {
            bold: self.strong > 0,
            italic: self.emphasis > 0,
            strikethrough: self.strike > 0,
            code: false,
        };
    }

    fn text(&mut self, text: &str, inline_code: bool) {
        if let Some((_, body)) = self.code.as_mut() {
            body.push_str(text);
            return;
        }
        if self.image.is_some() {
            // Alt text has no remote counterpart on external images.
            return;
        }
        let annotations = Annotations {
            code: inline_code,
            ..self.style
        };
        if let Some(last) = self.pending.last_mut() {
            if last.annotations == annotations && last.link == self.link {
                last.content.push_str(text);
                return;
            }
        }
        self.pending.push(RichText {
            content: text.to_string(),
            link: self.link.clone(),
            annotations,
        });
    }

    /// Attach buffered inline text: as the container's own text if it has
    /// none yet, otherwise as a paragraph.
    fn flush_loose_text(&mut self) {
        if self.pending.is_empty() || self.table.is_some() {
            return;
        }
        let text = std::mem::take(&mut self.pending);
        if text.iter().all(|t| t.content.trim().is_empty()) {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            if frame.kind != FrameKind::Root && frame.text.is_empty() && frame.children.is_empty() {
                frame.text = text;
                return;
            }
        }
        self.push_block(Block::Paragraph { text });
    }

    fn release_images(&mut self) {
        for url in std::mem::take(&mut self.held_images) {
            self.push_block(Block::Image { url });
        }
    }

    fn push_block(&mut self, block: Block) {
        if let Some(frame) = self.frames.last_mut() {
            frame.children.push(block);
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_loose_text();
        while self.frames.len() > 1 {
            if let Some(block) = self.frames.pop().and_then(Frame::into_block) {
                self.push_block(block);
            }
        }
        self.frames
            .pop()
            .map(|root| root.children)
            .unwrap_or_default()
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        _ => 3,
    }
}
