//! Markdown conversions: the generated-content track.
//!
//! Three operations live here:
//!
//! * [`parse`] — Markdown → [`ContentDocument`], the high-fidelity path used
//!   at export time (the Markdown a backend produced carries more reliable
//!   structure than its rich-text rendering).
//! * [`render`] — [`ContentDocument`] → Markdown, used to store an
//!   editor-authored body in its portable form.
//! * [`to_rich_text`] — Markdown → rich-text markup for the editing surface,
//!   delegated to pulldown-cmark's HTML renderer plus a cleanup pass.
//!
//! Parsing builds the tree with one stack frame per event pair. Every
//! `Start` pushes a frame — including constructs we do not model, which get
//! a transparent frame that splices its children into the parent — so every
//! `End` can pop unconditionally and the builder never desynchronizes from
//! the event stream.

use crate::document::{Block, ContentDocument, Inline, ListItem};
use once_cell::sync::Lazy;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};
use regex::Regex;

static RE_EMPTY_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p>\s*</p>").unwrap());

/// Parse Markdown into a content document.
pub fn parse(input: &str) -> ContentDocument {
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(input, Options::empty()) {
        match event {
            Event::Start(tag) => builder.start(tag),
            Event::End(_) => builder.end(),
            Event::Text(text) => builder.text(&text),
            Event::Code(code) => builder.text(&code),
            Event::SoftBreak => builder.text(" "),
            Event::HardBreak => builder.inline(Inline::Break),
            Event::Rule => builder.block(Block::Break),
            // Raw HTML, math, footnotes, task markers: not part of the
            // supported vocabulary; drop the wrapper, keep nothing.
            _ => {}
        }
    }
    builder.finish()
}

/// Render a content document as Markdown.
pub fn render(doc: &ContentDocument) -> String {
    let mut out = String::new();
    for block in &doc.blocks {
        render_block(block, &mut out);
    }
    // Blocks separate themselves with blank lines; normalise the tail.
    let trimmed = out.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

/// Convert Markdown to rich-text markup for the editing surface.
pub fn to_rich_text(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let mut html = String::with_capacity(input.len() * 2);
    pulldown_cmark::html::push_html(&mut html, Parser::new_ext(input, Options::empty()));
    let html = RE_EMPTY_PARAGRAPH.replace_all(&html, "");
    html.trim().to_string()
}

// ── Tree builder ─────────────────────────────────────────────────────────────

enum FrameKind {
    Root,
    Paragraph,
    Heading(u8),
    Quote,
    List { ordered: bool },
    Item,
    Strong,
    Emphasis,
    Link(String),
    /// A construct we do not model: children splice into the parent.
    Transparent,
}

struct Frame {
    kind: FrameKind,
    blocks: Vec<Block>,
    items: Vec<ListItem>,
    spans: Vec<Inline>,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
            items: Vec::new(),
            spans: Vec::new(),
        }
    }
}

struct TreeBuilder {
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::new(FrameKind::Root)],
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Paragraph => FrameKind::Paragraph,
            Tag::Heading { level, .. } => FrameKind::Heading(heading_level(level)),
            Tag::BlockQuote(_) => FrameKind::Quote,
            Tag::List(start) => FrameKind::List {
                ordered: start.is_some(),
            },
            Tag::Item => FrameKind::Item,
            Tag::Strong => FrameKind::Strong,
            Tag::Emphasis => FrameKind::Emphasis,
            Tag::Link { dest_url, .. } => FrameKind::Link(dest_url.into_string()),
            _ => FrameKind::Transparent,
        };
        self.stack.push(Frame::new(kind));
    }

    fn end(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let frame = self.stack.pop().expect("stack length checked");
        match frame.kind {
            FrameKind::Paragraph => {
                if !frame.spans.is_empty() {
                    self.block(Block::Paragraph(frame.spans));
                }
            }
            FrameKind::Heading(level) => {
                self.block(Block::heading(level, frame.spans));
            }
            FrameKind::Quote => {
                let mut blocks = frame.blocks;
                if !frame.spans.is_empty() {
                    blocks.push(Block::Paragraph(frame.spans));
                }
                self.block(Block::Quote(blocks));
            }
            FrameKind::List { ordered } => {
                let block = if ordered {
                    Block::OrderedList(frame.items)
                } else {
                    Block::BulletList(frame.items)
                };
                self.block(block);
            }
            FrameKind::Item => {
                let content = flatten_item(frame.spans, frame.blocks);
                if let Some(parent) = self.stack.last_mut() {
                    parent.items.push(ListItem::new(content));
                }
            }
            FrameKind::Strong => self.inline(Inline::Bold(frame.spans)),
            FrameKind::Emphasis => self.inline(Inline::Italic(frame.spans)),
            FrameKind::Link(url) => self.inline(Inline::Link {
                url,
                content: frame.spans,
            }),
            FrameKind::Root | FrameKind::Transparent => {
                // Splice children upward without a wrapper.
                let Frame {
                    blocks,
                    items,
                    spans,
                    ..
                } = frame;
                if let Some(parent) = self.stack.last_mut() {
                    parent.blocks.extend(blocks);
                    parent.items.extend(items);
                }
                for span in spans {
                    self.inline(span);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        self.inline(Inline::text(text));
    }

    fn inline(&mut self, inline: Inline) {
        if let Some(frame) = self.stack.last_mut() {
            if let (Some(Inline::Text(prev)), Inline::Text(next)) =
                (frame.spans.last_mut(), &inline)
            {
                prev.push_str(next);
                return;
            }
            frame.spans.push(inline);
        }
    }

    fn block(&mut self, block: Block) {
        if let Some(frame) = self.stack.last_mut() {
            frame.blocks.push(block);
        }
    }

    fn finish(mut self) -> ContentDocument {
        while self.stack.len() > 1 {
            self.end();
        }
        let root = self.stack.pop().expect("root frame always present");
        let mut blocks = root.blocks;
        if !root.spans.is_empty() {
            blocks.push(Block::Paragraph(root.spans));
        }
        ContentDocument::new(blocks)
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// List items carry inline content only. A loose item (paragraph-wrapped by
/// the parser) is flattened, multiple paragraphs joined by a hard break.
fn flatten_item(spans: Vec<Inline>, blocks: Vec<Block>) -> Vec<Inline> {
    let mut content = spans;
    for block in blocks {
        match block {
            Block::Paragraph(inner) | Block::Heading { content: inner, .. } => {
                if !content.is_empty() {
                    content.push(Inline::Break);
                }
                content.extend(inner);
            }
            Block::BulletList(items) | Block::OrderedList(items) => {
                for item in items {
                    if !content.is_empty() {
                        content.push(Inline::Break);
                    }
                    content.extend(item.content);
                }
            }
            Block::Quote(inner) => {
                let nested = flatten_item(Vec::new(), inner);
                if !content.is_empty() && !nested.is_empty() {
                    content.push(Inline::Break);
                }
                content.extend(nested);
            }
            Block::Break => {}
        }
    }
    content
}

// ── Markdown renderer ────────────────────────────────────────────────────────

fn render_block(block: &Block, out: &mut String) {
    match block {
        Block::Paragraph(spans) => {
            render_spans(spans, out);
            out.push_str("\n\n");
        }
        Block::Heading { level, content } => {
            for _ in 0..*level {
                out.push('#');
            }
            out.push(' ');
            render_spans(content, out);
            out.push_str("\n\n");
        }
        Block::BulletList(items) => {
            for item in items {
                out.push_str("- ");
                render_spans(&item.content, out);
                out.push('\n');
            }
            out.push('\n');
        }
        Block::OrderedList(items) => {
            for (i, item) in items.iter().enumerate() {
                out.push_str(&format!("{}. ", i + 1));
                render_spans(&item.content, out);
                out.push('\n');
            }
            out.push('\n');
        }
        Block::Quote(blocks) => {
            let mut inner = String::new();
            for block in blocks {
                render_block(block, &mut inner);
            }
            for line in inner.trim_end().lines() {
                if line.is_empty() {
                    out.push_str(">\n");
                } else {
                    out.push_str("> ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            out.push('\n');
        }
        Block::Break => out.push('\n'),
    }
}

fn render_spans(spans: &[Inline], out: &mut String) {
    for span in spans {
        match span {
            Inline::Text(text) => out.push_str(text),
            Inline::Bold(inner) => {
                out.push_str("**");
                render_spans(inner, out);
                out.push_str("**");
            }
            Inline::Italic(inner) => {
                out.push('*');
                render_spans(inner, out);
                out.push('*');
            }
            Inline::Link { url, content } => {
                out.push('[');
                render_spans(content, out);
                out.push_str("](");
                out.push_str(url);
                out.push(')');
            }
            Inline::Break => out.push_str("  \n"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
