//! Rich-text parsing: the editor's markup subset → [`ContentDocument`].
//!
//! The embedded editor emits a small, predictable HTML-like vocabulary:
//! `p`, `h1`–`h6`, `strong`/`b`, `em`/`i`, `ul`/`ol`/`li`, `blockquote`,
//! `br`, `a href`, plus `div`/`span` wrappers and character entities. This
//! parser covers exactly that subset and degrades gracefully outside it —
//! an unknown tag contributes its children without a wrapper, a tag that
//! never closes is closed at flush time, and malformed angle brackets fall
//! back to literal text. Nothing here can fail; the worst input yields the
//! best document we can make of it.

use crate::document::{Block, ContentDocument, Inline, ListItem};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Parse rich-text markup into a content document.
pub fn parse(input: &str) -> ContentDocument {
    let mut parser = RichTextParser::default();
    for token in tokenize(input) {
        match token {
            Token::Text(text) => parser.text(&decode_entities(text)),
            Token::Open { name, attrs } => parser.open(name, attrs),
            Token::Close(name) => parser.close(name),
        }
    }
    parser.finish()
}

// ── Tokenizer ────────────────────────────────────────────────────────────────

enum Token<'a> {
    Text(&'a str),
    Open { name: &'a str, attrs: &'a str },
    Close(&'a str),
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;
    while let Some(lt) = rest.find('<') {
        let after = &rest[lt + 1..];
        // Only a letter or '/' can start a tag; a bare '<' is content.
        if !after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/')
        {
            tokens.push(Token::Text(&rest[..lt + 1]));
            rest = after;
            continue;
        }
        if lt > 0 {
            tokens.push(Token::Text(&rest[..lt]));
        }
        match after.find('>') {
            Some(gt) => {
                let body = after[..gt].trim();
                if let Some(name_and_attrs) = body.strip_prefix('/') {
                    let name = name_and_attrs.trim();
                    tokens.push(Token::Close(tag_name(name)));
                } else if !body.is_empty() {
                    let body = body.strip_suffix('/').unwrap_or(body).trim_end();
                    let name = tag_name(body);
                    let attrs = &body[name.len()..];
                    tokens.push(Token::Open { name, attrs });
                }
                rest = &after[gt + 1..];
            }
            None => {
                // No closing angle bracket: the rest is literal text.
                tokens.push(Token::Text(&rest[lt..]));
                rest = "";
                break;
            }
        }
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    tokens
}

fn tag_name(body: &str) -> &str {
    let end = body
        .find(|c: char| c.is_whitespace())
        .unwrap_or(body.len());
    &body[..end]
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let semi = tail.find(';').filter(|&i| i <= 8);
        match semi {
            Some(semi) => {
                let entity = &tail[1..semi];
                match entity {
                    "amp" => out.push('&'),
                    "lt" => out.push('<'),
                    "gt" => out.push('>'),
                    "quot" => out.push('"'),
                    "apos" => out.push('\''),
                    "nbsp" => out.push(' '),
                    "ndash" => out.push('-'),
                    "mdash" => out.push_str("--"),
                    "hellip" => out.push_str("..."),
                    _ => match parse_numeric_entity(entity) {
                        Some(c) => out.push(c),
                        None => {
                            out.push('&');
                            out.push_str(entity);
                            out.push(';');
                        }
                    },
                }
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

// ── Tree builder ─────────────────────────────────────────────────────────────

/// A block container open on the stack. `Root` sits at the bottom.
enum Container {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    List { ordered: bool, items: Vec<ListItem> },
}

/// What kind of inline wrapper a stack frame closes into.
enum SpanKind {
    Bold,
    Italic,
    Link(String),
}

/// The block currently accepting inline spans.
enum BlockCtx {
    None,
    Paragraph,
    Heading(u8),
    Item,
}

struct RichTextParser {
    containers: Vec<Container>,
    inline_stack: Vec<(SpanKind, Vec<Inline>)>,
    spans: Vec<Inline>,
    block: BlockCtx,
}

impl Default for RichTextParser {
    fn default() -> Self {
        Self {
            containers: vec![Container::Root(Vec::new())],
            inline_stack: Vec::new(),
            spans: Vec::new(),
            block: BlockCtx::None,
        }
    }
}

impl RichTextParser {
    fn text(&mut self, text: &str) {
        if text.trim().is_empty() {
            // Whitespace between tags is formatting, not content — but keep
            // a single space inside an open block so words do not fuse.
            if matches!(self.block, BlockCtx::None) || !self.has_content() {
                return;
            }
            self.push_inline(Inline::text(" "));
            return;
        }
        if matches!(self.block, BlockCtx::None) {
            self.block = BlockCtx::Paragraph;
        }
        self.push_inline(Inline::text(text));
    }

    fn open(&mut self, name: &str, attrs: &str) {
        match name.to_ascii_lowercase().as_str() {
            "p" => {
                self.flush_block();
                self.block = BlockCtx::Paragraph;
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush_block();
                let level = name.as_bytes()[1] - b'0';
                self.block = BlockCtx::Heading(level);
            }
            "li" => {
                self.flush_block();
                self.block = BlockCtx::Item;
            }
            "ul" | "ol" => {
                self.flush_block();
                self.containers.push(Container::List {
                    ordered: name.eq_ignore_ascii_case("ol"),
                    items: Vec::new(),
                });
            }
            "blockquote" => {
                self.flush_block();
                self.containers.push(Container::Quote(Vec::new()));
            }
            "br" => {
                if matches!(self.block, BlockCtx::None) {
                    self.push_block(Block::Break);
                } else {
                    self.push_inline(Inline::Break);
                }
            }
            "strong" | "b" => self.inline_stack.push((SpanKind::Bold, Vec::new())),
            "em" | "i" => self.inline_stack.push((SpanKind::Italic, Vec::new())),
            "a" => {
                let url = RE_HREF
                    .captures(attrs)
                    .and_then(|c| c.get(1).or_else(|| c.get(2)))
                    .map(|m| decode_entities(m.as_str()))
                    .unwrap_or_default();
                self.inline_stack.push((SpanKind::Link(url), Vec::new()));
            }
            // div, span, and anything unrecognized: children pass through.
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name.to_ascii_lowercase().as_str() {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" => self.flush_block(),
            "ul" | "ol" => {
                self.flush_block();
                self.pop_container();
            }
            "blockquote" => {
                self.flush_block();
                self.pop_container();
            }
            "strong" | "b" | "em" | "i" | "a" => self.close_inline(),
            _ => {}
        }
    }

    fn finish(mut self) -> ContentDocument {
        self.flush_block();
        while self.containers.len() > 1 {
            self.pop_container();
        }
        match self.containers.pop() {
            Some(Container::Root(blocks)) => ContentDocument::new(blocks),
            _ => ContentDocument::default(),
        }
    }

    // — inline handling —

    fn has_content(&self) -> bool {
        !self.spans.is_empty() || self.inline_stack.iter().any(|(_, v)| !v.is_empty())
    }

    fn push_inline(&mut self, inline: Inline) {
        let spans = match self.inline_stack.last_mut() {
            Some((_, spans)) => spans,
            None => &mut self.spans,
        };
        // Merge adjacent text runs so downstream renderers see one span.
        if let (Some(Inline::Text(prev)), Inline::Text(next)) = (spans.last_mut(), &inline) {
            prev.push_str(next);
            return;
        }
        spans.push(inline);
    }

    fn close_inline(&mut self) {
        if let Some((kind, children)) = self.inline_stack.pop() {
            let wrapped = wrap_span(kind, children);
            self.push_inline(wrapped);
        }
    }

    /// Wrap every frame still open. Called when a block ends before its
    /// inline tags were closed.
    fn drain_inline_stack(&mut self) {
        while !self.inline_stack.is_empty() {
            self.close_inline();
        }
    }

    // — block handling —

    fn flush_block(&mut self) {
        self.drain_inline_stack();
        let spans = std::mem::take(&mut self.spans);
        let spans = trim_spans(spans);
        let block = std::mem::replace(&mut self.block, BlockCtx::None);
        if spans.is_empty() {
            return;
        }
        match block {
            BlockCtx::None | BlockCtx::Paragraph => self.push_block(Block::Paragraph(spans)),
            BlockCtx::Heading(level) => self.push_block(Block::heading(level, spans)),
            BlockCtx::Item => {
                if let Some(Container::List { items, .. }) = self.containers.last_mut() {
                    items.push(ListItem::new(spans));
                } else {
                    // An <li> outside any list degrades to a paragraph.
                    self.push_block(Block::Paragraph(spans));
                }
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.containers.last_mut() {
            Some(Container::Root(blocks)) | Some(Container::Quote(blocks)) => blocks.push(block),
            Some(Container::List { .. }) | None => {
                // A non-item block inside a list: attach after the list by
                // walking down to the nearest block container.
                for container in self.containers.iter_mut().rev() {
                    if let Container::Root(blocks) | Container::Quote(blocks) = container {
                        blocks.push(block);
                        return;
                    }
                }
            }
        }
    }

    fn pop_container(&mut self) {
        if self.containers.len() <= 1 {
            return;
        }
        let closed = self.containers.pop().expect("stack length checked");
        let block = match closed {
            Container::Quote(blocks) => Block::Quote(blocks),
            Container::List { ordered: true, items } => Block::OrderedList(items),
            Container::List { ordered: false, items } => Block::BulletList(items),
            Container::Root(blocks) => {
                self.containers.push(Container::Root(blocks));
                return;
            }
        };
        self.push_block(block);
    }
}

fn wrap_span(kind: SpanKind, children: Vec<Inline>) -> Inline {
    match kind {
        SpanKind::Bold => Inline::Bold(children),
        SpanKind::Italic => Inline::Italic(children),
        SpanKind::Link(url) => Inline::Link {
            url,
            content: children,
        },
    }
}

/// Drop leading/trailing pure-whitespace text spans from a finished block.
fn trim_spans(mut spans: Vec<Inline>) -> Vec<Inline> {
    let is_blank = |s: &Inline| matches!(s, Inline::Text(t) if t.trim().is_empty());
    while spans.first().is_some_and(is_blank) {
        spans.remove(0);
    }
    while spans.last().is_some_and(is_blank) {
        spans.pop();
    }
    if let Some(Inline::Text(t)) = spans.first_mut() {
        let trimmed = t.trim_start().to_string();
        *t = trimmed;
    }
    if let Some(Inline::Text(t)) = spans.last_mut() {
        let trimmed = t.trim_end().to_string();
        *t = trimmed;
    }
    spans
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_with_emphasis() {
        let doc = parse("<p><strong>Strong</strong> buy on <em>ACME</em></p>");
        assert_eq!(
            doc.blocks,
            vec![Block::Paragraph(vec![
                Inline::Bold(vec![Inline::text("Strong")]),
                Inline::text(" buy on "),
                Inline::Italic(vec![Inline::text("ACME")]),
            ])]
        );
    }

    #[test]
    fn test_heading_levels() {
        let doc = parse("<h2>Outlook</h2><p>Body</p>");
        assert_eq!(
            doc.blocks[0],
            Block::Heading {
                level: 2,
                content: vec![Inline::text("Outlook")]
            }
        );
    }

    #[test]
    fn test_unordered_list_two_items_in_order() {
        let doc = parse("<ul><li>first</li><li>second</li></ul>");
        assert_eq!(
            doc.blocks,
            vec![Block::BulletList(vec![
                ListItem::new(vec![Inline::text("first")]),
                ListItem::new(vec![Inline::text("second")]),
            ])]
        );
    }

    #[test]
    fn test_ordered_list() {
        let doc = parse("<ol><li>one</li></ol>");
        assert!(matches!(&doc.blocks[0], Block::OrderedList(items) if items.len() == 1));
    }

    #[test]
    fn test_blockquote_wraps_blocks() {
        let doc = parse("<blockquote><p>quoted words</p></blockquote>");
        match &doc.blocks[0] {
            Block::Quote(inner) => {
                assert_eq!(inner, &vec![Block::Paragraph(vec![Inline::text("quoted words")])]);
            }
            other => panic!("expected quote, got {other:?}"),
        }
    }

    #[test]
    fn test_link_with_href() {
        let doc = parse(r#"<p>see <a href="https://example.com/q?a=1&amp;b=2">here</a></p>"#);
        match &doc.blocks[0] {
            Block::Paragraph(spans) => match &spans[1] {
                Inline::Link { url, content } => {
                    assert_eq!(url, "https://example.com/q?a=1&b=2");
                    assert_eq!(content, &vec![Inline::text("here")]);
                }
                other => panic!("expected link, got {other:?}"),
            },
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_br_inside_paragraph() {
        let doc = parse("<p>one<br/>two</p>");
        assert_eq!(
            doc.blocks[0],
            Block::Paragraph(vec![Inline::text("one"), Inline::Break, Inline::text("two")])
        );
    }

    #[test]
    fn test_entities_decoded() {
        let doc = parse("<p>A &amp; B &lt;= C&nbsp;&#8212; done</p>");
        match &doc.blocks[0] {
            Block::Paragraph(spans) => {
                let text = match &spans[0] {
                    Inline::Text(t) => t,
                    other => panic!("unexpected {other:?}"),
                };
                assert_eq!(text, "A & B <= C \u{2014} done");
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_div_span_pass_through() {
        let doc = parse("<div><p><span>wrapped</span></p></div>");
        assert_eq!(doc.blocks, vec![Block::Paragraph(vec![Inline::text("wrapped")])]);
    }

    #[test]
    fn test_unknown_tag_degrades_to_children() {
        let doc = parse("<p><mark>kept text</mark></p>");
        assert_eq!(doc.blocks, vec![Block::Paragraph(vec![Inline::text("kept text")])]);
    }

    #[test]
    fn test_empty_paragraphs_dropped() {
        let doc = parse("<p>real</p><p>  </p><p></p>");
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn test_bare_text_becomes_paragraph() {
        let doc = parse("just plain text");
        assert_eq!(doc.blocks, vec![Block::Paragraph(vec![Inline::text("just plain text")])]);
    }

    #[test]
    fn test_unclosed_bold_closed_at_block_end() {
        let doc = parse("<p><strong>dangling</p>");
        assert_eq!(
            doc.blocks,
            vec![Block::Paragraph(vec![Inline::Bold(vec![Inline::text("dangling")])])]
        );
    }

    #[test]
    fn test_malformed_angle_bracket_is_text() {
        let doc = parse("<p>a < b</p>");
        assert_eq!(doc.blocks, vec![Block::Paragraph(vec![Inline::text("a < b")])]);
    }

    #[test]
    fn test_whitespace_between_list_items_ignored() {
        let doc = parse("<ul>\n  <li>one</li>\n  <li>two</li>\n</ul>");
        match &doc.blocks[0] {
            Block::BulletList(items) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }
}
