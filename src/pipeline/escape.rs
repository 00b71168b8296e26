//! Escaping: shield structural commands, escape everything else.
//!
//! ## The data/command problem
//!
//! LaTeX uses one alphabet for both commands and content. By the time text
//! reaches this stage the structural converter has already interleaved
//! commands (`\textbf{…}`, `\begin{itemize}`) with raw literal text, so a
//! blanket escape would destroy the very structure just emitted, and
//! escaping before conversion would double-escape. The fix is a single
//! protect/escape/restore pass over the whole string.
//!
//! ## Segment list, not sentinel splicing
//!
//! Protection is implemented as an explicit segment list
//! ([`Segment::Protected`] / [`Segment::Literal`]), not by splicing
//! placeholder substrings into the text. Sentinel substrings can collide
//! with content that happens to contain sentinel-like text; a segment list
//! cannot, and restoring "each protected span exactly once, in order" is a
//! structural property of the list rather than an invariant to police.

/// One scanned region of markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Already-final target syntax: copied through verbatim, exactly once.
    Protected(String),
    /// Free text: every reserved character gets its safe escaped form.
    Literal(String),
}

/// Characters that have syntactic meaning in the target markup.
const RESERVED: &[char] = &[
    '\\', '{', '}', '$', '&', '%', '#', '^', '_', '~', '|', '<', '>',
];

/// Escape reserved characters in literal text while leaving structural
/// commands untouched.
///
/// A protected command is the escape introducer followed by letters, an
/// optional star, an optional bracketed option, and any number of
/// brace-delimited groups (nested braces supported). The introducer followed
/// by a single reserved character is an already-escaped form and is
/// protected too, which makes the pass idempotent: running it twice never
/// double-escapes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    for seg in segment(input) {
        match seg {
            Segment::Protected(s) => out.push_str(&s),
            Segment::Literal(s) => out.push_str(&escape_literal(&s)),
        }
    }
    out
}

/// Escape a plain scalar field (ticker, price, category).
///
/// No protection pass: scalar fields must not contain commands, so every
/// reserved character — including the introducer itself — is escaped.
pub fn escape_plain(input: &str) -> String {
    escape_literal(input)
}

/// Split markup into protected commands and literal runs.
///
/// Concatenating the segments in order reproduces the input byte-for-byte.
pub fn segment(input: &str) -> Vec<Segment> {
    let bytes = input.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        match protected_len(&input[i..]) {
            Some(len) => {
                if literal_start < i {
                    segments.push(Segment::Literal(input[literal_start..i].to_string()));
                }
                segments.push(Segment::Protected(input[i..i + len].to_string()));
                i += len;
                literal_start = i;
            }
            None => {
                // A bare introducer with no command after it stays literal.
                i += 1;
            }
        }
    }
    if literal_start < bytes.len() {
        segments.push(Segment::Literal(input[literal_start..].to_string()));
    }
    segments
}

/// Length in bytes of the protected command starting at `rest` (which begins
/// with the introducer), or `None` if this introducer starts no command.
fn protected_len(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices().skip(1);
    let (first_idx, first) = chars.next()?;

    // Already-escaped form (`\%`, `\{`, …) or a line break (`\\`).
    if RESERVED.contains(&first) {
        return Some(first_idx + first.len_utf8());
    }

    if !first.is_ascii_alphabetic() {
        return None;
    }

    // Command name: one or more letters, optional star.
    let mut end = first_idx + first.len_utf8();
    for (idx, c) in chars {
        if c.is_ascii_alphabetic() {
            end = idx + c.len_utf8();
        } else {
            break;
        }
    }
    let tail = &rest[end..];
    let mut consumed = end;

    let tail = match tail.strip_prefix('*') {
        Some(t) => {
            consumed += 1;
            t
        }
        None => tail,
    };

    // Optional bracketed option, not nested.
    let tail = match tail.strip_prefix('[') {
        Some(t) => match t.find(']') {
            Some(close) => {
                consumed += 1 + close + 1;
                &t[close + 1..]
            }
            None => return Some(consumed),
        },
        None => tail,
    };

    // Zero or more brace groups with nesting. An unterminated group is not
    // consumed; protection stops at the command name and the rest is treated
    // as literal text for the validator to deal with.
    let mut remaining = tail;
    loop {
        match brace_group_len(remaining) {
            Some(len) => {
                consumed += len;
                remaining = &remaining[len..];
            }
            None => break,
        }
    }

    Some(consumed)
}

/// Length of the balanced brace group at the start of `s`, or `None`.
fn brace_group_len(s: &str) -> Option<usize> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    for (idx, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn escape_literal(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '$' => out.push_str("\\$"),
            '&' => out.push_str("\\&"),
            '%' => out.push_str("\\%"),
            '#' => out.push_str("\\#"),
            '^' => out.push_str("\\textasciicircum{}"),
            '_' => out.push_str("\\_"),
            '~' => out.push_str("\\textasciitilde{}"),
            '|' => out.push_str("\\textbar{}"),
            '<' => out.push_str("\\textless{}"),
            '>' => out.push_str("\\textgreater{}"),
            _ => out.push(c),
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────
