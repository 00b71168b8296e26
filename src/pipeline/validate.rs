//! Structure validation: repair emitted markup before it reaches the compiler.
//!
//! A single unbalanced group aborts the entire document compile, so this
//! stage fails closed toward *repair*, not rejection. Every rule targets a
//! defect class actually observed in converted generated text: orphaned
//! closing braces after sectioning commands, sectioning lines missing their
//! closer, and stray control bytes that survived earlier stages.
//!
//! What cannot be repaired is *reported*: if group counts still differ after
//! all rules ran, a [`RenderWarning::UnbalancedGroups`] is attached and the
//! render proceeds — the compiler, not this module, is the final judge of
//! validity.

use crate::error::RenderWarning;
use once_cell::sync::Lazy;
use regex::Regex;

/// A sectioning command with an argument group on one line.
static RE_SECTIONING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(?:(?:sub){0,2}section|paragraph)\*?\{").unwrap());

/// A sectioning command whose own line is followed by a lone closing brace.
static RE_SECTION_THEN_ORPHAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\\(?:(?:sub){0,2}section|paragraph)\*?\{[^}]*\})[ \t]*\n[ \t]*\}").unwrap()
});

/// Repair structural defects in emitted markup, reporting what was done.
///
/// Rules, in order:
/// 1. Remove literal NUL and CR bytes.
/// 2. Strip a single trailing unmatched escape introducer.
/// 3. Drop an orphaned `}` that directly follows a sectioning command on its
///    own line.
/// 4. On a line holding a sectioning command where openers exceed closers by
///    exactly one, append the missing closer.
/// 5. Remove a standalone `}` line whose preceding non-blank line does not
///    end in `{` or `}`.
/// 6. Compare global group-delimiter counts; a mismatch becomes a warning,
///    never an error.
pub fn validate(input: &str) -> (String, Vec<RenderWarning>) {
    let mut warnings = Vec::new();

    let mut markup: String = input.chars().filter(|&c| c != '\0' && c != '\r').collect();

    if markup.trim_end().ends_with('\\') && !markup.trim_end().ends_with("\\\\") {
        let end = markup.trim_end().len();
        markup.replace_range(end - 1.., "");
        warnings.push(RenderWarning::TrailingIntroducerStripped);
    }

    let markup = RE_SECTION_THEN_ORPHAN.replace_all(&markup, "$1").into_owned();

    let mut lines: Vec<String> = Vec::new();
    for (idx, line) in markup.lines().enumerate() {
        let line_no = idx + 1;

        if line.trim() == "}" {
            let prev = lines.iter().rev().find(|l| !l.trim().is_empty());
            let owned = prev.is_some_and(|p| {
                let t = p.trim_end();
                t.ends_with('{') || t.ends_with('}')
            });
            if !owned {
                tracing::warn!(line = line_no, "removing orphaned closing brace");
                warnings.push(RenderWarning::OrphanedBraceRemoved { line: line_no });
                continue;
            }
        }

        let mut line = line.to_string();
        if RE_SECTIONING.is_match(&line) {
            let opens = count_unescaped(&line, '{');
            let closes = count_unescaped(&line, '}');
            if opens == closes + 1 {
                tracing::warn!(line = line_no, "sectioning command missing closing brace");
                warnings.push(RenderWarning::MissingBraceAdded { line: line_no });
                let end = line.trim_end().len();
                line.truncate(end);
                line.push('}');
            }
        }

        lines.push(line);
    }
    let repaired = lines.join("\n");

    let opening = count_unescaped(&repaired, '{');
    let closing = count_unescaped(&repaired, '}');
    if opening != closing {
        tracing::warn!(opening, closing, "group delimiters unbalanced after repair");
        warnings.push(RenderWarning::UnbalancedGroups { opening, closing });
    }

    (repaired, warnings)
}

/// Count group delimiters that are *structural*: `\{` is literal content,
/// `\\{` opens a group right after a line break.
fn count_unescaped(s: &str, target: char) -> usize {
    let mut count = 0;
    let mut introducers = 0usize;
    for c in s.chars() {
        if c == '\\' {
            introducers += 1;
            continue;
        }
        if c == target && introducers % 2 == 0 {
            count += 1;
        }
        introducers = 0;
    }
    count
}

// ── Tests ────────────────────────────────────────────────────────────────────
