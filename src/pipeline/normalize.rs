//! Normalization: deterministic cleanup of generated and pasted text.
//!
//! ## Why is normalization necessary?
//!
//! Content reaching the pipeline is untrusted in shape even when it is
//! trustworthy in substance. A generative backend occasionally emits
//! artefacts that are *semantically correct* but *typographically broken* —
//! for example:
//!
//! - Smart quotes, em dashes, and ellipses that the typesetting fonts reject
//! - Windows-1252 bytes smuggled through as C1 control codepoints
//! - A missing space after sentence punctuation (`landscape.Our`)
//! - Numbers fused to their unit word (`10billion`)
//!
//! This module applies cheap, deterministic string/regex rules that fix these
//! quirks without touching content. Each rule is independently testable, and
//! the whole pass is pure: same input, same output, no side effects, no
//! failure path. Unresolvable byte sequences are replaced, never fatal.
//!
//! ## Rule order
//!
//! Byte recovery must run before any `str` rule; codepoint mapping must run
//! before token-boundary repair so a mapped dash does not re-fuse words; the
//! whitespace pass runs last so earlier rules may be sloppy about spacing.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalize raw bytes into clean text.
///
/// Front door for content whose encoding is not guaranteed. Invalid UTF-8
/// sequences are replaced with U+FFFD and reported in the returned count so
/// the caller can attach a warning; the pipeline never aborts on encoding.
pub fn normalize_bytes(input: &[u8]) -> (String, usize) {
    let text = String::from_utf8_lossy(input);
    let replaced = text.matches('\u{FFFD}').count();
    (normalize(&text), replaced)
}

/// Apply all normalization rules to already-valid text.
///
/// Rules (applied in order):
/// 1. Normalize line endings (CRLF → LF) and drop stray control bytes
/// 2. Map typographic and legacy codepoints to ASCII-safe equivalents
/// 3. Insert a space after sentence punctuation followed by a capital
/// 4. Insert a space between a digit and a fused magnitude word
/// 5. Collapse runs of spaces and excess blank lines, trim the ends
pub fn normalize(input: &str) -> String {
    let s = strip_control_chars(input);
    let s = map_codepoints(&s);
    let s = separate_sentences(&s);
    let s = separate_magnitudes(&s);
    collapse_whitespace(&s)
}

// ── Rule 1: Line endings and control bytes ───────────────────────────────────

fn strip_control_chars(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}

// ── Rule 2: Codepoint mapping ────────────────────────────────────────────────
//
// Two families: typographic characters (smart quotes, dashes, ellipsis) that
// pdflatex's input encoding chokes on, and Windows-1252 punctuation that
// arrives as C1 controls when a legacy byte was decoded as its codepoint.
// Sub/superscript digits are folded to plain digits; the typeset output
// formats numbers itself.

fn map_codepoints(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            // dashes and the minus sign
            '\u{2013}' | '\u{0096}' => out.push('-'),
            '\u{2014}' | '\u{0097}' => out.push_str("--"),
            '\u{2212}' => out.push('-'),
            // quotes
            '\u{2018}' | '\u{2019}' | '\u{2032}' | '\u{0091}' | '\u{0092}' | '\u{00B4}' => {
                out.push('\'')
            }
            '\u{201C}' | '\u{201D}' | '\u{2033}' | '\u{0093}' | '\u{0094}' => out.push('"'),
            // ellipsis, spaces, bullets
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' => out.push(' '),
            '\u{2022}' => out.push('-'),
            // subscript digits and signs
            '\u{2080}'..='\u{2089}' => out.push(sub_digit(c)),
            '\u{208A}' => out.push('+'),
            '\u{208B}' => out.push('-'),
            '\u{208C}' => out.push('='),
            '\u{208D}' => out.push('('),
            '\u{208E}' => out.push(')'),
            // superscript digits
            '\u{2070}' => out.push('0'),
            '\u{00B9}' => out.push('1'),
            '\u{00B2}' => out.push('2'),
            '\u{00B3}' => out.push('3'),
            '\u{2074}'..='\u{2079}' => out.push(sup_digit(c)),
            // invisible junk
            '\u{200B}' | '\u{FEFF}' | '\u{00AD}' | '\u{200C}' | '\u{200D}' | '\u{2060}' => {}
            _ => out.push(c),
        }
    }
    out
}

fn sub_digit(c: char) -> char {
    char::from_digit(c as u32 - 0x2080, 10).unwrap_or('0')
}

fn sup_digit(c: char) -> char {
    char::from_digit(c as u32 - 0x2070, 10).unwrap_or('0')
}

// ── Rule 3: Sentence-boundary repair ─────────────────────────────────────────
//
// `landscape.Our` → `landscape. Our`. The uppercase requirement keeps
// decimals (`3.14`), tickers (`BRK.B`), and domains (`example.com`) intact.

static RE_SENTENCE_FUSED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?,:;])([A-Z][a-z])").unwrap());

fn separate_sentences(input: &str) -> String {
    RE_SENTENCE_FUSED.replace_all(input, "$1 $2").to_string()
}

// ── Rule 4: Magnitude-word repair ────────────────────────────────────────────
//
// `10billion` → `10 billion`. Restricted to known magnitude words so unit
// suffixes (`100km`, `50MB`) survive untouched.

static RE_MAGNITUDE_FUSED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)(billion|million|trillion|thousand)\b").unwrap());

fn separate_magnitudes(input: &str) -> String {
    RE_MAGNITUDE_FUSED.replace_all(input, "$1 $2").to_string()
}

// ── Rule 5: Whitespace collapse ──────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n\s*\n+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    let s = RE_SPACES.replace_all(input, " ");
    let s = RE_BLANK_LINES.replace_all(&s, "\n\n");
    s.trim().to_string()
}

// ── Generated-content cleanup ────────────────────────────────────────────────

static RE_PREAMBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(here's|here is|based on)\b[^\n]*:\s*\n+").unwrap());
static RE_NOTE_TRAILER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\*\*Note:\*\*.*$").unwrap());

/// Strip conversational wrapping a generative backend adds around the
/// content it was asked for.
///
/// Removes a leading "Here's the analysis you asked for:" style preamble
/// line, trailing `**Note:** …` commentary, and a final line left dangling
/// by an unterminated bold marker. A trailing heading is kept as-is: a
/// document that ends in `# Title` is a short document, not a broken one.
pub fn clean_generated(input: &str) -> String {
    let s = RE_PREAMBLE.replace(input.trim_start(), "");
    let s = RE_NOTE_TRAILER.replace_all(&s, "");

    let mut lines: Vec<&str> = s.lines().collect();
    while matches!(lines.last(), Some(l) if l.trim().is_empty()) {
        lines.pop();
    }
    if let Some(last) = lines.last() {
        let t = last.trim();
        // An odd number of markers means the bold span never closed.
        if t.starts_with("**") && t.matches("**").count() % 2 == 1 {
            lines.pop();
        }
    }

    normalize(&lines.join("\n"))
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endings_and_controls() {
        assert_eq!(strip_control_chars("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(strip_control_chars("a\u{0000}b\u{0007}c"), "abc");
        assert_eq!(strip_control_chars("keep\ttab"), "keep\ttab");
    }

    #[test]
    fn test_dash_and_quote_mapping() {
        assert_eq!(map_codepoints("a \u{2013} b"), "a - b");
        assert_eq!(map_codepoints("a \u{2014} b"), "a -- b");
        assert_eq!(map_codepoints("\u{2018}q\u{2019}"), "'q'");
        assert_eq!(map_codepoints("\u{201C}q\u{201D}"), "\"q\"");
        assert_eq!(map_codepoints("wait\u{2026}"), "wait...");
    }

    #[test]
    fn test_legacy_c1_punctuation() {
        // Windows-1252 0x93/0x94 decoded as codepoints
        assert_eq!(map_codepoints("\u{0093}hi\u{0094}"), "\"hi\"");
        assert_eq!(map_codepoints("long\u{0097}dash"), "long--dash");
    }

    #[test]
    fn test_subscript_digits_folded() {
        assert_eq!(map_codepoints("H\u{2082}O"), "H2O");
        assert_eq!(map_codepoints("x\u{00B2}"), "x2");
    }

    #[test]
    fn test_invisible_chars_removed() {
        assert_eq!(map_codepoints("a\u{200B}b\u{FEFF}c\u{00AD}d"), "abcd");
    }

    #[test]
    fn test_sentence_boundary_repair() {
        assert_eq!(
            separate_sentences("landscape.Our thesis"),
            "landscape. Our thesis"
        );
        // decimals and tickers are left alone
        assert_eq!(separate_sentences("pi is 3.14"), "pi is 3.14");
        assert_eq!(separate_sentences("BRK.B holders"), "BRK.B holders");
    }

    #[test]
    fn test_magnitude_word_repair() {
        assert_eq!(separate_magnitudes("$2billion cap"), "$2 billion cap");
        assert_eq!(separate_magnitudes("30million shares"), "30 million shares");
        // unit suffixes survive
        assert_eq!(separate_magnitudes("100km range"), "100km range");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(collapse_whitespace("a   b\t\tc"), "a b c");
        assert_eq!(collapse_whitespace("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_normalize_bytes_replaces_invalid_sequences() {
        let (text, replaced) = normalize_bytes(b"upside \xff\xfe ahead");
        assert_eq!(replaced, 2);
        assert!(text.contains('\u{FFFD}'));
        assert!(text.starts_with("upside"));
    }

    #[test]
    fn test_normalize_em_dash_scenario() {
        // The canonical scenario: em dash preserved as a plain hyphen pair.
        let out = normalize("ACME Corp \u{2014} target 10% upside");
        assert_eq!(out, "ACME Corp -- target 10% upside");
    }

    // Regression fixtures from observed generated-text artifacts. The
    // general rules must fix the boundary classes they cover; dictionary
    // fusions are out of scope by design.
    #[test]
    fn test_observed_artifact_fixtures() {
        assert_eq!(normalize("landscape.Our view"), "landscape. Our view");
        assert_eq!(normalize("million.Robust growth"), "million. Robust growth");
        assert_eq!(normalize("high\u{2212}growth markets"), "high-growth markets");
        assert_eq!(normalize("$3billion and rising"), "$3 billion and rising");
        assert_eq!(normalize("company\u{00B4}s moat"), "company's moat");
    }

    #[test]
    fn test_clean_generated_strips_preamble_and_note() {
        let input =
            "Here's the investment thesis you requested:\n\nStrong moat.\n\n**Note:** not advice\n";
        let out = clean_generated(input);
        assert_eq!(out, "Strong moat.");
    }

    #[test]
    fn test_clean_generated_drops_unterminated_bold_trailer() {
        let out = clean_generated("Solid quarter.\n\n**Catalyst");
        assert_eq!(out, "Solid quarter.");
    }

    #[test]
    fn test_clean_generated_keeps_closed_bold_trailer() {
        let out = clean_generated("Summary.\n\n**Strong** conviction here");
        assert!(out.ends_with("**Strong** conviction here"));
    }

    #[test]
    fn test_clean_generated_keeps_trailing_heading() {
        // A heading at end-of-document is legitimate content.
        let out = clean_generated("Body text.\n\n# Outlook");
        assert!(out.ends_with("# Outlook"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("a \u{2014} b.Next  line\n\n\n\nend");
        assert_eq!(normalize(&once), once);
    }
}
