//! Pipeline stages for report-to-LaTeX conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the Markdown parser) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! content ──▶ normalize ──▶ richtext/markdown ──▶ latex ──▶ escape ──▶ validate ──▶ assemble
//! (either      (cleanup)      (parse to tree)     (emit)    (protect/   (repair)    (template)
//!  track)                                                    escape)
//! ```
//!
//! 1. [`normalize`]  — deterministic text cleanup of generated/pasted input
//! 2. [`richtext`]   — editor markup → content document
//! 3. [`markdown`]   — Markdown ⇄ content document, Markdown → rich text
//! 4. [`latex`]      — content document → structural markup, text left raw
//! 5. [`escape`]     — one protect/escape/restore pass over the whole body
//! 6. [`validate`]   — group-balance repair; what can't be fixed is warned
//! 7. [`assemble`]   — template slot substitution and asset staging
//!
//! Every stage except [`assemble`] is a pure text transform: bounded time,
//! no I/O, byte-identical output for identical input.

pub mod assemble;
pub mod escape;
pub mod latex;
pub mod markdown;
pub mod normalize;
pub mod richtext;
pub mod validate;
