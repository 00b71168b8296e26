//! Error types for the reco2pdf library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`ReportError`] — **Fatal**: the render cannot produce a PDF at all
//!   (invalid report record, template missing, LaTeX toolchain absent,
//!   compilation produced no artifact). Returned as `Err(ReportError)` from
//!   the top-level `render_report*` functions.
//!
//! * [`RenderWarning`] — **Non-fatal**: a content defect was repaired or a
//!   structural imbalance survived repair. Collected into
//!   [`crate::output::RenderOutput`] so callers can inspect what the
//!   pipeline fixed rather than losing the render to a stray brace.
//!
//! The separation encodes the propagation policy: stage-local failures are
//! converted into a silent repair, a warning annotation, or a typed fatal
//! error — never a raw io/encoding error escaping to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the reco2pdf library.
///
/// Repairs and structural imbalances use [`RenderWarning`] and are stored in
/// [`crate::output::RenderOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The report record failed field validation.
    #[error("Invalid report: {0}")]
    InvalidReport(String),

    /// No template file exists for the requested template version.
    #[error("Template not found for version '{version}': '{path}'\nCheck --templates-dir or use a built-in template version.")]
    TemplateNotFound { version: String, path: PathBuf },

    // ── Compiler errors ───────────────────────────────────────────────────
    /// The LaTeX toolchain is not installed or not on PATH.
    ///
    /// Deliberately distinct from [`ReportError::CompileFailed`]: "install
    /// the tool" and "fix the document" are different user actions.
    #[error("LaTeX compiler '{program}' is not available.\n{hint}")]
    CompilerMissing { program: String, hint: String },

    /// The compiler ran but produced no PDF artifact.
    ///
    /// The artifact file is the authoritative success signal; a non-zero
    /// exit status alone does not land here (warnings are benign).
    #[error("LaTeX compilation failed — no PDF produced.\nLast diagnostics:\n{log_tail}")]
    CompileFailed { log_tail: String },

    /// The compiler exceeded its timeout and was killed.
    #[error("LaTeX compilation timed out after {secs}s.\nIncrease the compile timeout or inspect the source at '{source_path}'.")]
    CompileTimeout { secs: u64, source_path: PathBuf },

    /// The compiler process could not be spawned or waited on.
    #[error("Failed to run LaTeX compiler: {detail}")]
    CompilerInvocation { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The per-render staging directory could not be created or written.
    #[error("Failed to stage render files: {source}")]
    StagingFailed {
        #[source]
        source: std::io::Error,
    },

    /// Could not relocate the PDF or log to permanent storage.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal defect found and handled during a render.
///
/// Stored in [`crate::output::RenderOutput::warnings`] and logged via
/// `tracing::warn!`. The render proceeds; final judgment on structural
/// imbalance is deferred to the compile step.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderWarning {
    /// Group-delimiter counts still differ after all repairs.
    #[error("Unbalanced groups after repair: {opening} opening vs {closing} closing")]
    UnbalancedGroups { opening: usize, closing: usize },

    /// A standalone closing brace with no owning command was removed.
    #[error("Removed orphaned closing brace at line {line}")]
    OrphanedBraceRemoved { line: usize },

    /// A sectioning command was missing its closing brace; one was appended.
    #[error("Added missing closing brace to sectioning command at line {line}")]
    MissingBraceAdded { line: usize },

    /// A single trailing escape-introducer was stripped.
    #[error("Stripped trailing escape introducer")]
    TrailingIntroducerStripped,

    /// A referenced image asset could not be staged; a fallback was used.
    #[error("Image asset '{path}' could not be staged: {detail}")]
    AssetMissing { path: String, detail: String },

    /// Invalid byte sequences were replaced during normalization.
    #[error("Replaced {count} unresolvable byte sequence(s) in content")]
    BytesReplaced { count: usize },
}
