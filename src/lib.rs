//! # reco2pdf
//!
//! Render structured investment-recommendation reports to styled PDF via
//! LaTeX.
//!
//! ## Why this crate?
//!
//! Report bodies arrive as rich text from an embedded editor or as Markdown
//! from a generative backend — untrusted, irregularly formatted text either
//! way. LaTeX is unforgiving: a single unescaped `%` or an unbalanced brace
//! aborts the entire document compile. This crate owns the pipeline that
//! makes that transformation safe: normalization of generation artefacts,
//! structure-preserving conversion to typesetting markup, escaping that
//! never touches already-emitted commands, and structural repair before the
//! compiler ever sees the source.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ReportData
//!  │
//!  ├─ 1. Normalize  fix encoding artefacts and generation quirks
//!  ├─ 2. Parse      rich text or Markdown → content document tree
//!  ├─ 3. Convert    tree → LaTeX structure, literal text still raw
//!  ├─ 4. Escape     one protect/escape/restore pass over the body
//!  ├─ 5. Validate   repair unbalanced groups, warn on what remains
//!  ├─ 6. Assemble   substitute template slots, stage image assets
//!  └─ 7. Compile    pdflatex under a timeout; artifact decides success
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reco2pdf::{render_report, RenderConfig, ReportData};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report: ReportData =
//!         serde_json::from_str(&std::fs::read_to_string("report.json")?)?;
//!     let config = RenderConfig::default();
//!     let output = render_report(&report, &config).await?;
//!     println!("{}", output.pdf_path.display());
//!     for warning in &output.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `reco2pdf` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! reco2pdf = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compile;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compile::{CompileOutcome, LatexCompiler};
pub use config::{RenderConfig, RenderConfigBuilder};
pub use convert::{assemble_source, render_report, render_report_sync};
pub use document::{Block, ContentDocument, Inline, ListItem};
pub use error::{RenderWarning, ReportError};
pub use output::{RenderOutput, RenderStats};
pub use report::{
    AnalysisType, BodyFormat, ContentSource, ExportBody, GeneratedBody, ReportContent, ReportData,
    TemplateVersion,
};
