//! Render entry points: report record in, compiled PDF out.
//!
//! ## Staging lifecycle
//!
//! Every render works inside its own [`tempfile::TempDir`]: the rendered
//! `.tex` source, staged image assets, and everything the compiler writes
//! (`.aux`, `.log`, `.pdf`) live there. The PDF and log are *copied* out to
//! permanent storage under a content-derived name, and the staging directory
//! is reclaimed when the `TempDir` drops — on success, failure, or panic
//! alike. Nothing in the permanent directories is ever partial.
//!
//! The pipeline itself is deterministic; only the output filename carries
//! the render timestamp, so retrying a failed render is always safe.

use crate::compile::{log_tail, LatexCompiler};
use crate::config::RenderConfig;
use crate::error::{RenderWarning, ReportError};
use crate::output::{RenderOutput, RenderStats};
use crate::pipeline::assemble::{assemble, load_template, AssembleContext};
use crate::report::ReportData;
use chrono::Local;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Render a report to PDF.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(ReportError)` only for fatal conditions: invalid record,
/// missing template, missing compiler, timeout, or a compile that produced
/// no artifact. Content defects are repaired and surface as
/// [`RenderOutput::warnings`].
pub async fn render_report(
    report: &ReportData,
    config: &RenderConfig,
) -> Result<RenderOutput, ReportError> {
    let total_start = Instant::now();

    // ── Step 1: Validate input and toolchain ─────────────────────────────
    report.validate()?;
    let compiler = LatexCompiler::new(config.compiler_program.as_str(), config.compile_timeout_secs);
    compiler.check_available()?;

    // ── Step 2: Stage and assemble ───────────────────────────────────────
    let staging = tempfile::tempdir().map_err(|e| ReportError::StagingFailed { source: e })?;
    let now = Local::now();
    let template = load_template(report.template, config)?;
    let ctx = AssembleContext {
        images_dir: &config.images_dir,
        staging_dir: staging.path(),
        now,
    };
    let (source, warnings) = assemble(&template, report, &ctx);
    for warning in &warnings {
        warn!(%warning, "render warning");
    }

    let stem = report.output_stem(&now);
    let tex_path = staging.path().join(format!("{stem}.tex"));
    tokio::fs::write(&tex_path, &source)
        .await
        .map_err(|e| ReportError::StagingFailed { source: e })?;
    debug!(source = %tex_path.display(), bytes = source.len(), "wrote render source");

    // ── Step 3: Compile ──────────────────────────────────────────────────
    let compile_start = Instant::now();
    let outcome = compiler.compile(&tex_path).await?;
    let compile_duration_ms = compile_start.elapsed().as_millis() as u64;

    // ── Step 4: Relocate log (kept on success and failure alike) ─────────
    let log_path = match &outcome.log_path {
        Some(staged_log) => {
            let dest = config.logs_dir.join(format!("{stem}.log"));
            match persist(staged_log, &dest).await {
                Ok(()) => Some(dest),
                Err(e) => {
                    warn!(error = %e, "could not relocate compiler log");
                    None
                }
            }
        }
        None => None,
    };

    // ── Step 5: Judge the outcome by the artifact ────────────────────────
    let Some(staged_pdf) = &outcome.artifact else {
        return Err(ReportError::CompileFailed {
            log_tail: log_tail(&outcome.log_text),
        });
    };

    let pdf_path = config.output_dir.join(format!("{stem}.pdf"));
    persist(staged_pdf, &pdf_path)
        .await
        .map_err(|e| ReportError::OutputWriteFailed {
            path: pdf_path.clone(),
            source: e,
        })?;

    let source_path = if config.keep_source {
        let dest = config.output_dir.join(format!("{stem}.tex"));
        match persist(&tex_path, &dest).await {
            Ok(()) => Some(dest),
            Err(e) => {
                warn!(error = %e, "could not keep render source");
                None
            }
        }
    } else {
        None
    };

    let stats = RenderStats {
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        compile_duration_ms,
        source_bytes: source.len(),
        compiler_exit_ok: outcome.exit_ok,
    };
    info!(
        pdf = %pdf_path.display(),
        warnings = warnings.len(),
        total_ms = stats.total_duration_ms,
        "render complete"
    );

    Ok(RenderOutput {
        pdf_path,
        log_path,
        source_path,
        warnings,
        stats,
    })
}

/// Synchronous wrapper around [`render_report`].
///
/// Creates a temporary tokio runtime internally.
pub fn render_report_sync(
    report: &ReportData,
    config: &RenderConfig,
) -> Result<RenderOutput, ReportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(render_report(report, config))
}

/// Assemble the LaTeX source for a report without invoking the compiler.
///
/// Requires no LaTeX toolchain. Image assets are staged into a throwaway
/// directory and discarded; only the returned source matters here.
pub fn assemble_source(
    report: &ReportData,
    config: &RenderConfig,
) -> Result<(String, Vec<RenderWarning>), ReportError> {
    report.validate()?;
    let staging = tempfile::tempdir().map_err(|e| ReportError::StagingFailed { source: e })?;
    let template = load_template(report.template, config)?;
    let ctx = AssembleContext {
        images_dir: &config.images_dir,
        staging_dir: staging.path(),
        now: Local::now(),
    };
    Ok(assemble(&template, report, &ctx))
}

/// Copy a staged file to permanent storage, creating parent directories.
///
/// Copy, not rename: the staging directory often lives on a different
/// filesystem than the output directory, and the staged original is
/// reclaimed with the staging directory anyway.
async fn persist(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(from, to).await?;
    Ok(())
}
