//! Output types returned by the render entry points.

use crate::error::RenderWarning;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of a successful report render.
///
/// A render that returns `Ok` always produced a PDF; repairs and structural
/// doubts along the way are in [`warnings`](Self::warnings), not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOutput {
    /// The compiled PDF, relocated to the configured output directory.
    pub pdf_path: PathBuf,
    /// The compiler log, relocated to the configured logs directory.
    /// `None` only if the compiler wrote no log at all.
    pub log_path: Option<PathBuf>,
    /// The rendered `.tex` source, kept only with `keep_source`.
    pub source_path: Option<PathBuf>,
    /// Non-fatal defects repaired or flagged during the render.
    pub warnings: Vec<RenderWarning>,
    /// Timing and size accounting.
    pub stats: RenderStats,
}

/// Accounting for one render.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderStats {
    /// Wall-clock for the whole render.
    pub total_duration_ms: u64,
    /// Wall-clock spent inside the compiler invocation.
    pub compile_duration_ms: u64,
    /// Size of the rendered LaTeX source in bytes.
    pub source_bytes: usize,
    /// Whether the compiler reported a clean exit (informational; the
    /// artifact decided success).
    pub compiler_exit_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_serializes() {
        let out = RenderOutput {
            pdf_path: PathBuf::from("data/pdfs/r.pdf"),
            log_path: None,
            source_path: None,
            warnings: vec![RenderWarning::TrailingIntroducerStripped],
            stats: RenderStats::default(),
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("r.pdf"));
        assert!(json.contains("TrailingIntroducerStripped"));
    }
}
