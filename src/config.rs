//! Configuration types for report rendering.
//!
//! All render behaviour is controlled through [`RenderConfig`], built via its
//! [`RenderConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across renders, serialise them for logging, and diff two
//! runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field. The
//! builder lets callers set only what they care about and rely on documented
//! defaults for the rest.

use crate::error::ReportError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a report render.
///
/// Built via [`RenderConfig::builder()`] or using
/// [`RenderConfig::default()`].
///
/// # Example
/// ```rust
/// use reco2pdf::RenderConfig;
///
/// let config = RenderConfig::builder()
///     .output_dir("out/pdfs")
///     .compile_timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Where compiled PDFs are relocated after a successful render.
    /// Default: `data/pdfs`.
    pub output_dir: PathBuf,

    /// Where compiler logs are relocated, success or failure.
    /// Default: `data/logs`.
    ///
    /// Logs are kept even for successful renders: a benign-warning compile
    /// today is tomorrow's debugging session.
    pub logs_dir: PathBuf,

    /// Where referenced image assets (logo, chart) are resolved from.
    /// Default: `data/images`.
    pub images_dir: PathBuf,

    /// Directory holding template `.tex` files, one per template version
    /// (`report_v1.tex` …). `None` uses the templates embedded in the binary.
    ///
    /// External templates are read-only inputs; the renderer never writes
    /// into this directory.
    pub templates_dir: Option<PathBuf>,

    /// The LaTeX compiler program. Default: `pdflatex`.
    pub compiler_program: String,

    /// Wall-clock limit for one compiler invocation in seconds. Default: 120.
    ///
    /// pdflatex on a one-page report finishes in under two seconds; a run
    /// that takes minutes is stuck in an error loop that `nonstopmode` did
    /// not break. The timeout converts that hang into a typed, recoverable
    /// error instead of a wedged render worker.
    pub compile_timeout_secs: u64,

    /// Also copy the rendered `.tex` source next to the PDF. Default: false.
    ///
    /// Off in production; invaluable when diagnosing a compile failure
    /// reported by a user, since the staging directory is gone by then.
    pub keep_source: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/pdfs"),
            logs_dir: PathBuf::from("data/logs"),
            images_dir: PathBuf::from("data/images"),
            templates_dir: None,
            compiler_program: "pdflatex".to_string(),
            compile_timeout_secs: 120,
            keep_source: false,
        }
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.logs_dir = dir.into();
        self
    }

    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    pub fn templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.templates_dir = Some(dir.into());
        self
    }

    pub fn compiler_program(mut self, program: impl Into<String>) -> Self {
        self.config.compiler_program = program.into();
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compile_timeout_secs = secs;
        self
    }

    pub fn keep_source(mut self, v: bool) -> Self {
        self.config.keep_source = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, ReportError> {
        let c = &self.config;
        if c.compile_timeout_secs == 0 {
            return Err(ReportError::InvalidConfig(
                "compile timeout must be ≥ 1 second".into(),
            ));
        }
        if c.compiler_program.trim().is_empty() {
            return Err(ReportError::InvalidConfig(
                "compiler program must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
