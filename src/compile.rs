//! The LaTeX compiler collaborator.
//!
//! The compiler is an external tool with two awkward properties the rest of
//! the crate must not care about:
//!
//! 1. **Exit status lies.** pdflatex exits non-zero for benign warnings
//!    while still producing a perfectly good PDF. The artifact file on disk
//!    is the authoritative success signal, so [`LatexCompiler::compile`]
//!    checks for it and reports the exit status separately.
//! 2. **It can hang.** `nonstopmode` does not break every error loop. The
//!    invocation runs under an explicit timeout and a timeout is a typed,
//!    recoverable error — not a wedged worker.
//!
//! "Tool missing" and "compile failed" are deliberately distinct errors:
//! one is fixed by installing TeX Live, the other by looking at the log.

use crate::error::ReportError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// How many diagnostic lines from the end of the log surface in errors.
const LOG_TAIL_LINES: usize = 5;

/// Handle to the external LaTeX toolchain.
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
    timeout: Duration,
}

/// Result of one compiler invocation.
#[derive(Debug)]
pub struct CompileOutcome {
    /// The produced PDF, present iff compilation succeeded.
    pub artifact: Option<PathBuf>,
    /// The compiler log file, if one was written.
    pub log_path: Option<PathBuf>,
    /// Log contents, lossily decoded (TeX logs are not reliably UTF-8).
    pub log_text: String,
    /// Raw exit status; informational only, never the success signal.
    pub exit_ok: bool,
}

impl CompileOutcome {
    /// Artifact presence is the authoritative success signal.
    pub fn success(&self) -> bool {
        self.artifact.is_some()
    }
}

impl LatexCompiler {
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Check that the compiler binary exists on PATH.
    ///
    /// Cheap enough to run before assembling anything, so a missing
    /// toolchain fails fast with an install hint instead of after the
    /// whole pipeline ran.
    pub fn check_available(&self) -> Result<(), ReportError> {
        which::which(&self.program).map_err(|_| self.missing_error())?;
        Ok(())
    }

    /// Compile `tex_path` in its parent directory.
    ///
    /// Returns `Ok` with an outcome whether or not the document compiled;
    /// `Err` only for invocation-level failures (tool missing, timeout,
    /// spawn failure). Interpreting a no-artifact outcome as
    /// [`ReportError::CompileFailed`] is the caller's decision.
    pub async fn compile(&self, tex_path: &Path) -> Result<CompileOutcome, ReportError> {
        let work_dir = tex_path.parent().unwrap_or_else(|| Path::new("."));
        let stem = tex_path
            .file_stem()
            .ok_or_else(|| ReportError::Internal(format!("no file stem in {}", tex_path.display())))?
            .to_string_lossy()
            .into_owned();

        debug!(program = %self.program, tex = %tex_path.display(), "invoking compiler");

        let invocation = Command::new(&self.program)
            .arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(work_dir)
            .arg(tex_path)
            .current_dir(work_dir)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, invocation).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(self.missing_error());
            }
            Ok(Err(e)) => {
                return Err(ReportError::CompilerInvocation {
                    detail: e.to_string(),
                });
            }
            Err(_) => {
                warn!(secs = self.timeout.as_secs(), "compiler timed out, killing");
                return Err(ReportError::CompileTimeout {
                    secs: self.timeout.as_secs(),
                    source_path: tex_path.to_path_buf(),
                });
            }
        };

        let exit_ok = output.status.success();
        let artifact_path = work_dir.join(format!("{stem}.pdf"));
        let log_file = work_dir.join(format!("{stem}.log"));

        let log_text = match std::fs::read(&log_file) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        let log_path = log_file.exists().then_some(log_file);

        let artifact = artifact_path.exists().then_some(artifact_path);
        match (&artifact, exit_ok) {
            (Some(_), true) => info!("compile succeeded"),
            (Some(_), false) => {
                // Benign-warning case: artifact produced despite the status.
                info!("compile produced artifact despite non-zero exit status");
            }
            (None, _) => warn!("compile produced no artifact"),
        }

        Ok(CompileOutcome {
            artifact,
            log_path,
            log_text,
            exit_ok,
        })
    }

    fn missing_error(&self) -> ReportError {
        ReportError::CompilerMissing {
            program: self.program.clone(),
            hint: "Install a TeX distribution (e.g. TeX Live: `apt install texlive-latex-extra`) \
                   or point --compiler at an existing binary."
                .to_string(),
        }
    }
}

/// The last few diagnostic lines of a compiler log.
///
/// TeX marks hard errors with a leading `!`; "Error"/"Fatal" catch the
/// engine-level messages around them.
pub fn log_tail(log_text: &str) -> String {
    let diagnostics: Vec<&str> = log_text
        .lines()
        .filter(|line| line.contains('!') || line.contains("Error") || line.contains("Fatal"))
        .collect();
    diagnostics
        .iter()
        .rev()
        .take(LOG_TAIL_LINES)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────
