//! CLI binary for reco2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RenderConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reco2pdf::{
    assemble_source, render_report, LatexCompiler, RenderConfig, ReportData, TemplateVersion,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

/// Render an investment-recommendation report to a styled PDF.
#[derive(Parser, Debug)]
#[command(name = "reco2pdf", version, about, long_about = None)]
struct Cli {
    /// Report record as JSON (see `ReportData` for the schema).
    /// Not required with --check.
    report: Option<PathBuf>,

    /// Directory for compiled PDFs.
    #[arg(long, default_value = "data/pdfs")]
    output_dir: PathBuf,

    /// Directory for compiler logs.
    #[arg(long, default_value = "data/logs")]
    logs_dir: PathBuf,

    /// Directory image assets are resolved from.
    #[arg(long, default_value = "data/images")]
    images_dir: PathBuf,

    /// Directory with template .tex files (default: built-in templates).
    #[arg(long)]
    templates_dir: Option<PathBuf>,

    /// Override the report's template version (v1 | v2 | v3).
    #[arg(long)]
    template: Option<String>,

    /// LaTeX compiler program.
    #[arg(long, default_value = "pdflatex", env = "RECO2PDF_COMPILER")]
    compiler: String,

    /// Compile timeout in seconds.
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Keep the rendered .tex source next to the PDF.
    #[arg(long)]
    keep_source: bool,

    /// Emit the rendered LaTeX source to stdout and skip compilation.
    /// Needs no LaTeX toolchain.
    #[arg(long)]
    tex_only: bool,

    /// Check that the LaTeX toolchain is available, then exit.
    #[arg(long)]
    check: bool,

    /// Suppress the progress spinner.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut builder = RenderConfig::builder()
        .output_dir(&cli.output_dir)
        .logs_dir(&cli.logs_dir)
        .images_dir(&cli.images_dir)
        .compiler_program(cli.compiler.as_str())
        .compile_timeout_secs(cli.timeout)
        .keep_source(cli.keep_source);
    if let Some(dir) = &cli.templates_dir {
        builder = builder.templates_dir(dir);
    }
    let config = builder.build().context("invalid configuration")?;

    if cli.check {
        return run_check(&config);
    }

    let report_path = cli
        .report
        .as_ref()
        .context("a report JSON file is required (or use --check)")?;
    let mut report = load_report(report_path)?;

    if let Some(version) = &cli.template {
        report.template = parse_template_version(version)?;
    }

    if cli.tex_only {
        let (source, warnings) = assemble_source(&report, &config)?;
        print_warnings(&warnings);
        println!("{source}");
        return Ok(());
    }

    let spinner = (!cli.quiet).then(make_spinner);
    let result = render_report(&report, &config).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result {
        Ok(output) => {
            print_warnings(&output.warnings);
            println!(
                "{} {} {}",
                green("✔"),
                bold("PDF written:"),
                output.pdf_path.display()
            );
            if let Some(log) = &output.log_path {
                println!("  {} {}", dim("log:"), dim(&log.display().to_string()));
            }
            println!(
                "  {}",
                dim(&format!(
                    "{} bytes of source, compiled in {} ms",
                    output.stats.source_bytes, output.stats.compile_duration_ms
                ))
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {e}", red("✘"));
            std::process::exit(1);
        }
    }
}

fn run_check(config: &RenderConfig) -> Result<()> {
    let compiler =
        LatexCompiler::new(config.compiler_program.as_str(), config.compile_timeout_secs);
    match compiler.check_available() {
        Ok(()) => {
            println!(
                "{} {} is available",
                green("✔"),
                bold(&config.compiler_program)
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {e}", red("✘"));
            std::process::exit(1);
        }
    }
}

fn load_report(path: &PathBuf) -> Result<ReportData> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read report file '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("'{}' is not a valid report record", path.display()))
}

fn parse_template_version(s: &str) -> Result<TemplateVersion> {
    match s.to_ascii_lowercase().as_str() {
        "v1" => Ok(TemplateVersion::V1),
        "v2" => Ok(TemplateVersion::V2),
        "v3" => Ok(TemplateVersion::V3),
        other => anyhow::bail!("unknown template version '{other}' (expected v1, v2, or v3)"),
    }
}

fn print_warnings(warnings: &[reco2pdf::RenderWarning]) {
    for warning in warnings {
        eprintln!("{} {warning}", yellow("⚠"));
    }
}

fn make_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_message("Rendering report…");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
