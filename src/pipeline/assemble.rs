//! Document assembly: template slots → rendered LaTeX source.
//!
//! A template is a read-only `.tex` file carrying uppercase placeholder
//! tokens. Assembly locates each token by exact substring match and
//! substitutes it exactly once per render:
//!
//! * body fields (thesis, rationale) run through the full conversion
//!   pipeline — normalize → parse → emit → escape → validate;
//! * scalar fields (prices, ticker, category, dates) take the
//!   literal-escape-only path;
//! * image slots stage their asset into the render's staging directory and
//!   emit a width-sized inclusion, with a placeholder fallback for the logo
//!   and an *empty* substitution for a missing chart;
//! * the checklist slot renders one indicator per known analysis type in
//!   declared order, marked or not.
//!
//! Whatever happens to the slots, the returned source always ends with the
//! template's closing marker.

use crate::config::RenderConfig;
use crate::document::ContentDocument;
use crate::error::{RenderWarning, ReportError};
use crate::pipeline::{escape, latex, markdown, normalize, richtext};
use crate::report::{
    AnalysisType, BodyFormat, ContentSource, ExportBody, ReportData, TemplateVersion,
};
use chrono::{DateTime, Local};
use std::path::Path;
use tracing::{debug, warn};

const TEMPLATE_V1: &str = include_str!("../../templates/report_v1.tex");
const TEMPLATE_V2: &str = include_str!("../../templates/report_v2.tex");
const TEMPLATE_V3: &str = include_str!("../../templates/report_v3.tex");

/// Name under which the fallback logo asset is staged.
pub const PLACEHOLDER_LOGO: &str = "placeholder_logo.png";
static PLACEHOLDER_LOGO_BYTES: &[u8] = include_bytes!("../../assets/placeholder_logo.png");

const CLOSING_MARKER: &str = "\\end{document}";

/// Per-render context the assembler works inside.
pub struct AssembleContext<'a> {
    /// Where referenced image assets are resolved from.
    pub images_dir: &'a Path,
    /// The render's staging directory; assets are copied next to the source.
    pub staging_dir: &'a Path,
    /// Render time, used for the default report date.
    pub now: DateTime<Local>,
}

/// Load the template source for a version.
///
/// With a `templates_dir` override the file `report_<version>.tex` must
/// exist there; otherwise the template embedded at build time is used.
pub fn load_template(
    version: TemplateVersion,
    config: &RenderConfig,
) -> Result<String, ReportError> {
    match &config.templates_dir {
        Some(dir) => {
            let path = dir.join(format!("report_{}.tex", version));
            std::fs::read_to_string(&path).map_err(|_| ReportError::TemplateNotFound {
                version: version.to_string(),
                path,
            })
        }
        None => Ok(match version {
            TemplateVersion::V1 => TEMPLATE_V1,
            TemplateVersion::V2 => TEMPLATE_V2,
            TemplateVersion::V3 => TEMPLATE_V3,
        }
        .to_string()),
    }
}

/// Substitute every slot in `template` from `report`, returning the rendered
/// source and the warnings accumulated across all content conversions.
pub fn assemble(
    template: &str,
    report: &ReportData,
    ctx: &AssembleContext<'_>,
) -> (String, Vec<RenderWarning>) {
    let mut warnings = Vec::new();
    let mut source = template.to_string();

    // ── Body fields: full conversion pipeline ────────────────────────────
    let (thesis, mut w) = body_to_latex(report.content.thesis_for_export(), report.content.source);
    warnings.append(&mut w);
    let (rationale, mut w) =
        body_to_latex(report.content.rationale_for_export(), report.content.source);
    warnings.append(&mut w);
    source = source.replace("INVESTMENTTHESISPLACEHOLDER", &thesis);
    source = source.replace("RATIONALEPLACEHOLDER", &rationale);

    // ── Scalar fields: literal-escape-only path ──────────────────────────
    source = source.replace("MAINTITLEPLACEHOLDER", &escape::escape_plain(&report.title()));
    source = source.replace("SUBTITLEPLACEHOLDER", &escape::escape_plain(&report.subtitle));
    source = source.replace(
        "DATEPLACEHOLDER",
        &escape::escape_plain(&report.report_date_or(&ctx.now)),
    );
    source = source.replace(
        "ACTIONBOXPLACEHOLDER",
        &format!("\\actionbox{{{}}}", escape::escape_plain(&report.action)),
    );
    source = source.replace("ENTRYPRICEPLACEHOLDER", &price(report.entry_price));
    source = source.replace("TARGETPRICEPLACEHOLDER", &price(report.target_price));
    source = source.replace("STOPLOSSPLACEHOLDER", &price(report.stop_loss));
    source = source.replace("RISKLEVELPLACEHOLDER", &escape::escape_plain(&report.risk_level));
    source = source.replace("CATEGORYPLACEHOLDER", &escape::escape_plain(&report.category));
    source = source.replace("ACTIONPLACEHOLDER", &escape::escape_plain(&report.action));
    source = source.replace("COMPANYNAMEPLACEHOLDER", &escape::escape_plain(&report.title()));
    source = source.replace(
        "TICKERPLACEHOLDER",
        &escape::escape_plain(report.ticker.trim().to_uppercase().as_str()),
    );

    // ── Checklist slot ───────────────────────────────────────────────────
    source = source.replace(
        "ANALYSISTYPESPLACEHOLDER",
        &analysis_checklist(&report.analysis_types),
    );

    // ── Image slots ──────────────────────────────────────────────────────
    let logo = stage_logo(report.company_logo.as_deref(), ctx, &mut warnings);
    source = source.replace("COMPANYLOGOPLACEHOLDER", &logo);
    let chart = stage_chart(report.chart_image.as_deref(), ctx, &mut warnings);
    source = source.replace("CHARTIMAGEPLACEHOLDER", &chart);

    // ── Closing-marker guarantee ─────────────────────────────────────────
    if !source.trim_end().ends_with(CLOSING_MARKER) {
        let end = source.trim_end().len();
        source.truncate(end);
        source.push('\n');
        source.push_str(CLOSING_MARKER);
        source.push('\n');
    }

    (source, warnings)
}

/// Run one body through the conversion pipeline appropriate to its format.
fn body_to_latex(body: ExportBody<'_>, source: ContentSource) -> (String, Vec<RenderWarning>) {
    if body.text.trim().is_empty() {
        return (String::new(), Vec::new());
    }
    let doc: ContentDocument = match body.format {
        BodyFormat::Markdown => {
            let cleaned = if source == ContentSource::Generated {
                normalize::clean_generated(body.text)
            } else {
                normalize::normalize(body.text)
            };
            markdown::parse(&cleaned)
        }
        BodyFormat::RichText => richtext::parse(&normalize::normalize(body.text)),
    };
    latex::document_to_latex(&doc)
}

fn price(value: f64) -> String {
    escape::escape_plain(&format!("{value:.2}"))
}

/// One indicator item per known analysis type, in declared order.
fn analysis_checklist(selected: &[AnalysisType]) -> String {
    let mut out = String::from("\\begin{itemize}[leftmargin=0pt, itemsep=0.5em]\n");
    for analysis in AnalysisType::ALL {
        let marker = if selected.contains(&analysis) {
            "\\item[\\fcolorbox{green}{green!20}{\\textbf{\\textcolor{white}{\\ding{51}}}}]"
        } else {
            "\\item[\\fcolorbox{gray}{white}{\\phantom{\\ding{51}}}]"
        };
        out.push_str("    ");
        out.push_str(marker);
        out.push_str(" \\textbf{");
        out.push_str(&escape::escape_plain(analysis.label()));
        out.push_str("}\n");
    }
    out.push_str("\\end{itemize}");
    out
}

/// Stage the company logo, falling back to the embedded placeholder.
/// Returns the filename the template's inclusion command should reference.
fn stage_logo(
    filename: Option<&str>,
    ctx: &AssembleContext<'_>,
    warnings: &mut Vec<RenderWarning>,
) -> String {
    if let Some(name) = filename {
        match stage_asset(name, ctx) {
            Ok(staged) => return staged,
            Err(detail) => {
                warn!(asset = name, %detail, "logo staging failed, using placeholder");
                warnings.push(RenderWarning::AssetMissing {
                    path: name.to_string(),
                    detail,
                });
            }
        }
    }
    if let Err(e) = std::fs::write(ctx.staging_dir.join(PLACEHOLDER_LOGO), PLACEHOLDER_LOGO_BYTES)
    {
        warn!(error = %e, "could not stage placeholder logo");
    }
    PLACEHOLDER_LOGO.to_string()
}

/// Stage the chart image and build its inclusion block. A missing chart
/// yields an empty substitution — no inclusion command, not a broken one.
fn stage_chart(
    filename: Option<&str>,
    ctx: &AssembleContext<'_>,
    warnings: &mut Vec<RenderWarning>,
) -> String {
    let Some(name) = filename else {
        return String::new();
    };
    match stage_asset(name, ctx) {
        Ok(staged) => format!(
            "\\vspace{{1em}}\n\\begin{{center}}\n\\includegraphics[width=1.0\\textwidth, keepaspectratio]{{{staged}}}\n\\end{{center}}\n\\vspace{{1em}}"
        ),
        Err(detail) => {
            warn!(asset = name, %detail, "chart staging failed, slot left empty");
            warnings.push(RenderWarning::AssetMissing {
                path: name.to_string(),
                detail,
            });
            String::new()
        }
    }
}

/// Copy one asset from the images directory into the staging directory.
fn stage_asset(name: &str, ctx: &AssembleContext<'_>) -> Result<String, String> {
    let file_name = Path::new(name)
        .file_name()
        .ok_or_else(|| format!("'{name}' has no file name"))?
        .to_string_lossy()
        .into_owned();
    let src = ctx.images_dir.join(name);
    if !src.exists() {
        return Err(format!("'{}' not found", src.display()));
    }
    let dest = ctx.staging_dir.join(&file_name);
    std::fs::copy(&src, &dest).map_err(|e| e.to_string())?;
    debug!(from = %src.display(), to = %dest.display(), "staged asset");
    Ok(file_name)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{GeneratedBody, ReportContent};
    use chrono::TimeZone;

    fn ctx_in<'a>(staging: &'a Path, images: &'a Path) -> AssembleContext<'a> {
        AssembleContext {
            images_dir: images,
            staging_dir: staging,
            now: Local.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        }
    }

    fn sample_report() -> ReportData {
        ReportData {
            category: "ASX Alpha".into(),
            action: "Buy".into(),
            ticker: "ACME".into(),
            company_name: "ACME Corp".into(),
            subtitle: "Quarterly update".into(),
            analysis_types: vec![AnalysisType::Fundamentals, AnalysisType::Catalyst],
            entry_price: 10.0,
            target_price: 12.5,
            stop_loss: 9.0,
            content: ReportContent {
                source: ContentSource::Human,
                human_thesis: "<p><strong>Strong</strong> quarter with 10% upside</p>".into(),
                human_rationale: "<ul><li>Margin growth</li><li>Cash flow</li></ul>".into(),
                ..Default::default()
            },
            company_logo: None,
            chart_image: None,
            template: TemplateVersion::V3,
            report_date: Some("01-06-2025".into()),
            risk_level: "Medium".into(),
        }
    }

    #[test]
    fn test_assemble_fills_every_slot() {
        let staging = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        let report = sample_report();
        let template = load_template(TemplateVersion::V3, &RenderConfig::default()).unwrap();
        let (source, _) = assemble(&template, &report, &ctx_in(staging.path(), images.path()));

        assert!(!source.contains("PLACEHOLDER"), "unfilled slot left in source");
        assert!(source.contains("ACME Corp (ACME)"));
        assert!(source.contains("\\textbf{Strong}"));
        assert!(source.contains("10\\%"));
        assert!(source.contains("\\item Margin growth"));
        assert!(source.trim_end().ends_with("\\end{document}"));
    }

    #[test]
    fn test_missing_chart_leaves_no_inclusion() {
        let staging = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        let report = sample_report();
        let template = load_template(TemplateVersion::V3, &RenderConfig::default()).unwrap();
        let (source, warnings) = assemble(&template, &report, &ctx_in(staging.path(), images.path()));

        // Exactly one inclusion: the logo. The chart slot vanished.
        assert_eq!(source.matches("\\includegraphics").count(), 1);
        assert!(warnings
            .iter()
            .all(|w| !matches!(w, RenderWarning::AssetMissing { .. })));
    }

    #[test]
    fn test_missing_logo_stages_placeholder() {
        let staging = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        let report = sample_report();
        let template = load_template(TemplateVersion::V3, &RenderConfig::default()).unwrap();
        let (source, _) = assemble(&template, &report, &ctx_in(staging.path(), images.path()));

        assert!(source.contains(PLACEHOLDER_LOGO));
        assert!(staging.path().join(PLACEHOLDER_LOGO).exists());
    }

    #[test]
    fn test_referenced_assets_are_staged() {
        let staging = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        std::fs::write(images.path().join("logo.png"), b"png").unwrap();
        std::fs::write(images.path().join("chart.png"), b"png").unwrap();

        let mut report = sample_report();
        report.company_logo = Some("logo.png".into());
        report.chart_image = Some("chart.png".into());
        let template = load_template(TemplateVersion::V3, &RenderConfig::default()).unwrap();
        let (source, warnings) = assemble(&template, &report, &ctx_in(staging.path(), images.path()));

        assert!(warnings.is_empty());
        assert!(staging.path().join("logo.png").exists());
        assert!(staging.path().join("chart.png").exists());
        assert!(source.contains("{logo.png}"));
        assert!(source.contains("{chart.png}"));
        assert_eq!(source.matches("\\includegraphics").count(), 2);
    }

    #[test]
    fn test_unreadable_chart_is_warning_not_error() {
        let staging = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        let mut report = sample_report();
        report.chart_image = Some("nope.png".into());
        let template = load_template(TemplateVersion::V3, &RenderConfig::default()).unwrap();
        let (source, warnings) = assemble(&template, &report, &ctx_in(staging.path(), images.path()));

        assert!(warnings
            .iter()
            .any(|w| matches!(w, RenderWarning::AssetMissing { .. })));
        // Slot substituted empty, logo placeholder remains the only image.
        assert_eq!(source.matches("\\includegraphics").count(), 1);
    }

    #[test]
    fn test_checklist_fixed_order_and_markers() {
        let list = analysis_checklist(&[AnalysisType::Technical]);
        let fundamentals = list.find("Fundamentals").unwrap();
        let technical = list.find("Technical Analysis").unwrap();
        let macro_pos = list.find("Macro/Geopolitical").unwrap();
        let catalyst = list.find("Catalyst").unwrap();
        assert!(fundamentals < technical && technical < macro_pos && macro_pos < catalyst);
        // One marked indicator, three unmarked, regardless of selection size.
        assert_eq!(list.matches("green!20").count(), 1);
        assert_eq!(list.matches("\\phantom").count(), 3);
    }

    #[test]
    fn test_generated_markdown_track_is_preferred() {
        let staging = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        let mut report = sample_report();
        report.content = ReportContent {
            source: ContentSource::Generated,
            generated_thesis: Some(GeneratedBody {
                markdown: "# Thesis\n\n**Growth** ahead".into(),
                rich_text: "<p>stale rendering</p>".into(),
            }),
            generated_rationale: Some(GeneratedBody {
                markdown: "- driver one\n- driver two".into(),
                rich_text: String::new(),
            }),
            ..Default::default()
        };
        let template = load_template(TemplateVersion::V1, &RenderConfig::default()).unwrap();
        let (source, _) = assemble(&template, &report, &ctx_in(staging.path(), images.path()));

        assert!(source.contains("\\section*{Thesis}"));
        assert!(source.contains("\\textbf{Growth}"));
        assert!(source.contains("\\item driver one"));
        assert!(!source.contains("stale rendering"));
    }

    #[test]
    fn test_scalar_fields_are_literal_escaped() {
        let staging = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        let mut report = sample_report();
        report.company_name = "Procter & Gamble".into();
        report.category = "Top 100 #picks".into();
        let template = load_template(TemplateVersion::V3, &RenderConfig::default()).unwrap();
        let (source, _) = assemble(&template, &report, &ctx_in(staging.path(), images.path()));

        assert!(source.contains("Procter \\& Gamble"));
        assert!(source.contains("Top 100 \\#picks"));
    }

    #[test]
    fn test_closing_marker_appended_when_missing() {
        let staging = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        let report = sample_report();
        let template = "\\documentclass{article}\n\\begin{document}\nINVESTMENTTHESISPLACEHOLDER\n";
        let (source, _) = assemble(template, &report, &ctx_in(staging.path(), images.path()));
        assert!(source.trim_end().ends_with("\\end{document}"));
    }

    #[test]
    fn test_assemble_is_idempotent_per_input() {
        let staging = tempfile::tempdir().unwrap();
        let images = tempfile::tempdir().unwrap();
        let report = sample_report();
        let template = load_template(TemplateVersion::V2, &RenderConfig::default()).unwrap();
        let ctx = ctx_in(staging.path(), images.path());
        let (a, _) = assemble(&template, &report, &ctx);
        let (b, _) = assemble(&template, &report, &ctx);
        assert_eq!(a, b, "same input must produce byte-identical markup");
    }

    #[test]
    fn test_external_templates_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("report_v1.tex"),
            "CUSTOM MAINTITLEPLACEHOLDER\n\\end{document}\n",
        )
        .unwrap();
        let config = RenderConfig::builder()
            .templates_dir(dir.path())
            .build()
            .unwrap();
        let template = load_template(TemplateVersion::V1, &config).unwrap();
        assert!(template.starts_with("CUSTOM"));

        let missing = load_template(TemplateVersion::V2, &config);
        assert!(matches!(missing, Err(ReportError::TemplateNotFound { .. })));
    }
}
