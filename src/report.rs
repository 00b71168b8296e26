//! The report record: everything one render consumes.
//!
//! ## The dual content track
//!
//! A report body can come from a human editor (rich-text markup) or from a
//! generative backend. Generated content is kept in **both** its native
//! Markdown form and the rich-text rendering shown in the editor, because the
//! two representations are not equivalent: rich text → Markdown → LaTeX
//! round-trips lose structure the original Markdown retained. At export time
//! exactly one track is active (selected by [`ContentSource`]) and the
//! Markdown form of generated content is preferred whenever present.

use crate::error::ReportError;
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Analysis dimensions a recommendation may cover.
///
/// The declared order here is the order the report checklist renders in,
/// independent of which types were selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisType {
    #[serde(rename = "Fundamentals")]
    Fundamentals,
    #[serde(rename = "Technical Analysis")]
    Technical,
    #[serde(rename = "Macro/Geopolitical")]
    Macro,
    #[serde(rename = "Catalyst")]
    Catalyst,
}

impl AnalysisType {
    /// Every known type, in checklist order.
    pub const ALL: [AnalysisType; 4] = [
        AnalysisType::Fundamentals,
        AnalysisType::Technical,
        AnalysisType::Macro,
        AnalysisType::Catalyst,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisType::Fundamentals => "Fundamentals",
            AnalysisType::Technical => "Technical Analysis",
            AnalysisType::Macro => "Macro/Geopolitical",
            AnalysisType::Catalyst => "Catalyst",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which authoring track is active at export time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    #[default]
    Human,
    Generated,
}

/// One of the fixed report layout templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVersion {
    V1,
    V2,
    #[default]
    V3,
}

impl TemplateVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateVersion::V1 => "v1",
            TemplateVersion::V2 => "v2",
            TemplateVersion::V3 => "v3",
        }
    }
}

impl fmt::Display for TemplateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated body kept in both of its representations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratedBody {
    /// Native lightweight-markup output of the generative backend.
    #[serde(default)]
    pub markdown: String,
    /// The rich-text rendering shown in the editor.
    #[serde(default)]
    pub rich_text: String,
}

/// The representation an exported body is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    RichText,
    Markdown,
}

/// A body selected for export, borrowed from the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportBody<'a> {
    pub text: &'a str,
    pub format: BodyFormat,
}

/// The dual-track content record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportContent {
    #[serde(default)]
    pub source: ContentSource,
    /// Human-authored executive summary, rich-text markup.
    #[serde(default)]
    pub human_thesis: String,
    /// Human-authored investment rationale, rich-text markup.
    #[serde(default)]
    pub human_rationale: String,
    #[serde(default)]
    pub generated_thesis: Option<GeneratedBody>,
    #[serde(default)]
    pub generated_rationale: Option<GeneratedBody>,
}

impl ReportContent {
    /// The thesis body for export, honouring the prefer-Markdown rule.
    pub fn thesis_for_export(&self) -> ExportBody<'_> {
        self.select(&self.human_thesis, self.generated_thesis.as_ref())
    }

    /// The rationale body for export, honouring the prefer-Markdown rule.
    pub fn rationale_for_export(&self) -> ExportBody<'_> {
        self.select(&self.human_rationale, self.generated_rationale.as_ref())
    }

    fn select<'a>(
        &'a self,
        human: &'a str,
        generated: Option<&'a GeneratedBody>,
    ) -> ExportBody<'a> {
        match (self.source, generated) {
            (ContentSource::Generated, Some(body)) if !body.markdown.trim().is_empty() => {
                ExportBody {
                    text: &body.markdown,
                    format: BodyFormat::Markdown,
                }
            }
            (ContentSource::Generated, Some(body)) => ExportBody {
                text: &body.rich_text,
                format: BodyFormat::RichText,
            },
            _ => ExportBody {
                text: human,
                format: BodyFormat::RichText,
            },
        }
    }
}

/// Everything one report render consumes: scalar fields, the content record,
/// referenced image assets, and the chosen template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_action")]
    pub action: String,
    pub ticker: String,
    pub company_name: String,
    #[serde(default)]
    pub subtitle: String,

    #[serde(default)]
    pub analysis_types: Vec<AnalysisType>,

    #[serde(default)]
    pub entry_price: f64,
    #[serde(default)]
    pub target_price: f64,
    #[serde(default)]
    pub stop_loss: f64,

    #[serde(default)]
    pub content: ReportContent,

    /// Image filenames, resolved against the configured images directory.
    #[serde(default)]
    pub company_logo: Option<String>,
    #[serde(default)]
    pub chart_image: Option<String>,

    #[serde(default)]
    pub template: TemplateVersion,

    /// dd-mm-yyyy. Defaults to the render date when absent.
    #[serde(default)]
    pub report_date: Option<String>,
    #[serde(default = "default_risk_level")]
    pub risk_level: String,
}

fn default_category() -> String {
    "ASX Alpha".to_string()
}
fn default_action() -> String {
    "Buy".to_string()
}
fn default_risk_level() -> String {
    "Medium".to_string()
}

static FILENAME_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static FILENAME_JOIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").unwrap());

impl ReportData {
    /// Derived report title: "Company (TICKER)" with graceful fallbacks.
    pub fn title(&self) -> String {
        let company = self.company_name.trim();
        let ticker = self.ticker.trim();
        match (company.is_empty(), ticker.is_empty()) {
            (false, false) => format!("{} ({})", company, ticker.to_uppercase()),
            (false, true) => company.to_string(),
            (true, false) => format!("Investment Recommendation ({})", ticker.to_uppercase()),
            (true, true) => "Investment Recommendation".to_string(),
        }
    }

    /// The report date field, defaulting to `now` formatted dd-mm-yyyy.
    pub fn report_date_or(&self, now: &DateTime<Local>) -> String {
        match self.report_date.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => now.format("%d-%m-%Y").to_string(),
        }
    }

    /// Content-derived stem for the output PDF and log:
    /// `recommendation_{TICKER}_{sanitized title}_{timestamp}`.
    pub fn output_stem(&self, now: &DateTime<Local>) -> String {
        let title = self.title();
        let cleaned = FILENAME_STRIP.replace_all(&title, "");
        let mut cleaned = FILENAME_JOIN.replace_all(&cleaned, "_").into_owned();
        if cleaned.len() > 30 {
            let mut cut = 30;
            while !cleaned.is_char_boundary(cut) {
                cut -= 1;
            }
            cleaned.truncate(cut);
        }
        let cleaned = cleaned.trim_matches('_');
        format!(
            "recommendation_{}_{}_{}",
            self.ticker.trim().to_uppercase(),
            cleaned,
            now.format("%Y%m%d_%H%M%S")
        )
    }

    /// Field validation. Collects every problem before failing so the caller
    /// can show them all at once.
    pub fn validate(&self) -> Result<(), ReportError> {
        let mut problems = Vec::new();

        if self.company_name.trim().is_empty() {
            problems.push("company name is required".to_string());
        } else if self.company_name.trim().len() < 2 {
            problems.push("company name should be at least 2 characters long".to_string());
        }

        let ticker = self.ticker.trim();
        if ticker.is_empty() {
            problems.push("ticker is required".to_string());
        } else if !ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            problems.push(
                "ticker should contain only letters, numbers, dots, and hyphens".to_string(),
            );
        }

        if self.analysis_types.is_empty() {
            problems.push("at least one analysis type must be selected".to_string());
        }

        match self.content.source {
            ContentSource::Human => {
                if self.content.human_thesis.trim().is_empty() {
                    problems
                        .push("executive summary is required for human-written content".to_string());
                }
                if self.content.human_rationale.trim().is_empty() {
                    problems.push(
                        "investment rationale is required for human-written content".to_string(),
                    );
                }
            }
            ContentSource::Generated => {
                let has_thesis = self
                    .content
                    .generated_thesis
                    .as_ref()
                    .is_some_and(|b| !b.markdown.trim().is_empty() || !b.rich_text.trim().is_empty());
                if !has_thesis {
                    problems.push("generated executive summary is missing".to_string());
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ReportError::InvalidReport(problems.join("; ")))
        }
    }
}
