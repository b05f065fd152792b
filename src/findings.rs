//! The finding model shared by every analyzer.
//!
//! A finding's severity is a function of its kind and is never stored
//! separately, so a new rule picks its severity by adding a kind.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::parsers::DocumentSummary;
use crate::visual::VisualReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Blocking,
}

/// Which analyzer produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Schema,
    Structural,
    Visual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FindingKind {
    // Schema
    InvalidJson { detail: String },
    NotAnObject { found: &'static str },
    MissingContext,
    UnexpectedContext { found: String },
    MissingType,
    Placeholder { marker: String },
    DeprecatedType { type_name: String, note: String },
    RestrictedType { type_name: String, note: String },

    // Structural
    MissingTitle,
    MissingMetaDescription,
    MissingH1,
    MultipleH1 { count: usize },
    ImagesMissingAlt { count: usize },

    // Visual
    RenderFailed { detail: String },
    H1NotAboveFold,
    NoCtaAboveFold,
    MissingViewportMeta,
    HorizontalScroll,
    SmallBaseFont { size: Option<f64> },
}

impl FindingKind {
    pub fn severity(&self) -> Severity {
        match self {
            FindingKind::Placeholder { .. }
            | FindingKind::DeprecatedType { .. }
            | FindingKind::RestrictedType { .. } => Severity::Blocking,
            _ => Severity::Warning,
        }
    }

    pub fn category(&self) -> Category {
        use FindingKind::*;
        match self {
            InvalidJson { .. }
            | NotAnObject { .. }
            | MissingContext
            | UnexpectedContext { .. }
            | MissingType
            | Placeholder { .. }
            | DeprecatedType { .. }
            | RestrictedType { .. } => Category::Schema,
            MissingTitle
            | MissingMetaDescription
            | MissingH1
            | MultipleH1 { .. }
            | ImagesMissingAlt { .. } => Category::Structural,
            RenderFailed { .. }
            | H1NotAboveFold
            | NoCtaAboveFold
            | MissingViewportMeta
            | HorizontalScroll
            | SmallBaseFont { .. } => Category::Visual,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FindingKind::*;
        match self {
            InvalidJson { detail } => write!(f, "Invalid JSON - {}", detail),
            NotAnObject { found } => {
                write!(f, "Invalid JSON-LD - expected an object, found {}", found)
            }
            MissingContext => f.write_str("Missing @context"),
            UnexpectedContext { .. } => f.write_str("@context should be 'https://schema.org'"),
            MissingType => f.write_str("Missing @type"),
            Placeholder { marker } => write!(f, "Contains placeholder text: {}", marker),
            DeprecatedType { type_name, note } => write!(f, "@type '{}' is {}", type_name, note),
            RestrictedType { type_name, note } => {
                write!(f, "@type '{}' is {} - verify site qualifies", type_name, note)
            }
            MissingTitle => f.write_str("Missing <title> tag"),
            MissingMetaDescription => f.write_str("Missing meta description"),
            MissingH1 => f.write_str("No <h1> heading"),
            MultipleH1 { count } => write!(f, "{} <h1> headings (expected one)", count),
            ImagesMissingAlt { count } => write!(f, "{} image(s) without alt text", count),
            RenderFailed { detail } => write!(f, "Visual analysis failed: {}", detail),
            H1NotAboveFold => f.write_str("H1 not visible above the fold"),
            NoCtaAboveFold => f.write_str("No call-to-action visible above the fold"),
            MissingViewportMeta => f.write_str("Missing viewport meta tag"),
            HorizontalScroll => f.write_str("Horizontal scroll on mobile viewport"),
            SmallBaseFont { size: Some(size) } => {
                write!(f, "Base font size {}px is below 16px", size)
            }
            SmallBaseFont { size: None } => f.write_str("Base font size could not be determined"),
        }
    }
}

/// One reportable observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// 1-based structured-data block the finding refers to, if any.
    pub block: Option<usize>,
    pub kind: FindingKind,
}

impl Finding {
    pub fn new(kind: FindingKind) -> Self {
        Self { block: None, kind }
    }

    pub fn in_block(block: usize, kind: FindingKind) -> Self {
        Self {
            block: Some(block),
            kind,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn is_blocking(&self) -> bool {
        self.severity() == Severity::Blocking
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block {
            Some(block) => write!(f, "Block {}: {}", block, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl Serialize for Finding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire {
            block: Option<usize>,
            category: Category,
            severity: Severity,
            message: String,
        }

        Wire {
            block: self.block,
            category: self.category(),
            severity: self.severity(),
            message: self.message(),
        }
        .serialize(serializer)
    }
}

/// Minimum readable base font size in CSS pixels.
pub const MIN_READABLE_FONT_PX: f64 = 16.0;

/// Structural observations derived from a document summary, in a fixed order.
pub fn structural_findings(summary: &DocumentSummary) -> Vec<Finding> {
    let mut findings = Vec::new();

    if summary.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
        findings.push(Finding::new(FindingKind::MissingTitle));
    }
    if summary
        .meta_description
        .as_deref()
        .is_none_or(|d| d.trim().is_empty())
    {
        findings.push(Finding::new(FindingKind::MissingMetaDescription));
    }
    match summary.headings.h1.len() {
        0 => findings.push(Finding::new(FindingKind::MissingH1)),
        1 => {}
        count => findings.push(Finding::new(FindingKind::MultipleH1 { count })),
    }
    let missing_alt = summary
        .images
        .iter()
        .filter(|img| img.alt.is_none())
        .count();
    if missing_alt > 0 {
        findings.push(Finding::new(FindingKind::ImagesMissingAlt { count: missing_alt }));
    }

    findings
}

/// Visual observations derived from a visual report.
///
/// A report carrying an error yields only the render failure: its flags are
/// defaults, not observations.
pub fn visual_findings(report: &VisualReport) -> Vec<Finding> {
    if let Some(error) = &report.error {
        return vec![Finding::new(FindingKind::RenderFailed {
            detail: error.clone(),
        })];
    }

    let mut findings = Vec::new();
    if !report.above_fold.h1_visible {
        findings.push(Finding::new(FindingKind::H1NotAboveFold));
    }
    if !report.above_fold.cta_visible {
        findings.push(Finding::new(FindingKind::NoCtaAboveFold));
    }
    if !report.mobile.viewport_meta {
        findings.push(Finding::new(FindingKind::MissingViewportMeta));
    }
    if report.mobile.horizontal_scroll {
        findings.push(Finding::new(FindingKind::HorizontalScroll));
    }
    if !report.fonts.readable {
        findings.push(Finding::new(FindingKind::SmallBaseFont {
            size: report.fonts.base_size,
        }));
    }
    findings
}
