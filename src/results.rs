use scraper::Html;
use serde::Serialize;
use url::Url;

use crate::fetch::FetchedPage;
use crate::findings::{self, Finding};
use crate::parsers::{self, DocumentSummary, jsonld};
use crate::schema::{self, RuleSet};
use crate::visual::VisualReport;

/// Concatenates findings in source order: schema, structural, visual.
pub fn aggregate(schema: Vec<Finding>, structural: Vec<Finding>, visual: Vec<Finding>) -> Vec<Finding> {
    let mut findings = schema;
    findings.extend(structural);
    findings.extend(visual);
    findings
}

/// Everything one page audit produced
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// URL as requested
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    pub status_code: u16,

    pub redirect_chain: Vec<String>,

    pub summary: DocumentSummary,

    /// Present when visual inspection ran
    pub visual: Option<VisualReport>,

    pub findings: Vec<Finding>,
}

impl AuditReport {
    /// Runs the document analyzers over a fetched page.
    pub fn build(
        url: &str,
        page: FetchedPage,
        rules: &RuleSet,
        visual: Option<VisualReport>,
    ) -> Self {
        let base_url = Url::parse(&page.url).ok();
        let summary = parsers::extract(&page.body, base_url.as_ref());

        let regions = jsonld::scan_document(&Html::parse_document(&page.body));
        let schema_findings = schema::validate(regions, rules);
        let structural_findings = findings::structural_findings(&summary);
        let visual_findings = visual
            .as_ref()
            .map(findings::visual_findings)
            .unwrap_or_default();

        Self {
            url: url.to_string(),
            final_url: page.url,
            status_code: page.status_code,
            redirect_chain: page.redirect_chain,
            summary,
            visual,
            findings: aggregate(schema_findings, structural_findings, visual_findings),
        }
    }

    pub fn blocking(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_blocking())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.is_blocking())
    }

    pub fn has_blocking(&self) -> bool {
        self.blocking().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{Category, FindingKind};
    use std::collections::BTreeMap;

    fn page(body: &str) -> FetchedPage {
        FetchedPage {
            url: "https://example.com/landing".to_string(),
            status_code: 200,
            body: body.to_string(),
            headers: BTreeMap::new(),
            redirect_chain: vec!["http://example.com/landing".to_string()],
        }
    }

    #[test]
    fn test_aggregate_keeps_source_order() {
        let merged = aggregate(
            vec![Finding::in_block(1, FindingKind::MissingType)],
            vec![Finding::new(FindingKind::MissingTitle), Finding::new(FindingKind::MissingH1)],
            vec![Finding::new(FindingKind::HorizontalScroll)],
        );
        let kinds: Vec<_> = merged.into_iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FindingKind::MissingType,
                FindingKind::MissingTitle,
                FindingKind::MissingH1,
                FindingKind::HorizontalScroll,
            ]
        );
    }

    #[test]
    fn test_aggregate_does_not_deduplicate() {
        let same = Finding::new(FindingKind::MissingH1);
        let merged = aggregate(vec![], vec![same.clone(), same.clone()], vec![]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_build_report() {
        let body = r#"<html><head><title>Landing</title>
            <script type="application/ld+json">{"@context": "https://schema.org", "@type": "HowTo"}</script>
            <script type="application/ld+json">{ not json</script>
            </head><body><h1>Welcome</h1><a href="/about">About</a></body></html>"#;
        let report = AuditReport::build(
            "example.com/landing",
            page(body),
            &RuleSet::default(),
            Some(VisualReport::failed("https://example.com/landing", "boom")),
        );

        assert_eq!(report.url, "example.com/landing");
        assert_eq!(report.final_url, "https://example.com/landing");
        assert_eq!(report.summary.title.as_deref(), Some("Landing"));
        assert_eq!(report.summary.links.internal.len(), 1);
        assert_eq!(report.summary.structured_data.len(), 1);

        let categories: Vec<_> = report.findings.iter().map(Finding::category).collect();
        assert_eq!(
            categories,
            vec![
                Category::Schema,
                Category::Schema,
                Category::Structural,
                Category::Visual,
            ]
        );
        assert_eq!(report.findings[0].block, Some(1));
        assert_eq!(report.findings[1].block, Some(2));
        assert!(report.has_blocking());
        assert_eq!(report.blocking().count(), 1);
        assert_eq!(report.warnings().count(), 3);
    }

    #[test]
    fn test_build_without_visual() {
        let report = AuditReport::build(
            "https://example.com/landing",
            page("<html><head><title>t</title><meta name='description' content='d'></head><body><h1>x</h1></body></html>"),
            &RuleSet::default(),
            None,
        );
        assert!(report.visual.is_none());
        assert!(report.findings.is_empty());
        assert!(!report.has_blocking());
    }
}
