//! Human-readable renderings of audit results. JSON output goes through
//! [`to_json`].

use serde::Serialize;
use std::fmt::{self, Write};

use crate::fetch::FetchedPage;
use crate::findings::Finding;
use crate::hook::HookOutcome;
use crate::parsers::DocumentSummary;
use crate::results::AuditReport;
use crate::visual::VisualReport;

pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

fn mark(ok: bool) -> &'static str {
    if ok { "✓" } else { "✗" }
}

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

/// Runs a writer against a fresh `String`.
fn render(write: impl FnOnce(&mut String) -> fmt::Result) -> String {
    let mut out = String::new();
    // fmt::Write for String never fails
    write(&mut out).map(|()| out).unwrap_or_default()
}

pub fn summary_text(summary: &DocumentSummary) -> String {
    render(|out| write_summary(out, summary))
}

fn write_summary(out: &mut String, summary: &DocumentSummary) -> fmt::Result {
    writeln!(out, "Title: {}", or_none(summary.title.as_deref()))?;
    writeln!(
        out,
        "Meta Description: {}",
        or_none(summary.meta_description.as_deref())
    )?;
    writeln!(out, "Canonical: {}", or_none(summary.canonical.as_deref()))?;
    writeln!(out, "H1 Tags: {}", summary.headings.h1.len())?;
    writeln!(out, "H2 Tags: {}", summary.headings.h2.len())?;
    writeln!(out, "Images: {}", summary.images.len())?;
    writeln!(out, "Internal Links: {}", summary.links.internal.len())?;
    writeln!(out, "External Links: {}", summary.links.external.len())?;
    writeln!(out, "Schema Blocks: {}", summary.structured_data.len())?;
    writeln!(out, "Word Count: {}", summary.word_count)
}

pub fn visual_text(report: &VisualReport) -> String {
    render(|out| write_visual(out, report))
}

fn write_visual(out: &mut String, report: &VisualReport) -> fmt::Result {
    writeln!(out, "Visual Analysis Results")?;
    writeln!(out, "{}", "=".repeat(40))?;

    writeln!(out, "\nAbove the Fold:")?;
    writeln!(out, "  H1 Visible: {}", mark(report.above_fold.h1_visible))?;
    writeln!(out, "  CTA Visible: {}", mark(report.above_fold.cta_visible))?;
    writeln!(
        out,
        "  Hero Image: {}",
        report.above_fold.hero_image.as_deref().unwrap_or("None found")
    )?;

    writeln!(out, "\nMobile Responsiveness:")?;
    writeln!(out, "  Viewport Meta: {}", mark(report.mobile.viewport_meta))?;
    writeln!(
        out,
        "  Horizontal Scroll: {}",
        if report.mobile.horizontal_scroll { "✗ (problem)" } else { "✓" }
    )?;

    writeln!(out, "\nTypography:")?;
    match report.fonts.base_size {
        Some(size) => writeln!(out, "  Base Font Size: {}px", size)?,
        None => writeln!(out, "  Base Font Size: unknown")?,
    }
    writeln!(out, "  Readable (≥16px): {}", mark(report.fonts.readable))?;

    if let Some(error) = &report.error {
        writeln!(out, "\nError: {}", error)?;
    }
    Ok(())
}

/// Response metadata, without the body
pub fn fetch_text(page: &FetchedPage) -> String {
    render(|out| {
        writeln!(out, "URL: {}", page.url)?;
        writeln!(out, "Status: {}", page.status_code)?;
        write_redirects(out, &page.redirect_chain)
    })
}

fn write_redirects(out: &mut String, chain: &[String]) -> fmt::Result {
    if chain.is_empty() {
        return Ok(());
    }
    writeln!(out, "Redirects: {}", chain.join(" -> "))
}

fn write_finding_list(out: &mut String, heading: &str, findings: &[&Finding]) -> fmt::Result {
    if findings.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}", heading)?;
    for finding in findings {
        writeln!(out, "  - {}", finding)?;
    }
    Ok(())
}

/// Warnings first, then blocking findings, each under its own heading
pub fn findings_text(findings: &[Finding]) -> String {
    let (blocking, warnings): (Vec<&Finding>, Vec<&Finding>) =
        findings.iter().partition(|f| f.is_blocking());
    render(|out| {
        write_finding_list(out, "Schema validation warnings:", &warnings)?;
        write_finding_list(out, "Schema validation ERRORS (blocking):", &blocking)
    })
}

pub fn hook_text(outcome: &HookOutcome) -> String {
    match outcome {
        HookOutcome::Skipped | HookOutcome::Clean => String::new(),
        HookOutcome::Warnings(warnings) => findings_text(warnings),
        HookOutcome::Blocked { warnings, blocking } => {
            findings_text(&[warnings.as_slice(), blocking.as_slice()].concat())
        }
    }
}

pub fn audit_text(report: &AuditReport) -> String {
    render(|out| write_audit(out, report))
}

fn write_audit(out: &mut String, report: &AuditReport) -> fmt::Result {
    writeln!(out, "Page Audit: {}", report.url)?;
    writeln!(out, "{}", "=".repeat(40))?;
    writeln!(out, "Final URL: {}", report.final_url)?;
    writeln!(out, "Status: {}", report.status_code)?;
    write_redirects(out, &report.redirect_chain)?;

    writeln!(out)?;
    write_summary(out, &report.summary)?;

    if let Some(visual) = &report.visual {
        writeln!(out)?;
        write_visual(out, visual)?;
    }

    writeln!(out, "\nFindings:")?;
    if report.findings.is_empty() {
        writeln!(out, "  None")?;
    }
    for finding in &report.findings {
        writeln!(
            out,
            "  [{:?}/{:?}] {}",
            finding.severity(),
            finding.category(),
            finding
        )?;
    }
    Ok(())
}
