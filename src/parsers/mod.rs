//! Content extraction: raw HTML in, [`DocumentSummary`] out.
//!
//! Extraction is a pure function of the markup and the optional base URL.
//! Nothing here touches the network, and missing tags surface as empty
//! fields rather than errors.

pub mod html;
pub mod jsonld;
pub mod text;


use scraper::Html;
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

use crate::filter::{LinkFilter, LinkScope};

pub use jsonld::{RawBlock, StructuredDataBlock};

/// An `<link rel="alternate" hreflang="..">` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hreflang {
    pub lang: String,
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub loading: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInfo {
    pub href: String,
    /// Visible anchor text, at most [`LINK_TEXT_LIMIT`] characters.
    pub text: String,
    pub rel: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Links {
    pub internal: Vec<LinkInfo>,
    pub external: Vec<LinkInfo>,
}

/// Maximum number of characters kept from an anchor's text.
pub const LINK_TEXT_LIMIT: usize = 100;

/// SEO-relevant facts about one fetched document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_robots: Option<String>,
    pub canonical: Option<String>,
    pub hreflang: Vec<Hreflang>,
    pub headings: Headings,
    pub images: Vec<ImageInfo>,
    pub links: Links,
    pub open_graph: BTreeMap<String, String>,
    pub twitter_card: BTreeMap<String, String>,
    pub structured_data: Vec<StructuredDataBlock>,
    pub word_count: usize,
}

/// Parses `html` into a [`DocumentSummary`].
///
/// Links are classified and image sources resolved only when `base_url` is
/// given; without it the link sets stay empty and image sources are passed
/// through untouched.
pub fn extract(html: &str, base_url: Option<&Url>) -> DocumentSummary {
    let doc = Html::parse_document(html);
    let link_filter = base_url.map(LinkFilter::new);

    let meta = html::meta_tags(&doc);

    let mut summary = DocumentSummary {
        title: html::title(&doc),
        meta_description: meta.description,
        meta_robots: meta.robots,
        canonical: html::canonical(&doc),
        hreflang: html::hreflang(&doc),
        headings: html::headings(&doc),
        images: html::images(&doc, link_filter.as_ref()),
        open_graph: meta.open_graph,
        twitter_card: meta.twitter_card,
        structured_data: jsonld::blocks(&doc),
        word_count: text::word_count(&doc),
        ..DocumentSummary::default()
    };

    if let Some(filter) = &link_filter {
        for (scope, link) in html::links(&doc, filter) {
            match scope {
                LinkScope::Internal => summary.links.internal.push(link),
                LinkScope::External => summary.links.external.push(link),
            }
        }
    }

    ::log::debug!(
        "Extracted {} internal / {} external links, {} images, {} schema blocks, {} words",
        summary.links.internal.len(),
        summary.links.external.len(),
        summary.images.len(),
        summary.structured_data.len(),
        summary.word_count
    );

    summary
}
