use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::filter::{LinkFilter, LinkScope};
use crate::parsers::text::normalize_whitespace;
use crate::parsers::{Headings, Hreflang, ImageInfo, LINK_TEXT_LIMIT, LinkInfo};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static META: LazyLock<Selector> = LazyLock::new(|| selector("meta"));
static CANONICAL: LazyLock<Selector> = LazyLock::new(|| selector(r#"link[rel~="canonical"]"#));
static ALTERNATE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"link[rel~="alternate"][hreflang]"#));
static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static H2: LazyLock<Selector> = LazyLock::new(|| selector("h2"));
static H3: LazyLock<Selector> = LazyLock::new(|| selector("h3"));
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

/// Text content of an element with whitespace collapsed to single spaces
pub fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// First `<title>`, if any
pub fn title(doc: &Html) -> Option<String> {
    doc.select(&TITLE).next().map(|t| element_text(&t))
}

/// Everything pulled out of `<meta>` tags in one pass.
#[derive(Debug, Default)]
pub struct MetaTags {
    pub description: Option<String>,
    pub robots: Option<String>,
    pub open_graph: BTreeMap<String, String>,
    pub twitter_card: BTreeMap<String, String>,
}

/// Scans all meta tags.
///
/// Description and robots keep the first match. Open Graph (`property="og:*"`)
/// and Twitter Card (`name="twitter:*"`) properties are keyed by their
/// lower-cased property name, later duplicates overwriting earlier ones.
pub fn meta_tags(doc: &Html) -> MetaTags {
    let mut tags = MetaTags::default();

    for meta in doc.select(&META) {
        let attrs = meta.value();
        let name = attrs.attr("name").unwrap_or_default().to_lowercase();
        let property = attrs.attr("property").unwrap_or_default().to_lowercase();
        let content = attrs.attr("content").unwrap_or_default();

        match name.as_str() {
            "description" if tags.description.is_none() => {
                tags.description = Some(content.to_string())
            }
            "robots" if tags.robots.is_none() => tags.robots = Some(content.to_string()),
            _ => {}
        }

        if property.starts_with("og:") {
            tags.open_graph.insert(property, content.to_string());
        }
        if name.starts_with("twitter:") {
            tags.twitter_card.insert(name, content.to_string());
        }
    }

    tags
}

/// href of the first canonical link
pub fn canonical(doc: &Html) -> Option<String> {
    doc.select(&CANONICAL)
        .next()
        .and_then(|link| link.value().attr("href"))
        .map(|href| href.to_string())
}

pub fn hreflang(doc: &Html) -> Vec<Hreflang> {
    doc.select(&ALTERNATE)
        .filter_map(|link| {
            let lang = link.value().attr("hreflang")?;
            if lang.is_empty() {
                return None;
            }
            Some(Hreflang {
                lang: lang.to_string(),
                href: link.value().attr("href").map(|h| h.to_string()),
            })
        })
        .collect()
}

/// Non-empty heading text for h1 through h3, in document order
pub fn headings(doc: &Html) -> Headings {
    let collect = |sel: &Selector| {
        doc.select(sel)
            .map(|h| element_text(&h))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
    };

    Headings {
        h1: collect(&*H1),
        h2: collect(&*H2),
        h3: collect(&*H3),
    }
}

pub fn images(doc: &Html, filter: Option<&LinkFilter>) -> Vec<ImageInfo> {
    doc.select(&IMG)
        .map(|img| {
            let attr = |name: &str| img.value().attr(name).map(|v| v.to_string());

            let src = match (attr("src"), filter) {
                (Some(src), Some(filter)) if !src.is_empty() => {
                    Some(filter.resolve(&src).map(|u| u.to_string()).unwrap_or(src))
                }
                (src, _) => src,
            };

            ImageInfo {
                src,
                alt: attr("alt"),
                width: attr("width"),
                height: attr("height"),
                loading: attr("loading"),
            }
        })
        .collect()
}

/// Followable anchors, resolved and classified, in document order
pub fn links(doc: &Html, filter: &LinkFilter) -> Vec<(LinkScope, LinkInfo)> {
    let mut found = Vec::new();

    for anchor in doc.select(&ANCHOR) {
        let href = anchor.value().attr("href").unwrap_or_default();
        if !LinkFilter::should_follow(href) {
            continue;
        }
        let Some(resolved) = filter.resolve(href) else {
            continue;
        };

        let link = LinkInfo {
            href: resolved.to_string(),
            text: element_text(&anchor).chars().take(LINK_TEXT_LIMIT).collect(),
            rel: anchor
                .value()
                .attr("rel")
                .map(|rel| rel.split_whitespace().map(|t| t.to_string()).collect())
                .unwrap_or_default(),
        };
        found.push((filter.classify(&resolved), link));
    }

    ::log::debug!("HTML parser found {} followable links", found.len());
    found
}
