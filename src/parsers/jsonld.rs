//! Locating and parsing embedded JSON-LD (`<script type="application/ld+json">`).
//!
//! Regions are numbered from 1 in document order. Numbering counts every
//! region, so a block keeps the same index whether or not its neighbours parsed.

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

static LD_JSON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector")
});

/// Textual match used for template sources (JSX, Vue, PHP...) that an HTML
/// parser would not read faithfully.
static LD_JSON_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\s+type=["']application/ld\+json["']\s*>(.*?)</script>"#)
        .expect("static regex")
});

/// A successfully parsed structured-data block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredDataBlock {
    /// 1-based position of the region in the document.
    pub index: usize,
    pub value: Value,
}

/// A structured-data region before validation: parsed, or the parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub index: usize,
    pub content: Result<Value, String>,
}

impl RawBlock {
    fn parse(index: usize, text: &str) -> Self {
        let content = serde_json::from_str::<Value>(text.trim()).map_err(|e| e.to_string());
        if let Err(e) = &content {
            ::log::debug!("JSON-LD block {} failed to parse: {}", index, e);
        }
        Self { index, content }
    }

    pub fn into_block(self) -> Option<StructuredDataBlock> {
        match self.content {
            Ok(value) => Some(StructuredDataBlock {
                index: self.index,
                value,
            }),
            Err(_) => None,
        }
    }
}

impl From<StructuredDataBlock> for RawBlock {
    fn from(block: StructuredDataBlock) -> Self {
        Self {
            index: block.index,
            content: Ok(block.value),
        }
    }
}

/// Every JSON-LD region of a parsed document, including unparseable ones.
pub fn scan_document(doc: &Html) -> Vec<RawBlock> {
    doc.select(&LD_JSON)
        .enumerate()
        .map(|(i, script)| RawBlock::parse(i + 1, &script.text().collect::<String>()))
        .collect()
}

/// Every JSON-LD region found textually in arbitrary source.
pub fn scan_source(source: &str) -> Vec<RawBlock> {
    LD_JSON_SOURCE
        .captures_iter(source)
        .enumerate()
        .map(|(i, caps)| RawBlock::parse(i + 1, caps.get(1).map_or("", |m| m.as_str())))
        .collect()
}

/// Parsed blocks only; regions that fail to parse are dropped.
pub fn blocks(doc: &Html) -> Vec<StructuredDataBlock> {
    scan_document(doc)
        .into_iter()
        .filter_map(RawBlock::into_block)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scan_document_keeps_positions() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type": "Organization"}</script>
            <script type="application/ld+json">{ not json </script>
            <script type="application/ld+json">[{"@type": "Product"}]</script>
            </head><body></body></html>"#;
        let doc = Html::parse_document(html);

        let raw = scan_document(&doc);
        assert_eq!(raw.len(), 3);
        assert!(raw[1].content.is_err());

        let parsed = blocks(&doc);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].index, 1);
        assert_eq!(parsed[0].value, json!({"@type": "Organization"}));
        assert_eq!(parsed[1].index, 3);
    }

    #[test]
    fn test_other_script_types_ignored() {
        let html = r#"<script type="text/javascript">var x = {"@type": "HowTo"};</script>
            <script>{"a": 1}</script>"#;
        let doc = Html::parse_document(html);
        assert!(scan_document(&doc).is_empty());
    }

    #[test]
    fn test_scan_source_template() {
        let source = r#"
            export default () => (
              <SCRIPT type='application/ld+json'>
                {"@context": "https://schema.org", "@type": "Event"}
              </script>
            );
        "#;
        let raw = scan_source(source);
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].index, 1);
        assert_eq!(
            raw[0].content,
            Ok(json!({"@context": "https://schema.org", "@type": "Event"}))
        );
    }

    #[test]
    fn test_scan_source_nothing_found() {
        assert!(scan_source("<html><body>plain</body></html>").is_empty());
    }
}
