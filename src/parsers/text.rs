use regex::Regex;
use scraper::{Html, Node};
use std::borrow::Cow;
use std::sync::LazyLock;

/// Elements whose text is not counted as page content.
pub const NON_CONTENT_ELEMENTS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("static regex"));

/// Visible text fragments in document order.
///
/// Each text node is trimmed and empty ones dropped. Subtrees rooted at any
/// of [`NON_CONTENT_ELEMENTS`] are skipped entirely. The document itself is
/// not modified.
///
/// The parser keeps `<noscript>` contents as raw markup, so that markup is
/// parsed again as a fragment and only its text is kept.
pub fn visible_fragments(doc: &Html) -> Vec<Cow<'_, str>> {
    let mut fragments = Vec::new();
    let mut stack = vec![doc.tree.root()];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    fragments.push(Cow::Borrowed(trimmed));
                }
                continue;
            }
            Node::Element(element) if NON_CONTENT_ELEMENTS.contains(&element.name()) => continue,
            Node::Element(element)
                if element.name() == "noscript" && node.children().all(|c| c.value().is_text()) =>
            {
                let raw: String = node
                    .children()
                    .filter_map(|c| c.value().as_text())
                    .map(|t| &**t)
                    .collect();
                let inner = Html::parse_fragment(&raw);
                fragments.extend(
                    visible_fragments(&inner)
                        .into_iter()
                        .map(|f| Cow::Owned(f.into_owned())),
                );
                continue;
            }
            _ => {}
        }
        // Reverse so children pop in document order
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }

    fragments
}

/// Visible text joined by single spaces
pub fn visible_text(doc: &Html) -> String {
    visible_fragments(doc).join(" ")
}

/// Number of `\b\w+\b` tokens in `text`
pub fn count_words(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// Word count of the document's visible content
pub fn word_count(doc: &Html) -> usize {
    count_words(&visible_text(doc))
}

/// Collapses runs of whitespace into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
