use serde::Serialize;
use url::Url;

/// Which side of the site boundary a link falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkScope {
    Internal,
    External,
}

/// Decides which anchors count as links and classifies them against a base URL.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    base_url: Url,
    /// Host component of the base URL; compared exactly, no subdomain folding.
    required_host: Option<String>,
}

impl LinkFilter {
    /// Create a new link filter anchored at `base_url`
    pub fn new(base_url: &Url) -> Self {
        Self {
            base_url: base_url.clone(),
            required_host: base_url.host_str().map(|h| h.to_string()),
        }
    }

    /// Whether an `href` is a link at all.
    ///
    /// Empty hrefs, in-page fragments and `javascript:` pseudo-links are skipped
    /// entirely: they are neither internal nor external.
    pub fn should_follow(href: &str) -> bool {
        if href.is_empty() || href.starts_with('#') {
            return false;
        }
        let is_script = href
            .get(..11)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"));
        !is_script
    }

    /// Resolve an href against the base URL
    pub fn resolve(&self, href: &str) -> Option<Url> {
        match self.base_url.join(href) {
            Ok(url) => Some(url),
            Err(e) => {
                ::log::debug!("Skipping unresolvable href {:?}: {}", href, e);
                None
            }
        }
    }

    /// Classify an already-resolved URL
    pub fn classify(&self, url: &Url) -> LinkScope {
        if self.is_in_host_scope(url) {
            LinkScope::Internal
        } else {
            LinkScope::External
        }
    }

    /// Check if a URL is on exactly the same host as the base URL
    fn is_in_host_scope(&self, url: &Url) -> bool {
        match (&self.required_host, url.host_str()) {
            (Some(required), Some(host)) => host == required,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_follow() {
        assert!(!LinkFilter::should_follow(""));
        assert!(!LinkFilter::should_follow("#section"));
        assert!(!LinkFilter::should_follow("#"));
        assert!(!LinkFilter::should_follow("javascript:void(0)"));
        assert!(!LinkFilter::should_follow("JavaScript:void(0)"));

        assert!(LinkFilter::should_follow("/about"));
        assert!(LinkFilter::should_follow("page.html#top"));
        assert!(LinkFilter::should_follow("https://other.com"));
    }

    #[test]
    fn test_host_classification() {
        let base = Url::parse("https://example.com/blog/").unwrap();
        let filter = LinkFilter::new(&base);

        let same = filter.resolve("/about").unwrap();
        assert_eq!(same.as_str(), "https://example.com/about");
        assert_eq!(filter.classify(&same), LinkScope::Internal);

        let relative = filter.resolve("post-1").unwrap();
        assert_eq!(relative.as_str(), "https://example.com/blog/post-1");
        assert_eq!(filter.classify(&relative), LinkScope::Internal);

        let other = filter.resolve("https://other.com/page").unwrap();
        assert_eq!(filter.classify(&other), LinkScope::External);
    }

    #[test]
    fn test_subdomains_are_external() {
        let base = Url::parse("https://example.com/").unwrap();
        let filter = LinkFilter::new(&base);

        let sub = Url::parse("https://www.example.com/").unwrap();
        assert_eq!(filter.classify(&sub), LinkScope::External);
    }

    #[test]
    fn test_non_http_links_are_external() {
        let base = Url::parse("https://example.com/").unwrap();
        let filter = LinkFilter::new(&base);

        let mail = filter.resolve("mailto:hello@example.com").unwrap();
        assert_eq!(filter.classify(&mail), LinkScope::External);
    }
}
