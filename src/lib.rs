// Re-export modules
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod findings;
pub mod hook;
pub mod parsers;
pub mod render;
pub mod report;
pub mod resolver;
pub mod results;
pub mod schema;
pub mod screenshot;
pub mod viewport;
pub mod visual;

// Re-export commonly used types for convenience
pub use config::AuditConfig;
pub use error::AuditError;
pub use findings::{Finding, Severity};
pub use parsers::{DocumentSummary, extract};
pub use results::AuditReport;
pub use visual::VisualReport;

use std::time::Instant;

use crate::fetch::FetchOptions;
use crate::render::{Renderer, WebDriverRenderer};
use crate::visual::InspectOptions;

/// Main builder for a single-page audit
pub struct Audit {
    url: String,
    config: AuditConfig,
    visual: bool,
}

impl Audit {
    /// Create a new Audit builder for the given URL
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            config: AuditConfig::default(),
            visual: false,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: AuditConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(
        self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, error::ConfigError> {
        let config = AuditConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self, error::ConfigError> {
        let config = AuditConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    /// Also render the page and run the layout heuristics
    pub fn with_visual(mut self, visual: bool) -> Self {
        self.visual = visual;
        self
    }

    /// Set the fetch timeout in seconds
    pub fn with_fetch_timeout(mut self, timeout_seconds: u64) -> Self {
        self.config.fetch_timeout_secs = timeout_seconds;
        self
    }

    /// Set the per-viewport render timeout in milliseconds
    pub fn with_render_timeout(mut self, timeout_ms: u64) -> Self {
        self.config.render_timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Run the audit, rendering through WebDriver when visual inspection is on
    pub async fn run(&self) -> Result<AuditReport, AuditError> {
        if self.visual {
            let config = self.config.clone().with_env_overrides();
            let renderer = WebDriverRenderer::from_config(&config);
            self.execute(Some(&renderer)).await
        } else {
            self.execute::<WebDriverRenderer>(None).await
        }
    }

    /// Run the audit with visual inspection through `renderer`
    pub async fn run_with_renderer<R: Renderer>(
        &self,
        renderer: &R,
    ) -> Result<AuditReport, AuditError> {
        self.execute(Some(renderer)).await
    }

    async fn execute<R: Renderer>(&self, renderer: Option<&R>) -> Result<AuditReport, AuditError> {
        let start_time = Instant::now();
        ::log::info!("Starting audit of {}", self.url);

        let target =
            resolver::resolve_with_timeout(&self.url, self.config.resolve_timeout()).await?;
        let page = fetch::fetch(&target, &FetchOptions::from(&self.config)).await?;

        let visual = match renderer {
            Some(renderer) => Some(
                visual::inspect(renderer, &page.url, &InspectOptions::from(&self.config)).await,
            ),
            None => None,
        };

        let report = AuditReport::build(&self.url, page, &self.config.rules, visual);

        ::log::info!(
            "Audit of {} complete - {} findings ({} blocking) in {:.2} seconds",
            self.url,
            report.findings.len(),
            report.blocking().count(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::render::fixture::FixtureRenderer;

    #[test]
    fn test_builder_overrides() {
        let audit = Audit::new("example.com")
            .with_config_str(r#"{"max_redirects": 1}"#)
            .unwrap()
            .with_fetch_timeout(5)
            .with_render_timeout(1500);

        assert_eq!(audit.config().max_redirects, 1);
        assert_eq!(audit.config().fetch_timeout_secs, 5);
        assert_eq!(audit.config().render_timeout_ms, 1500);
    }

    #[tokio::test]
    async fn test_blocked_url_stops_before_fetch() {
        let result = Audit::new("http://169.254.169.254/latest/meta-data")
            .run()
            .await;
        assert!(matches!(
            result,
            Err(AuditError::Rejected(ResolveError::Blocked { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let renderer = FixtureRenderer::new("<html></html>");
        let result = Audit::new("ftp://example.com/")
            .run_with_renderer(&renderer)
            .await;

        assert!(matches!(
            result,
            Err(AuditError::Rejected(ResolveError::UnsupportedScheme(_)))
        ));
        assert!(renderer.opened().is_empty());
    }
}
