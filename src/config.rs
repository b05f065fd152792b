use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::schema::RuleSet;

/// Configuration for a page audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Whole-request budget for the fetch step, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Page-load budget per viewport, in milliseconds
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// DNS lookup budget, in milliseconds
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,

    /// Maximum number of redirects to follow
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Structured-data rule tables
    #[serde(default)]
    pub rules: RuleSet,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            render_timeout_ms: default_render_timeout_ms(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
            max_redirects: default_max_redirects(),
            follow_redirects: true,
            user_agent: default_user_agent(),
            rules: RuleSet::default(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let read_error = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(read_error)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(read_error)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Override the WebDriver URL with the `WEBDRIVER_URL` environment variable if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

fn default_resolve_timeout_ms() -> u64 {
    5_000
}

fn default_max_redirects() -> usize {
    5
}

pub fn default_user_agent() -> String {
    concat!(
        "Mozilla/5.0 (compatible; page-audit/",
        env!("CARGO_PKG_VERSION"),
        ")"
    )
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = AuditConfig::from_json("{}").unwrap();
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert!(config.headless);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.render_timeout(), Duration::from_millis(30_000));
        assert_eq!(config.max_redirects, 5);
        assert!(config.follow_redirects);
        assert_eq!(config.rules, RuleSet::default());
    }

    #[test]
    fn test_partial_override() {
        let config = AuditConfig::from_json(
            r#"{"max_redirects": 2, "rules": {"restricted": {}}}"#,
        )
        .unwrap();
        assert_eq!(config.max_redirects, 2);
        assert!(config.rules.restricted.is_empty());
        assert_eq!(config.rules.deprecated, RuleSet::default().deprecated);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"headless": false, "render_timeout_ms": 500}}"#).unwrap();

        let config = AuditConfig::from_file(file.path()).unwrap();
        assert!(!config.headless);
        assert_eq!(config.render_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        assert!(matches!(
            AuditConfig::from_file("/nonexistent/audit.json"),
            Err(ConfigError::Read { .. })
        ));
        assert!(matches!(
            AuditConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
