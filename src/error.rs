use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::resolver::AddressClass;

/// Reasons the safe resolver refuses a URL before any network I/O happens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host component: {0}")]
    MissingHost(String),

    /// The host resolved, and at least one address is not publicly routable.
    #[error("Blocked: URL resolves to {class} IP ({address})")]
    Blocked {
        host: String,
        address: IpAddr,
        class: AddressClass,
    },

    #[error("DNS resolution for '{host}' timed out after {}ms", .timeout.as_millis())]
    Timeout { host: String, timeout: Duration },
}

/// Transport failures while fetching a page. Never retried internally.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Rejected(#[from] ResolveError),

    #[error("Request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Too many redirects (max {0})")]
    TooManyRedirects(usize),

    #[error("Invalid redirect location '{location}' from {from}")]
    BadRedirect { from: String, location: String },

    #[error("SSL error: {0}")]
    Tls(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),
}

/// Failures of the rendering capability. The visual inspector captures these
/// as data; only the screenshot path propagates them.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to start WebDriver session at {url}: {reason}")]
    Session { url: String, reason: String },

    #[error("WebDriver command failed while {context}: {reason}")]
    Command { context: String, reason: String },

    #[error("Page load timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Unexpected script result for {script}: {value}")]
    UnexpectedValue { script: String, value: String },

    #[error(transparent)]
    Rejected(#[from] ResolveError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid viewport: {name}. Choose from: {valid}")]
    UnknownViewport { name: String, valid: String },
}

/// Screenshot persistence failures.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Output path must be within current directory or home directory: {0}")]
    OutsideAllowedRoots(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Errors that stop a full page audit before a report exists.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Rejected(#[from] ResolveError),

    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
