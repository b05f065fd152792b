//! Single-attempt page fetching.
//!
//! Redirects are followed by hand so every hop passes the address check
//! again and lands in the redirect chain.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::error::Error as _;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use url::{Host, Url};

use crate::config::{AuditConfig, default_user_agent};
use crate::error::FetchError;
use crate::resolver::{self, DEFAULT_RESOLVE_TIMEOUT, PageTarget};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_DEFAULT: &str = "en-US,en;q=0.5";

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Budget for the whole call, redirects included.
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub user_agent: String,
    /// DNS budget for each redirect hop.
    pub resolve_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            follow_redirects: true,
            max_redirects: 5,
            user_agent: default_user_agent(),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl From<&AuditConfig> for FetchOptions {
    fn from(config: &AuditConfig) -> Self {
        Self {
            timeout: config.fetch_timeout(),
            follow_redirects: config.follow_redirects,
            max_redirects: config.max_redirects,
            user_agent: config.user_agent.clone(),
            resolve_timeout: config.resolve_timeout(),
        }
    }
}

/// A fetched response.
#[derive(Debug, Clone, Serialize)]
pub struct FetchedPage {
    /// URL of the response that ended the redirect chain
    pub url: String,
    pub status_code: u16,
    pub body: String,
    /// Lowercase header names; repeated headers joined with ", "
    pub headers: BTreeMap<String, String>,
    /// Every URL that answered with a redirect, in order
    pub redirect_chain: Vec<String>,
}

/// Resolves `input` and fetches it.
pub async fn fetch_url(input: &str, options: &FetchOptions) -> Result<FetchedPage, FetchError> {
    let target = resolver::resolve_with_timeout(input, options.resolve_timeout).await?;
    fetch(&target, options).await
}

/// Fetches an already-resolved target.
pub async fn fetch(target: &PageTarget, options: &FetchOptions) -> Result<FetchedPage, FetchError> {
    let started = Instant::now();
    let client = build_client(target, options)?;

    let page = match tokio::time::timeout(options.timeout, follow(&client, target, options)).await
    {
        Ok(result) => result?,
        Err(_) => return Err(FetchError::Timeout(options.timeout)),
    };

    ::log::debug!(
        "Fetched {} ({}) in {:.2} seconds after {} redirect(s)",
        page.url,
        page.status_code,
        started.elapsed().as_secs_f64(),
        page.redirect_chain.len()
    );
    Ok(page)
}

fn build_client(target: &PageTarget, options: &FetchOptions) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_DEFAULT));

    let mut builder = Client::builder()
        .redirect(Policy::none())
        .timeout(options.timeout)
        .user_agent(options.user_agent.as_str())
        .default_headers(headers);

    // Connect to the address that passed the check rather than looking it up again
    if let (Some(Host::Domain(domain)), Some(address)) = (target.url.host(), target.address) {
        if let Some(port) = target.url.port_or_known_default() {
            builder = builder.resolve(domain, SocketAddr::new(address, port));
        }
    }

    builder
        .build()
        .map_err(|e| FetchError::Request(e.to_string()))
}

async fn follow(
    client: &Client,
    target: &PageTarget,
    options: &FetchOptions,
) -> Result<FetchedPage, FetchError> {
    let mut current = target.url.clone();
    let mut redirect_chain = Vec::new();

    loop {
        let response = client
            .get(current.clone())
            .send()
            .await
            .map_err(|e| transport_error(e, options.timeout))?;
        let status = response.status();

        if options.follow_redirects && is_redirect(status) {
            match response.headers().get(LOCATION) {
                Some(location) => {
                    if redirect_chain.len() >= options.max_redirects {
                        return Err(FetchError::TooManyRedirects(options.max_redirects));
                    }
                    let location = String::from_utf8_lossy(location.as_bytes()).into_owned();
                    let next = current.join(&location).map_err(|_| FetchError::BadRedirect {
                        from: current.to_string(),
                        location: location.clone(),
                    })?;
                    ::log::debug!("{} redirects ({}) to {}", current, status.as_u16(), next);

                    let hop = resolver::resolve_url(next, options.resolve_timeout).await?;
                    redirect_chain.push(current.to_string());
                    current = hop.url;
                    continue;
                }
                None => {
                    ::log::warn!(
                        "Redirect status {} for {} but no Location header",
                        status.as_u16(),
                        current
                    );
                }
            }
        }

        let headers = collect_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, options.timeout))?;
        return Ok(FetchedPage {
            url: current.to_string(),
            status_code: status.as_u16(),
            body,
            headers,
            redirect_chain,
        });
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        match collected.entry(name.as_str().to_string()) {
            Entry::Occupied(mut existing) => {
                let existing = existing.get_mut();
                existing.push_str(", ");
                existing.push_str(&value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value.into_owned());
            }
        }
    }
    collected
}

/// Sorts a reqwest failure into the transport taxonomy
fn transport_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    let detail = error_chain(&error);
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if is_tls_failure(&detail) {
        FetchError::Tls(detail)
    } else if error.is_connect() {
        FetchError::Connect(detail)
    } else {
        FetchError::Request(detail)
    }
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

fn is_tls_failure(detail: &str) -> bool {
    let lower = detail.to_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|marker| lower.contains(marker))
}
