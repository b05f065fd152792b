//! SSRF-resistant URL resolution.
//!
//! Every analyzer that touches the network goes through [`resolve`] first.
//! A URL is normalised (bare hosts become `https://host`), restricted to
//! `http`/`https`, and its host is resolved. If any resolved address is
//! private, loopback or reserved the URL is rejected with the offending
//! address. A failed DNS lookup is *not* a rejection: the fetch or render step
//! that follows will fail on its own when it tries to connect.
//!
//! The check happens at resolution time only; the address the fetcher later
//! connects to may differ (DNS rebinding). See DESIGN.md.

use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use url::{Host, Url};

use crate::error::ResolveError;

/// Default budget for a single DNS lookup.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Network class of a resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressClass {
    Public,
    Private,
    Loopback,
    Reserved,
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressClass::Public => "public",
            AddressClass::Private => "private",
            AddressClass::Loopback => "loopback",
            AddressClass::Reserved => "reserved",
        };
        f.write_str(name)
    }
}

/// A URL that passed the safety gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageTarget {
    pub url: Url,
    /// First public address the host resolved to. `None` when the lookup
    /// failed and the decision was deferred to the connecting step.
    pub address: Option<IpAddr>,
}

/// Resolves `input` into a [`PageTarget`] using the default lookup budget.
pub async fn resolve(input: &str) -> Result<PageTarget, ResolveError> {
    resolve_with_timeout(input, DEFAULT_RESOLVE_TIMEOUT).await
}

/// Resolves `input` into a [`PageTarget`], abandoning the lookup after `timeout`.
pub async fn resolve_with_timeout(
    input: &str,
    timeout: Duration,
) -> Result<PageTarget, ResolveError> {
    let url = normalize_url(input)?;
    resolve_url(url, timeout).await
}

/// Runs the address check for an already-normalised URL. Used for redirect hops.
pub async fn resolve_url(url: Url, timeout: Duration) -> Result<PageTarget, ResolveError> {
    check_scheme(&url)?;

    let host = match url.host() {
        Some(host) => host.to_owned(),
        None => return Err(ResolveError::MissingHost(url.to_string())),
    };

    let addresses = match &host {
        Host::Ipv4(ip) => vec![IpAddr::V4(*ip)],
        Host::Ipv6(ip) => vec![IpAddr::V6(*ip)],
        Host::Domain(domain) => lookup(domain, url.port_or_known_default(), timeout).await?,
    };

    let host_name = host.to_string();
    for address in &addresses {
        let class = classify(*address);
        if class != AddressClass::Public {
            ::log::warn!("Blocked {} ({} resolves to {} {})", url, host_name, class, address);
            return Err(ResolveError::Blocked {
                host: host_name,
                address: *address,
                class,
            });
        }
    }

    ::log::debug!("Resolved {} to {:?}", url, addresses.first());
    Ok(PageTarget {
        url,
        address: addresses.first().copied(),
    })
}

/// Turns user input into an absolute URL without enforcing any policy yet.
///
/// Input without a scheme (`example.com`, `example.com:8080/path`) is treated
/// as an `https` URL.
pub fn normalize_url(input: &str) -> Result<Url, ResolveError> {
    let trimmed = input.trim();
    let invalid = |reason: String| ResolveError::InvalidUrl {
        url: trimmed.to_string(),
        reason,
    };

    match Url::parse(trimmed) {
        Ok(url) if url.has_host() || !looks_like_host_and_port(trimmed) => Ok(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", trimmed)).map_err(|e| invalid(e.to_string()))
        }
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// `localhost:8080` parses as scheme `localhost`; detect that shape.
fn looks_like_host_and_port(input: &str) -> bool {
    match input.split_once(':') {
        Some((_, rest)) => {
            let port = rest.split('/').next().unwrap_or_default();
            !port.is_empty() && port.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn check_scheme(url: &Url) -> Result<(), ResolveError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ResolveError::UnsupportedScheme(other.to_string())),
    }
}

/// Forward lookup. Lookup failures yield an empty list (deferred), a timeout
/// is an error.
async fn lookup(
    domain: &str,
    port: Option<u16>,
    timeout: Duration,
) -> Result<Vec<IpAddr>, ResolveError> {
    let query = format!("{}:{}", domain, port.unwrap_or(0));
    match tokio::time::timeout(timeout, tokio::net::lookup_host(query)).await {
        Ok(Ok(addrs)) => Ok(addrs.map(|addr| addr.ip()).collect()),
        Ok(Err(e)) => {
            ::log::debug!("DNS lookup for {} failed, deferring to fetch: {}", domain, e);
            Ok(Vec::new())
        }
        Err(_) => Err(ResolveError::Timeout {
            host: domain.to_string(),
            timeout,
        }),
    }
}

/// Classifies an address as public, private, loopback or reserved.
pub fn classify(ip: IpAddr) -> AddressClass {
    match ip {
        IpAddr::V4(v4) => classify_ipv4(v4),
        IpAddr::V6(v6) => classify_ipv6(v6),
    }
}

fn classify_ipv4(ip: Ipv4Addr) -> AddressClass {
    let o = ip.octets();

    // 127.0.0.0/8
    if o[0] == 127 {
        return AddressClass::Loopback;
    }

    // RFC 1918, link-local 169.254.0.0/16, shared address space 100.64.0.0/10
    if o[0] == 10
        || (o[0] == 172 && (16..=31).contains(&o[1]))
        || (o[0] == 192 && o[1] == 168)
        || (o[0] == 169 && o[1] == 254)
        || (o[0] == 100 && (64..=127).contains(&o[1]))
    {
        return AddressClass::Private;
    }

    // This-network, IETF protocol assignments, documentation, benchmarking,
    // multicast, 240.0.0.0/4 and broadcast
    if o[0] == 0
        || (o[0] == 192 && o[1] == 0 && o[2] == 0)
        || (o[0] == 192 && o[1] == 0 && o[2] == 2)
        || (o[0] == 198 && o[1] == 51 && o[2] == 100)
        || (o[0] == 203 && o[1] == 0 && o[2] == 113)
        || (o[0] == 198 && (o[1] == 18 || o[1] == 19))
        || o[0] >= 224
    {
        return AddressClass::Reserved;
    }

    AddressClass::Public
}

fn classify_ipv6(ip: Ipv6Addr) -> AddressClass {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return classify_ipv4(v4);
    }

    let s = ip.segments();
    if ip.is_loopback() {
        return AddressClass::Loopback;
    }
    // fc00::/7 unique-local, fe80::/10 link-local
    if (s[0] & 0xfe00) == 0xfc00 || (s[0] & 0xffc0) == 0xfe80 {
        return AddressClass::Private;
    }
    // 6to4 carries an IPv4 address in the next 32 bits
    if s[0] == 0x2002 {
        let embedded = Ipv4Addr::new(
            (s[1] >> 8) as u8,
            s[1] as u8,
            (s[2] >> 8) as u8,
            s[2] as u8,
        );
        match classify_ipv4(embedded) {
            AddressClass::Public => {}
            class => return class,
        }
    }
    // ::/8 (unspecified, IPv4-compatible, NAT64), ff00::/8 multicast,
    // 2001:db8::/32 documentation
    if (s[0] & 0xff00) == 0 || (s[0] & 0xff00) == 0xff00 || (s[0] == 0x2001 && s[1] == 0x0db8) {
        return AddressClass::Reserved;
    }
    AddressClass::Public
}
