//! Fetching contact photos referenced by URL.
//!
//! Requests never reach loopback, private, link-local or unspecified
//! addresses. Hosts are checked before the request is sent, and the client's
//! resolver applies the same rules again at connect time so a DNS answer that
//! changes in between cannot steer the connection inward.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use meerkat_core::config::FetchConfig;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Url, redirect};
use thiserror::Error;

const BLOCKED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1", "[::1]"];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("scheme not allowed: {0}")]
    DisallowedScheme(String),

    #[error("host not allowed: {0}")]
    BlockedHost(String),

    #[error("address not allowed: {0}")]
    BlockedAddress(IpAddr),

    #[error("cannot resolve host: {0}")]
    Resolve(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("not an image: {0}")]
    NotAnImage(String),

    #[error("response exceeds {0} bytes")]
    TooLarge(usize),
}

/// An image body and its `Content-Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Whether an address is off-limits for outbound requests.
#[must_use]
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map_or_else(|| is_blocked_v6(v6), is_blocked_v4),
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7
        || (first & 0xfe00) == 0xfc00
        // fe80::/10
        || (first & 0xffc0) == 0xfe80
}

/// ## Summary
/// Parses a photo URL and applies the scheme and literal-host rules.
///
/// Whitespace anywhere in the input is removed first; some exporters wrap
/// long URIs across lines.
///
/// ## Errors
/// Returns the [`FetchError`] describing the first rule the URL breaks.
pub fn validate_url(raw: &str) -> Result<Url, FetchError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let url = Url::parse(&compact).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    check_url(&url)?;
    Ok(url)
}

fn check_url(url: &Url) -> Result<(), FetchError> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(FetchError::DisallowedScheme(other.to_string())),
    }

    let host = url
        .host_str()
        .ok_or_else(|| FetchError::InvalidUrl("missing host".to_string()))?
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if BLOCKED_HOSTS.contains(&host.as_str()) {
        return Err(FetchError::BlockedHost(host));
    }

    if let Some(ip) = literal_ip(&host).filter(|ip| is_blocked_ip(*ip)) {
        return Err(FetchError::BlockedAddress(ip));
    }
    Ok(())
}

/// Parses an IP literal host, with or without IPv6 brackets.
fn literal_ip(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .ok()
}

/// Resolver handed to the HTTP client; drops every blocked address from the
/// answer and fails if nothing is left.
#[derive(Debug, Default)]
struct SafeResolver;

impl Resolve for SafeResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_allowed(name.as_str().to_string()))
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn resolve_allowed(host: String) -> Result<Addrs, BoxError> {
    let resolved = tokio::net::lookup_host((host.as_str(), 0)).await?;
    let allowed: Vec<SocketAddr> = resolved.filter(|a| !is_blocked_ip(a.ip())).collect();
    if allowed.is_empty() {
        tracing::warn!(%host, "All resolved addresses are blocked");
        return Err(Box::new(FetchError::BlockedHost(host)));
    }
    Ok(Box::new(allowed.into_iter()))
}

/// HTTP client for remote photos.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_bytes: usize,
}

impl ImageFetcher {
    /// ## Summary
    /// Builds a client with the timeouts, redirect limit and resolver the
    /// fetch rules require.
    ///
    /// ## Errors
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let max_redirects = config.max_redirects;
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                return attempt.error(format!("more than {max_redirects} redirects"));
            }
            match check_url(attempt.url()) {
                Ok(()) => attempt.follow(),
                Err(err) => attempt.error(err),
            }
        });

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(policy)
            .dns_resolver(Arc::new(SafeResolver))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }

    /// ## Summary
    /// Downloads an image.
    ///
    /// ## Errors
    /// Returns a [`FetchError`] if the URL breaks a rule, the host resolves to
    /// a blocked address, the response is not a successful `image/*` body, or
    /// the body is larger than the configured cap.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, raw_url: &str) -> Result<FetchedImage, FetchError> {
        let url = validate_url(raw_url)?;
        self.check_resolved(&url).await?;

        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err(FetchError::NotAnImage(content_type));
        }

        let declared_len = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_len.is_some_and(|len| len > self.max_bytes) {
            return Err(FetchError::TooLarge(self.max_bytes));
        }

        let mut bytes = Vec::with_capacity(declared_len.unwrap_or_default());
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        let content_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        tracing::debug!(len = bytes.len(), %content_type, "Fetched remote image");
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }

    /// Rejects the URL if any address its host resolves to is blocked.
    async fn check_resolved(&self, url: &Url) -> Result<(), FetchError> {
        let Some(host) = url.host_str().filter(|h| literal_ip(h).is_none()) else {
            return Ok(());
        };
        let port = url.port_or_known_default().unwrap_or(80);
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| FetchError::Resolve(format!("{host}: {e}")))?;

        let mut any = false;
        for addr in addrs {
            any = true;
            if is_blocked_ip(addr.ip()) {
                return Err(FetchError::BlockedAddress(addr.ip()));
            }
        }
        if any {
            Ok(())
        } else {
            Err(FetchError::Resolve(format!("{host}: no addresses")))
        }
    }
}
