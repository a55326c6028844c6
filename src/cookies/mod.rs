//! Cookie model and domain scoping rules
//!
//! A cookie is identified by its (domain, name) pair. Domains are stored in
//! normalized form: lower-case host, no leading dot.

use std::time::SystemTime;
use url::Url;

pub mod jar;

pub use jar::CookieJar;

/// Represents a stored cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub name: String,
    pub value: String,
    pub path: String,
    /// Only sent over https when set.
    pub secure: bool,
    /// Sent back only to `domain` itself, never to its subdomains.
    pub host_only: bool,
    /// Absolute expiry received from the server, if any.
    pub expires: Option<SystemTime>,
    /// Explicit expiry flag; flagged cookies stay in the jar until a request prunes them.
    pub expired: bool,
}

impl Cookie {
    /// Create a cookie scoped to `domain` with path `/`
    pub fn new(
        domain: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            secure: false,
            host_only: false,
            expires: None,
            expired: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_host_only(mut self, host_only: bool) -> Self {
        self.host_only = host_only;
        self
    }

    pub fn with_expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    /// True if flagged expired or past its server-supplied expiry
    pub fn is_expired(&self) -> bool {
        self.expired
            || self
                .expires
                .map(|at| at <= SystemTime::now())
                .unwrap_or(false)
    }

    /// Whether this cookie should accompany a request to `url`
    pub fn matches_url(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return false,
        };
        let in_scope = if self.host_only {
            self.domain == host
        } else {
            domain_matches(&self.domain, &host)
        };
        if !in_scope {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        path_matches(&self.path, url.path())
    }

    /// `name=value` pair for the Cookie request header
    pub fn to_header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Normalize a domain argument.
///
/// Accepts a bare host (`.Example.com`) or a URL (`https://example.com/a`).
pub fn normalize_domain(input: &str) -> String {
    let input = input.trim();
    let host = if input.contains("://") {
        Url::parse(input)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default()
    } else {
        input.to_string()
    };
    host.trim_start_matches('.').to_ascii_lowercase()
}

/// True when `host` equals `cookie_domain` or is a subdomain of it.
///
/// Both arguments must already be normalized.
pub fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    if cookie_domain.is_empty() {
        return false;
    }
    if host == cookie_domain {
        return true;
    }
    host.len() > cookie_domain.len()
        && host.ends_with(cookie_domain)
        && host.as_bytes()[host.len() - cookie_domain.len() - 1] == b'.'
}

/// RFC 6265 path-match
pub fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// RFC 6265 default-path for a request path
pub fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}
