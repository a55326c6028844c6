//! Configuration management for requester

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::cookies::CookieJar;
use crate::error::{RequesterError, Result};

/// Proxy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    /// Plain http proxy at `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: "http".to_string(),
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Proxy URL without credentials
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl fmt::Display for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// Knobs for the reqwest-backed transport. Nothing times out by default.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub accept_invalid_certs: bool,
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            timeout: None,
            connect_timeout: None,
            follow_redirects: true,
            max_redirects: 10,
            accept_invalid_certs: false,
            user_agent: Some(format!("requester/{}", crate::VERSION)),
        }
    }
}

/// Session state shared by every request a requester issues.
///
/// Mutations apply to requests dispatched afterwards; requests already handed
/// to the transport keep the headers and proxy they were built with.
#[derive(Debug, Default)]
pub struct ClientConfig {
    default_headers: RwLock<Vec<(String, String)>>,
    proxy: RwLock<Option<ProxySettings>>,
    cookie_jar: Arc<CookieJar>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a default header; an existing header of the same name is kept.
    pub fn add_default_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.default_headers.write().push((name.into(), value.into()));
    }

    /// Default headers in insertion order
    pub fn default_headers(&self) -> Vec<(String, String)> {
        self.default_headers.read().clone()
    }

    /// Default headers as a header map, duplicates appended
    pub fn header_map(&self) -> Result<HeaderMap> {
        let headers = self.default_headers.read();
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            let (name, value) = header_pair(name, value)?;
            map.append(name, value);
        }
        Ok(map)
    }

    pub fn set_proxy(&self, proxy: Option<ProxySettings>) {
        *self.proxy.write() = proxy;
    }

    pub fn proxy(&self) -> Option<ProxySettings> {
        self.proxy.read().clone()
    }

    /// The jar used for every request from this session
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.cookie_jar
    }
}

pub(crate) fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| RequesterError::InvalidHeader(format!("'{}': {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| RequesterError::InvalidHeader(format!("'{}' value: {}", name, e)))?;
    Ok((header_name, header_value))
}
