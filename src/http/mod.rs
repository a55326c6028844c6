//! HTTP transport module
//!
//! A [`Transport`] performs the network exchange for a prepared request.
//! [`HttpTransport`] is the reqwest-backed implementation; the requester's
//! cookie jar is installed as the client's cookie store so cookies are read
//! and merged on every exchange.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Method};
use url::Url;

use crate::config::{ProxySettings, TransportConfig};
use crate::cookies::CookieJar;
use crate::error::{RequesterError, Result};

pub mod request;
pub mod response;

pub use request::{Body, Request, StringContent, DEFAULT_MEDIA_TYPE};
pub use response::{BodyStream, Response};

/// Everything a transport needs to perform one exchange
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub proxy: Option<ProxySettings>,
    /// The session's jar; read for the Cookie header and updated from Set-Cookie.
    pub cookie_jar: Arc<CookieJar>,
}

/// External HTTP engine
pub trait Transport: Send + Sync {
    fn execute(&self, request: TransportRequest)
        -> impl Future<Output = Result<Response>> + Send;
}

struct CachedClient {
    proxy: Option<ProxySettings>,
    jar: Arc<CookieJar>,
    client: Client,
}

/// reqwest-backed transport.
///
/// The underlying client is rebuilt whenever the proxy or the cookie jar
/// differs from the one it was built for.
pub struct HttpTransport {
    config: TransportConfig,
    cached: Mutex<Option<CachedClient>>,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            cached: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn client_for(&self, proxy: &Option<ProxySettings>, jar: &Arc<CookieJar>) -> Result<Client> {
        let mut cached = self.cached.lock();
        if let Some(entry) = cached.as_ref() {
            if entry.proxy == *proxy && Arc::ptr_eq(&entry.jar, jar) {
                return Ok(entry.client.clone());
            }
        }

        let client = self.build_client(proxy, jar)?;
        *cached = Some(CachedClient {
            proxy: proxy.clone(),
            jar: Arc::clone(jar),
            client: client.clone(),
        });
        Ok(client)
    }

    fn build_client(&self, proxy: &Option<ProxySettings>, jar: &Arc<CookieJar>) -> Result<Client> {
        let mut builder = ClientBuilder::new()
            .cookie_provider(Arc::clone(jar))
            .redirect(if self.config.follow_redirects {
                reqwest::redirect::Policy::limited(self.config.max_redirects as usize)
            } else {
                reqwest::redirect::Policy::none()
            });

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(user_agent) = &self.config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if self.config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder = match proxy {
            Some(settings) => {
                let proxy = reqwest::Proxy::all(settings.url())
                    .map_err(|e| RequesterError::Proxy(format!("Invalid proxy {}: {}", settings, e)))?;
                let proxy = if let (Some(username), Some(password)) =
                    (&settings.username, &settings.password)
                {
                    proxy.basic_auth(username, password)
                } else {
                    proxy
                };
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        Ok(builder.build()?)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> Result<Response> {
        let client = self.client_for(&request.proxy, &request.cookie_jar)?;

        let mut builder = client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        log::debug!("<- {} {}", response.status(), response.url());
        Ok(Response::from_reqwest(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_is_reused_until_proxy_changes() {
        let transport = HttpTransport::default();
        let jar = Arc::new(CookieJar::new());

        transport.client_for(&None, &jar).expect("client");
        transport.client_for(&None, &jar).expect("client");
        assert!(transport.cached.lock().as_ref().expect("cached").proxy.is_none());

        let proxy = Some(ProxySettings::new("127.0.0.1", 3128));
        transport.client_for(&proxy, &jar).expect("client");
        assert_eq!(
            transport.cached.lock().as_ref().expect("cached").proxy,
            proxy
        );
    }

    #[test]
    fn client_is_rebuilt_for_another_jar() {
        let transport = HttpTransport::default();
        let first = Arc::new(CookieJar::new());
        let second = Arc::new(CookieJar::new());

        transport.client_for(&None, &first).expect("client");
        transport.client_for(&None, &second).expect("client");
        let cached = transport.cached.lock();
        assert!(Arc::ptr_eq(&cached.as_ref().expect("cached").jar, &second));
    }

    #[test]
    fn invalid_proxy_is_reported() {
        let transport = HttpTransport::default();
        let jar = Arc::new(CookieJar::new());
        let proxy = Some(ProxySettings::new("bad host", 80));
        let err = transport.client_for(&proxy, &jar).expect_err("invalid proxy");
        assert!(matches!(err, RequesterError::Proxy(_)));
    }
}
