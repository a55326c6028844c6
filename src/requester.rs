//! Requester facade and its builder
//!
//! A [`Requester`] is one client session: default headers, an optional proxy
//! and a cookie jar, all applied to every request it sends. Every request
//! operation is a thin wrapper over one dispatch path parameterised by
//! method, body encoding and response decoding.

use std::future::Future;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::codec::{Codec, JsonCodec};
use crate::config::{header_pair, ClientConfig, ProxySettings};
use crate::cookies::{Cookie, CookieJar};
use crate::error::{RequesterError, Result};
use crate::http::{Body, HttpTransport, Request, Response, Transport, TransportRequest};
use crate::utils::UrlUtils;

/// Stateful HTTP client session
pub struct Requester<T = HttpTransport, C = JsonCodec> {
    config: ClientConfig,
    transport: T,
    codec: C,
}

impl Requester {
    /// Builder over the default reqwest transport and JSON codec
    pub fn builder() -> Builder {
        Builder::new()
    }
}

impl<T: Transport, C: Codec> Requester<T, C> {
    pub fn new(transport: T, codec: C) -> Self {
        Self {
            config: ClientConfig::new(),
            transport,
            codec,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn add_default_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.config.add_default_header(name, value);
    }

    pub fn add_cookie(&self, cookie: Cookie) {
        self.cookie_jar().add(cookie);
    }

    pub fn add_cookies<I, N, V, P>(&self, domain: &str, cookies: I)
    where
        I: IntoIterator<Item = (N, V, P)>,
        N: Into<String>,
        V: Into<String>,
        P: Into<String>,
    {
        self.cookie_jar().add_many(domain, cookies);
    }

    pub fn update_cookie(&self, domain: &str, name: &str, value: impl Into<String>) {
        self.cookie_jar().update(domain, name, value);
    }

    pub fn has_cookie(&self, domain: &str, name: &str) -> bool {
        self.cookie_jar().has(domain, name)
    }

    pub fn expire_cookie(&self, domain: &str, name: &str) {
        self.cookie_jar().expire(domain, name);
    }

    pub fn expire_cookies<I, S>(&self, domain: &str, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cookie_jar().expire_all(domain, names);
    }

    pub fn expire_cookies_where<F>(&self, domain: &str, predicate: F)
    where
        F: FnMut(&Cookie) -> bool,
    {
        self.cookie_jar().expire_where(domain, predicate);
    }

    pub fn set_proxy(&self, proxy: ProxySettings) {
        self.config.set_proxy(Some(proxy));
    }

    pub fn set_proxy_addr(&self, host: impl Into<String>, port: u16) {
        self.set_proxy(ProxySettings::new(host, port));
    }

    pub fn clear_proxy(&self) {
        self.config.set_proxy(None);
    }

    pub fn proxy(&self) -> Option<ProxySettings> {
        self.config.proxy()
    }

    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        self.config.cookie_jar()
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.dispatch(Request::get(url), None).await
    }

    /// GET and read the body as text; non-success statuses are errors
    pub async fn get_string(&self, url: &str) -> Result<String> {
        let response = self.dispatch(Request::get(url), None).await?;
        response.error_for_status()?.text().await
    }

    pub async fn get_json_value(&self, url: &str) -> Result<Value> {
        self.dispatch_decoded(Request::get(url), true, None).await
    }

    pub async fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        self.dispatch_decoded(Request::get(url), true, None).await
    }

    pub async fn post(&self, url: &str, body: impl Into<Body>) -> Result<Response> {
        self.dispatch(Request::post(url).body(body), None).await
    }

    pub async fn post_for_json_value(
        &self,
        url: &str,
        body: impl Into<Body>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value> {
        self.dispatch_decoded(Request::post(url).body(body), false, cancel)
            .await
    }

    pub async fn post_for_json<R: DeserializeOwned>(
        &self,
        url: &str,
        body: impl Into<Body>,
        cancel: Option<&CancellationToken>,
    ) -> Result<R> {
        self.dispatch_decoded(Request::post(url).body(body), false, cancel)
            .await
    }

    /// POST `value` encoded with the codec
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        value: &B,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response> {
        let request = Request::post(url).body(self.encode_body(value)?);
        self.dispatch(request, cancel).await
    }

    pub async fn post_json_for_json_value<B: Serialize + ?Sized>(
        &self,
        url: &str,
        value: &B,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value> {
        let request = Request::post(url).body(self.encode_body(value)?);
        self.dispatch_decoded(request, false, cancel).await
    }

    pub async fn post_json_for_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: &str,
        value: &B,
        cancel: Option<&CancellationToken>,
    ) -> Result<R> {
        let request = Request::post(url).body(self.encode_body(value)?);
        self.dispatch_decoded(request, false, cancel).await
    }

    /// Send an arbitrary request with the session's headers, proxy and cookies
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.dispatch(request, None).await
    }

    pub async fn send_with_cancel(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.dispatch(request, Some(cancel)).await
    }

    fn encode_body<B: Serialize + ?Sized>(&self, value: &B) -> Result<Body> {
        let bytes = self.codec.encode(value)?;
        Ok(Body::bytes(bytes).with_content_type(self.codec.content_type()))
    }

    async fn dispatch(
        &self,
        request: Request,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response> {
        let prepared = self.prepare(request)?;
        with_cancel(cancel, self.transport.execute(prepared)).await
    }

    async fn dispatch_decoded<R: DeserializeOwned>(
        &self,
        request: Request,
        ensure_success: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<R> {
        let prepared = self.prepare(request)?;
        let exchange = async {
            let mut response = self.transport.execute(prepared).await?;
            if ensure_success {
                response = response.error_for_status()?;
            }
            let bytes = response.bytes().await?;
            if cancel.map(CancellationToken::is_cancelled).unwrap_or(false) {
                return Err(RequesterError::Cancelled);
            }
            self.codec.decode(&bytes)
        };
        with_cancel(cancel, exchange).await
    }

    /// Resolve the URL and merge default and per-request headers
    fn prepare(&self, request: Request) -> Result<TransportRequest> {
        let Request {
            method,
            url,
            headers: overrides,
            body,
        } = request;

        let url = UrlUtils::validate_url(&url)?;
        let mut headers = self.config.header_map()?;

        let body = match body {
            Some(body) => {
                let (bytes, content_type) = body.into_parts();
                if let Some(content_type) = content_type {
                    let (_, value) = header_pair(CONTENT_TYPE.as_str(), &content_type)?;
                    headers.insert(CONTENT_TYPE, value);
                }
                Some(bytes)
            }
            None => None,
        };

        let mut replaced = Vec::new();
        for (name, value) in &overrides {
            let (name, value) = header_pair(name, value)?;
            if !replaced.contains(&name) {
                headers.remove(&name);
                replaced.push(name.clone());
            }
            headers.append(name, value);
        }

        log::debug!("-> {} {}", method, url);
        Ok(TransportRequest {
            method,
            url,
            headers,
            body,
            proxy: self.config.proxy(),
            cookie_jar: Arc::clone(self.config.cookie_jar()),
        })
    }
}

async fn with_cancel<O, F>(cancel: Option<&CancellationToken>, future: F) -> Result<O>
where
    F: Future<Output = Result<O>>,
{
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(RequesterError::Cancelled),
                result = future => result,
            }
        }
        None => future.await,
    }
}

/// Fluent configuration for a [`Requester`].
///
/// The builder owns a single requester from construction on; every `with_*`
/// call mutates it in place and [`Builder::build`] hands out that same
/// instance each time.
pub struct Builder<T = HttpTransport, C = JsonCodec> {
    requester: Arc<Requester<T, C>>,
}

impl Builder {
    pub fn new() -> Self {
        Self::with_transport(HttpTransport::default())
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Builder<T, JsonCodec> {
    pub fn with_transport(transport: T) -> Self {
        Self::with_parts(transport, JsonCodec::default())
    }
}

impl<T: Transport, C: Codec> Builder<T, C> {
    pub fn with_parts(transport: T, codec: C) -> Self {
        Self {
            requester: Arc::new(Requester::new(transport, codec)),
        }
    }

    pub fn with_default_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.requester.add_default_header(name, value);
        self
    }

    pub fn with_cookie(&mut self, cookie: Cookie) -> &mut Self {
        self.requester.add_cookie(cookie);
        self
    }

    pub fn with_cookies<I, N, V, P>(&mut self, domain: &str, cookies: I) -> &mut Self
    where
        I: IntoIterator<Item = (N, V, P)>,
        N: Into<String>,
        V: Into<String>,
        P: Into<String>,
    {
        self.requester.add_cookies(domain, cookies);
        self
    }

    pub fn with_proxy(&mut self, proxy: ProxySettings) -> &mut Self {
        self.requester.set_proxy(proxy);
        self
    }

    pub fn with_proxy_addr(&mut self, host: impl Into<String>, port: u16) -> &mut Self {
        self.requester.set_proxy_addr(host, port);
        self
    }

    /// The requester this builder has been configuring
    pub fn build(&self) -> Arc<Requester<T, C>> {
        Arc::clone(&self.requester)
    }
}
