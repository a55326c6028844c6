//! HTTP response handling

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

use crate::error::{RequesterError, Result};
use crate::utils::StringUtils;

/// Response body as a stream of chunks
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Response returned by a transport; the body is read lazily
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: BodyStream,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, url: Url, body: BodyStream) -> Self {
        Self {
            status,
            headers,
            url,
            body,
        }
    }

    /// Response with an already buffered body
    pub fn from_bytes(
        status: StatusCode,
        headers: HeaderMap,
        url: Url,
        body: impl Into<Bytes>,
    ) -> Self {
        let body: Bytes = body.into();
        let body = stream::once(async move { Ok::<_, RequesterError>(body) });
        Self::new(status, headers, url, Box::pin(body))
    }

    pub(crate) fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RequesterError::from));
        Self::new(status, headers, url, Box::pin(body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL after any redirects
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Turn a non-success status into `RequesterError::Status`
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(RequesterError::Status {
                status: self.status,
                url: self.url,
            })
        }
    }

    pub fn into_stream(self) -> BodyStream {
        self.body
    }

    /// Read the whole body
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    /// Read the body as text using the charset from Content-Type, UTF-8 otherwise
    pub async fn text(self) -> Result<String> {
        let encoding = self
            .content_type()
            .and_then(StringUtils::charset_from_content_type)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        self.text_with_encoding(encoding).await
    }

    pub async fn text_with_encoding(self, encoding: &'static Encoding) -> Result<String> {
        let bytes = self.bytes().await?;
        let (text, _, _) = encoding.decode(&bytes);
        Ok(text.into_owned())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .finish()
    }
}
