//! HTTP request description and payloads

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use reqwest::Method;

/// Media type used for string content unless overridden
pub const DEFAULT_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Text payload encoded with a character set and tagged with a media type
#[derive(Debug, Clone)]
pub struct StringContent {
    content: String,
    encoding: &'static Encoding,
    media_type: String,
}

impl StringContent {
    /// UTF-8 content with the default form media type
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            encoding: UTF_8,
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
        }
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content-Type header value, e.g. `text/plain; charset=utf-8`
    pub fn content_type(&self) -> String {
        format!(
            "{}; charset={}",
            self.media_type,
            self.encoding.name().to_ascii_lowercase()
        )
    }

    fn encode(&self) -> Bytes {
        let (bytes, _, _) = self.encoding.encode(&self.content);
        Bytes::copy_from_slice(&bytes)
    }
}

/// Request body bytes plus the content type they should be sent with
#[derive(Debug, Clone, Default)]
pub struct Body {
    bytes: Bytes,
    content_type: Option<String>,
}

impl Body {
    /// Raw bytes with no content type
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Bytes, Option<String>) {
        (self.bytes, self.content_type)
    }
}

impl From<StringContent> for Body {
    fn from(content: StringContent) -> Self {
        Body {
            bytes: content.encode(),
            content_type: Some(content.content_type()),
        }
    }
}

impl From<String> for Body {
    fn from(content: String) -> Self {
        StringContent::new(content).into()
    }
}

impl From<&str> for Body {
    fn from(content: &str) -> Self {
        StringContent::new(content).into()
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::bytes(bytes)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::bytes(bytes)
    }
}

/// A request to be sent through a requester.
///
/// Headers set here replace default headers of the same name.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<Body>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn string_content_defaults_to_utf8_form() {
        let body: Body = StringContent::new("a=1&b=2").into();
        assert_eq!(
            body.content_type(),
            Some("application/x-www-form-urlencoded; charset=utf-8")
        );
        assert_eq!(body.as_bytes(), b"a=1&b=2");
    }

    #[test]
    fn string_content_applies_encoding() {
        let body: Body = StringContent::new("café")
            .with_encoding(WINDOWS_1252)
            .with_media_type("text/plain")
            .into();
        assert_eq!(body.content_type(), Some("text/plain; charset=windows-1252"));
        assert_eq!(body.as_bytes(), &[b'c', b'a', b'f', 0xE9]);
    }

    #[test]
    fn raw_bytes_carry_no_content_type() {
        let body: Body = vec![1u8, 2, 3].into();
        assert_eq!(body.content_type(), None);
    }
}
