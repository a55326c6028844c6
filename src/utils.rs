//! Utility functions and helpers

use crate::error::{RequesterError, Result};
use url::Url;

/// URL validation and parsing utilities
pub struct UrlUtils;

impl UrlUtils {
    /// Parse an absolute http(s) URL
    pub fn validate_url(input: &str) -> Result<Url> {
        let url = Url::parse(input.trim())
            .map_err(|e| RequesterError::InvalidUrl(format!("Invalid URL '{}': {}", input, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(RequesterError::InvalidUrl(format!(
                    "Unsupported scheme '{}' in '{}'",
                    other, input
                )))
            }
        }

        if url.host_str().is_none() {
            return Err(RequesterError::InvalidUrl(format!(
                "Missing host in '{}'",
                input
            )));
        }

        Ok(url)
    }

    /// Extract the host from a URL for cookie matching
    pub fn extract_host(url: &Url) -> Option<String> {
        url.host_str().map(|h| h.to_ascii_lowercase())
    }
}

/// String utilities
pub struct StringUtils;

impl StringUtils {
    /// Pull the `charset` parameter out of a Content-Type value
    pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
        content_type.split(';').skip(1).find_map(|param| {
            let (key, value) = param.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches('"'))
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{StringUtils, UrlUtils};
    use crate::error::RequesterError;
    use url::Url;

    #[test]
    fn validate_url_accepts_absolute_http() {
        let url = UrlUtils::validate_url("https://example.com/api").expect("valid url");
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn validate_url_rejects_relative_and_foreign_schemes() {
        let err = UrlUtils::validate_url("example.com/path").expect_err("relative url");
        assert!(matches!(err, RequesterError::InvalidUrl(_)));

        let err = UrlUtils::validate_url("ftp://example.com/").expect_err("ftp url");
        assert!(matches!(err, RequesterError::InvalidUrl(_)));
    }

    #[test]
    fn extract_host_lowercases() {
        let url = Url::parse("http://API.Example.com/x").expect("valid url");
        assert_eq!(
            UrlUtils::extract_host(&url),
            Some("api.example.com".to_string())
        );
    }

    #[test]
    fn charset_is_read_from_content_type() {
        assert_eq!(
            StringUtils::charset_from_content_type("text/plain; charset=\"ISO-8859-1\""),
            Some("ISO-8859-1")
        );
        assert_eq!(
            StringUtils::charset_from_content_type("application/json"),
            None
        );
    }
}
