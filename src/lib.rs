//! requester - a stateful HTTP client facade
//!
//! This crate wraps default headers, proxy settings and a managed cookie jar
//! behind a builder, and offers request operations that return the raw
//! response, its text, or a body decoded through a serialization codec.

pub mod codec;
pub mod config;
pub mod cookies;
pub mod error;
pub mod http;
pub mod logging;
pub mod requester;
pub mod utils;

pub use codec::{Codec, JsonCodec, JsonOptions};
pub use config::{ClientConfig, ProxySettings, TransportConfig};
pub use cookies::{Cookie, CookieJar};
pub use error::{RequesterError, Result};
pub use http::{Body, HttpTransport, Request, Response, StringContent, Transport, TransportRequest};
pub use requester::{Builder, Requester};
pub use tokio_util::sync::CancellationToken;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
