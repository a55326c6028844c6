//! Structured body serialization

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RequesterError, Result};

/// External serialization engine used for structured request and response bodies
pub trait Codec: Send + Sync {
    /// Content-Type sent with encoded bodies
    fn content_type(&self) -> &str;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// Options handed through to serde_json
#[derive(Debug, Clone, Default)]
pub struct JsonOptions {
    pub pretty: bool,
}

/// serde_json codec
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    options: JsonOptions,
}

impl JsonCodec {
    pub fn new(options: JsonOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &JsonOptions {
        &self.options
    }
}

impl Codec for JsonCodec {
    fn content_type(&self) -> &str {
        "application/json; charset=utf-8"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let encoded = if self.options.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(RequesterError::encode)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(RequesterError::decode)
    }
}
