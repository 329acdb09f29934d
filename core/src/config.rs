//! Client configuration.

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the service base URL.
pub const BASE_URL_ENV: &str = "SWIFT_CLOUD_API_URL";

const DEFAULT_BASE_URL: &str = "https://desktop-test-api.swiftmobility.eu";

/// Extra fields the optimization endpoint currently expects at the top level
/// of its request body. Sent verbatim; the client attaches no meaning to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTag {
    pub version: String,
    pub request_id: String,
}

impl Default for RequestTag {
    fn default() -> Self {
        Self {
            version: "0.7.0.alpha".to_string(),
            request_id: "123-456".to_string(),
        }
    }
}

/// Cloud client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Service base URL, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Passthrough fields for the optimization request. `None` omits them.
    #[serde(default = "default_request_tag")]
    pub request_tag: Option<RequestTag>,

    /// Timeout for establishing a connection, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_base_url() -> String {
    std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

fn default_request_tag() -> Option<RequestTag> {
    Some(RequestTag::default())
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_tag: default_request_tag(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl CloudConfig {
    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set or clear the passthrough request tag.
    pub fn with_request_tag(mut self, tag: Option<RequestTag>) -> Self {
        self.request_tag = tag;
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }
}
