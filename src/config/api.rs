use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Request pipeline settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    /// Prefix prepended to every endpoint path before it reaches the transport.
    /// Empty means endpoint paths are used as-is.
    #[serde(default)]
    pub base_url: String,

    /// Value written to `api.online` when the context is created
    #[serde(default = "default_initially_online")]
    pub initially_online: bool,

    /// Serve eligible GET responses from the response cache
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Upper bound for one transport call (unit: milliseconds).
    /// 0 disables the timeout; the call can then only end through cancellation.
    #[serde(default = "default_request_timeout_in_ms")]
    pub request_timeout_in_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            initially_online: default_initially_online(),
            cache_enabled: default_cache_enabled(),
            request_timeout_in_ms: default_request_timeout_in_ms(),
        }
    }
}

impl ApiConfig {
    /// Validates api configuration
    /// # Errors
    /// Returns `Error::InvalidConfig` when `base_url` is set but is not an
    /// http(s) URL, or ends with a `/` (endpoint paths carry the leading slash).
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Ok(());
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "api.base_url '{}' must start with http:// or https://",
                self.base_url
            )));
        }

        if self.base_url.ends_with('/') {
            return Err(Error::InvalidConfig(format!(
                "api.base_url '{}' must not end with '/'",
                self.base_url
            )));
        }

        Ok(())
    }
}

fn default_initially_online() -> bool {
    true
}
fn default_cache_enabled() -> bool {
    true
}
fn default_request_timeout_in_ms() -> u64 {
    30_000
}
