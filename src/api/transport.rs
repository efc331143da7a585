use std::collections::BTreeMap;

#[cfg(test)]
use mockall::automock;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::TransportError;

/// What the transport needs to perform one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportRequest {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    /// JSON payload. Always `None` for GET and HEAD.
    pub body: Option<String>,
}

/// A completed HTTP exchange. The body is left unparsed; the pipeline
/// decodes it as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub ok: bool,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// `ok` follows the status: true for 2xx.
    pub fn new(
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            status,
            ok: (200..300).contains(&status),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn json(
        status: u16,
        body: &Value,
    ) -> Self {
        let mut response = Self::new(status, body.to_string());
        response
            .headers
            .insert("content-type".to_string(), "application/json".to_string());
        response
    }

    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Performs the actual network call.
///
/// Implementations resolve with whatever the server answered, including
/// non-2xx statuses, and only fail for transport level problems.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn fetch(
        &self,
        url: &str,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}
