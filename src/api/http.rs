//! [`Transport`] over HTTP, backed by `reqwest`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use tracing::warn;

use super::Transport;
use super::TransportRequest;
use super::TransportResponse;
use crate::TransportError;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl HttpTransport {
    /// Build a transport with a connect timeout. Request timeouts are
    /// enforced by the dispatch loop (`api.request_timeout_in_ms`).
    pub fn new(connect_timeout: Duration) -> std::result::Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.header("content-type", "application/json").body(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("[HttpTransport] {} {} failed: {}", request.method, url, e);
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        debug!("[HttpTransport] {} {} -> {}", request.method, url, status.as_u16());
        Ok(TransportResponse {
            status: status.as_u16(),
            ok: status.is_success(),
            headers,
            body: body.to_vec(),
        })
    }
}
