use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::TransportResponse;
use crate::constants::ON_CODE_HANDLER_PREFIX;
use crate::constants::ON_ERROR_HANDLER;
use crate::constants::SYNTHETIC_ERROR_STATUS;
use crate::TransportError;

/// The decoded HTTP part of a response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResponse {
    pub status: u16,
    pub ok: bool,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Response as seen by handlers and written to the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub error: bool,
    pub error_message: String,
    /// Name of the handler list the pipeline runs, e.g. `onCode200`
    pub handler: String,
    pub is_valid: bool,
    pub raw: RawResponse,
}

impl ResponseEnvelope {
    /// Fold a transport outcome into an envelope. Transport failures and
    /// bodies that are not JSON become synthetic `onError` responses; an
    /// empty body decodes to `null`.
    pub fn from_outcome(outcome: std::result::Result<TransportResponse, TransportError>) -> Self {
        match outcome {
            Ok(response) => Self::from_response(response),
            Err(e) => Self::synthetic_error(&e, BTreeMap::new()),
        }
    }

    pub fn from_response(response: TransportResponse) -> Self {
        let body = if response.body.iter().all(u8::is_ascii_whitespace) {
            Ok(Value::Null)
        } else {
            serde_json::from_slice::<Value>(&response.body)
        };

        match body {
            Ok(body) => Self {
                error: false,
                error_message: String::new(),
                handler: format!("{}{}", ON_CODE_HANDLER_PREFIX, response.status),
                is_valid: true,
                raw: RawResponse {
                    status: response.status,
                    ok: response.ok,
                    headers: response.headers,
                    body,
                },
            },
            Err(e) => Self::synthetic_error(
                &TransportError::InvalidBody(e.to_string()),
                response.headers,
            ),
        }
    }

    pub fn synthetic_error(
        error: &TransportError,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            error: true,
            error_message: error.to_string(),
            handler: ON_ERROR_HANDLER.to_string(),
            is_valid: false,
            raw: RawResponse {
                status: SYNTHETIC_ERROR_STATUS,
                ok: false,
                headers,
                body: Value::Object(Default::default()),
            },
        }
    }
}
