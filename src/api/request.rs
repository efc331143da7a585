use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::Serializer;
use serde_json::json;
use serde_json::Value;

use super::EndpointDefinition;
use super::ResponseEnvelope;
use super::TransportRequest;
use crate::constants::REQUEST_ID_PREFIX;
use crate::store::StateStore;
use crate::utils::query::object_to_query;

/// Request identity, unique per call: `api1`, `api2`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl fmt::Display for RequestId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}{}", REQUEST_ID_PREFIX, self.0)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Call-site overrides merged over the endpoint's defaults.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub headers: Option<Value>,
    pub body: Option<Value>,
    pub query: Option<Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(
        mut self,
        headers: Value,
    ) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(
        mut self,
        body: Value,
    ) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(
        mut self,
        query: Value,
    ) -> Self {
        self.query = Some(query);
        self
    }
}

/// The concrete call: templates resolved, query serialised into `path`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSpec {
    pub method: String,
    pub path: String,
    pub headers: Value,
    pub body: Value,
    pub query: Value,
}

/// One call from creation to handled.
///
/// Owned by the dispatch queue while queued or sending, then by the handler
/// pipeline; nothing else mutates it.
#[derive(Clone, Serialize)]
pub struct RequestModel {
    pub id: RequestId,
    pub name: String,
    pub flags: BTreeMap<String, String>,
    pub sending: bool,
    pub request: RequestSpec,
    /// `None` until a response arrived (from the cache or the network)
    pub response: Option<ResponseEnvelope>,
    #[serde(skip)]
    pub(crate) endpoint: Arc<EndpointDefinition>,
}

impl RequestModel {
    /// Build a request from `endpoint` and call-site overrides.
    ///
    /// Method defaults to GET and is uppercased. Header, body and query
    /// templates are populated from `store`, then call-site objects are merged
    /// over them key by key. A non-empty query is always serialised into the
    /// path.
    pub fn new(
        id: RequestId,
        name: impl Into<String>,
        endpoint: Arc<EndpointDefinition>,
        store: &StateStore,
        call: CallArgs,
    ) -> Self {
        let method = if endpoint.method.trim().is_empty() {
            "GET".to_string()
        } else {
            endpoint.method.trim().to_uppercase()
        };

        let headers = merge(store.populate(&endpoint.headers), call.headers);
        let body = merge(store.populate(&endpoint.body), call.body);
        let query = merge(store.populate(&endpoint.query), call.query);
        let path = format!("{}{}", endpoint.path, object_to_query(&query));

        Self {
            id,
            name: name.into(),
            flags: endpoint.flags.clone(),
            sending: false,
            request: RequestSpec {
                method,
                path,
                headers,
                body,
                query,
            },
            response: None,
            endpoint,
        }
    }

    /// GET and HEAD never carry a body.
    pub fn carries_body(&self) -> bool {
        !matches!(self.request.method.as_str(), "GET" | "HEAD")
    }

    /// Canonical cache key: `[method, path, body, headers, query]` as JSON.
    /// Object keys serialise sorted, so equal requests give equal keys and
    /// the array framing keeps distinct field splits apart.
    pub fn signature(&self) -> String {
        json!([
            self.request.method,
            self.request.path,
            self.request.body,
            self.request.headers,
            self.request.query,
        ])
        .to_string()
    }

    pub fn transport_request(&self) -> TransportRequest {
        let headers = match &self.request.headers {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), v)
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        TransportRequest {
            method: self.request.method.clone(),
            headers,
            body: self
                .carries_body()
                .then(|| self.request.body.to_string()),
        }
    }

    /// Cacheable: a GET whose response is a non-error 2xx with the `ok` flag.
    pub fn is_cache_eligible(&self) -> bool {
        self.request.method == "GET"
            && self.response.as_ref().is_some_and(|r| {
                !r.error && r.raw.ok && (200..300).contains(&r.raw.status)
            })
    }

    pub fn endpoint(&self) -> &EndpointDefinition {
        &self.endpoint
    }
}

impl fmt::Debug for RequestModel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RequestModel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("sending", &self.sending)
            .field("request", &self.request)
            .field("response", &self.response)
            .finish()
    }
}

/// Shallow merge of `over` into `base`. Objects merge key by key, anything
/// else given at the call site replaces the default. `null` defaults count as
/// an empty object.
fn merge(
    base: Value,
    over: Option<Value>,
) -> Value {
    let base = if base.is_null() { json!({}) } else { base };
    match (base, over) {
        (base, None) => base,
        (Value::Object(mut base), Some(Value::Object(over))) => {
            base.extend(over);
            Value::Object(base)
        }
        (_, Some(over)) => over,
    }
}
