use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::json;
use serde_json::Value;

use super::RawResponse;
use super::ResponseEnvelope;
use crate::definition::OnChange;

/// Maps a response to the value written at a store path.
pub type MapFn = Arc<dyn Fn(&ResponseEnvelope) -> Value + Send + Sync>;

/// Second-pass transform over values read from the store.
pub type ParseFn = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// Response shape check. Failing marks the response invalid, nothing more.
pub type ResponseValidator = Arc<dyn Fn(&RawResponse) -> bool + Send + Sync>;

/// `{run, update}`: write `run(response)` to `update`.
#[derive(Clone)]
pub struct ResponseMapper {
    pub run: MapFn,
    pub update: String,
}

/// `{from, run, update}`: write `run(populate(from))` to `update`.
#[derive(Clone)]
pub struct ResponseParser {
    pub from: Value,
    pub run: ParseFn,
    pub update: String,
}

/// Declarative description of one network call.
///
/// `headers`, `body` and `query` are templates: strings starting with `#`
/// are read from the store when a request is created.
///
/// # Examples
/// ```ignore
/// let profile = EndpointDefinition::get("/profile.json")
///     .query(json!({ "jwt": "#user.jwt" }))
///     .on_change(OnChange::new(["user.jwt"]).when("user.jwt", validators::is_string))
///     .map("onCode200", "user.profile.data", |res| res.raw.body["user"].clone())
///     .flag("sending", "user.profile.api.sending");
/// ```
#[derive(Clone)]
pub struct EndpointDefinition {
    pub on_change: Option<OnChange>,
    pub method: String,
    pub path: String,
    pub headers: Value,
    pub body: Value,
    pub query: Value,
    /// Map stage descriptors by handler name (`onCode200`, `onError`, `onDefault` ...)
    pub handlers: BTreeMap<String, Vec<ResponseMapper>>,
    /// Parse stage descriptors by handler name
    pub parsers: BTreeMap<String, Vec<ResponseParser>>,
    pub validators: Vec<ResponseValidator>,
    /// Flag name -> store path the flag is projected to
    pub flags: BTreeMap<String, String>,
}

impl EndpointDefinition {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            on_change: None,
            method: method.into(),
            path: path.into(),
            headers: json!({}),
            body: json!({}),
            query: json!({}),
            handlers: BTreeMap::new(),
            parsers: BTreeMap::new(),
            validators: Vec::new(),
            flags: BTreeMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    pub fn header(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        if !self.headers.is_object() {
            self.headers = json!({});
        }
        if let Value::Object(map) = &mut self.headers {
            map.insert(name.into(), value.into());
        }
        self
    }

    pub fn body(
        mut self,
        body: Value,
    ) -> Self {
        self.body = body;
        self
    }

    pub fn query(
        mut self,
        query: Value,
    ) -> Self {
        self.query = query;
        self
    }

    /// Send this endpoint whenever `on_change` fires.
    pub fn on_change(
        mut self,
        on_change: OnChange,
    ) -> Self {
        self.on_change = Some(on_change);
        self
    }

    pub fn map(
        mut self,
        handler: impl Into<String>,
        update: impl Into<String>,
        run: impl Fn(&ResponseEnvelope) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.handlers
            .entry(handler.into())
            .or_default()
            .push(ResponseMapper {
                run: Arc::new(run),
                update: update.into(),
            });
        self
    }

    pub fn parse(
        mut self,
        handler: impl Into<String>,
        from: Value,
        update: impl Into<String>,
        run: impl Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.parsers
            .entry(handler.into())
            .or_default()
            .push(ResponseParser {
                from,
                run: Arc::new(run),
                update: update.into(),
            });
        self
    }

    pub fn validate_response(
        mut self,
        validator: impl Fn(&RawResponse) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn flag(
        mut self,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.flags.insert(name.into(), path.into());
        self
    }

    /// True if either stage has descriptors registered under `handler`.
    pub fn has_handler(
        &self,
        handler: &str,
    ) -> bool {
        self.handlers.contains_key(handler) || self.parsers.contains_key(handler)
    }
}

impl fmt::Debug for EndpointDefinition {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("EndpointDefinition")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("query", &self.query)
            .field("on_change", &self.on_change)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .field("validators", &self.validators.len())
            .field("flags", &self.flags)
            .finish()
    }
}
