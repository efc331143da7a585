use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::Atom;
use crate::Transport;
use crate::TransportError;
use crate::TransportRequest;
use crate::TransportResponse;

/// Shared log of callback invocations.
pub type Calls = Arc<Mutex<Vec<String>>>;

pub fn recorder() -> Calls {
    Arc::new(Mutex::new(Vec::new()))
}

/// Callback that appends `label` to `calls` every time it runs.
pub fn record(
    calls: &Calls,
    label: &str,
) -> impl Fn(&Atom) + Send + Sync + 'static {
    let calls = calls.clone();
    let label = label.to_string();
    move |_| calls.lock().push(label.clone())
}

pub fn recorded(calls: &Calls) -> Vec<String> {
    calls.lock().clone()
}

/// Callback that records the value at `path` as seen when it runs.
pub fn record_value(
    calls: &Calls,
    path: &str,
) -> impl Fn(&Atom) + Send + Sync + 'static {
    let calls = calls.clone();
    let path = path.to_string();
    move |atom| {
        let value = atom.get(&path).unwrap_or(Value::Null);
        calls.lock().push(value.to_string())
    }
}

/// Transport that never answers. Requests only end through cancellation or
/// the request timeout.
#[derive(Debug, Default)]
pub struct PendingTransport {
    pub calls: AtomicUsize,
}

impl PendingTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for PendingTransport {
    async fn fetch(
        &self,
        _url: &str,
        _request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}
