use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::flags;
use super::CallArgs;
use super::HandlerPipeline;
use super::RequestId;
use super::RequestModel;
use super::ResponseEnvelope;
use super::TransportResponse;
use crate::atom::AtomEvent;
use crate::constants::API_ONLINE_PATH;
use crate::constants::SENDING_FLAG;
use crate::metrics::CACHE_HITS;
use crate::metrics::REQUESTS_DISPATCHED;
use crate::metrics::TRANSPORT_ERRORS;
use crate::Atom;
use crate::RegistrationError;
use crate::Result;
use crate::TransportError;

impl Atom {
    /// Create a request for the api definition `name` and queue it.
    ///
    /// # Errors
    /// `RegistrationError::UnknownDefinition` if no api definition is
    /// registered under `name`.
    pub fn send(
        &self,
        name: &str,
        call: CallArgs,
    ) -> Result<RequestId> {
        let request = self.new_request(name, call)?;
        let id = request.id;
        self.enqueue(request);
        Ok(id)
    }

    /// Build a request with a fresh id without queueing it.
    pub fn new_request(
        &self,
        name: &str,
        call: CallArgs,
    ) -> Result<RequestModel> {
        let endpoint = self
            .inner
            .definitions
            .read()
            .endpoint(name)
            .ok_or_else(|| RegistrationError::UnknownDefinition {
                kind: "api",
                name: name.to_string(),
            })?;

        let id = RequestId(self.inner.request_seq.fetch_add(1, Ordering::SeqCst) + 1);
        let store = self.inner.store.read();
        Ok(RequestModel::new(id, name, endpoint, &store, call))
    }

    /// Queue `request` and schedule a dispatch tick.
    ///
    /// Returns false if a request with the same id is already queued.
    pub fn enqueue(
        &self,
        request: RequestModel,
    ) -> bool {
        let added = self.inner.queue.lock().add(request);
        if added {
            self.schedule_dispatch();
        }
        added
    }

    /// Cancel a queued or in-flight request.
    ///
    /// An in-flight request resolves as an `onError` response on a later turn
    /// and its `sending` flag is released by the pipeline. Returns false if
    /// the id is unknown, already cancelled or already handled.
    pub fn cancel(
        &self,
        id: &RequestId,
    ) -> bool {
        let cancelled = self.inner.queue.lock().cancel(id);
        debug!(%id, cancelled, "[Atom::cancel]");
        cancelled
    }

    /// Write the connectivity flag. Going online resumes dispatching.
    pub fn set_online(
        &self,
        online: bool,
    ) -> Result<bool> {
        self.set(API_ONLINE_PATH, online)
    }

    pub fn is_online(&self) -> bool {
        self.inner.store.read().lookup(API_ONLINE_PATH) == Some(&Value::Bool(true))
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub(crate) fn schedule_dispatch(&self) {
        if self.inner.queue.lock().schedule_tick() {
            self.emit(AtomEvent::DispatchTick);
        }
    }

    /// One dispatch tick: send the next request if online and nothing is in
    /// flight.
    pub(crate) fn handle_requests(&self) {
        self.inner.queue.lock().begin_tick();

        if !self.is_online() {
            debug!("[Atom::handle_requests] offline, keep requests queued");
            return;
        }

        let next = self.inner.queue.lock().next_request();
        if let Some(request) = next {
            self.handle_request(request);
        }
    }

    fn handle_request(
        &self,
        request: RequestModel,
    ) {
        flags::project(self, &request, SENDING_FLAG, true);

        if self.settings().api.cache_enabled {
            if let Some(cached) = self.inner.cache.get(&request.signature()) {
                debug!(id = %request.id, name = %request.name, "[Atom::handle_request] cache hit");
                CACHE_HITS.with_label_values(&[&request.name]).inc();
                self.handle_response(request.id, cached);
                return;
            }
        }

        REQUESTS_DISPATCHED.with_label_values(&[&request.name]).inc();

        let token = CancellationToken::new();
        self.inner.queue.lock().attach_token(request.id, token.clone());
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);

        let id = request.id;
        let url = format!("{}{}", self.settings().api.base_url, request.request.path);
        let transport_request = request.transport_request();
        let transport = self.inner.transport.clone();
        let timeout_ms = self.settings().api.request_timeout_in_ms;
        let events = self.inner.events_tx.clone();

        debug!(%id, name = %request.name, %url, method = %transport_request.method, "[Atom::handle_request] fetch");

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(TransportError::Cancelled),
                outcome = with_timeout(transport.fetch(&url, transport_request), timeout_ms) => outcome,
            };
            trace!(%id, ok = outcome.is_ok(), "[Atom::handle_request] fetch resolved");

            let envelope = ResponseEnvelope::from_outcome(outcome);
            if events.send(AtomEvent::Responded { id, envelope }).is_err() {
                warn!(%id, "[Atom::handle_request] event loop gone, response dropped");
            }
        });
    }

    /// Run the handler pipeline for a response and move on to the next
    /// request.
    pub(crate) fn handle_response(
        &self,
        id: RequestId,
        envelope: ResponseEnvelope,
    ) {
        let Some(mut request) = self.inner.queue.lock().take(&id) else {
            warn!(%id, "[Atom::handle_response] request no longer queued");
            return;
        };

        if envelope.error {
            debug!(%id, error = %envelope.error_message, "[Atom::handle_response] transport failure");
            TRANSPORT_ERRORS.with_label_values(&[&request.name]).inc();
        }

        request.response = Some(envelope);
        HandlerPipeline::run(self, &mut request);
        self.schedule_dispatch();
    }
}

async fn with_timeout<F>(
    fetch: F,
    timeout_ms: u64,
) -> std::result::Result<TransportResponse, TransportError>
where
    F: Future<Output = std::result::Result<TransportResponse, TransportError>>,
{
    if timeout_ms == 0 {
        return fetch.await;
    }
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fetch).await {
        Ok(outcome) => outcome,
        Err(_) => Err(TransportError::Timeout(timeout_ms)),
    }
}
