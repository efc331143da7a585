use std::collections::HashMap;
use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use super::RequestId;
use super::RequestModel;

/// Pending requests in arrival order, with a global single-flight gate.
///
/// A request stays in the queue from `add` until its response has been fully
/// handled. `sending` on the queued model is the only thing that prevents a
/// second dispatch.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    requests: VecDeque<RequestModel>,
    tokens: HashMap<RequestId, CancellationToken>,
    tick_scheduled: bool,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `request`. A request whose id is already queued is ignored.
    ///
    /// Returns true if the request was added.
    pub fn add(
        &mut self,
        request: RequestModel,
    ) -> bool {
        if self.requests.iter().any(|r| r.id == request.id) {
            debug!(id = %request.id, "[DispatchQueue::add] already queued, ignore");
            return false;
        }
        trace!(id = %request.id, name = %request.name, "[DispatchQueue::add]");
        self.requests.push_back(request);
        true
    }

    /// Pick the next request to send.
    ///
    /// Yields nothing while any request is sending. Otherwise marks the first
    /// request that is not sending as sending and returns a copy of it.
    pub fn next_request(&mut self) -> Option<RequestModel> {
        if self.is_sending() {
            trace!("[DispatchQueue::next_request] a request is in flight");
            return None;
        }
        let request = self.requests.iter_mut().find(|r| !r.sending)?;
        request.sending = true;
        Some(request.clone())
    }

    /// Remove a request from the queue, dropping its cancellation token.
    pub fn take(
        &mut self,
        id: &RequestId,
    ) -> Option<RequestModel> {
        self.tokens.remove(id);
        let index = self.requests.iter().position(|r| &r.id == id)?;
        self.requests.remove(index)
    }

    pub fn attach_token(
        &mut self,
        id: RequestId,
        token: CancellationToken,
    ) {
        self.tokens.insert(id, token);
    }

    /// Cancel `id`.
    ///
    /// An in-flight request has its token cancelled and resolves through the
    /// pipeline as an `onError` response. A request that was only queued is
    /// dropped without ever reaching the transport. Returns whether this call
    /// cancelled anything, so a repeated cancel yields `false`.
    pub fn cancel(
        &mut self,
        id: &RequestId,
    ) -> bool {
        if let Some(token) = self.tokens.get(id) {
            if token.is_cancelled() {
                return false;
            }
            token.cancel();
            return true;
        }
        match self.requests.iter().position(|r| &r.id == id && !r.sending) {
            Some(index) => {
                self.requests.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns true when the caller must schedule a dispatch tick.
    pub fn schedule_tick(&mut self) -> bool {
        !std::mem::replace(&mut self.tick_scheduled, true)
    }

    pub fn begin_tick(&mut self) {
        self.tick_scheduled = false;
    }

    pub fn is_sending(&self) -> bool {
        self.requests.iter().any(|r| r.sending)
    }

    pub fn contains(
        &self,
        id: &RequestId,
    ) -> bool {
        self.requests.iter().any(|r| &r.id == id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
