use dashmap::DashMap;
use tracing::trace;

use super::RequestModel;
use super::ResponseEnvelope;

/// Responses of eligible requests keyed by [`RequestModel::signature`].
///
/// Entries live until [`ResponseCache::clear`]; there is no expiry.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<String, ResponseEnvelope>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(
        &self,
        signature: &str,
    ) -> bool {
        self.entries.contains_key(signature)
    }

    pub fn get(
        &self,
        signature: &str,
    ) -> Option<ResponseEnvelope> {
        self.entries.get(signature).map(|entry| entry.value().clone())
    }

    /// Store the response of `request` if it is cache eligible.
    ///
    /// Returns true if an entry was written.
    pub fn set(
        &self,
        request: &RequestModel,
    ) -> bool {
        if !request.is_cache_eligible() {
            return false;
        }
        let Some(response) = request.response.clone() else {
            return false;
        };
        trace!(id = %request.id, name = %request.name, "[ResponseCache::set]");
        self.entries.insert(request.signature(), response);
        true
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
