use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::Callback;
use super::Validator;
use super::WatchClass;
use super::WatchSpec;
use super::WatcherId;
use crate::store::StorePath;
use crate::WatchError;

/// A registered subscription.
pub struct Watcher {
    pub id: WatcherId,
    pub paths: Vec<String>,
    pub validators: BTreeMap<String, Vec<Validator>>,
    pub callbacks: Vec<Callback>,
    pub class: WatchClass,
}

impl fmt::Debug for Watcher {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("paths", &self.paths)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .field("callbacks", &self.callbacks.len())
            .field("class", &self.class)
            .finish()
    }
}

/// Slot-based watcher storage.
///
/// The slot index is the watcher id. Removal leaves a tombstone (`None`) so
/// ids are never reused and registration order is preserved.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    slots: Vec<Option<Arc<Watcher>>>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `spec` and store it.
    pub fn register(
        &mut self,
        spec: WatchSpec,
    ) -> std::result::Result<WatcherId, WatchError> {
        Self::check(&spec)?;

        let id = WatcherId(self.slots.len() as u64);
        let watcher = Watcher {
            id,
            paths: spec.paths,
            validators: spec.validators,
            callbacks: spec.callbacks,
            class: spec.class,
        };
        debug!(%id, paths = ?watcher.paths, class = %watcher.class, "[WatcherRegistry] watch");
        self.slots.push(Some(Arc::new(watcher)));
        Ok(id)
    }

    /// Tombstone the given watchers. Unknown or already removed ids are
    /// ignored. Returns how many watchers were removed.
    pub fn stop_watching(
        &mut self,
        ids: &[WatcherId],
    ) -> usize {
        let mut removed = 0;
        for id in ids {
            if let Some(slot) = self.slots.get_mut(id.0 as usize) {
                if slot.take().is_some() {
                    debug!(%id, "[WatcherRegistry] stop watching");
                    removed += 1;
                }
            }
        }
        removed
    }

    pub fn is_live(
        &self,
        id: WatcherId,
    ) -> bool {
        matches!(self.slots.get(id.0 as usize), Some(Some(_)))
    }

    /// Live watchers of `class`, in registration order.
    pub fn live(
        &self,
        class: WatchClass,
    ) -> Vec<Arc<Watcher>> {
        self.slots
            .iter()
            .flatten()
            .filter(|w| w.class == class)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(spec: &WatchSpec) -> std::result::Result<(), WatchError> {
        if spec.paths.is_empty() {
            return Err(WatchError::InvalidPaths("[]".into()));
        }
        if let Some(bad) = spec.paths.iter().find(|p| StorePath::parse(p).is_err()) {
            return Err(WatchError::InvalidPaths(format!("{:?}", bad)));
        }

        for (path, predicates) in &spec.validators {
            if StorePath::parse(path).is_err() {
                return Err(WatchError::InvalidValidators(format!("bad path {:?}", path)));
            }
            if predicates.is_empty() {
                return Err(WatchError::InvalidValidators(format!(
                    "no predicate for {:?}",
                    path
                )));
            }
        }

        if spec.callbacks.is_empty() {
            return Err(WatchError::InvalidCallbacks);
        }
        Ok(())
    }
}
