use serde_json::Value;
use tracing::debug;
use tracing::trace;

use super::WatchClass;
use super::Watcher;
use crate::metrics::NOTIFIED_WATCHERS;
use crate::store::any_intersects;
use crate::store::StateStore;
use crate::Atom;

impl Watcher {
    /// True if any changed path intersects any of the watched paths.
    pub fn matches(
        &self,
        changed: &[String],
    ) -> bool {
        any_intersects(changed, &self.paths)
    }

    /// Every predicate must accept the current value at its own path.
    pub fn validators_pass(
        &self,
        store: &StateStore,
    ) -> bool {
        self.validators.iter().all(|(path, predicates)| {
            let value = store.lookup(path).unwrap_or(&Value::Null);
            predicates.iter().all(|predicate| predicate(value))
        })
    }
}

/// Delivers one drained change set to the watchers of one class.
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Invoke the callbacks of every live watcher of `class` whose paths
    /// intersect `changed` and whose validators pass.
    ///
    /// Watchers are visited in registration order. Callbacks run with no lock
    /// held, so they may write state, watch, or stop watching; a watcher
    /// removed by an earlier callback of the same pass is skipped and a
    /// watcher added during the pass waits for the next one. Validators are
    /// evaluated right before the watcher's callbacks, against the state left
    /// by earlier callbacks.
    ///
    /// Returns how many watchers fired.
    pub fn dispatch(
        atom: &Atom,
        class: WatchClass,
        changed: &[String],
    ) -> usize {
        debug!(%class, ?changed, "[NotificationDispatcher] reacting to changes");

        let candidates = atom.inner.registry.read().live(class);
        let mut fired = 0;

        for watcher in candidates {
            if !atom.inner.registry.read().is_live(watcher.id) {
                trace!(id = %watcher.id, "[NotificationDispatcher] removed during pass, skip");
                continue;
            }
            if !watcher.matches(changed) {
                continue;
            }
            let passes = {
                let store = atom.inner.store.read();
                watcher.validators_pass(&store)
            };
            if !passes {
                trace!(id = %watcher.id, "[NotificationDispatcher] validators rejected");
                continue;
            }

            trace!(id = %watcher.id, "[NotificationDispatcher] fire");
            for callback in &watcher.callbacks {
                callback(atom);
            }
            fired += 1;
        }

        NOTIFIED_WATCHERS
            .with_label_values(&[class.as_str()])
            .inc_by(fired as u64);
        fired
    }
}
