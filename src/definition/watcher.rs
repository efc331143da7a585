use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::error;

use super::resolve_args;
use super::OnChange;
use super::WatchFn;
use crate::Atom;

/// Runs `run(atom, populate(from))` whenever `on_change` fires.
#[derive(Clone)]
pub struct WatcherDefinition {
    pub on_change: OnChange,
    pub from: Value,
    pub run: WatchFn,
}

impl WatcherDefinition {
    pub fn new(
        on_change: OnChange,
        run: impl Fn(&Atom, Vec<Value>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_change,
            from: Value::Null,
            run: Arc::new(run),
        }
    }

    pub fn from(
        mut self,
        from: Value,
    ) -> Self {
        self.from = from;
        self
    }
}

impl fmt::Debug for WatcherDefinition {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("WatcherDefinition")
            .field("on_change", &self.on_change)
            .field("from", &self.from)
            .finish()
    }
}

impl Atom {
    pub(crate) fn run_watcher(
        &self,
        name: &str,
    ) {
        let Some(watcher) = self.inner.definitions.read().watcher(name) else {
            error!(name, "[Atom::run_watcher] unknown watcher");
            return;
        };

        debug!(name, "[Atom::run_watcher]");
        let args = resolve_args(self, &watcher.from);
        (watcher.run)(self, args);
    }
}
