use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::error;

use super::evaluate;
use super::OnChange;
use super::RunFn;
use crate::Atom;

/// Keeps `to` equal to `run(populate(from))` whenever `on_change` fires.
///
/// Registered in the ensurer class, so derived state is written before plain
/// watchers observe the same flush.
#[derive(Clone)]
pub struct EnsurerDefinition {
    pub on_change: OnChange,
    pub from: Value,
    pub run: Option<RunFn>,
    pub to: String,
}

impl EnsurerDefinition {
    /// Copy the value(s) at `from` into `to`. Add a function with
    /// [`EnsurerDefinition::run`].
    pub fn new(
        on_change: OnChange,
        from: Value,
        to: impl Into<String>,
    ) -> Self {
        Self {
            on_change,
            from,
            run: None,
            to: to.into(),
        }
    }

    pub fn run(
        mut self,
        run: impl Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.run = Some(Arc::new(run));
        self
    }
}

impl fmt::Debug for EnsurerDefinition {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("EnsurerDefinition")
            .field("on_change", &self.on_change)
            .field("from", &self.from)
            .field("run", &self.run.is_some())
            .field("to", &self.to)
            .finish()
    }
}

impl Atom {
    pub(crate) fn run_ensurer(
        &self,
        name: &str,
    ) {
        let Some(ensurer) = self.inner.definitions.read().ensurer(name) else {
            error!(name, "[Atom::run_ensurer] unknown ensurer");
            return;
        };

        let result = evaluate(self, &ensurer.from, ensurer.run.as_ref(), Vec::new());
        debug!(name, to = %ensurer.to, ?result, "[Atom::run_ensurer]");
        if let Err(e) = self.set(&ensurer.to, result) {
            error!(name, "[Atom::run_ensurer] {}", e);
        }
    }
}
