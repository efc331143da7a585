use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::error;

use super::evaluate;
use super::RunFn;
use crate::Atom;

/// On-demand derived value: `run(populate(from)..., extra...)`.
#[derive(Clone, Default)]
pub struct GetterDefinition {
    pub from: Value,
    pub run: Option<RunFn>,
}

impl GetterDefinition {
    pub fn new(from: Value) -> Self {
        Self { from, run: None }
    }

    pub fn run(
        mut self,
        run: impl Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.run = Some(Arc::new(run));
        self
    }
}

impl fmt::Debug for GetterDefinition {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("GetterDefinition")
            .field("from", &self.from)
            .field("run", &self.run.is_some())
            .finish()
    }
}

impl Atom {
    /// Evaluate the getter `name`. `extra` is appended after the arguments
    /// read from the store.
    ///
    /// Returns `None` (and logs) if no getter is registered under `name`.
    pub fn getter(
        &self,
        name: &str,
        extra: Vec<Value>,
    ) -> Option<Value> {
        let Some(getter) = self.inner.definitions.read().getter(name) else {
            error!(name, "[Atom::getter] invalid getter name");
            return None;
        };

        let result = evaluate(self, &getter.from, getter.run.as_ref(), extra);
        debug!(name, ?result, "[Atom::getter]");
        Some(result)
    }
}
