//! Declarative definitions registered by name.
//!
//! [`Atom::create`] validates a [`Definition`] and wires it into the
//! reactive core:
//! - api definitions with `on_change` send themselves when it fires
//! - ensurers recompute a store path (ensurer class)
//! - watchers run arbitrary logic (default class)
//! - routers are evaluated whenever `app.router.location` changes
//! - getters are evaluated on demand through [`Atom::getter`]

mod ensurer;
mod getter;
mod router;
mod watcher;

pub use ensurer::*;
pub use getter::*;
pub use router::*;
pub use watcher::*;


use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::api::EndpointDefinition;
use crate::reactive::Validator;
use crate::reactive::WatchClass;
use crate::reactive::WatchSpec;
use crate::reactive::WatcherId;
use crate::store::StorePath;
use crate::Atom;
use crate::CallArgs;
use crate::RegistrationError;
use crate::Result;

/// Computes a value from resolved `from` arguments followed by any extra
/// call-site arguments.
pub type RunFn = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// Watcher body. Receives the context and the resolved `from` arguments.
pub type WatchFn = Arc<dyn Fn(&Atom, Vec<Value>) + Send + Sync>;

/// Trigger of a definition: the paths it reacts to and the validators that
/// must pass.
#[derive(Clone, Default)]
pub struct OnChange {
    pub paths: Vec<String>,
    pub when: BTreeMap<String, Vec<Validator>>,
}

impl OnChange {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            when: BTreeMap::new(),
        }
    }

    pub fn when(
        mut self,
        path: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.when
            .entry(path.into())
            .or_default()
            .push(Arc::new(predicate));
        self
    }

    pub(crate) fn to_watch_spec(
        &self,
        class: WatchClass,
    ) -> WatchSpec {
        WatchSpec::new(self.paths.iter().cloned())
            .validators(self.when.clone())
            .class(class)
    }
}

impl fmt::Debug for OnChange {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("OnChange")
            .field("paths", &self.paths)
            .field("when", &self.when.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Definition {
    Api(EndpointDefinition),
    Ensurer(EnsurerDefinition),
    Getter(GetterDefinition),
    Router(RouterDefinition),
    Watcher(WatcherDefinition),
}

impl Definition {
    pub fn kind(&self) -> DefinitionKind {
        match self {
            Definition::Api(_) => DefinitionKind::Api,
            Definition::Ensurer(_) => DefinitionKind::Ensurer,
            Definition::Getter(_) => DefinitionKind::Getter,
            Definition::Router(_) => DefinitionKind::Router,
            Definition::Watcher(_) => DefinitionKind::Watcher,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Api,
    Ensurer,
    Getter,
    Router,
    Watcher,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Api => "api",
            DefinitionKind::Ensurer => "ensurer",
            DefinitionKind::Getter => "getter",
            DefinitionKind::Router => "router",
            DefinitionKind::Watcher => "watcher",
        }
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered definitions by kind and name.
///
/// Routers keep registration order so their store writes happen in a stable
/// order.
#[derive(Debug, Default)]
pub(crate) struct Definitions {
    endpoints: HashMap<String, Arc<EndpointDefinition>>,
    ensurers: HashMap<String, Arc<EnsurerDefinition>>,
    getters: HashMap<String, Arc<GetterDefinition>>,
    routers: IndexMap<String, Arc<RouterDefinition>>,
    watchers: HashMap<String, Arc<WatcherDefinition>>,
    /// Watchers registered on behalf of a definition
    watch_ids: HashMap<(DefinitionKind, String), WatcherId>,
}

impl Definitions {
    pub(crate) fn endpoint(
        &self,
        name: &str,
    ) -> Option<Arc<EndpointDefinition>> {
        self.endpoints.get(name).cloned()
    }

    pub(crate) fn ensurer(
        &self,
        name: &str,
    ) -> Option<Arc<EnsurerDefinition>> {
        self.ensurers.get(name).cloned()
    }

    pub(crate) fn getter(
        &self,
        name: &str,
    ) -> Option<Arc<GetterDefinition>> {
        self.getters.get(name).cloned()
    }

    pub(crate) fn watcher(
        &self,
        name: &str,
    ) -> Option<Arc<WatcherDefinition>> {
        self.watchers.get(name).cloned()
    }

    pub(crate) fn routers(&self) -> Vec<(String, Arc<RouterDefinition>)> {
        self.routers
            .iter()
            .map(|(name, router)| (name.clone(), router.clone()))
            .collect()
    }

    /// Store `definition` under `name`. Returns true if it replaced an
    /// existing definition of the same kind.
    fn insert(
        &mut self,
        name: &str,
        definition: Definition,
    ) -> bool {
        let name = name.to_string();
        match definition {
            Definition::Api(d) => self.endpoints.insert(name, Arc::new(d)).is_some(),
            Definition::Ensurer(d) => self.ensurers.insert(name, Arc::new(d)).is_some(),
            Definition::Getter(d) => self.getters.insert(name, Arc::new(d)).is_some(),
            Definition::Router(d) => self.routers.insert(name, Arc::new(d)).is_some(),
            Definition::Watcher(d) => self.watchers.insert(name, Arc::new(d)).is_some(),
        }
    }
}

impl Atom {
    /// Register `definition` under `name`.
    ///
    /// A definition of the same kind and name is replaced and the watcher
    /// registered for it is stopped.
    ///
    /// # Errors
    /// `RegistrationError` if the name is empty or the definition is
    /// malformed. Errors are logged as well; nothing is registered then.
    pub fn create(
        &self,
        name: &str,
        definition: Definition,
    ) -> Result<()> {
        let kind = definition.kind();
        if let Err(e) = check_definition(name, &definition) {
            error!("[Atom::create] {}", e);
            return Err(e.into());
        }

        let (replaced, previous_watch) = {
            let mut definitions = self.inner.definitions.write();
            let replaced = definitions.insert(name, definition.clone());
            let previous_watch = definitions.watch_ids.remove(&(kind, name.to_string()));
            (replaced, previous_watch)
        };
        if replaced {
            warn!(%kind, name, "[Atom::create] replacing existing definition");
        }
        if let Some(id) = previous_watch {
            self.stop_watching(&[id]);
        }

        let spec = match &definition {
            Definition::Api(endpoint) => endpoint.on_change.as_ref().map(|on_change| {
                let name = name.to_string();
                on_change
                    .to_watch_spec(WatchClass::Default)
                    .callback(move |atom| {
                        if let Err(e) = atom.send(&name, CallArgs::default()) {
                            error!(name = %name, "[Atom::create] on_change send: {}", e);
                        }
                    })
            }),
            Definition::Ensurer(ensurer) => {
                let name = name.to_string();
                Some(
                    ensurer
                        .on_change
                        .to_watch_spec(WatchClass::Ensurer)
                        .callback(move |atom| atom.run_ensurer(&name)),
                )
            }
            Definition::Watcher(watcher) => {
                let name = name.to_string();
                Some(
                    watcher
                        .on_change
                        .to_watch_spec(WatchClass::Default)
                        .callback(move |atom| atom.run_watcher(&name)),
                )
            }
            Definition::Getter(_) | Definition::Router(_) => None,
        };

        if let Some(spec) = spec {
            let id = self.watch(spec)?;
            self.inner
                .definitions
                .write()
                .watch_ids
                .insert((kind, name.to_string()), id);
        }

        if kind == DefinitionKind::Router && self.is_initialized() {
            self.run_routers();
        }

        info!(%kind, name, "[Atom::create] created");
        Ok(())
    }
}

/// Populate `from` and spread it into an argument list: an array gives its
/// items, `null` gives no arguments, anything else a single argument.
pub(crate) fn resolve_args(
    atom: &Atom,
    from: &Value,
) -> Vec<Value> {
    match atom.populate(from) {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Run `run` over the resolved arguments followed by `extra`. Without a
/// function the first argument is the result.
pub(crate) fn evaluate(
    atom: &Atom,
    from: &Value,
    run: Option<&RunFn>,
    extra: Vec<Value>,
) -> Value {
    let mut args = resolve_args(atom, from);
    match run {
        Some(run) => {
            args.extend(extra);
            run(args)
        }
        None => args.into_iter().next().unwrap_or(Value::Null),
    }
}

fn check_definition(
    name: &str,
    definition: &Definition,
) -> std::result::Result<(), RegistrationError> {
    let kind = definition.kind().as_str();
    if name.trim().is_empty() {
        return Err(RegistrationError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }

    let invalid = |property: &'static str, hint: String| RegistrationError::InvalidProperty {
        kind,
        name: name.to_string(),
        property,
        hint,
    };
    let check_path = |property: &'static str, path: &str| {
        StorePath::parse(path)
            .map(|_| ())
            .map_err(|e| invalid(property, e.to_string()))
    };
    let check_on_change = |on_change: &OnChange| -> std::result::Result<(), RegistrationError> {
        if on_change.paths.is_empty() {
            return Err(invalid("onChange", "\"onChange\" should list at least one path.".into()));
        }
        for path in on_change.paths.iter().chain(on_change.when.keys()) {
            check_path("onChange", path)?;
        }
        if on_change.when.values().any(Vec::is_empty) {
            return Err(invalid(
                "onChange",
                "every \"when\" path needs at least one predicate.".into(),
            ));
        }
        Ok(())
    };

    match definition {
        Definition::Api(endpoint) => {
            if endpoint.path.trim().is_empty() {
                return Err(RegistrationError::MissingProperty {
                    kind,
                    name: name.to_string(),
                    property: "path",
                });
            }
            if let Some(on_change) = &endpoint.on_change {
                check_on_change(on_change)?;
            }
            for mapper in endpoint.handlers.values().flatten() {
                check_path("handlers", &mapper.update)?;
            }
            for parser in endpoint.parsers.values().flatten() {
                check_path("parsers", &parser.update)?;
            }
            for path in endpoint.flags.values() {
                check_path("flags", path)?;
            }
        }
        Definition::Ensurer(ensurer) => {
            check_on_change(&ensurer.on_change)?;
            check_path("to", &ensurer.to)?;
        }
        Definition::Getter(_) => {}
        Definition::Router(router) => {
            if !router.url_pattern.starts_with('/') {
                return Err(invalid(
                    "urlPattern",
                    "\"urlPattern\" should be a string like \"/user\" or \"/user/:userId\".".into(),
                ));
            }
            check_path("update", &router.update)?;
        }
        Definition::Watcher(watcher) => {
            check_on_change(&watcher.on_change)?;
        }
    }

    debug!(kind, name, "[check_definition] ok");
    Ok(())
}
