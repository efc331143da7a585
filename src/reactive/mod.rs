//! Change propagation: pending-change scheduling, watcher registry and
//! notification dispatch.
//!
//! A non-silent [`crate::Atom::set`] records the changed path in both
//! propagation classes of the [`ChangeScheduler`] and schedules one flush on
//! the event loop. The flush drains the [`WatchClass::Ensurer`] bucket first,
//! then [`WatchClass::Default`], handing each drained set to the
//! [`NotificationDispatcher`].

mod dispatcher;
mod registry;
mod scheduler;
pub mod validators;

pub use dispatcher::*;
pub use registry::*;
pub use scheduler::*;


use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::Atom;

/// Watcher callback. Receives the owning context so it can read and write
/// state, register watchers or send requests.
pub type Callback = Arc<dyn Fn(&Atom) + Send + Sync>;

/// Predicate over the current value at a path (`null` when missing).
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Propagation class of a watcher.
///
/// Ensurers derive state from raw inputs and are drained before plain
/// watchers, so plain watchers observe derived state that is already up to
/// date. Callers are responsible for registering with the right class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WatchClass {
    #[default]
    Default,
    Ensurer,
}

impl WatchClass {
    /// Order in which classes are drained within one flush.
    pub const FLUSH_ORDER: [WatchClass; 2] = [WatchClass::Ensurer, WatchClass::Default];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchClass::Default => "default",
            WatchClass::Ensurer => "ensurer",
        }
    }
}

impl fmt::Display for WatchClass {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Watcher identity. Ids grow monotonically and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(pub(crate) u64);

impl fmt::Display for WatcherId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}{}", crate::constants::WATCHER_ID_PREFIX, self.0)
    }
}

/// Everything needed to register a watcher.
///
/// # Examples
/// ```ignore
/// let id = atom.watch(
///     WatchSpec::new(["user.jwt"])
///         .validate("user.jwt", validators::is_string)
///         .callback(|atom| { /* ... */ }),
/// )?;
/// ```
#[derive(Clone, Default)]
pub struct WatchSpec {
    pub(crate) paths: Vec<String>,
    pub(crate) validators: BTreeMap<String, Vec<Validator>>,
    pub(crate) callbacks: Vec<Callback>,
    pub(crate) class: WatchClass,
}

impl WatchSpec {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Add a predicate over the current value at `path`.
    pub fn validate(
        mut self,
        path: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validators
            .entry(path.into())
            .or_default()
            .push(Arc::new(predicate));
        self
    }

    /// Merge a whole validator map, as carried by declarative definitions.
    pub fn validators(
        mut self,
        validators: BTreeMap<String, Vec<Validator>>,
    ) -> Self {
        for (path, predicates) in validators {
            self.validators.entry(path).or_default().extend(predicates);
        }
        self
    }

    pub fn callback(
        mut self,
        callback: impl Fn(&Atom) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.push(Arc::new(callback));
        self
    }

    pub fn class(
        mut self,
        class: WatchClass,
    ) -> Self {
        self.class = class;
        self
    }
}

impl fmt::Debug for WatchSpec {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("WatchSpec")
            .field("paths", &self.paths)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .field("callbacks", &self.callbacks.len())
            .field("class", &self.class)
            .finish()
    }
}
