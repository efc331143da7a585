//! The application context.
//!
//! An [`Atom`] owns the state store, the change scheduler, the watcher
//! registry, the registered definitions and the request pipeline. It is a
//! cheap handle (`Arc` inside) passed to every callback.
//!
//! Reactions run on the event loop driven by [`Atom::run`] or
//! [`Atom::run_until_idle`]: a non-silent write schedules one `Flush` event,
//! queueing a request schedules one `DispatchTick`, and every transport call
//! comes back as a `Responded` event.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::constants::API_ONLINE_PATH;
use crate::constants::APP_READY_PATH;
use crate::definition::Definitions;
use crate::definition::PatternMatcher;
use crate::definition::RouteMatcher;
use crate::metrics::FLUSH_COUNTER;
use crate::reactive::validators;
use crate::reactive::ChangeScheduler;
use crate::reactive::NotificationDispatcher;
use crate::reactive::WatchClass;
use crate::reactive::WatchSpec;
use crate::reactive::WatcherId;
use crate::reactive::WatcherRegistry;
use crate::store::StateStore;
use crate::AtomConfig;
use crate::DispatchQueue;
use crate::Error;
use crate::RequestId;
use crate::ResponseCache;
use crate::ResponseEnvelope;
use crate::Result;
use crate::Transport;

#[derive(Debug)]
pub(crate) enum AtomEvent {
    /// Drain pending changes
    Flush,
    /// Try to send the next queued request
    DispatchTick,
    /// A transport call resolved
    Responded {
        id: RequestId,
        envelope: ResponseEnvelope,
    },
}

/// Options for [`Atom::set_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// Write without notifying watchers
    pub silent: bool,
}

pub(crate) struct AtomInner {
    pub(crate) config: AtomConfig,
    pub(crate) store: RwLock<StateStore>,
    pub(crate) scheduler: Mutex<ChangeScheduler>,
    pub(crate) registry: RwLock<WatcherRegistry>,
    pub(crate) definitions: RwLock<Definitions>,
    pub(crate) queue: Mutex<DispatchQueue>,
    pub(crate) cache: ResponseCache,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) route_matcher: Arc<dyn RouteMatcher>,

    pub(crate) request_seq: AtomicU64,
    /// Transport calls whose `Responded` event was not handled yet
    pub(crate) in_flight: AtomicUsize,
    initialized: AtomicBool,

    pub(crate) events_tx: mpsc::UnboundedSender<AtomEvent>,
    events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<AtomEvent>>,
}

/// Handle to one application context. Clones share the same state.
#[derive(Clone)]
pub struct Atom {
    pub(crate) inner: Arc<AtomInner>,
}

impl std::fmt::Debug for Atom {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Atom")
            .field("config", &self.inner.config)
            .field("watchers", &self.inner.registry.read().len())
            .field("queued", &self.inner.queue.lock().len())
            .field("cached", &self.inner.cache.len())
            .finish()
    }
}

/// Builder for [`Atom`] when the defaults need replacing.
///
/// # Examples
/// ```ignore
/// let atom = AtomBuilder::new(config, Arc::new(HttpTransport::default()))
///     .route_matcher(Arc::new(MyMatcher))
///     .build();
/// ```
pub struct AtomBuilder {
    config: AtomConfig,
    transport: Arc<dyn Transport>,
    route_matcher: Arc<dyn RouteMatcher>,
}

impl AtomBuilder {
    pub fn new(
        config: AtomConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            transport,
            route_matcher: Arc::new(PatternMatcher),
        }
    }

    pub fn route_matcher(
        mut self,
        route_matcher: Arc<dyn RouteMatcher>,
    ) -> Self {
        self.route_matcher = route_matcher;
        self
    }

    pub fn build(self) -> Atom {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut store = StateStore::new();
        if let Err(e) = store.set(API_ONLINE_PATH, Value::Bool(self.config.api.initially_online)) {
            error!("[AtomBuilder::build] {}", e);
        }

        Atom {
            inner: Arc::new(AtomInner {
                config: self.config,
                store: RwLock::new(store),
                scheduler: Mutex::new(ChangeScheduler::new()),
                registry: RwLock::new(WatcherRegistry::new()),
                definitions: RwLock::new(Definitions::default()),
                queue: Mutex::new(DispatchQueue::new()),
                cache: ResponseCache::new(),
                transport: self.transport,
                route_matcher: self.route_matcher,
                request_seq: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                initialized: AtomicBool::new(false),
                events_tx,
                events_rx: tokio::sync::Mutex::new(events_rx),
            }),
        }
    }
}

impl Atom {
    /// New context with the default route matcher. `api.online` starts as
    /// `config.api.initially_online`, written without notification.
    pub fn new(
        config: AtomConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        AtomBuilder::new(config, transport).build()
    }

    pub fn settings(&self) -> &AtomConfig {
        &self.inner.config
    }

    /// Register the connectivity watcher, start the router and set
    /// `app.ready`. Calling it again is a no-op.
    pub fn init(&self) -> Result<()> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            warn!("[Atom::init] already initialized");
            return Ok(());
        }

        self.watch(
            WatchSpec::new([API_ONLINE_PATH])
                .validate(API_ONLINE_PATH, validators::is_true)
                .callback(|atom| {
                    debug!("[Atom] back online, resume dispatching");
                    atom.schedule_dispatch();
                }),
        )?;
        self.start_router()?;
        self.set(APP_READY_PATH, true)?;

        info!("[Atom::init] ready");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    // -
    // State

    /// Copy of the value at `path`.
    pub fn get(
        &self,
        path: &str,
    ) -> Option<Value> {
        self.inner.store.read().get(path)
    }

    pub fn get_or(
        &self,
        path: &str,
        default: Value,
    ) -> Value {
        self.inner.store.read().get_or(path, default)
    }

    pub fn get_values<S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Vec<Value> {
        self.inner.store.read().get_values(paths)
    }

    /// Resolve `#path` templates against the current state.
    pub fn populate(
        &self,
        template: &Value,
    ) -> Value {
        self.inner.store.read().populate(template)
    }

    /// Copy of the whole state tree.
    pub fn snapshot(&self) -> Value {
        self.inner.store.read().snapshot()
    }

    /// Write `value` at `path` and notify watchers on the next flush.
    ///
    /// Returns whether the state changed; writing a deep-equal value does
    /// nothing.
    pub fn set(
        &self,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<bool> {
        self.set_with(path, value, SetOptions::default())
    }

    pub fn set_with(
        &self,
        path: &str,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> Result<bool> {
        let changed = self.inner.store.write().set(path, value.into())?;
        if !changed {
            trace!(path, "[Atom::set] unchanged");
            return Ok(false);
        }

        trace!(path, silent = options.silent, "[Atom::set] changed");
        if !options.silent {
            self.notify(path);
        }
        Ok(true)
    }

    // -
    // Watchers

    /// Register a watcher.
    ///
    /// # Errors
    /// `WatchError` when paths, validators or callbacks are missing or
    /// malformed. The error is logged as well.
    pub fn watch(
        &self,
        spec: WatchSpec,
    ) -> Result<WatcherId> {
        self.inner.registry.write().register(spec).map_err(|e| {
            error!("[Atom::watch] {}", e);
            e.into()
        })
    }

    /// Stop the given watchers. Unknown ids are ignored.
    pub fn stop_watching(
        &self,
        ids: &[WatcherId],
    ) -> usize {
        self.inner.registry.write().stop_watching(ids)
    }

    fn notify(
        &self,
        path: &str,
    ) {
        if self.inner.scheduler.lock().notify(path) {
            self.emit(AtomEvent::Flush);
        }
    }

    /// Drain pending changes, ensurer class first.
    ///
    /// Each class is drained until empty since callbacks may record more
    /// changes of the same class. After `scheduler.max_drain_passes` passes
    /// the remainder is left for the next flush.
    pub(crate) fn flush(&self) {
        {
            let mut scheduler = self.inner.scheduler.lock();
            scheduler.begin_flush();
            if WatchClass::FLUSH_ORDER
                .iter()
                .all(|class| scheduler.pending(*class).is_empty())
            {
                return;
            }
        }
        FLUSH_COUNTER.inc();

        let max_passes = self.inner.config.scheduler.max_drain_passes;
        for class in WatchClass::FLUSH_ORDER {
            let mut passes = 0;
            loop {
                let changed = self.inner.scheduler.lock().take(class);
                if changed.is_empty() {
                    break;
                }

                if passes >= max_passes {
                    warn!(
                        %class,
                        max_passes,
                        pending = changed.len(),
                        "[Atom::flush] drain limit reached, deferring remaining changes"
                    );
                    let reschedule = {
                        let mut scheduler = self.inner.scheduler.lock();
                        scheduler.requeue(class, changed);
                        scheduler.reschedule()
                    };
                    if reschedule {
                        self.emit(AtomEvent::Flush);
                    }
                    break;
                }

                passes += 1;
                NotificationDispatcher::dispatch(self, class, &changed);
            }
        }
    }

    // -
    // Event loop

    pub(crate) fn emit(
        &self,
        event: AtomEvent,
    ) {
        if let Err(e) = self.inner.events_tx.send(event) {
            error!("[Atom::emit] event loop closed: {:?}", e.0);
        }
    }

    fn handle_event(
        &self,
        event: AtomEvent,
    ) {
        trace!(?event, "[Atom::handle_event]");
        match event {
            AtomEvent::Flush => self.flush(),
            AtomEvent::DispatchTick => self.handle_requests(),
            AtomEvent::Responded { id, envelope } => {
                self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.handle_response(id, envelope);
            }
        }
    }

    /// Process events until `shutdown` fires.
    ///
    /// # Errors
    /// `Error::EventLoopBusy` if another task is already driving the loop.
    pub async fn run(
        &self,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        let mut events = self
            .inner
            .events_rx
            .try_lock()
            .map_err(|_| Error::EventLoopBusy)?;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("[Atom::run] shutdown signal received.");
                    return Ok(());
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => return Err(Error::EventLoopClosed),
                },
            }
        }
    }

    /// Process events until nothing is pending and no transport call is in
    /// flight.
    ///
    /// # Errors
    /// `Error::EventLoopBusy` if another task is already driving the loop.
    pub async fn run_until_idle(&self) -> Result<()> {
        let mut events = self
            .inner
            .events_rx
            .try_lock()
            .map_err(|_| Error::EventLoopBusy)?;

        loop {
            match events.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Empty) => {
                    if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                        return Ok(());
                    }
                    match events.recv().await {
                        Some(event) => self.handle_event(event),
                        None => return Err(Error::EventLoopClosed),
                    }
                }
                Err(TryRecvError::Disconnected) => return Err(Error::EventLoopClosed),
            }
        }
    }
}
