use indexmap::IndexSet;
use tracing::trace;

use super::WatchClass;

/// Pending changes, one ordered set per propagation class.
///
/// `notify` coalesces every change made during one turn onto a single pending
/// flush: it only asks the caller to schedule a flush when none is pending.
/// Duplicate paths within a flush collapse, first insertion wins the order.
#[derive(Debug, Default)]
pub struct ChangeScheduler {
    ensurer: IndexSet<String>,
    default: IndexSet<String>,
    flush_scheduled: bool,
}

impl ChangeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` as changed for every class.
    ///
    /// Returns true when the caller must schedule a flush (none was pending).
    pub fn notify(
        &mut self,
        path: &str,
    ) -> bool {
        for class in WatchClass::FLUSH_ORDER {
            self.bucket_mut(class).insert(path.to_string());
        }
        if self.flush_scheduled {
            trace!(path, "[ChangeScheduler::notify] flush already pending");
            false
        } else {
            self.flush_scheduled = true;
            true
        }
    }

    /// Mark the pending flush as started. Changes recorded from now on
    /// schedule a new flush.
    pub fn begin_flush(&mut self) {
        self.flush_scheduled = false;
    }

    /// Atomically drain the bucket of `class`.
    pub fn take(
        &mut self,
        class: WatchClass,
    ) -> Vec<String> {
        std::mem::take(self.bucket_mut(class)).into_iter().collect()
    }

    /// Put paths back at the front of a bucket, ahead of anything recorded
    /// since they were taken.
    pub fn requeue(
        &mut self,
        class: WatchClass,
        paths: Vec<String>,
    ) {
        let bucket = self.bucket_mut(class);
        let newer = std::mem::take(bucket);
        bucket.extend(paths);
        bucket.extend(newer);
    }

    pub fn pending(
        &self,
        class: WatchClass,
    ) -> &IndexSet<String> {
        match class {
            WatchClass::Ensurer => &self.ensurer,
            WatchClass::Default => &self.default,
        }
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    /// Request a flush for paths that were requeued. Returns true when the
    /// caller must schedule it.
    pub fn reschedule(&mut self) -> bool {
        !std::mem::replace(&mut self.flush_scheduled, true)
    }

    fn bucket_mut(
        &mut self,
        class: WatchClass,
    ) -> &mut IndexSet<String> {
        match class {
            WatchClass::Ensurer => &mut self.ensurer,
            WatchClass::Default => &mut self.default,
        }
    }
}
