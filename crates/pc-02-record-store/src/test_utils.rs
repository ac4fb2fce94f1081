//! Store wrappers for exercising conflict handling in dependent crates.

use crate::ports::outbound::{BatchOperation, KVStoreError, KeyValueStore, StoredValue};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type CommitHook<S> = Box<dyn FnOnce(&S) + Send>;

/// Wraps a store and lets a test interleave a competing writer.
///
/// Each queued hook runs against the inner store immediately before the next
/// batch write, so the wrapped caller sees exactly the race the hook stages.
pub struct ContendedStore<S: KeyValueStore> {
    inner: Arc<S>,
    hooks: Mutex<VecDeque<CommitHook<S>>>,
    forced_conflicts: AtomicUsize,
    batch_writes: AtomicUsize,
}

impl<S: KeyValueStore> ContendedStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            hooks: Mutex::new(VecDeque::new()),
            forced_conflicts: AtomicUsize::new(0),
            batch_writes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Run `hook` against the inner store just before the next batch write.
    pub fn before_next_write(&self, hook: impl FnOnce(&S) + Send + 'static) {
        self.hooks.lock().push_back(Box::new(hook));
    }

    /// Reject the next `n` batch writes with a conflict, without touching data.
    pub fn force_conflicts(&self, n: usize) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// Batch writes attempted so far (including rejected ones).
    pub fn batch_writes(&self) -> usize {
        self.batch_writes.load(Ordering::SeqCst)
    }
}

impl<S: KeyValueStore> KeyValueStore for ContendedStore<S> {
    fn get(&self, key: &[u8]) -> Result<Option<StoredValue>, KVStoreError> {
        self.inner.get(key)
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        self.batch_writes.fetch_add(1, Ordering::SeqCst);

        let hook = self.hooks.lock().pop_front();
        if let Some(hook) = hook {
            hook(self.inner.as_ref());
        }

        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Err(KVStoreError::Conflict {
                key: "forced".to_string(),
            });
        }

        self.inner.atomic_batch_write(operations)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, StoredValue)>, KVStoreError> {
        self.inner.prefix_scan(prefix)
    }
}
