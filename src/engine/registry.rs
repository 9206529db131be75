//! In-flight process bookkeeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::InvocationId;

/// Cancellation signal shared between a handle and its invocation loop.
///
/// Setting the flag is a request; the loop observes it on its next poll,
/// kills the process, and resolves with `Cancelled`. Setting it after
/// resolution has no effect.
#[derive(Debug, Default)]
pub(crate) struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub(crate) fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One registered in-flight invocation.
#[derive(Debug)]
struct Entry {
    /// OS process id, filled in once the spawn succeeds.
    pid: Option<u32>,
    cancel: Arc<CancelFlag>,
    registered_at: Instant,
}

/// Engine-owned map of in-flight invocations.
///
/// Exists solely to support cancellation and introspection of live
/// invocations; entries are inserted at dispatch and removed at resolution.
/// Scoped to the engine instance, never process-wide. Safe under concurrent
/// insert/remove from any number of in-flight invocations.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    inner: RwLock<HashMap<InvocationId, Entry>>,
}

impl ProcessRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an invocation at dispatch time, before the spawn attempt.
    pub(crate) fn insert(&self, id: InvocationId, cancel: Arc<CancelFlag>) {
        let entry = Entry {
            pid: None,
            cancel,
            registered_at: Instant::now(),
        };
        self.write().insert(id, entry);
    }

    /// Record the OS pid once the process has been spawned.
    pub(crate) fn set_pid(&self, id: &InvocationId, pid: u32) {
        if let Some(entry) = self.write().get_mut(id) {
            entry.pid = Some(pid);
        }
    }

    /// Remove an invocation at resolution.
    ///
    /// Returns whether the invocation was still registered.
    pub(crate) fn remove(&self, id: &InvocationId) -> bool {
        self.write().remove(id).is_some()
    }

    /// Request cancellation of a registered invocation.
    ///
    /// Returns `true` if the invocation was found and signalled, `false` if
    /// it already resolved (or never existed).
    pub fn cancel(&self, id: &InvocationId) -> bool {
        match self.read().get(id) {
            Some(entry) => {
                entry.cancel.set();
                true
            }
            None => false,
        }
    }

    /// Whether an invocation is still in flight.
    pub fn contains(&self, id: &InvocationId) -> bool {
        self.read().contains_key(id)
    }

    /// OS pid of a registered invocation, if the process has been spawned.
    pub fn pid(&self, id: &InvocationId) -> Option<u32> {
        self.read().get(id).and_then(|e| e.pid)
    }

    /// Time elapsed since an invocation was registered.
    pub fn age(&self, id: &InvocationId) -> Option<std::time::Duration> {
        self.read().get(id).map(|e| e.registered_at.elapsed())
    }

    /// Number of in-flight invocations.
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// IDs of all in-flight invocations.
    pub fn list_ids(&self) -> Vec<InvocationId> {
        self.read().keys().copied().collect()
    }

    // A poisoned lock means an invocation panicked mid-update; the map
    // itself is still structurally sound and the engine must stay usable,
    // so recover the guard instead of propagating.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<InvocationId, Entry>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<InvocationId, Entry>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag() -> Arc<CancelFlag> {
        Arc::new(CancelFlag::default())
    }

    #[test]
    fn test_insert_and_remove() {
        let registry = ProcessRegistry::new();
        let id = InvocationId::new();

        registry.insert(id, flag());
        assert!(registry.contains(&id));
        assert_eq!(registry.count(), 1);

        assert!(registry.remove(&id));
        assert!(!registry.contains(&id));
        assert_eq!(registry.count(), 0);

        // Second remove is a no-op
        assert!(!registry.remove(&id));
    }

    #[test]
    fn test_set_pid() {
        let registry = ProcessRegistry::new();
        let id = InvocationId::new();

        registry.insert(id, flag());
        assert_eq!(registry.pid(&id), None);

        registry.set_pid(&id, 4242);
        assert_eq!(registry.pid(&id), Some(4242));
    }

    #[test]
    fn test_cancel_signals_flag() {
        let registry = ProcessRegistry::new();
        let id = InvocationId::new();
        let cancel = flag();

        registry.insert(id, Arc::clone(&cancel));
        assert!(!cancel.is_set());

        assert!(registry.cancel(&id));
        assert!(cancel.is_set());
    }

    #[test]
    fn test_cancel_after_resolution() {
        let registry = ProcessRegistry::new();
        let id = InvocationId::new();

        registry.insert(id, flag());
        registry.remove(&id);
        assert!(!registry.cancel(&id));
    }

    #[test]
    fn test_cancel_unknown() {
        let registry = ProcessRegistry::new();
        assert!(!registry.cancel(&InvocationId::from_raw(999_999)));
    }

    #[test]
    fn test_list_ids() {
        let registry = ProcessRegistry::new();
        let a = InvocationId::new();
        let b = InvocationId::new();

        registry.insert(a, flag());
        registry.insert(b, flag());

        let ids = registry.list_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
    }

    #[test]
    fn test_concurrent_insert_remove() {
        use std::thread;

        let registry = Arc::new(ProcessRegistry::new());
        let mut handles = vec![];

        for _ in 0..100 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                let id = InvocationId::new();
                registry.insert(id, Arc::new(CancelFlag::default()));
                registry.set_pid(&id, id.as_u64() as u32);
                assert!(registry.contains(&id));
                assert!(registry.remove(&id));
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.count(), 0);
    }
}
