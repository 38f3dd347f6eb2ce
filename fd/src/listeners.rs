//! Change listeners for the registry and directory
//!
//! Listeners are notified after the store's lock has been released, from a
//! snapshot of the listener list, so a listener may call back into the store
//! (or subscribe/unsubscribe) without deadlocking. Each invocation is isolated:
//! a listener that returns an error or panics is logged and skipped, and the
//! remaining listeners still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use eyre::Result;
use tracing::{debug, warn};

/// A change callback
pub type Listener<E> = Arc<dyn Fn(&E) -> Result<()> + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered set of listeners for events of type `E`
pub struct ListenerSet<E> {
    listeners: Mutex<Vec<(SubscriptionId, Listener<E>)>>,
    next_id: AtomicU64,
}

impl<E> Default for ListenerSet<E> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<E> std::fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet").field("len", &self.len()).finish()
    }
}

impl<E> ListenerSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it receives every event emitted after this call
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) -> Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(?id, "ListenerSet::subscribe: called");
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        debug!(?id, "ListenerSet::unsubscribe: called");
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every listener of `event`, returning how many of them failed
    ///
    /// Must not be called while holding the owning store's lock.
    pub fn notify(&self, event: &E) -> usize {
        let snapshot: Vec<(SubscriptionId, Listener<E>)> = self.lock().clone();
        debug!(listeners = snapshot.len(), "ListenerSet::notify: called");

        let mut failures = 0;
        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(?id, "Listener failed: {}", e);
                }
                Err(panic) => {
                    failures += 1;
                    warn!(?id, "Listener panicked: {}", panic_message(panic.as_ref()));
                }
            }
        }
        failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Listener<E>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_notify_reaches_all_listeners() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let total = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let total = total.clone();
            set.subscribe(move |n: &u32| {
                total.fetch_add(*n as usize, Ordering::SeqCst);
                Ok(())
            });
        }

        assert_eq!(set.notify(&2), 0);
        assert_eq!(total.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_failing_listeners_do_not_stop_siblings() {
        let set: ListenerSet<&'static str> = ListenerSet::new();
        let seen = Arc::new(AtomicUsize::new(0));

        set.subscribe(|_| Err(eyre::eyre!("listener error")));
        set.subscribe(|_| panic!("listener panic"));
        let seen_clone = seen.clone();
        set.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(set.notify(&"event"), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let set: ListenerSet<()> = ListenerSet::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let id = set.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(set.unsubscribe(id));
        assert!(!set.unsubscribe(id));
        assert!(set.is_empty());

        set.notify(&());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_may_subscribe_during_notify() {
        let set: Arc<ListenerSet<()>> = Arc::new(ListenerSet::new());
        let inner = set.clone();
        set.subscribe(move |_| {
            inner.subscribe(|_| Ok(()));
            Ok(())
        });

        set.notify(&());
        assert_eq!(set.len(), 2);
    }
}
