use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use crate::book::Collection;

type Listener = Arc<dyn Fn(&Collection) + Send + Sync>;

/// Observer list for snapshot changes.
///
/// Snapshots are queued while the store's transition lock is held, so the
/// queue is in state-change order, and delivered after it is released. Only
/// one thread delivers at a time; a listener that dispatches from inside a
/// notification just queues the next snapshot, which the running delivery
/// loop picks up once the current notification returns.
pub(crate) struct Listeners {
    registered: RwLock<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    queue: Mutex<VecDeque<Collection>>,
    draining: AtomicBool,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        Listeners {
            registered: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        }
    }

    pub(crate) fn add(&self, listener: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registered
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut registered = self
            .registered
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = registered.len();
        registered.retain(|(listener_id, _)| *listener_id != id);
        registered.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Queue `snapshot` for delivery. Call with the transition lock held.
    pub(crate) fn enqueue(&self, snapshot: Collection) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(snapshot);
    }

    /// Deliver queued snapshots unless another call is already delivering.
    pub(crate) fn drain(&self) {
        loop {
            if self
                .draining
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                return;
            }

            {
                let _guard = DrainGuard(&self.draining);
                while let Some(snapshot) = self.pop() {
                    // Clone the list so listeners may subscribe or unsubscribe.
                    let listeners: Vec<Listener> = self
                        .registered
                        .read()
                        .unwrap_or_else(PoisonError::into_inner)
                        .iter()
                        .map(|(_, listener)| listener.clone())
                        .collect();
                    for listener in listeners {
                        listener(&snapshot);
                    }
                }
            }

            // A snapshot queued between the last pop and the guard drop
            // would otherwise wait for the next dispatch.
            if self.is_queue_empty() {
                return;
            }
        }
    }

    fn pop(&self) -> Option<Collection> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn is_queue_empty(&self) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle returned by [`LibraryStore::subscribe`](crate::LibraryStore::subscribe).
///
/// Dropping it unsubscribes the listener.
#[must_use = "dropping the subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub(crate) fn new(id: u64, listeners: &Arc<Listeners>) -> Self {
        Subscription {
            id,
            listeners: Arc::downgrade(listeners),
        }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}
