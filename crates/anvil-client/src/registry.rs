// ── Callback registry ──
//
// Every domain client hands out subscriptions through one of these.
// Entries are (id, callback) pairs in registration order; the token
// returned at registration removes exactly its own entry. Notification
// runs against a snapshot of the pass but re-checks membership before
// each invocation, which is what makes add/remove from inside a
// callback well-defined.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct RegistryInner<E> {
    next_id: u64,
    entries: Vec<(u64, Callback<E>)>,
}

impl<E> Default for RegistryInner<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

/// Subscribe/notify primitive shared by every domain client.
///
/// Callbacks run synchronously, in registration order. A callback may
/// freely register or unsubscribe (itself included) while a
/// notification pass is running: entries added during a pass are not
/// invoked until the next pass, entries removed during a pass are
/// skipped for the rest of it. Clones share the same entry list.
pub struct CallbackRegistry<E> {
    inner: Arc<Mutex<RegistryInner<E>>>,
}

impl<E> CallbackRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback and return the token that removes it.
    pub fn register(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> Subscription
    where
        E: 'static,
    {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Arc::new(callback)));
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Box::new(move || remove_entry(&weak, id)),
        }
    }

    /// Invoke every callback registered at the start of the pass that is
    /// still registered when its turn comes. The internal lock is never
    /// held while a callback runs.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<(u64, Callback<E>)> = self.inner.lock().entries.clone();
        for (id, callback) in snapshot {
            let still_registered = self
                .inner
                .lock()
                .entries
                .iter()
                .any(|(entry_id, _)| *entry_id == id);
            if still_registered {
                callback(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner::default())),
        }
    }
}

impl<E> Clone for CallbackRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for CallbackRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .finish()
    }
}

fn remove_entry<E>(registry: &Weak<Mutex<RegistryInner<E>>>, id: u64) {
    if let Some(inner) = registry.upgrade() {
        inner.lock().entries.retain(|(entry_id, _)| *entry_id != id);
    }
}

// ── Subscription ────────────────────────────────────────────────────

/// Token removing one registered callback.
///
/// `unsubscribe` is idempotent and safe to call from inside the
/// callback itself, mid-notification. Dropping the token without
/// calling it leaves the callback registered for the life of the
/// registry; once the registry is gone, unsubscribing is a no-op.
pub struct Subscription {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription")
    }
}
