use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{error, trace};

use super::event::InvocationEvent;

pub type Listener = Arc<dyn Fn(&InvocationEvent) + Send + Sync>;

#[derive(Clone)]
struct Entry {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Listener,
}

#[derive(Default)]
struct Inner {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl Inner {
    fn remove(&self, id: u64) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|entry| entry.id != id);
    }
}

/// Ordered set of listeners.
///
/// Dispatch works on a snapshot taken when it starts: listeners registered
/// while a dispatch is running are not called by it, and listeners disposed
/// while it runs are skipped if it has not reached them yet.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Inner>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&InvocationEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));

        self.inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                id,
                active: active.clone(),
                callback: Arc::new(callback),
            });
        trace!(listener = id, "listener registered");

        Subscription {
            id,
            active,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Calls every live listener in registration order. Returns how many ran.
    pub fn dispatch(&self, event: &InvocationEvent) -> usize {
        let snapshot: Vec<Entry> = self
            .inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut delivered = 0;
        for entry in snapshot {
            if !entry.active.load(Ordering::SeqCst) {
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (entry.callback)(event)));
            match outcome {
                Ok(()) => delivered += 1,
                Err(payload) => error!(
                    listener = entry.id,
                    invocation = %event.id,
                    "listener panicked: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle returned by [`ListenerRegistry::register`].
///
/// Dropping it does NOT unsubscribe; call [`Subscription::dispose`] or
/// convert it with [`Subscription::into_guard`].
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    registry: Weak<Inner>,
}

impl Subscription {
    /// Removes the listener. Repeated calls are no-ops.
    pub fn dispose(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.registry.upgrade() {
            inner.remove(self.id);
        }
        trace!(listener = self.id, "listener disposed");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard(self)
    }
}

/// Disposes its subscription on drop.
#[derive(Debug)]
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
    pub fn subscription(&self) -> &Subscription {
        &self.0
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.dispose();
    }
}
