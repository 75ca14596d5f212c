//! Connectivity monitor
//!
//! Tracks the online/offline signal reported by the host platform. The host
//! calls [`ConnectivityMonitor::set_online`] from its `online`/`offline` event
//! handlers; nothing here polls. Consumers either register a callback with
//! [`ConnectivityMonitor::on_change`] or await transitions through
//! [`ConnectivityMonitor::watch`].

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::info;

pub type ConnectivityCallback = Arc<dyn Fn(bool) + Send + Sync>;

struct Inner {
    state: watch::Sender<bool>,
    subscribers: DashMap<u64, ConnectivityCallback>,
    next_id: AtomicU64,
}

#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    /// Start from the platform's current connectivity reading
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self {
            inner: Arc::new(Inner {
                state,
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.inner.state.borrow()
    }

    pub fn is_offline(&self) -> bool {
        !self.is_online()
    }

    /// Record a platform connectivity event
    ///
    /// Subscribers are notified once per actual transition; repeating the
    /// current state is a no-op. Returns whether the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.inner.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
            let callbacks: Vec<ConnectivityCallback> = self
                .inner
                .subscribers
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            for callback in callbacks {
                callback(online);
            }
        }

        changed
    }

    pub fn notify_online(&self) -> bool {
        self.set_online(true)
    }

    pub fn notify_offline(&self) -> bool {
        self.set_online(false)
    }

    /// Register a callback for every transition
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or unsubscribed.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.subscribers.insert(id, Arc::new(callback));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Receiver that observes the latest state
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.inner.state.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Handle returned by [`ConnectivityMonitor::on_change`]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.remove(&self.id);
        }
    }
}
