//! Single-slot debounced task
//!
//! Scheduling replaces whatever is pending. Once the delay elapses the task
//! leaves the slot before it runs, so a later cancel stops pending timers but
//! never an in-flight task.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

struct Pending {
    id: u64,
    handle: JoinHandle<()>,
}

type Slot = Arc<Mutex<Option<Pending>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Pending>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Debouncer {
    delay: Duration,
    slot: Slot,
    next_id: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` after the delay, cancelling any pending task first
    pub fn schedule<F>(&self, runtime: &Handle, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let slot = self.slot.clone();
        let delay = self.delay;

        // Held until the new handle is stored so the task cannot observe a stale slot
        let mut pending = lock(&self.slot);
        if let Some(previous) = pending.take() {
            previous.handle.abort();
            debug!("Replaced pending debounced task {}", previous.id);
        }

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut pending = lock(&slot);
                match pending.as_ref() {
                    Some(current) if current.id == id => {
                        pending.take();
                    }
                    _ => return,
                }
            }
            task.await;
        });

        *pending = Some(Pending { id, handle });
    }

    /// Cancel the pending task, if any
    pub fn cancel(&self) -> bool {
        match lock(&self.slot).take() {
            Some(previous) => {
                previous.handle.abort();
                debug!("Cancelled pending debounced task {}", previous.id);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.slot).is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
