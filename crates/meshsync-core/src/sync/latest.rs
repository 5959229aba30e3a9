//! Single-value, most-recent-wins handoff between two tasks.
//!
//! The producer never waits: a value that was not picked up before the next
//! one arrives is overwritten, counted in `meshsync_dropped_items_total` and
//! logged at debug level.

use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use super::metrics::record_dropped_item;

struct Shared<T> {
    value: Mutex<Option<T>>,
    notify: Notify,
    sender_closed: AtomicBool,
    receiver_closed: AtomicBool,
    overwrites: AtomicU64,
    stage: String,
}

/// Create a connected sender/receiver pair; `stage` labels dropped-item metrics.
pub fn latest_slot<T>(stage: impl Into<String>) -> (LatestSender<T>, LatestReceiver<T>) {
    let shared = Arc::new(Shared {
        value: Mutex::new(None),
        notify: Notify::new(),
        sender_closed: AtomicBool::new(false),
        receiver_closed: AtomicBool::new(false),
        overwrites: AtomicU64::new(0),
        stage: stage.into(),
    });
    (LatestSender { shared: Arc::clone(&shared) }, LatestReceiver { shared })
}

pub struct LatestSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> LatestSender<T> {
    /// Publish a value, replacing any value not yet received.
    ///
    /// Hands the value back when the receiver is gone.
    pub fn send(&self, value: T) -> Result<(), T> {
        if self.is_closed() {
            return Err(value);
        }
        let previous = self.shared.value.lock().replace(value);
        if previous.is_some() {
            self.shared.overwrites.fetch_add(1, Ordering::Relaxed);
            record_dropped_item(&self.shared.stage);
            tracing::debug!(stage = %self.shared.stage, "[Backpressure] overwrote undelivered value");
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.receiver_closed.load(Ordering::Acquire)
    }
}

impl<T> Drop for LatestSender<T> {
    fn drop(&mut self) {
        self.shared.sender_closed.store(true, Ordering::Release);
        self.shared.notify.notify_one();
    }
}

pub struct LatestReceiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> LatestReceiver<T> {
    /// Wait for the next value. `None` once the sender is dropped and the
    /// last value has been taken.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let taken = self.shared.value.lock().take();
            if taken.is_some() {
                return taken;
            }
            if self.shared.sender_closed.load(Ordering::Acquire) {
                return self.shared.value.lock().take();
            }
            // notify_one stores a permit, so a send between the checks above
            // and this await is not lost
            self.shared.notify.notified().await;
        }
    }

    /// Values overwritten before they could be received.
    pub fn overwrites(&self) -> u64 {
        self.shared.overwrites.load(Ordering::Relaxed)
    }

    pub fn into_stream(self) -> BoxStream<'static, T> {
        Box::pin(futures::stream::unfold(self, |mut rx| async move {
            rx.recv().await.map(|value| (value, rx))
        }))
    }
}

impl<T> Drop for LatestReceiver<T> {
    fn drop(&mut self) {
        self.shared.receiver_closed.store(true, Ordering::Release);
    }
}
