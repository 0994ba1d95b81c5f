//! # Browser Notifications
//!
//! Lifecycle events of the session, delivered to browser listeners on a
//! dedicated thread so the caller never runs listener code.
//!
//! ```text
//!   host / dispose() ──broadcast──▶ [queue] ──▶ eai-browser ──▶ listeners
//! ```
//!
//! Notifications are delivered in broadcast order. Shutting the notifier
//! down delivers what is already queued, then joins the thread.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use eai_core::same_object;
use eai_events::{EaiError, EaiResult};

/// A session lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowserEvent {
    /// The scene finished loading.
    Initialized,
    /// Loading a URL failed.
    UrlError(String),
    /// The session is going away.
    Shutdown,
}

impl fmt::Display for BrowserEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized => f.write_str("initialized"),
            Self::UrlError(message) => write!(f, "url error: {message}"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Receives session lifecycle events.
pub trait BrowserListener: Send + Sync {
    /// Called on the notifier thread.
    fn browser_changed(&self, event: &BrowserEvent);
}

impl<F> BrowserListener for F
where
    F: Fn(&BrowserEvent) + Send + Sync,
{
    fn browser_changed(&self, event: &BrowserEvent) {
        self(event);
    }
}

/// One queued broadcast with the listeners registered at the time.
struct Notification {
    event: BrowserEvent,
    listeners: Vec<Arc<dyn BrowserListener>>,
}

/// Listener set plus the delivery thread.
pub struct BrowserNotifier {
    listeners: RwLock<Vec<Arc<dyn BrowserListener>>>,
    /// `None` once shut down.
    sender: Mutex<Option<Sender<Notification>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    delivered: Arc<AtomicU64>,
    panics: Arc<AtomicU64>,
}

impl BrowserNotifier {
    /// Starts the delivery thread.
    ///
    /// # Errors
    ///
    /// `ThreadSpawn` if the OS refuses the thread.
    pub fn new(thread_name: &str) -> EaiResult<Self> {
        let (sender, receiver) = unbounded();
        let delivered = Arc::new(AtomicU64::new(0));
        let panics = Arc::new(AtomicU64::new(0));

        let worker = {
            let delivered = Arc::clone(&delivered);
            let panics = Arc::clone(&panics);
            thread::Builder::new()
                .name(thread_name.to_string())
                .spawn(move || notify_loop(&receiver, &delivered, &panics))
                .map_err(|e| EaiError::ThreadSpawn(e.to_string()))?
        };

        Ok(Self {
            listeners: RwLock::new(Vec::new()),
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            delivered,
            panics,
        })
    }

    /// Registers a listener. A listener already registered is ignored.
    ///
    /// # Returns
    ///
    /// `true` if the listener was added.
    pub fn add_listener(&self, listener: Arc<dyn BrowserListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|existing| same_object(existing, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Removes a listener by identity.
    ///
    /// # Returns
    ///
    /// `true` if it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn BrowserListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|existing| !same_object(existing, listener));
        listeners.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Queues `event` for every listener registered now.
    ///
    /// # Returns
    ///
    /// `false` if the notifier was shut down and the event dropped.
    pub fn broadcast(&self, event: BrowserEvent) -> bool {
        let listeners = self.listeners.read().clone();
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            tracing::debug!("Dropping browser event {} after shutdown", event);
            return false;
        };

        tracing::debug!("Broadcasting browser event {} to {} listeners", event, listeners.len());
        sender.send(Notification { event, listeners }).is_ok()
    }

    /// Delivers what is queued and stops the thread. Idempotent.
    ///
    /// Called from a listener, the thread is not joined; it exits after
    /// the current notification.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::error!("Browser notifier thread terminated abnormally");
        }
    }

    /// Listener calls that returned normally.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Listener calls that panicked.
    #[must_use]
    pub fn listener_panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }
}

impl Drop for BrowserNotifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn notify_loop(source: &Receiver<Notification>, delivered: &AtomicU64, panics: &AtomicU64) {
    for notification in source.iter() {
        for listener in &notification.listeners {
            let outcome =
                catch_unwind(AssertUnwindSafe(|| listener.browser_changed(&notification.event)));
            if outcome.is_ok() {
                delivered.fetch_add(1, Ordering::Relaxed);
            } else {
                panics.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Browser listener panicked on {}", notification.event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn recorder() -> (Arc<dyn BrowserListener>, Receiver<(BrowserEvent, Option<String>)>) {
        let (tx, rx) = unbounded();
        let listener: Arc<dyn BrowserListener> = Arc::new(move |event: &BrowserEvent| {
            let name = thread::current().name().map(str::to_string);
            tx.send((event.clone(), name)).unwrap();
        });
        (listener, rx)
    }

    #[test]
    fn test_duplicate_listener_is_ignored() {
        let notifier = BrowserNotifier::new("test-browser").unwrap();
        let (listener, _rx) = recorder();

        assert!(notifier.add_listener(Arc::clone(&listener)));
        assert!(!notifier.add_listener(Arc::clone(&listener)));
        assert_eq!(notifier.listener_count(), 1);

        assert!(notifier.remove_listener(&listener));
        assert!(!notifier.remove_listener(&listener));
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn test_events_arrive_in_order_off_thread() {
        let notifier = BrowserNotifier::new("test-browser").unwrap();
        let (listener, rx) = recorder();
        notifier.add_listener(listener);

        notifier.broadcast(BrowserEvent::Initialized);
        notifier.broadcast(BrowserEvent::UrlError("missing.wrl".to_string()));
        notifier.broadcast(BrowserEvent::Shutdown);
        notifier.shutdown();

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received.iter().map(|(event, _)| event.clone()).collect::<Vec<_>>(),
            vec![
                BrowserEvent::Initialized,
                BrowserEvent::UrlError("missing.wrl".to_string()),
                BrowserEvent::Shutdown,
            ]
        );
        assert!(received
            .iter()
            .all(|(_, name)| name.as_deref() == Some("test-browser")));
        assert_eq!(notifier.delivered(), 3);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let notifier = BrowserNotifier::new("test-browser").unwrap();
        let failing: Arc<dyn BrowserListener> = Arc::new(|_: &BrowserEvent| panic!("listener bug"));
        let (listener, rx) = recorder();
        notifier.add_listener(failing);
        notifier.add_listener(listener);

        notifier.broadcast(BrowserEvent::Initialized);
        let (event, _) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, BrowserEvent::Initialized);

        notifier.shutdown();
        assert_eq!(notifier.listener_panics(), 1);
    }

    #[test]
    fn test_broadcast_after_shutdown_is_dropped() {
        let notifier = BrowserNotifier::new("test-browser").unwrap();
        let (listener, rx) = recorder();
        notifier.add_listener(listener);

        notifier.shutdown();
        notifier.shutdown();
        assert!(!notifier.broadcast(BrowserEvent::Shutdown));
        assert!(rx.try_recv().is_err());
    }
}
