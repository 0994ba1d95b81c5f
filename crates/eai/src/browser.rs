//! # EAI Browser
//!
//! One external-authoring session against a running scene.
//!
//! ## Lifecycle
//!
//! ```text
//!   new() ──▶ running ──dispose()──▶ disposed
//!              │  ▲
//!   begin_update() / end_update()   (writes held back while open)
//!              │  │
//!         process_events()          (engine applies queued writes)
//! ```
//!
//! Browser listeners hear about the lifecycle through [`BrowserEvent`]s on
//! the notifier thread: the host reports `Initialized` and `UrlError`,
//! `dispose()` sends `Shutdown` and waits until it has been delivered.
//!
//! Every operation on a disposed session fails with `Disposed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eai_core::{FieldId, NodeHandle};
use eai_events::{
    Clock, DispatchStats, DrainReport, EaiError, EaiFieldFactory, EaiResult, EventAdapterFactory,
    EventIn, EventOut, ExternalEventQueue, SystemClock,
};

use crate::config::EaiConfig;
use crate::notifier::{BrowserEvent, BrowserListener, BrowserNotifier};
use crate::registry::NodeRegistry;

/// An EAI session.
pub struct EaiBrowser {
    /// Session configuration.
    config: EaiConfig,
    /// Timestamp source shared with the adapters.
    clock: Arc<dyn Clock>,
    /// Pending eventIn writes.
    queue: Arc<ExternalEventQueue>,
    /// Node → adapter cache and dispatcher.
    adapters: Arc<EventAdapterFactory>,
    /// Field handle construction.
    fields: EaiFieldFactory,
    /// DEF names.
    registry: NodeRegistry,
    /// Lifecycle listeners.
    notifier: BrowserNotifier,
    /// Dispose latch.
    disposed: AtomicBool,
}

impl EaiBrowser {
    /// Opens a session.
    ///
    /// # Arguments
    ///
    /// * `config` - Session configuration
    /// * `clock` - Timestamp source for eventOut notifications
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a bad configuration, `ThreadSpawn` if the
    /// dispatcher cannot start.
    pub fn new(config: EaiConfig, clock: Arc<dyn Clock>) -> EaiResult<Self> {
        config.validate()?;
        let queue = Arc::new(ExternalEventQueue::new());
        let adapters = Arc::new(EventAdapterFactory::new(
            config.dispatch.clone(),
            Arc::clone(&clock),
        )?);
        let fields = EaiFieldFactory::new(Arc::clone(&queue), Arc::clone(&adapters));
        let notifier = BrowserNotifier::new(&config.session.notifier_thread_name)?;

        tracing::info!("EAI session opened ({:?} dispatch)", config.dispatch.mode);
        Ok(Self {
            config,
            clock,
            queue,
            adapters,
            fields,
            registry: NodeRegistry::new(),
            notifier,
            disposed: AtomicBool::new(false),
        })
    }

    /// Opens a session with the default configuration and the wall clock.
    ///
    /// # Errors
    ///
    /// `ThreadSpawn` if the dispatcher cannot start.
    pub fn with_defaults() -> EaiResult<Self> {
        Self::new(EaiConfig::default(), Arc::new(SystemClock))
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &EaiConfig {
        &self.config
    }

    /// Current session time in seconds.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.clock.time()
    }

    /// Exposes `node` under a DEF name, returning the node it replaced.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn register_node(
        &self,
        name: impl Into<String>,
        node: NodeHandle,
    ) -> EaiResult<Option<NodeHandle>> {
        self.ensure_open()?;
        Ok(self.registry.register(name, node))
    }

    /// Withdraws a DEF name.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn unregister_node(&self, name: &str) -> EaiResult<Option<NodeHandle>> {
        self.ensure_open()?;
        Ok(self.registry.unregister(name))
    }

    /// Looks up a node by DEF name.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown name, `Disposed` after
    /// [`dispose`](Self::dispose).
    pub fn node(&self, name: &str) -> EaiResult<NodeHandle> {
        self.ensure_open()?;
        self.registry
            .get(name)
            .ok_or_else(|| EaiError::NodeNotFound(name.to_string()))
    }

    /// Write handle for a field of `node`.
    ///
    /// # Errors
    ///
    /// `InvalidEventIn` if the field is missing or not writable.
    pub fn event_in(&self, node: &NodeHandle, name: &str) -> EaiResult<EventIn> {
        self.ensure_open()?;
        self.fields.event_in(node, name)
    }

    /// Live read handle for a field of `node`.
    ///
    /// # Errors
    ///
    /// `InvalidEventOut` if the field is missing or not readable.
    pub fn event_out(&self, node: &NodeHandle, name: &str) -> EaiResult<EventOut> {
        self.ensure_open()?;
        self.fields.event_out(node, name)
    }

    /// Snapshot read handle for a field of `node`.
    ///
    /// # Errors
    ///
    /// The facade's error if the field is missing, unreadable or cannot be
    /// loaded.
    pub fn stored_event_out(&self, node: &NodeHandle, field: FieldId) -> EaiResult<EventOut> {
        self.ensure_open()?;
        self.fields.stored_event_out(node, field)
    }

    /// Opens an update batch; queued writes are held back until it closes.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn begin_update(&self) -> EaiResult<()> {
        self.ensure_open()?;
        self.queue.begin_update();
        Ok(())
    }

    /// Closes an update batch.
    ///
    /// With `process_on_end_update` set, closing the outermost batch
    /// applies the queued writes and returns the report.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn end_update(&self) -> EaiResult<Option<DrainReport>> {
        self.ensure_open()?;
        let outermost = self.queue.end_update();
        if outermost && self.config.session.process_on_end_update {
            return Ok(Some(self.queue.drain()));
        }
        Ok(None)
    }

    /// Applies every queued eventIn write. Called by the engine once per
    /// event cycle.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose). Individual write
    /// failures are reported in the [`DrainReport`].
    pub fn process_events(&self) -> EaiResult<DrainReport> {
        self.ensure_open()?;
        Ok(self.queue.drain())
    }

    /// Registers a lifecycle listener. A listener already registered is
    /// ignored.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn add_browser_listener(&self, listener: Arc<dyn BrowserListener>) -> EaiResult<()> {
        self.ensure_open()?;
        self.notifier.add_listener(listener);
        Ok(())
    }

    /// Removes a lifecycle listener by identity.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn remove_browser_listener(&self, listener: &Arc<dyn BrowserListener>) -> EaiResult<()> {
        self.ensure_open()?;
        self.notifier.remove_listener(listener);
        Ok(())
    }

    /// Number of registered lifecycle listeners.
    #[must_use]
    pub fn browser_listener_count(&self) -> usize {
        self.notifier.listener_count()
    }

    /// Reports that the scene finished loading.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn notify_initialized(&self) -> EaiResult<()> {
        self.ensure_open()?;
        self.notifier.broadcast(BrowserEvent::Initialized);
        Ok(())
    }

    /// Reports that loading a URL failed.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn notify_url_error(&self, message: impl Into<String>) -> EaiResult<()> {
        self.ensure_open()?;
        let message = message.into();
        tracing::warn!("URL load failed: {}", message);
        self.notifier.broadcast(BrowserEvent::UrlError(message));
        Ok(())
    }

    /// Number of queued eventIn writes.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.pending_count()
    }

    /// Drops adapters of nodes that no longer exist.
    ///
    /// # Errors
    ///
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn purge_disposed_nodes(&self) -> EaiResult<usize> {
        self.ensure_open()?;
        Ok(self.adapters.purge_disposed())
    }

    /// Dispatcher counters, buffered mode only.
    #[must_use]
    pub fn dispatch_stats(&self) -> Option<Arc<DispatchStats>> {
        self.adapters.dispatch_stats()
    }

    /// The adapter factory of this session.
    #[must_use]
    pub fn adapters(&self) -> &Arc<EventAdapterFactory> {
        &self.adapters
    }

    /// Whether [`dispose`](Self::dispose) was called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Ends the session.
    ///
    /// Closes any open update batch, applies the writes still queued, stops
    /// the dispatcher, forgets every DEF name and delivers `Shutdown` to the
    /// browser listeners. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        while self.queue.in_update() {
            self.queue.end_update();
        }
        let report = self.queue.drain();
        let discarded = self.queue.close();
        self.adapters.shutdown();
        self.registry.clear();
        self.notifier.broadcast(BrowserEvent::Shutdown);
        self.notifier.shutdown();

        tracing::info!(
            "EAI session disposed: {} final writes applied, {} failed, {} discarded",
            report.applied,
            report.failures.len(),
            discarded
        );
    }

    fn ensure_open(&self) -> EaiResult<()> {
        if self.is_disposed() {
            return Err(EaiError::Disposed);
        }
        Ok(())
    }
}

impl Drop for EaiBrowser {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eai_core::{AccessType, FieldValue, MemoryNode};
    use eai_events::ManualClock;

    fn browser(config: EaiConfig) -> EaiBrowser {
        EaiBrowser::new(config, Arc::new(ManualClock::new(100.0))).unwrap()
    }

    fn material() -> NodeHandle {
        MemoryNode::builder("Material")
            .field("transparency", AccessType::ExposedField, FieldValue::SfFloat(0.0))
            .build()
    }

    #[test]
    fn test_registry_lookup() {
        let browser = browser(EaiConfig::synchronous());
        browser.register_node("MAT", material()).unwrap();

        assert_eq!(browser.node("MAT").unwrap().type_name(), "Material");
        assert_eq!(
            browser.node("NOPE").unwrap_err(),
            EaiError::NodeNotFound("NOPE".to_string())
        );
        assert!((browser.current_time() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_process_on_end_update() {
        let mut config = EaiConfig::synchronous();
        config.session.process_on_end_update = true;
        let browser = browser(config);
        let node = material();
        let input = browser.event_in(&node, "transparency").unwrap();

        browser.begin_update().unwrap();
        input.set_value(&FieldValue::SfFloat(0.5)).unwrap();
        assert_eq!(browser.process_events().unwrap().applied, 0);

        let report = browser.end_update().unwrap().unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(node.field_value(FieldId(0)).unwrap(), FieldValue::SfFloat(0.5));
    }

    #[test]
    fn test_browser_listeners_see_lifecycle() {
        let browser = browser(EaiConfig::synchronous());
        let (tx, rx) = crossbeam_channel::unbounded();
        let listener: Arc<dyn BrowserListener> = Arc::new(move |event: &BrowserEvent| {
            let name = std::thread::current().name().map(str::to_string);
            tx.send((event.clone(), name)).unwrap();
        });
        browser.add_browser_listener(Arc::clone(&listener)).unwrap();
        browser.add_browser_listener(Arc::clone(&listener)).unwrap();
        assert_eq!(browser.browser_listener_count(), 1);

        browser.notify_initialized().unwrap();
        browser.notify_url_error("http://example.invalid/world.wrl").unwrap();
        browser.dispose();

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received.iter().map(|(event, _)| event.clone()).collect::<Vec<_>>(),
            vec![
                BrowserEvent::Initialized,
                BrowserEvent::UrlError("http://example.invalid/world.wrl".to_string()),
                BrowserEvent::Shutdown,
            ]
        );
        assert!(received
            .iter()
            .all(|(_, name)| name.as_deref() == Some("eai-browser")));
        assert_eq!(browser.notify_initialized().unwrap_err(), EaiError::Disposed);
        assert_eq!(
            browser.add_browser_listener(listener).unwrap_err(),
            EaiError::Disposed
        );
    }

    #[test]
    fn test_removed_browser_listener_is_not_called() {
        let browser = browser(EaiConfig::synchronous());
        let (tx, rx) = crossbeam_channel::unbounded();
        let listener: Arc<dyn BrowserListener> =
            Arc::new(move |event: &BrowserEvent| tx.send(event.clone()).unwrap());
        browser.add_browser_listener(Arc::clone(&listener)).unwrap();
        browser.remove_browser_listener(&listener).unwrap();
        assert_eq!(browser.browser_listener_count(), 0);

        browser.dispose();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dispose_flushes_and_closes() {
        let browser = browser(EaiConfig::default());
        let node = material();
        browser.register_node("MAT", node.clone()).unwrap();
        let input = browser.event_in(&node, "transparency").unwrap();

        browser.begin_update().unwrap();
        input.set_value(&FieldValue::SfFloat(0.75)).unwrap();
        browser.dispose();
        browser.dispose();

        assert!(browser.is_disposed());
        assert_eq!(node.field_value(FieldId(0)).unwrap(), FieldValue::SfFloat(0.75));
        assert!(browser.adapters().is_shut_down());
        assert_eq!(browser.node("MAT").unwrap_err(), EaiError::Disposed);
        assert_eq!(browser.process_events().unwrap_err(), EaiError::Disposed);
        assert_eq!(
            input.set_value(&FieldValue::SfFloat(0.1)).unwrap_err(),
            EaiError::Disposed
        );
    }
}
