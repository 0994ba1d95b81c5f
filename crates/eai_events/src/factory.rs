//! # Event Adapter Factory
//!
//! Owns the node → adapter cache and, in buffered mode, the dispatcher
//! pool every adapter shares.
//!
//! The cache holds adapters strongly and nodes weakly. A dropped node's
//! entry is replaced the next time a node with the same identity is looked
//! up, or removed by [`EventAdapterFactory::purge_disposed`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use eai_core::{FieldChangeListener, NodeHandle, NodeId, WeakNodeHandle};

use crate::adapter::{BufferedEventAdapter, EventAdapter, SynchronousEventAdapter};
use crate::clock::Clock;
use crate::config::{DispatchConfig, DispatchMode};
use crate::dispatch::{DispatchStats, EventAdapterThreadPool};
use crate::error::EaiResult;

/// A cached adapter and the node it watches.
struct CachedAdapter {
    node: WeakNodeHandle,
    adapter: Arc<dyn EventAdapter>,
}

/// Creates and caches one event adapter per node.
pub struct EventAdapterFactory {
    /// Adapter settings.
    config: DispatchConfig,
    /// Timestamp source for every adapter.
    clock: Arc<dyn Clock>,
    /// Dispatcher, buffered mode only.
    pool: Option<Arc<EventAdapterThreadPool>>,
    /// Node → adapter.
    cache: Mutex<HashMap<NodeId, CachedAdapter>>,
    /// Shutdown latch.
    shut_down: AtomicBool,
}

impl EventAdapterFactory {
    /// Creates a factory. Buffered mode starts the dispatcher threads.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a config that fails validation, `ThreadSpawn`
    /// if a worker cannot be started.
    pub fn new(config: DispatchConfig, clock: Arc<dyn Clock>) -> EaiResult<Self> {
        config.validate()?;
        let pool = match config.mode {
            DispatchMode::Buffered => Some(Arc::new(EventAdapterThreadPool::new(&config)?)),
            DispatchMode::Synchronous => None,
        };

        Ok(Self {
            config,
            clock,
            pool,
            cache: Mutex::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Returns the adapter for `node`, creating and registering it on first
    /// use.
    pub fn get_adapter(&self, node: &NodeHandle) -> Arc<dyn EventAdapter> {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(&node.id()) {
            if entry.node.refers_to(node) {
                return Arc::clone(&entry.adapter);
            }
        }

        let (adapter, listener): (Arc<dyn EventAdapter>, Arc<dyn FieldChangeListener>) =
            match &self.pool {
                Some(pool) => {
                    let adapter = BufferedEventAdapter::new(
                        node,
                        Arc::clone(pool),
                        Arc::clone(&self.clock),
                        &self.config,
                    );
                    (adapter.clone(), adapter)
                }
                None => {
                    let adapter =
                        Arc::new(SynchronousEventAdapter::new(node, Arc::clone(&self.clock)));
                    (adapter.clone(), adapter)
                }
            };

        node.add_change_listener(listener);
        cache.insert(
            node.id(),
            CachedAdapter {
                node: node.downgrade(),
                adapter: Arc::clone(&adapter),
            },
        );
        tracing::debug!("Created {:?} event adapter for {} {}", self.config.mode, node.type_name(), node.id());
        adapter
    }

    /// Stops the dispatcher. Irreversible; adapters keep working but their
    /// buffered events are dropped.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(pool) = &self.pool {
            pool.shutdown();
        }
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Delivery strategy of the adapters this factory creates.
    #[must_use]
    pub const fn mode(&self) -> DispatchMode {
        self.config.mode
    }

    /// Number of cached adapters, including ones whose node is gone.
    #[must_use]
    pub fn adapter_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drops cache entries whose node has been dropped.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub fn purge_disposed(&self) -> usize {
        let mut cache = self.cache.lock();
        let before = cache.len();
        cache.retain(|_, entry| !entry.node.is_disposed());
        let purged = before - cache.len();
        if purged > 0 {
            tracing::debug!("Purged {} adapters of disposed nodes", purged);
        }
        purged
    }

    /// Dispatcher counters, buffered mode only.
    #[must_use]
    pub fn dispatch_stats(&self) -> Option<Arc<DispatchStats>> {
        self.pool.as_ref().map(|pool| pool.stats())
    }
}

impl Drop for EventAdapterFactory {
    fn drop(&mut self) {
        self.shutdown();
    }
}
