//! # Event Adapter Thread Pool
//!
//! Delivers buffered eventOut notifications on a fixed set of worker
//! threads.
//!
//! ## Architecture
//!
//! ```text
//!                        listener identity
//!   adapter ──┐          ┌──▶ [lane 0] ──▶ worker-0 ──┐
//!   adapter ──┼──────────┼──▶ [lane 1] ──▶ worker-1 ──┼──▶ listener
//!   adapter ──┘          └──▶ [lane N] ──▶ worker-N ──┘       │
//!       ▲                     (unbounded)                     ▼
//!       └──────────────── [recycle queue] ◀────────────── reclaimer
//! ```
//!
//! Every listener is pinned to one lane, so a listener sees its events in
//! generation order for any number of workers, and never runs on two
//! workers at once. Producers never block. Dispatch records travel in
//! boxes that are reused through the recycle queue, so steady-state
//! dispatch does not allocate records.
//!
//! Pinning trades load balancing for ordering. A slow listener stalls
//! every listener that hashes to its lane, even while other workers sit
//! idle; it never stalls the engine thread or listeners on other lanes.
//! Listeners that block for long should hand work to their own thread.
//!
//! ## Shutdown
//!
//! 1. The recycle queue is detached under a write lock. Producers check it
//!    under the read lock, so no send can be in flight afterwards.
//! 2. Undelivered records are purged from every lane.
//! 3. One `None` sentinel per lane is queued and the workers are joined.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use eai_core::FieldId;

use crate::adapter::BufferReclaimer;
use crate::config::DispatchConfig;
use crate::error::{EaiError, EaiResult};
use crate::output::{EventOutListener, OutputEvent};

/// Counters for the dispatcher.
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Events accepted by `send_event`.
    pub events_sent: AtomicU64,
    /// Listener calls that returned normally.
    pub events_delivered: AtomicU64,
    /// Events discarded because the pool was shut down.
    pub events_dropped: AtomicU64,
    /// Dispatch records allocated.
    pub records_allocated: AtomicU64,
    /// Dispatch records reused from the recycle queue.
    pub records_recycled: AtomicU64,
    /// Listener calls that panicked.
    pub listener_panics: AtomicU64,
}

impl DispatchStats {
    /// Events accepted but not yet delivered, dropped or panicked.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        let sent = self.events_sent.load(Ordering::Acquire);
        let done = self.events_delivered.load(Ordering::Acquire)
            + self.listener_panics.load(Ordering::Acquire);
        sent.saturating_sub(done)
    }
}

/// One queued delivery.
struct EventRecord {
    listener: Option<Arc<dyn EventOutListener>>,
    event: Option<OutputEvent>,
    field: FieldId,
    reclaimer: Option<Arc<dyn BufferReclaimer>>,
}

impl EventRecord {
    fn empty() -> Self {
        Self {
            listener: None,
            event: None,
            field: FieldId(0),
            reclaimer: None,
        }
    }

    fn clear(&mut self) {
        self.listener = None;
        self.event = None;
        self.reclaimer = None;
    }
}

/// `None` tells a worker to exit.
type Message = Option<Box<EventRecord>>;

/// One worker's source queue.
struct Lane {
    sender: Sender<Message>,
    /// Kept for purging on shutdown.
    receiver: Receiver<Message>,
}

/// Fixed-size pool of listener-dispatch threads.
pub struct EventAdapterThreadPool {
    /// Source queues, one per worker.
    lanes: Vec<Lane>,
    /// Consumer side of the recycle queue; `None` once shutdown began.
    recycler: RwLock<Option<Receiver<Box<EventRecord>>>>,
    /// Worker handles.
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Number of workers started.
    worker_count: usize,
    /// Shutdown latch.
    shut_down: AtomicBool,
    /// Counters.
    stats: Arc<DispatchStats>,
}

impl EventAdapterThreadPool {
    /// Starts `config.worker_threads` workers named `{thread_name}-{n}`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for zero workers, `ThreadSpawn` if the OS refuses a
    /// thread. Workers already started are shut down again.
    pub fn new(config: &DispatchConfig) -> EaiResult<Self> {
        if config.worker_threads == 0 {
            return Err(EaiError::InvalidConfig(
                "dispatcher needs at least one worker thread".to_string(),
            ));
        }

        let lanes: Vec<Lane> = (0..config.worker_threads)
            .map(|_| {
                let (sender, receiver) = unbounded();
                Lane { sender, receiver }
            })
            .collect();
        let (recycle_tx, recycle_rx) = unbounded();
        let pool = Self {
            lanes,
            recycler: RwLock::new(Some(recycle_rx)),
            workers: Mutex::new(Vec::with_capacity(config.worker_threads)),
            worker_count: config.worker_threads,
            shut_down: AtomicBool::new(false),
            stats: Arc::new(DispatchStats::default()),
        };

        for (id, lane) in pool.lanes.iter().enumerate() {
            let receiver = lane.receiver.clone();
            let recycle = recycle_tx.clone();
            let stats = Arc::clone(&pool.stats);

            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, id))
                .spawn(move || worker_loop(&receiver, recycle, &stats))
                .map_err(|e| EaiError::ThreadSpawn(e.to_string()))?;
            pool.workers.lock().push(handle);
        }

        tracing::info!(
            "Event dispatcher started: {} workers ({})",
            config.worker_threads,
            config.thread_name
        );
        Ok(pool)
    }

    /// Queues one delivery.
    ///
    /// Never blocks. After shutdown the event is dropped.
    ///
    /// # Returns
    ///
    /// `false` if the event was dropped.
    pub fn send_event(
        &self,
        listener: Arc<dyn EventOutListener>,
        event: OutputEvent,
        field: FieldId,
        reclaimer: Arc<dyn BufferReclaimer>,
    ) -> bool {
        let recycler = self.recycler.read();
        let Some(recycler) = recycler.as_ref() else {
            self.stats.events_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Dropping event for field {} after shutdown", field);
            return false;
        };

        let mut record = if let Ok(record) = recycler.try_recv() {
            self.stats.records_recycled.fetch_add(1, Ordering::Relaxed);
            record
        } else {
            self.stats.records_allocated.fetch_add(1, Ordering::Relaxed);
            Box::new(EventRecord::empty())
        };
        let lane = &self.lanes[self.lane_index(&listener)];
        record.listener = Some(listener);
        record.event = Some(event);
        record.field = field;
        record.reclaimer = Some(reclaimer);

        tracing::trace!("Dispatching event for field {}", field);
        if lane.sender.send(Some(record)).is_err() {
            self.stats.events_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.stats.events_sent.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Stops all workers. Undelivered events are discarded.
    ///
    /// Idempotent. When called from a worker thread, that worker is not
    /// joined; it exits once it has finished its current listener.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        // No producer can be between the recycler check and the send now
        drop(self.recycler.write().take());

        let purged: usize = self
            .lanes
            .iter()
            .map(|lane| lane.receiver.try_iter().filter(Option::is_some).count())
            .sum();
        let purged = u64::try_from(purged).unwrap_or(u64::MAX);
        self.stats.events_dropped.fetch_add(purged, Ordering::Relaxed);

        for lane in &self.lanes {
            let _ = lane.sender.send(None);
        }

        let current = thread::current().id();
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("Dispatcher worker terminated abnormally");
            }
        }

        tracing::info!("Event dispatcher shut down, {} undelivered events discarded", purged);
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Number of worker threads started.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Events waiting in the lanes.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.lanes.iter().map(|lane| lane.receiver.len()).sum()
    }

    /// Lane serving `listener`. Stable for the listener's lifetime.
    fn lane_index(&self, listener: &Arc<dyn EventOutListener>) -> usize {
        // Allocation addresses are at least 8-aligned
        let address = Arc::as_ptr(listener).cast::<()>() as usize;
        (address >> 3) % self.lanes.len()
    }

    /// Dispatcher counters.
    #[must_use]
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }
}

impl Drop for EventAdapterThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    source: &Receiver<Message>,
    recycle: Sender<Box<EventRecord>>,
    stats: &DispatchStats,
) {
    while let Ok(Some(mut record)) = source.recv() {
        deliver(&mut record, stats);
        record.clear();
        // Fails once the pool detached the recycle queue
        let _ = recycle.send(record);
    }
}

fn deliver(record: &mut EventRecord, stats: &DispatchStats) {
    let (Some(listener), Some(event), Some(reclaimer)) = (
        record.listener.take(),
        record.event.take(),
        record.reclaimer.take(),
    ) else {
        return;
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| listener.callback(&event)));
    match outcome {
        Ok(()) => {
            stats.events_delivered.fetch_add(1, Ordering::Relaxed);
        }
        Err(_) => {
            stats.listener_panics.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                "EventOut listener panicked while handling field {}",
                record.field
            );
        }
    }

    reclaimer.reclaim_event_out_buffer(record.field, event.into_buffer());
}
