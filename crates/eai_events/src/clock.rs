//! # Event Clock
//!
//! Source of the timestamps attached to output events. VRML time is
//! seconds since the Unix epoch as a double.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies event timestamps.
pub trait Clock: Send + Sync {
    /// Current time in seconds.
    fn time(&self) -> f64;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn time(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64())
    }
}

/// A clock that only moves when told to.
///
/// Hosts that drive time from their own frame loop, and tests, use this.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// `f64` bit pattern of the current time.
    bits: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    /// Sets the current time.
    pub fn set(&self, time: f64) {
        self.bits.store(time.to_bits(), Ordering::Release);
    }

    /// Moves the clock forward by `delta` seconds.
    pub fn advance(&self, delta: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
    }
}

impl Clock for ManualClock {
    fn time(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
