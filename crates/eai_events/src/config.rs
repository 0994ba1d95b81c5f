//! # Dispatch Configuration
//!
//! How eventOut notifications reach listeners, and how much memory the
//! recycling pools may keep.

use serde::{Deserialize, Serialize};

use crate::error::{EaiError, EaiResult};

/// Delivery strategy for eventOut listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Listeners run on dispatcher threads against snapshot buffers.
    Buffered,
    /// Listeners run on the engine thread against the live field.
    Synchronous,
}

/// Configuration for adapters and the dispatcher pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Delivery strategy.
    pub mode: DispatchMode,
    /// Dispatcher worker threads (buffered mode).
    pub worker_threads: usize,
    /// Worker thread name prefix; threads are named `{prefix}-{n}`.
    pub thread_name: String,
    /// Idle snapshot buffers kept per (node, field).
    pub max_pooled_buffers_per_field: usize,
    /// Array capacity an idle buffer may keep between loads.
    pub max_retained_elements: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Buffered,
            worker_threads: 2,
            thread_name: String::from("eai-dispatch"),
            max_pooled_buffers_per_field: 8,
            max_retained_elements: 1024,
        }
    }
}

impl DispatchConfig {
    /// Production config: more workers and deeper pools for scenes with
    /// many routed eventOuts.
    #[must_use]
    pub fn production() -> Self {
        Self {
            worker_threads: 4,
            max_pooled_buffers_per_field: 32,
            max_retained_elements: 4096,
            ..Self::default()
        }
    }

    /// Listeners run inline on the engine thread. No workers are started.
    #[must_use]
    pub fn synchronous() -> Self {
        Self {
            mode: DispatchMode::Synchronous,
            worker_threads: 0,
            max_pooled_buffers_per_field: 0,
            ..Self::default()
        }
    }

    /// Checks the values before any thread is started.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a buffered config without workers or without a
    /// thread name.
    pub fn validate(&self) -> EaiResult<()> {
        if self.mode == DispatchMode::Buffered {
            if self.worker_threads == 0 {
                return Err(EaiError::InvalidConfig(
                    "buffered dispatch needs at least one worker thread".to_string(),
                ));
            }
            if self.thread_name.trim().is_empty() {
                return Err(EaiError::InvalidConfig(
                    "worker thread name must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(DispatchConfig::default().validate().is_ok());
        assert!(DispatchConfig::production().validate().is_ok());
        assert!(DispatchConfig::synchronous().validate().is_ok());
    }

    #[test]
    fn test_buffered_needs_workers() {
        let config = DispatchConfig {
            worker_threads: 0,
            ..DispatchConfig::default()
        };
        assert!(matches!(config.validate(), Err(EaiError::InvalidConfig(_))));
    }

    #[test]
    fn test_buffered_needs_thread_name() {
        let config = DispatchConfig {
            thread_name: "  ".to_string(),
            ..DispatchConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
