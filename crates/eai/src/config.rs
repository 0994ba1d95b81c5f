//! # Session Configuration
//!
//! Loaded once at startup from TOML:
//!
//! ```toml
//! [dispatch]
//! mode = "buffered"
//! worker_threads = 2
//! thread_name = "eai-dispatch"
//! max_pooled_buffers_per_field = 8
//! max_retained_elements = 1024
//!
//! [session]
//! process_on_end_update = false
//! notifier_thread_name = "eai-browser"
//! ```
//!
//! Every key is optional; missing keys take their default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use eai_events::{DispatchConfig, EaiError, EaiResult};

/// Session behaviour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Apply queued eventIn writes as soon as the outermost update batch
    /// closes, instead of waiting for the next `process_events`.
    pub process_on_end_update: bool,
    /// Name of the thread delivering browser notifications.
    pub notifier_thread_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            process_on_end_update: false,
            notifier_thread_name: String::from("eai-browser"),
        }
    }
}

impl SessionConfig {
    /// Checks all values.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for an empty notifier thread name.
    pub fn validate(&self) -> EaiResult<()> {
        if self.notifier_thread_name.trim().is_empty() {
            return Err(EaiError::InvalidConfig(
                "notifier_thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete EAI configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EaiConfig {
    /// EventOut dispatch settings.
    pub dispatch: DispatchConfig,
    /// Session settings.
    pub session: SessionConfig,
}

impl EaiConfig {
    /// Production preset.
    #[must_use]
    pub fn production() -> Self {
        Self {
            dispatch: DispatchConfig::production(),
            session: SessionConfig::default(),
        }
    }

    /// Listeners run inline on the engine thread.
    #[must_use]
    pub fn synchronous() -> Self {
        Self {
            dispatch: DispatchConfig::synchronous(),
            session: SessionConfig::default(),
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `Config` for malformed TOML, `InvalidConfig` for out-of-range values.
    pub fn from_toml_str(source: &str) -> EaiResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| EaiError::Config(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be read or parsed, `InvalidConfig` for
    /// out-of-range values.
    pub fn from_file(path: impl AsRef<Path>) -> EaiResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EaiError::Config(format!("failed to read {}: {e}", path.display())))?;
        tracing::debug!("Loading EAI configuration from {}", path.display());
        Self::from_toml_str(&source)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// `Config` if serialization fails.
    pub fn to_toml_string(&self) -> EaiResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EaiError::Config(format!("failed to serialize TOML: {e}")))
    }

    /// Checks all values.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for out-of-range values.
    pub fn validate(&self) -> EaiResult<()> {
        self.dispatch.validate()?;
        self.session.validate()
    }
}
