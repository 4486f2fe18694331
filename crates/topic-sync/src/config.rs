//! Engine configuration
//!
//! Loaded from TOML. Every section is optional; missing values take the
//! defaults below.
//!
//! ```toml
//! history_limit = 50
//!
//! [sync]
//! enabled = true
//! channel_capacity = 64
//!
//! [scores]
//! aggregation = "average"
//! perspectives = ["ann", "bob"]
//!
//! [storage]
//! key = "topic"
//!
//! [view]
//! categories = ["breakdown", "research"]
//! ```

use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use topic_graph::{AggregationMode, Perspective, ViewConfig};

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Undo snapshots kept
    pub history_limit: usize,
    /// Remote sync
    pub sync: SyncConfig,
    /// Display score defaults
    pub scores: ScoreConfig,
    /// Local offline storage
    pub storage: StorageConfig,
    /// Initial view
    pub view: ViewConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With undo depth
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// With sync switched on or off
    #[inline]
    #[must_use]
    pub fn with_sync_enabled(mut self, enabled: bool) -> Self {
        self.sync.enabled = enabled;
        self
    }

    /// With sync queue capacity
    #[inline]
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.sync.channel_capacity = capacity;
        self
    }

    /// With score perspectives and aggregation
    #[inline]
    #[must_use]
    pub fn with_scores(mut self, perspectives: Vec<Perspective>, aggregation: AggregationMode) -> Self {
        self.scores = ScoreConfig {
            aggregation,
            perspectives,
        };
        self
    }

    /// With local storage key
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage.key = key.into();
        self
    }

    /// With initial view
    #[inline]
    #[must_use]
    pub fn with_view(mut self, view: ViewConfig) -> Self {
        self.view = view;
        self
    }

    /// Parse and check a TOML document
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`]
    /// for values that parse but cannot be used.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.check()?;
        Ok(config)
    }

    /// Read, parse and check a TOML file
    ///
    /// # Errors
    /// See [`EngineConfig::from_toml_str`]; also [`ConfigError::Io`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Reject values that parse but make no sense
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first bad value.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid("history_limit must be at least 1".into()));
        }
        if self.sync.enabled && self.sync.channel_capacity == 0 {
            return Err(ConfigError::Invalid("sync.channel_capacity must be at least 1".into()));
        }
        if self.storage.key.is_empty() {
            return Err(ConfigError::Invalid("storage.key must not be empty".into()));
        }
        if self.scores.aggregation == AggregationMode::Single && self.scores.perspectives.len() > 1 {
            return Err(ConfigError::Invalid(
                "scores.aggregation = \"single\" takes at most one perspective".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            sync: SyncConfig::default(),
            scores: ScoreConfig::default(),
            storage: StorageConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

/// Remote sync settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Send diffs to the remote
    pub enabled: bool,
    /// Batches queued before commits start reporting failures
    pub channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: 64,
        }
    }
}

/// Display score settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub aggregation: AggregationMode,
    /// Empty means the current identity's perspective
    pub perspectives: Vec<Perspective>,
}

/// Local storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Key the snapshot is saved under
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: "topic".to_string(),
        }
    }
}
