//! Error types for the topic store
//!
//! - Remote failures: the collaborator was unreachable or refused a batch
//! - Sync failures: a remote failure plus the batch that did not land
//! - Store errors: a mutation was refused
//! - Storage and migration errors: a local snapshot could not be used

use crate::batch::TopicBatch;
use topic_graph::GraphError;

/// Failure reported by the remote collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Remote could not be reached
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    /// Remote refused the request
    #[error("remote rejected the request: {0}")]
    Rejected(String),

    /// Requested topic does not exist remotely
    #[error("topic not found: {0}")]
    TopicNotFound(String),
}

impl RemoteError {
    /// Whether retrying the same request could succeed
    ///
    /// The sync worker never retries on its own; this informs the message
    /// shown to the user.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// A batch the remote did not accept
///
/// Carries every pending change so the user can keep their edits before
/// reloading.
#[derive(Debug, Clone, thiserror::Error)]
#[error("changes were not saved: {error}")]
pub struct SyncFailure {
    /// Remote error
    pub error: RemoteError,
    /// The full batch that failed
    pub pending: TopicBatch,
}

impl SyncFailure {
    /// Human-readable summary for the UI
    #[must_use]
    pub fn user_message(&self) -> String {
        let hint = if self.error.is_retryable() {
            "check your connection and reload"
        } else {
            "reload the topic"
        };
        format!(
            "{} ({} unsaved change(s)); {hint}",
            self.error,
            self.pending.len()
        )
    }
}

/// Store mutation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The mutation broke a graph rule
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Current identity may not edit this topic
    #[error("{user} may not edit this topic")]
    ReadOnly { user: String },

    /// Topic could not be fetched
    #[error("load failed: {0}")]
    Remote(#[from] RemoteError),
}

impl StoreError {
    /// Ontology or referential integrity violation
    #[inline]
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::Graph(err) if err.is_integrity_violation())
    }
}

/// Local storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key cannot be used as a file name
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Schema migration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// No migration path covers this version
    #[error("unsupported schema version {found} (current is {current})")]
    UnsupportedVersion { found: u32, current: u32 },

    /// A step could not transform the snapshot
    #[error("migration from version {from_version} failed: {reason}")]
    StepFailed { from_version: u32, reason: String },

    /// Fully migrated snapshot is still not a valid topic
    #[error("migrated snapshot is invalid: {0}")]
    Invalid(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`crate::EngineConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parse but make no sense together
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
