//! Topic Sync - the stateful half of the engine
//!
//! Wraps [`topic_graph::TopicState`] in a [`TopicStore`] that owns:
//! - The commit path every named action goes through
//! - Undo/redo history as whole-state snapshots
//! - Diff sync: each transition becomes one create/update/delete batch
//!   sent to a [`TopicRemote`] by a background worker
//! - Local offline snapshots with schema migrations
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use topic_sync::prelude::*;
//!
//! let remote = Arc::new(InMemoryRemote::new());
//! let config = EngineConfig::from_toml_str("history_limit = 20")?;
//! let (mut store, mut failures) =
//!     TopicStore::from_config("traffic", StaticIdentity::editor("ann"), &config, Some(remote));
//!
//! let problem = store.create_node(NodeType::Problem, "Traffic")?;
//! store.set_anchor(Some(problem))?;
//! store.undo()?;
//!
//! if let Some(failure) = failures.try_next() {
//!     eprintln!("{}", failure.user_message());
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod batch;
pub mod config;
pub mod diff;
pub mod error;
pub mod history;
pub mod identity;
pub mod migration;
pub mod remote;
pub mod storage;
pub mod store;
pub mod sync;

// Re-exports for convenience
pub use batch::{score_records, AnchorChange, EntityBatch, ScoreKey, ScoreRecord, TopicBatch};
pub use config::{EngineConfig, ScoreConfig, StorageConfig, SyncConfig};
pub use diff::{compute_crud_diff, flatten_record, CrudDiff, FlatRecord};
pub use error::{
    ConfigError, MigrationError, RemoteError, StorageError, StoreError, StoreResult, SyncFailure,
};
pub use history::{History, DEFAULT_HISTORY_LIMIT};
pub use identity::{Identity, StaticIdentity};
pub use migration::{migrate, CURRENT_SCHEMA_VERSION};
pub use remote::{InMemoryRemote, RemoteTopic, TopicRemote};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, PersistedTopic};
pub use store::{RestoreOutcome, SubscriptionId, TopicStore};
pub use sync::{DiffSync, SyncFailures, SyncStatus, SyncWorker};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a topic store
    pub use crate::{
        EngineConfig, InMemoryRemote, LocalStorage, StaticIdentity, StoreError, StoreResult,
        SyncFailure, TopicRemote, TopicStore,
    };
    pub use topic_graph::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
