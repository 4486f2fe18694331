//! The topic store: one commit path for every mutation
//!
//! # Core Concepts
//!
//! - **Commit**: a named action runs against a copy of the current state.
//!   If it fails nothing changes; if it changes nothing nothing is recorded.
//!   Otherwise the old state goes onto the undo stack, the transition is
//!   diffed for sync, and subscribers are notified, in that order.
//! - **Loads** (remote fetch, local restore, reset) replace the state with
//!   sync paused and history cleared, so loaded data is never echoed back
//!   to the remote and cannot be undone into.
//! - **Single writer**: the store is owned, `&mut self` serializes commits,
//!   and the only concurrent actor is the sync worker behind a channel.

use crate::config::{EngineConfig, ScoreConfig};
use crate::error::{MigrationError, StorageError, StoreError, StoreResult};
use crate::history::History;
use crate::identity::Identity;
use crate::migration::{self, CURRENT_SCHEMA_VERSION};
use crate::remote::TopicRemote;
use crate::storage::{LocalStorage, PersistedTopic};
use crate::sync::{DiffSync, SyncFailures, SyncStatus};
use std::collections::BTreeMap;
use std::sync::Arc;
use topic_graph::{
    filter_view, get_display_scores, Attach, Edge, EdgeId, GraphPartId, GraphResult, ImportReport,
    Node, NodeId, NodeType, Perspective, RelationName, Removed, Score, TopicState,
    ViewConfig, ViewOutput,
};

/// Handle returned by [`TopicStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&TopicState) + Send + Sync>;

/// What [`TopicStore::restore_from_local`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing stored under the key; state untouched
    Missing,
    /// Snapshot loaded, migrated from `from_version` if older
    Restored { from_version: u32 },
    /// Snapshot unusable; the store now holds a blank topic
    FellBack(MigrationError),
}

/// Owner of the live topic
pub struct TopicStore {
    topic: String,
    state: TopicState,
    history: History,
    sync: DiffSync,
    identity: Box<dyn Identity>,
    scores: ScoreConfig,
    view: ViewConfig,
    storage_key: String,
    listeners: BTreeMap<SubscriptionId, Listener>,
    next_subscription: u64,
}

impl std::fmt::Debug for TopicStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicStore")
            .field("topic", &self.topic)
            .field("nodes", &self.state.graph.node_count())
            .field("edges", &self.state.graph.edge_count())
            .field("history", &self.history)
            .field("sync", &self.sync)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl TopicStore {
    /// Local-only store with default settings
    #[must_use]
    pub fn new(topic: impl Into<String>, identity: impl Identity + 'static) -> Self {
        let config = EngineConfig::default();
        let (sync, _failures) = DiffSync::disabled();
        Self {
            topic: topic.into(),
            state: TopicState::new(),
            history: History::new(config.history_limit),
            sync,
            identity: Box::new(identity),
            scores: config.scores,
            view: config.view,
            storage_key: config.storage.key,
            listeners: BTreeMap::new(),
            next_subscription: 0,
        }
    }

    /// Store configured from `config`
    ///
    /// With sync enabled and a `remote` given, the sync worker is spawned on
    /// the current tokio runtime; otherwise the store is local-only and the
    /// returned failures receiver stays empty.
    ///
    /// # Panics
    /// When sync is enabled with a remote outside a tokio runtime.
    #[must_use]
    pub fn from_config(
        topic: impl Into<String>,
        identity: impl Identity + 'static,
        config: &EngineConfig,
        remote: Option<Arc<dyn TopicRemote>>,
    ) -> (Self, SyncFailures) {
        let topic = topic.into();
        let (sync, failures) = match remote {
            Some(remote) if config.sync.enabled => {
                DiffSync::spawn(topic.clone(), remote, config.sync.channel_capacity)
            }
            _ => DiffSync::disabled(),
        };
        let store = Self {
            topic,
            state: TopicState::new(),
            history: History::new(config.history_limit),
            sync,
            identity: Box::new(identity),
            scores: config.scores.clone(),
            view: config.view.clone(),
            storage_key: config.storage.key.clone(),
            listeners: BTreeMap::new(),
            next_subscription: 0,
        };
        (store, failures)
    }

    /// With an explicit sync handle (e.g. from [`DiffSync::channel`])
    #[inline]
    #[must_use]
    pub fn with_sync(mut self, sync: DiffSync) -> Self {
        self.sync = sync;
        self
    }

    /// With a different undo depth; clears history
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = History::new(limit);
        self
    }

    /// With display score settings
    #[inline]
    #[must_use]
    pub fn with_scores(mut self, scores: ScoreConfig) -> Self {
        self.scores = scores;
        self
    }

    #[inline]
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &TopicState {
        &self.state
    }

    /// Anchor node's label
    #[inline]
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.state.title()
    }

    #[inline]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[inline]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[inline]
    #[must_use]
    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    /// Stop sending diffs; commits made until [`TopicStore::resume_sync`]
    /// are never sent
    pub fn pause_sync(&mut self) {
        self.sync.pause();
    }

    pub fn resume_sync(&mut self) {
        self.sync.resume();
    }

    #[inline]
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.identity.can_edit()
    }

    #[inline]
    #[must_use]
    pub fn view_config(&self) -> &ViewConfig {
        &self.view
    }

    /// Replace the active view configuration
    pub fn set_view_config(&mut self, view: ViewConfig) {
        self.view = view;
    }

    /// Run `action` through the commit path
    ///
    /// # Errors
    /// [`StoreError::ReadOnly`] when the identity may not edit, or the
    /// action's own [`GraphError`](topic_graph::GraphError). The state is
    /// untouched on error.
    pub fn commit<R>(
        &mut self,
        action: &str,
        mutate: impl FnOnce(&mut TopicState) -> GraphResult<R>,
    ) -> StoreResult<R> {
        self.ensure_editable()?;

        let mut next = self.state.clone();
        let output = mutate(&mut next).map_err(|err| {
            tracing::debug!(action, error = %err, "action rejected");
            StoreError::from(err)
        })?;
        if next == self.state {
            tracing::debug!(action, "action changed nothing");
            return Ok(output);
        }

        let previous = std::mem::replace(&mut self.state, next);
        self.sync.on_transition(&previous, &self.state);
        self.history.record(previous);
        tracing::debug!(
            action,
            nodes = self.state.graph.node_count(),
            edges = self.state.graph.edge_count(),
            "committed"
        );
        self.notify();
        Ok(output)
    }

    /// Step back one commit; `Ok(false)` when there is nothing to undo
    ///
    /// The reverting transition is synced like any commit.
    ///
    /// # Errors
    /// [`StoreError::ReadOnly`]
    pub fn undo(&mut self) -> StoreResult<bool> {
        self.ensure_editable()?;
        let Some(previous) = self.history.undo(self.state.clone()) else {
            return Ok(false);
        };
        self.step_to(previous, "undo");
        Ok(true)
    }

    /// Re-apply one undone commit; `Ok(false)` when there is nothing to redo
    ///
    /// # Errors
    /// [`StoreError::ReadOnly`]
    pub fn redo(&mut self) -> StoreResult<bool> {
        self.ensure_editable()?;
        let Some(next) = self.history.redo(self.state.clone()) else {
            return Ok(false);
        };
        self.step_to(next, "redo");
        Ok(true)
    }

    /// Replace the state with the remote's copy of this topic
    ///
    /// # Errors
    /// [`StoreError::Remote`] when the fetch fails, [`StoreError::Graph`]
    /// when the fetched topic does not validate. The state is untouched on
    /// error.
    pub async fn load_from_remote(&mut self, remote: &dyn TopicRemote) -> StoreResult<()> {
        let fetched = remote.get_topic(&self.topic).await?;
        let state = fetched.into_state()?;
        self.replace(state, "loaded topic from remote");
        Ok(())
    }

    /// Blank topic, history cleared, nothing synced
    pub fn reset(&mut self) {
        self.replace(TopicState::new(), "reset topic");
    }

    /// Save the current state under the configured key
    ///
    /// # Errors
    /// Encoding or storage failure.
    pub fn save_to_local(&self, storage: &dyn LocalStorage) -> Result<(), StorageError> {
        PersistedTopic::current(&self.state)?.save(storage, &self.storage_key)?;
        tracing::debug!(key = %self.storage_key, version = CURRENT_SCHEMA_VERSION, "saved topic locally");
        Ok(())
    }

    /// Load the snapshot saved under the configured key, migrating it first
    ///
    /// A stored value that is not an envelope, or a snapshot that cannot be
    /// migrated or validated, is discarded and the store falls back to a
    /// blank topic.
    ///
    /// # Errors
    /// Storage failure (I/O or a bad key); the state is untouched in that case.
    pub fn restore_from_local(&mut self, storage: &dyn LocalStorage) -> Result<RestoreOutcome, StorageError> {
        let envelope = match PersistedTopic::load(storage, &self.storage_key) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return Ok(RestoreOutcome::Missing),
            Err(StorageError::Serialization(err)) => {
                tracing::warn!(key = %self.storage_key, error = %err, "stored topic is corrupt, starting blank");
                self.replace(TopicState::new(), "reset topic after corrupt snapshot");
                return Ok(RestoreOutcome::FellBack(MigrationError::Invalid(format!(
                    "stored value is not a topic snapshot: {err}"
                ))));
            }
            Err(err) => return Err(err),
        };
        let from_version = envelope.version;
        match migration::restore(envelope) {
            Ok(state) => {
                self.replace(state, "restored topic from local storage");
                Ok(RestoreOutcome::Restored { from_version })
            }
            Err(err) => {
                tracing::warn!(
                    key = %self.storage_key,
                    version = from_version,
                    error = %err,
                    "stored topic unusable, starting blank"
                );
                self.replace(TopicState::new(), "reset topic after failed restore");
                Ok(RestoreOutcome::FellBack(err))
            }
        }
    }

    /// Call `listener` after every state transition
    pub fn subscribe(&mut self, listener: impl Fn(&TopicState) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    /// Stop notifying; `false` if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Display scores under the configured perspectives
    ///
    /// An empty perspective list means the current identity's own scores.
    #[must_use]
    pub fn display_scores(&self, parts: &[GraphPartId]) -> BTreeMap<GraphPartId, Score> {
        let own;
        let perspectives = if self.scores.perspectives.is_empty() {
            own = [self.identity.perspective()];
            &own[..]
        } else {
            &self.scores.perspectives[..]
        };
        get_display_scores(parts, perspectives, &self.state.user_scores, self.scores.aggregation)
    }

    /// Current view under the active configuration
    #[must_use]
    pub fn view(&self) -> ViewOutput {
        filter_view(&self.state.graph, &self.state.user_scores, &self.view)
    }

    pub fn create_node(&mut self, node_type: NodeType, label: impl Into<String>) -> StoreResult<NodeId> {
        self.commit("create node", |state| state.create_node(node_type, label))
    }

    pub fn create_connected_node(
        &mut self,
        existing: NodeId,
        attach: Attach,
        relation: RelationName,
        node_type: NodeType,
        label: impl Into<String>,
    ) -> StoreResult<(NodeId, EdgeId)> {
        self.commit("create connected node", |state| {
            state.create_connected_node(existing, attach, relation, node_type, label)
        })
    }

    pub fn update_label(&mut self, node: NodeId, label: impl Into<String>) -> StoreResult<()> {
        self.commit("update label", |state| state.update_label(node, label))
    }

    pub fn update_notes(&mut self, node: NodeId, notes: impl Into<String>) -> StoreResult<()> {
        self.commit("update notes", |state| state.update_notes(node, notes))
    }

    pub fn update_custom_type(&mut self, node: NodeId, custom_type: Option<String>) -> StoreResult<()> {
        self.commit("update custom type", |state| state.update_custom_type(node, custom_type))
    }

    /// Change a node's type; edges made illegal go in the same commit
    pub fn change_node_type(&mut self, node: NodeId, node_type: NodeType) -> StoreResult<Removed> {
        self.commit("change node type", |state| state.change_node_type(node, node_type))
    }

    pub fn delete_node(&mut self, node: NodeId) -> StoreResult<Removed> {
        self.commit("delete node", |state| state.delete_node(node))
    }

    pub fn add_edge(&mut self, edge: Edge) -> StoreResult<EdgeId> {
        self.commit("add edge", |state| state.add_edge(edge))
    }

    pub fn connect(&mut self, source: NodeId, relation: RelationName, target: NodeId) -> StoreResult<EdgeId> {
        self.commit("connect", |state| state.connect(source, relation, target))
    }

    pub fn update_edge_notes(&mut self, edge: EdgeId, notes: impl Into<String>) -> StoreResult<()> {
        self.commit("update edge notes", |state| state.update_edge_notes(edge, notes))
    }

    pub fn update_edge_custom_label(&mut self, edge: EdgeId, label: Option<String>) -> StoreResult<()> {
        self.commit("update edge label", |state| state.update_edge_custom_label(edge, label))
    }

    pub fn delete_edge(&mut self, edge: EdgeId) -> StoreResult<Removed> {
        self.commit("delete edge", |state| state.delete_edge(edge))
    }

    pub fn create_root_claim(&mut self, part: GraphPartId, label: impl Into<String>) -> StoreResult<NodeId> {
        self.commit("create root claim", |state| state.create_root_claim(part, label))
    }

    pub fn create_argument(
        &mut self,
        parent: NodeId,
        node_type: NodeType,
        label: impl Into<String>,
    ) -> StoreResult<(NodeId, EdgeId)> {
        self.commit("create argument", |state| state.create_argument(parent, node_type, label))
    }

    /// Score a part as the current identity
    pub fn set_score(&mut self, part: GraphPartId, score: Score) -> StoreResult<()> {
        let perspective: Perspective = self.identity.perspective();
        self.commit("set score", |state| state.set_score(perspective, part, score))
    }

    pub fn set_anchor(&mut self, anchor: Option<NodeId>) -> StoreResult<()> {
        self.commit("set anchor", |state| state.set_anchor(anchor))
    }

    /// Bulk import as one commit; bad records are reported, not fatal
    pub fn import(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> StoreResult<ImportReport> {
        self.commit("import", |state| Ok(state.import(nodes, edges)))
    }

    fn ensure_editable(&self) -> StoreResult<()> {
        if self.identity.can_edit() {
            return Ok(());
        }
        Err(StoreError::ReadOnly {
            user: self.identity.perspective().to_string(),
        })
    }

    fn step_to(&mut self, state: TopicState, action: &str) {
        let previous = std::mem::replace(&mut self.state, state);
        self.sync.on_transition(&previous, &self.state);
        tracing::info!(
            action,
            undo = self.history.undo_len(),
            redo = self.history.redo_len(),
            "history step"
        );
        self.notify();
    }

    /// Swap in a loaded state without syncing it; a caller's pause outlives the swap
    fn replace(&mut self, state: TopicState, message: &str) {
        let was_paused = self.sync.is_paused();
        self.sync.pause();
        let previous = std::mem::replace(&mut self.state, state);
        self.sync.on_transition(&previous, &self.state);
        self.history.clear();
        if !was_paused {
            self.sync.resume();
        }
        tracing::info!(
            topic = %self.topic,
            nodes = self.state.graph.node_count(),
            edges = self.state.graph.edge_count(),
            "{message}"
        );
        self.notify();
    }

    fn notify(&self) {
        for listener in self.listeners.values() {
            listener(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::remote::InMemoryRemote;
    use crate::storage::MemoryStorage;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> TopicStore {
        TopicStore::new("t", StaticIdentity::editor("ann"))
    }

    #[test]
    fn commit_records_history_and_notifies() {
        let mut store = store();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let problem = store.create_node(NodeType::Problem, "traffic").unwrap();
        assert!(store.can_undo());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.state().graph.node(problem).is_some());
    }

    #[test]
    fn failed_action_changes_nothing() {
        let mut store = store();
        let problem = store.create_node(NodeType::Problem, "p").unwrap();
        let before = store.state().clone();

        let err = store.connect(problem, RelationName::Addresses, NodeId::new()).unwrap_err();
        assert!(err.is_integrity_violation());
        assert_eq!(store.state(), &before);
        assert_eq!(store.history.undo_len(), 1);
    }

    #[test]
    fn no_op_is_not_recorded() {
        let mut store = store();
        let problem = store.create_node(NodeType::Problem, "p").unwrap();
        store.update_label(problem, "p").unwrap();
        assert_eq!(store.history.undo_len(), 1);
    }

    #[test]
    fn viewer_cannot_commit() {
        let mut store = TopicStore::new("t", StaticIdentity::viewer("guest"));
        let err = store.create_node(NodeType::Problem, "p").unwrap_err();
        assert_eq!(err, StoreError::ReadOnly { user: "guest".into() });
        assert!(store.state().graph.is_empty());
    }

    #[test]
    fn undo_and_redo_walk_history() {
        let mut store = store();
        let problem = store.create_node(NodeType::Problem, "p").unwrap();
        store.update_label(problem, "renamed").unwrap();

        assert!(store.undo().unwrap());
        assert_eq!(store.state().graph.node(problem).unwrap().label, "p");
        assert!(store.undo().unwrap());
        assert!(store.state().graph.is_empty());
        assert!(!store.undo().unwrap());

        assert!(store.redo().unwrap());
        assert!(store.redo().unwrap());
        assert_eq!(store.state().graph.node(problem).unwrap().label, "renamed");
        assert!(!store.redo().unwrap());
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let mut store = store();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));

        store.create_node(NodeType::Problem, "p").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn scores_default_to_own_perspective() {
        let mut store = store();
        let problem = store.create_node(NodeType::Problem, "p").unwrap();
        store.set_score(problem.into(), Score::Seven).unwrap();

        let scores = store.display_scores(&[problem.into()]);
        assert_eq!(scores[&GraphPartId::from(problem)], Score::Seven);
    }

    #[tokio::test]
    async fn commits_are_synced_and_loads_are_not() {
        let remote = InMemoryRemote::new();
        let (sync, mut worker, _failures) = DiffSync::channel("t", Arc::new(remote.clone()), 8);
        let mut store = store().with_sync(sync);

        store.create_node(NodeType::Problem, "p").unwrap();
        worker.drain().await;
        assert_eq!(remote.batches().len(), 1);

        store.load_from_remote(&remote).await.unwrap();
        store.reset();
        worker.drain().await;
        assert_eq!(remote.batches().len(), 1);
        assert!(!store.can_undo());
        assert_eq!(store.sync_status().skipped_while_paused, 2);
    }

    #[tokio::test]
    async fn failed_load_keeps_state() {
        let remote = InMemoryRemote::new();
        let mut store = store();
        store.create_node(NodeType::Problem, "p").unwrap();

        let err = store.load_from_remote(&remote).await.unwrap_err();
        assert!(matches!(err, StoreError::Remote(_)));
        assert_eq!(store.state().graph.node_count(), 1);
    }

    #[test]
    fn local_round_trip() {
        let storage = MemoryStorage::new();
        let mut store = store();
        assert_eq!(store.restore_from_local(&storage).unwrap(), RestoreOutcome::Missing);

        store.create_node(NodeType::Problem, "p").unwrap();
        store.save_to_local(&storage).unwrap();
        let saved = store.state().clone();
        store.reset();

        let outcome = store.restore_from_local(&storage).unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored { from_version: CURRENT_SCHEMA_VERSION });
        assert_eq!(store.state(), &saved);
    }

    #[test]
    fn unusable_snapshot_falls_back_to_blank() {
        let storage = MemoryStorage::new();
        storage
            .save("topic", r#"{"version": 99, "state": {"nodes": []}}"#)
            .unwrap();
        let mut store = store();
        store.create_node(NodeType::Problem, "p").unwrap();

        let outcome = store.restore_from_local(&storage).unwrap();
        assert!(matches!(outcome, RestoreOutcome::FellBack(_)));
        assert!(store.state().graph.is_empty());
    }

    #[test]
    fn corrupt_value_falls_back_to_blank() {
        let storage = MemoryStorage::new();
        storage.save("topic", "not json at all").unwrap();
        let mut store = store();
        store.create_node(NodeType::Problem, "p").unwrap();

        let outcome = store.restore_from_local(&storage).unwrap();
        assert!(matches!(outcome, RestoreOutcome::FellBack(MigrationError::Invalid(_))));
        assert!(store.state().graph.is_empty());
        assert!(!store.can_undo());
    }

    #[tokio::test]
    async fn explicit_pause_outlives_reset() {
        let remote = InMemoryRemote::new();
        let (sync, mut worker, _failures) = DiffSync::channel("t", Arc::new(remote.clone()), 8);
        let mut store = store().with_sync(sync);

        store.pause_sync();
        store.reset();
        store.create_node(NodeType::Problem, "offline").unwrap();
        worker.drain().await;
        assert!(remote.batches().is_empty());

        store.resume_sync();
        store.create_node(NodeType::Problem, "online").unwrap();
        worker.drain().await;
        assert_eq!(remote.batches().len(), 1);
    }

    #[test]
    fn loads_notify_subscribers() {
        let mut store = store();
        let states = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&states);
        store.subscribe(move |state| seen.lock().push(state.graph.node_count()));

        store.create_node(NodeType::Problem, "p").unwrap();
        store.reset();
        assert_eq!(*states.lock(), vec![1, 0]);
    }
}
