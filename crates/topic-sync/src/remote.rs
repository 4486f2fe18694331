//! Remote persistence collaborator
//!
//! The store never talks to a server directly; it hands batches to a
//! [`TopicRemote`]. [`InMemoryRemote`] keeps a snapshot in memory and can be
//! told to fail, which is enough to exercise the protocol end to end.

use crate::batch::{ScoreKey, ScoreRecord, TopicBatch};
use crate::error::RemoteError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use topic_graph::{Edge, EdgeId, Graph, GraphError, Node, NodeId, TopicState, UserScores};

/// Full topic as the remote returns it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTopic {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub user_scores: Vec<ScoreRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<NodeId>,
}

impl RemoteTopic {
    /// Snapshot of a local state
    #[must_use]
    pub fn from_state(state: &TopicState) -> Self {
        Self {
            nodes: state.graph.nodes().cloned().collect(),
            edges: state.graph.edges().cloned().collect(),
            user_scores: crate::batch::score_records(state),
            anchor: state.anchor,
        }
    }

    /// Validated local state
    ///
    /// # Errors
    /// Fails on the first integrity violation; a remote topic that does not
    /// validate is never loaded partially.
    pub fn into_state(self) -> Result<TopicState, GraphError> {
        let graph = Graph::from_parts(self.nodes, self.edges)?;
        let mut user_scores = UserScores::new();
        for record in self.user_scores {
            user_scores.set(record.username, record.graph_part_id, record.value);
        }
        let mut state = TopicState::from_parts(graph, user_scores);
        if let Some(anchor) = self.anchor {
            state.set_anchor(Some(anchor))?;
        }
        Ok(state)
    }
}

/// Remote persistence
#[async_trait]
pub trait TopicRemote: Send + Sync {
    /// Apply one combined create/update/delete batch
    async fn apply_batch(&self, topic: &str, batch: &TopicBatch) -> Result<(), RemoteError>;

    /// Fetch a full topic
    async fn get_topic(&self, topic: &str) -> Result<RemoteTopic, RemoteError>;
}

#[derive(Debug, Default)]
struct StoredTopic {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    scores: BTreeMap<ScoreKey, ScoreRecord>,
    anchor: Option<NodeId>,
}

impl StoredTopic {
    fn apply(&mut self, batch: &TopicBatch) {
        for id in &batch.edges.delete {
            self.edges.remove(id);
        }
        for id in &batch.nodes.delete {
            self.nodes.remove(id);
        }
        for key in &batch.user_scores.delete {
            self.scores.remove(key);
        }
        for node in batch.nodes.create.iter().chain(&batch.nodes.update) {
            self.nodes.insert(node.id, node.clone());
        }
        for edge in batch.edges.create.iter().chain(&batch.edges.update) {
            self.edges.insert(edge.id, edge.clone());
        }
        for record in batch.user_scores.create.iter().chain(&batch.user_scores.update) {
            self.scores.insert(record.key(), record.clone());
        }
        if let Some(change) = batch.anchor {
            self.anchor = change.anchor;
        }
    }

    fn snapshot(&self) -> RemoteTopic {
        RemoteTopic {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
            user_scores: self.scores.values().cloned().collect(),
            anchor: self.anchor,
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryInner {
    topics: BTreeMap<String, StoredTopic>,
    batches: Vec<TopicBatch>,
    fail_with: Option<RemoteError>,
}

/// In-memory remote
///
/// Cloning shares the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemote {
    inner: Arc<Mutex<InMemoryInner>>,
}

impl InMemoryRemote {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a topic
    pub fn insert_topic(&self, topic: impl Into<String>, state: &TopicState) {
        let mut stored = StoredTopic::default();
        stored.apply(&TopicBatch::between(&TopicState::new(), state));
        self.inner.lock().topics.insert(topic.into(), stored);
    }

    /// Fail every request with `error` until cleared
    pub fn fail_with(&self, error: Option<RemoteError>) {
        self.inner.lock().fail_with = error;
    }

    /// Batches accepted so far, oldest first
    #[must_use]
    pub fn batches(&self) -> Vec<TopicBatch> {
        self.inner.lock().batches.clone()
    }

    /// Current snapshot of a topic
    #[must_use]
    pub fn snapshot(&self, topic: &str) -> Option<RemoteTopic> {
        self.inner.lock().topics.get(topic).map(StoredTopic::snapshot)
    }
}

#[async_trait]
impl TopicRemote for InMemoryRemote {
    async fn apply_batch(&self, topic: &str, batch: &TopicBatch) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        if let Some(error) = inner.fail_with.clone() {
            return Err(error);
        }
        inner.topics.entry(topic.to_string()).or_default().apply(batch);
        inner.batches.push(batch.clone());
        Ok(())
    }

    async fn get_topic(&self, topic: &str) -> Result<RemoteTopic, RemoteError> {
        let inner = self.inner.lock();
        if let Some(error) = inner.fail_with.clone() {
            return Err(error);
        }
        inner
            .topics
            .get(topic)
            .map(StoredTopic::snapshot)
            .ok_or_else(|| RemoteError::TopicNotFound(topic.to_string()))
    }
}
