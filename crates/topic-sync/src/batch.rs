//! Batch wire types
//!
//! One [`TopicBatch`] carries every change a single commit made, grouped by
//! entity kind, so the remote sees one combined request per transition.

use crate::diff::{compute_crud_diff, CrudDiff};
use serde::{Deserialize, Serialize};
use topic_graph::{Edge, EdgeId, GraphPartId, Node, NodeId, Perspective, Score, TopicState};
use uuid::Uuid;

/// One user's score for one part, as stored remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub username: Perspective,
    pub graph_part_id: GraphPartId,
    pub value: Score,
}

impl ScoreRecord {
    #[inline]
    #[must_use]
    pub fn key(&self) -> ScoreKey {
        ScoreKey {
            username: self.username.clone(),
            graph_part_id: self.graph_part_id,
        }
    }
}

/// Identity of a score record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreKey {
    pub username: Perspective,
    pub graph_part_id: GraphPartId,
}

/// Create/update/delete request for one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>, K: Deserialize<'de>"))]
pub struct EntityBatch<T, K> {
    #[serde(default)]
    pub create: Vec<T>,
    #[serde(default)]
    pub update: Vec<T>,
    #[serde(default)]
    pub delete: Vec<K>,
}

impl<T, K> Default for EntityBatch<T, K> {
    fn default() -> Self {
        Self {
            create: Vec::new(),
            update: Vec::new(),
            delete: Vec::new(),
        }
    }
}

impl<T, K> EntityBatch<T, K> {
    fn from_diff(diff: CrudDiff<T>, key: impl Fn(&T) -> K) -> Self {
        Self {
            delete: diff.deleted.iter().map(key).collect(),
            create: diff.created,
            update: diff.updated,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }
}

/// New anchor value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorChange {
    pub anchor: Option<NodeId>,
}

/// Every change of one commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicBatch {
    /// Correlates dispatch and failure logs
    pub id: Uuid,
    pub nodes: EntityBatch<Node, NodeId>,
    pub edges: EntityBatch<Edge, EdgeId>,
    pub user_scores: EntityBatch<ScoreRecord, ScoreKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorChange>,
}

/// Score records of a state, in key order
#[must_use]
pub fn score_records(state: &TopicState) -> Vec<ScoreRecord> {
    state
        .user_scores
        .iter()
        .map(|(username, graph_part_id, value)| ScoreRecord {
            username: username.clone(),
            graph_part_id,
            value,
        })
        .collect()
}

impl TopicBatch {
    /// Minimal batch turning `before` into `after`
    #[must_use]
    pub fn between(before: &TopicState, after: &TopicState) -> Self {
        let nodes = |state: &TopicState| state.graph.nodes().cloned().collect::<Vec<_>>();
        let edges = |state: &TopicState| state.graph.edges().cloned().collect::<Vec<_>>();

        let node_diff = compute_crud_diff(&nodes(before), &nodes(after), |node| node.id);
        let edge_diff = compute_crud_diff(&edges(before), &edges(after), |edge| edge.id);
        let score_diff = compute_crud_diff(&score_records(before), &score_records(after), ScoreRecord::key);

        Self {
            id: Uuid::new_v4(),
            nodes: EntityBatch::from_diff(node_diff, |node| node.id),
            edges: EntityBatch::from_diff(edge_diff, |edge| edge.id),
            user_scores: EntityBatch::from_diff(score_diff, ScoreRecord::key),
            anchor: (before.anchor != after.anchor).then_some(AnchorChange {
                anchor: after.anchor,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.user_scores.is_empty() && self.anchor.is_none()
    }

    /// Number of individual changes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() + self.edges.len() + self.user_scores.len() + usize::from(self.anchor.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topic_graph::{NodeType, RelationName};

    #[test]
    fn identical_states_make_empty_batch() {
        let mut state = TopicState::new();
        state.create_node(NodeType::Problem, "p").unwrap();
        assert!(TopicBatch::between(&state, &state).is_empty());
    }

    #[test]
    fn missing_batch_lists_default_to_empty() {
        let batch: EntityBatch<Node, NodeId> = serde_json::from_str(r#"{"create": []}"#).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn label_change_is_one_node_update() {
        let mut before = TopicState::new();
        let problem = before.create_node(NodeType::Problem, "p").unwrap();
        let mut after = before.clone();
        after.update_label(problem, "renamed").unwrap();

        let batch = TopicBatch::between(&before, &after);

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.nodes.update[0].label, "renamed");
    }

    #[test]
    fn cascade_delete_lists_every_id() {
        let mut before = TopicState::new();
        let problem = before.create_node(NodeType::Problem, "p").unwrap();
        let solution = before.create_node(NodeType::Solution, "s").unwrap();
        let edge = before.connect(problem, RelationName::Addresses, solution).unwrap();
        before
            .set_score(Perspective::new("ann"), edge.into(), Score::Three)
            .unwrap();
        let mut after = before.clone();
        after.delete_node(solution).unwrap();

        let batch = TopicBatch::between(&before, &after);

        assert_eq!(batch.nodes.delete, vec![solution]);
        assert_eq!(batch.edges.delete, vec![edge]);
        assert_eq!(batch.user_scores.delete.len(), 1);
        assert!(batch.anchor.is_none());
    }

    #[test]
    fn anchor_change_is_carried() {
        let mut before = TopicState::new();
        let problem = before.create_node(NodeType::Problem, "p").unwrap();
        let mut after = before.clone();
        after.set_anchor(Some(problem)).unwrap();

        let batch = TopicBatch::between(&before, &after);
        assert_eq!(
            batch.anchor,
            Some(AnchorChange {
                anchor: Some(problem)
            })
        );
    }
}
