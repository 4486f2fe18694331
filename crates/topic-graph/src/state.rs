//! Topic state and named mutation actions
//!
//! [`TopicState`] is everything a topic holds: the graph, every user's
//! scores and the anchor node whose label is the topic title. The actions
//! here are the only way parts change; the store wraps each one in a commit
//! so history and sync see every transition.
//!
//! Every action either applies completely or leaves the state untouched.

use crate::error::{GraphError, GraphResult};
use crate::graph::{Edge, Graph, Node, Removed};
use crate::ids::{EdgeId, GraphPartId, NodeId};
use crate::ontology::{is_legal_relation, NodeType, RelationName};
use crate::score::{Perspective, Score, UserScores};
use serde::{Deserialize, Serialize};

/// Where a newly created node sits relative to the node it connects to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// New node is the edge source (parent)
    AsParent,
    /// New node is the edge target (child)
    AsChild,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub nodes_added: usize,
    pub edges_added: usize,
    /// One entry per rejected record
    pub rejected: Vec<GraphError>,
}

impl ImportReport {
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Full content of one topic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicState {
    #[serde(flatten)]
    pub graph: Graph,
    #[serde(default)]
    pub user_scores: UserScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<NodeId>,
}

impl TopicState {
    /// Blank topic
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State from parts fetched elsewhere (e.g. a remote load)
    #[must_use]
    pub fn from_parts(graph: Graph, user_scores: UserScores) -> Self {
        Self {
            graph,
            user_scores,
            anchor: None,
        }
    }

    /// Topic title: the anchor node's label
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.anchor
            .and_then(|anchor| self.graph.node(anchor))
            .map(|node| node.label.as_str())
    }

    /// Ids of every node and edge
    #[must_use]
    pub fn part_ids(&self) -> Vec<GraphPartId> {
        self.graph
            .nodes()
            .map(|node| GraphPartId::from(node.id))
            .chain(self.graph.edges().map(|edge| GraphPartId::from(edge.id)))
            .collect()
    }

    /// Add a node built by the caller
    ///
    /// # Errors
    /// See [`Graph::insert_node`].
    pub fn add_node(&mut self, node: Node) -> GraphResult<NodeId> {
        let id = node.id;
        self.graph.insert_node(node)?;
        Ok(id)
    }

    /// Create a breakdown or research node
    ///
    /// # Errors
    /// Justification types are created through [`TopicState::create_root_claim`]
    /// or [`TopicState::create_argument`].
    pub fn create_node(&mut self, node_type: NodeType, label: impl Into<String>) -> GraphResult<NodeId> {
        self.add_node(Node::new(node_type, label)?)
    }

    /// Create a node already joined to `existing` by `relation`
    ///
    /// # Errors
    /// [`GraphError::NodeNotFound`] for a missing `existing`, or
    /// [`GraphError::OntologyViolation`] if the relation is illegal; nothing
    /// is inserted in either case.
    pub fn create_connected_node(
        &mut self,
        existing: NodeId,
        attach: Attach,
        relation: RelationName,
        node_type: NodeType,
        label: impl Into<String>,
    ) -> GraphResult<(NodeId, EdgeId)> {
        if self.graph.node(existing).is_none() {
            return Err(GraphError::NodeNotFound(existing));
        }
        let node = Node::new(node_type, label)?;
        let edge = match attach {
            Attach::AsParent => Edge::new(node.id, relation, existing),
            Attach::AsChild => Edge::new(existing, relation, node.id),
        };
        let ids = (node.id, edge.id);

        self.graph.insert_node(node)?;
        if let Err(err) = self.graph.insert_edge(edge) {
            self.graph.remove_node(ids.0)?;
            return Err(err);
        }
        Ok(ids)
    }

    fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        self.graph.node_mut(id).ok_or(GraphError::NodeNotFound(id))
    }

    fn edge_mut(&mut self, id: EdgeId) -> GraphResult<&mut Edge> {
        self.graph.edge_mut(id).ok_or(GraphError::EdgeNotFound(id))
    }

    /// Replace a node's label
    ///
    /// # Errors
    /// [`GraphError::NodeNotFound`]
    pub fn update_label(&mut self, id: NodeId, label: impl Into<String>) -> GraphResult<()> {
        self.node_mut(id)?.label = label.into();
        Ok(())
    }

    /// Replace a node's notes
    ///
    /// # Errors
    /// [`GraphError::NodeNotFound`]
    pub fn update_notes(&mut self, id: NodeId, notes: impl Into<String>) -> GraphResult<()> {
        self.node_mut(id)?.notes = notes.into();
        Ok(())
    }

    /// Set or clear the custom type label of a custom node
    ///
    /// # Errors
    /// [`GraphError::NodeNotFound`], or [`GraphError::InvalidNodeData`] for
    /// non-custom nodes.
    pub fn update_custom_type(&mut self, id: NodeId, custom_type: Option<String>) -> GraphResult<()> {
        let node = self.node_mut(id)?;
        if custom_type.is_some() && node.node_type != NodeType::Custom {
            return Err(GraphError::InvalidNodeData {
                node_id: id,
                reason: "custom type set on a non-custom node".to_string(),
            });
        }
        node.custom_type = custom_type;
        Ok(())
    }

    /// Change a node's type within its category
    ///
    /// Incident edges that the ontology no longer allows are removed (with
    /// their justification trees and scores) and returned.
    ///
    /// # Errors
    /// [`GraphError::NodeNotFound`], [`GraphError::CategoryChange`] when
    /// `node_type` belongs to another category, or
    /// [`GraphError::RootClaimChange`] when a root claim would become an
    /// argument or the reverse.
    pub fn change_node_type(&mut self, id: NodeId, node_type: NodeType) -> GraphResult<Removed> {
        let node = self.node_mut(id)?;
        let (from, to) = (node.node_type.category(), node_type.category());
        if from != to {
            return Err(GraphError::CategoryChange { node_id: id, from, to });
        }
        // a justification tree keeps exactly one root
        if (node.node_type == NodeType::RootClaim) != (node_type == NodeType::RootClaim) {
            return Err(GraphError::RootClaimChange(id));
        }
        node.node_type = node_type;
        if node_type != NodeType::Custom {
            node.custom_type = None;
        }

        let illegal: Vec<EdgeId> = self
            .graph
            .incident_edges(id)
            .filter(|edge| {
                let source = self.graph.node(edge.source).map(|node| node.node_type);
                let target = self.graph.node(edge.target).map(|node| node.node_type);
                match (source, target) {
                    (Some(source), Some(target)) => !is_legal_relation(source, edge.relation, target),
                    _ => true,
                }
            })
            .map(|edge| edge.id)
            .collect();

        let mut removed = Removed::default();
        for edge_id in illegal {
            // an earlier cascade may already have taken it
            if self.graph.edge(edge_id).is_some() {
                let cascade = self.graph.remove_edge(edge_id)?;
                removed.nodes.extend(cascade.nodes);
                removed.edges.extend(cascade.edges);
            }
        }
        if !removed.is_empty() {
            tracing::debug!(
                node = %id,
                edges = removed.edges.len(),
                "type change dropped edges the ontology no longer allows"
            );
        }
        self.forget(&removed);
        Ok(removed)
    }

    /// Delete a node with its edges and every justification part about them
    ///
    /// # Errors
    /// [`GraphError::NodeNotFound`]
    pub fn delete_node(&mut self, id: NodeId) -> GraphResult<Removed> {
        let removed = self.graph.remove_node(id)?;
        self.forget(&removed);
        Ok(removed)
    }

    /// Add an edge; see [`Graph::insert_edge`]
    ///
    /// # Errors
    /// Ontology, referential and data errors.
    pub fn add_edge(&mut self, edge: Edge) -> GraphResult<EdgeId> {
        let id = edge.id;
        self.graph.insert_edge(edge)?;
        Ok(id)
    }

    /// Connect two existing nodes: `source` (parent) `--relation-->` `target` (child)
    ///
    /// # Errors
    /// See [`TopicState::add_edge`].
    pub fn connect(&mut self, source: NodeId, relation: RelationName, target: NodeId) -> GraphResult<EdgeId> {
        self.add_edge(Edge::new(source, relation, target))
    }

    /// Replace an edge's notes
    ///
    /// # Errors
    /// [`GraphError::EdgeNotFound`]
    pub fn update_edge_notes(&mut self, id: EdgeId, notes: impl Into<String>) -> GraphResult<()> {
        self.edge_mut(id)?.notes = notes.into();
        Ok(())
    }

    /// Set or clear the label of a custom edge
    ///
    /// # Errors
    /// [`GraphError::EdgeNotFound`], or [`GraphError::InvalidEdgeData`] for
    /// non-custom relations.
    pub fn update_edge_custom_label(&mut self, id: EdgeId, label: Option<String>) -> GraphResult<()> {
        let edge = self.edge_mut(id)?;
        if label.is_some() && edge.relation != RelationName::Custom {
            return Err(GraphError::InvalidEdgeData {
                edge_id: id,
                reason: "custom label set on a non-custom relation".to_string(),
            });
        }
        edge.custom_label = label;
        Ok(())
    }

    /// Delete an edge and every justification part about it
    ///
    /// # Errors
    /// [`GraphError::EdgeNotFound`]
    pub fn delete_edge(&mut self, id: EdgeId) -> GraphResult<Removed> {
        let removed = self.graph.remove_edge(id)?;
        self.forget(&removed);
        Ok(removed)
    }

    /// Root claim arguing about `part`, created on first use
    ///
    /// # Errors
    /// [`GraphError::PartNotFound`] if `part` is not in the graph.
    pub fn create_root_claim(&mut self, part: GraphPartId, label: impl Into<String>) -> GraphResult<NodeId> {
        if !self.graph.contains_part(part) {
            return Err(GraphError::PartNotFound(part));
        }
        if let Some(existing) = crate::aspects::root_claim(part, &self.graph) {
            return Ok(existing.id);
        }
        self.add_node(Node::justification(NodeType::RootClaim, label, part)?)
    }

    /// Add a support or critique under `parent` in a justification tree
    ///
    /// The argument inherits the parent's argued part.
    ///
    /// # Errors
    /// [`GraphError::NodeNotFound`] for a missing parent,
    /// [`GraphError::InvalidNodeData`] if the parent is not a justification
    /// node, or data/ontology errors for a non-argument `node_type`.
    pub fn create_argument(
        &mut self,
        parent: NodeId,
        node_type: NodeType,
        label: impl Into<String>,
    ) -> GraphResult<(NodeId, EdgeId)> {
        let argued = self
            .graph
            .node(parent)
            .ok_or(GraphError::NodeNotFound(parent))?
            .argued_diagram_part_id
            .ok_or_else(|| GraphError::InvalidNodeData {
                node_id: parent,
                reason: "arguments attach to justification nodes".to_string(),
            })?;
        let relation = match node_type {
            NodeType::Critique => RelationName::Critiques,
            _ => RelationName::Supports,
        };

        let node = Node::justification(node_type, label, argued)?;
        let edge = Edge::new(parent, relation, node.id).arguing(argued);
        let ids = (node.id, edge.id);

        self.graph.insert_node(node)?;
        if let Err(err) = self.graph.insert_edge(edge) {
            self.graph.remove_node(ids.0)?;
            return Err(err);
        }
        Ok(ids)
    }

    /// Record `perspective`'s score for a part; the sentinel clears it
    ///
    /// # Errors
    /// [`GraphError::PartNotFound`]
    pub fn set_score(&mut self, perspective: Perspective, part: GraphPartId, score: Score) -> GraphResult<()> {
        if !self.graph.contains_part(part) {
            return Err(GraphError::PartNotFound(part));
        }
        self.user_scores.set(perspective, part, score);
        Ok(())
    }

    /// Set or clear the anchor node
    ///
    /// # Errors
    /// [`GraphError::NodeNotFound`]
    pub fn set_anchor(&mut self, anchor: Option<NodeId>) -> GraphResult<()> {
        if let Some(id) = anchor {
            if self.graph.node(id).is_none() {
                return Err(GraphError::NodeNotFound(id));
            }
        }
        self.anchor = anchor;
        Ok(())
    }

    /// Bulk import; each bad record is rejected on its own
    ///
    /// Records are placed in rounds: a node waits for the part it argues
    /// about, an edge for its endpoints and argued part. Record order in
    /// the input therefore does not matter, including justification trees
    /// about imported edges. Records still waiting when a round places
    /// nothing are rejected. Rejections are logged and listed in the
    /// report; the rest of the batch is kept.
    pub fn import(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> ImportReport {
        let mut report = ImportReport::default();
        let (mut nodes, mut edges) = (nodes, edges);

        loop {
            let waiting = nodes.len() + edges.len();
            let (ready, later): (Vec<Node>, Vec<Node>) = nodes
                .into_iter()
                .partition(|node| self.can_place(node.argued_diagram_part_id, &[]));
            for node in ready {
                self.import_node(node, &mut report);
            }
            nodes = later;

            let (ready, later): (Vec<Edge>, Vec<Edge>) = edges
                .into_iter()
                .partition(|edge| self.can_place(edge.argued_diagram_part_id, &[edge.source, edge.target]));
            for edge in ready {
                self.import_edge(edge, &mut report);
            }
            edges = later;

            if waiting == 0 || nodes.len() + edges.len() == waiting {
                break;
            }
        }
        // whatever is left points at parts that never arrived
        for node in nodes {
            self.import_node(node, &mut report);
        }
        for edge in edges {
            self.import_edge(edge, &mut report);
        }

        tracing::info!(
            nodes = report.nodes_added,
            edges = report.edges_added,
            rejected = report.rejected.len(),
            "imported parts"
        );
        report
    }

    fn can_place(&self, argued: Option<GraphPartId>, endpoints: &[NodeId]) -> bool {
        let argued_present = match argued {
            Some(part) => self.graph.contains_part(part),
            None => true,
        };
        argued_present && endpoints.iter().all(|id| self.graph.node(*id).is_some())
    }

    fn import_node(&mut self, node: Node, report: &mut ImportReport) {
        match self.graph.insert_node(node) {
            Ok(()) => report.nodes_added += 1,
            Err(err) => {
                tracing::warn!(error = %err, "rejected imported node");
                report.rejected.push(err);
            }
        }
    }

    fn import_edge(&mut self, edge: Edge, report: &mut ImportReport) {
        match self.graph.insert_edge(edge) {
            Ok(()) => report.edges_added += 1,
            Err(err) => {
                tracing::warn!(error = %err, "rejected imported edge");
                report.rejected.push(err);
            }
        }
    }

    /// Drop scores and the anchor for removed parts
    fn forget(&mut self, removed: &Removed) {
        for node in &removed.nodes {
            self.user_scores.remove_part(node.id.into());
            if self.anchor == Some(node.id) {
                self.anchor = None;
            }
        }
        for edge in &removed.edges {
            self.user_scores.remove_part(edge.id.into());
        }
    }
}
