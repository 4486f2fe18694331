//! Graph data model
//!
//! [`Graph`] owns nodes and edges keyed by id. Insertion enforces the
//! ontology and referential integrity; removal cascades to incident edges
//! and to every justification part that argues about a removed part.

use crate::error::{GraphError, GraphResult};
use crate::ids::{EdgeId, GraphPartId, NodeId};
use crate::ontology::{is_legal_relation, Category, NodeType, RelationName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A vertex of the topic graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    #[serde(default)]
    pub notes: String,
    /// Only meaningful when `node_type` is [`NodeType::Custom`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
    /// Only present on justification nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argued_diagram_part_id: Option<GraphPartId>,
}

/// Category-specific view of a node
///
/// Use this at boundaries that need type-specific behaviour instead of
/// poking at the optional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Breakdown,
    Custom { custom_type: Option<&'a str> },
    Research,
    Justification { argued_part: GraphPartId },
}

impl Node {
    /// Create a breakdown or research node
    ///
    /// # Errors
    /// Justification types need an argued part; use [`Node::justification`].
    pub fn new(node_type: NodeType, label: impl Into<String>) -> GraphResult<Self> {
        let id = NodeId::new();
        if node_type.category() == Category::Justification {
            return Err(GraphError::InvalidNodeData {
                node_id: id,
                reason: format!("{node_type} requires an argued diagram part"),
            });
        }
        Ok(Self {
            id,
            node_type,
            label: label.into(),
            notes: String::new(),
            custom_type: None,
            argued_diagram_part_id: None,
        })
    }

    /// Create a justification node arguing about `argued_part`
    ///
    /// # Errors
    /// Fails if `node_type` is not a justification type.
    pub fn justification(
        node_type: NodeType,
        label: impl Into<String>,
        argued_part: GraphPartId,
    ) -> GraphResult<Self> {
        let id = NodeId::new();
        if node_type.category() != Category::Justification {
            return Err(GraphError::InvalidNodeData {
                node_id: id,
                reason: format!("{node_type} cannot argue about a diagram part"),
            });
        }
        Ok(Self {
            id,
            node_type,
            label: label.into(),
            notes: String::new(),
            custom_type: None,
            argued_diagram_part_id: Some(argued_part),
        })
    }

    /// Replace the generated id (fixtures, imports)
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Set notes
    #[inline]
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Set the custom type label (custom nodes only; checked on insert)
    #[inline]
    #[must_use]
    pub fn with_custom_type(mut self, custom_type: impl Into<String>) -> Self {
        self.custom_type = Some(custom_type.into());
        self
    }

    /// Category of this node's type
    #[inline]
    #[must_use]
    pub fn category(&self) -> Category {
        self.node_type.category()
    }

    /// Category-specific view
    #[must_use]
    pub fn kind(&self) -> NodeKind<'_> {
        match (self.node_type.category(), self.argued_diagram_part_id) {
            (Category::Justification, Some(argued_part)) => NodeKind::Justification { argued_part },
            (Category::Research, _) => NodeKind::Research,
            _ if self.node_type == NodeType::Custom => NodeKind::Custom {
                custom_type: self.custom_type.as_deref(),
            },
            _ => NodeKind::Breakdown,
        }
    }

    /// Check field consistency against the node type
    ///
    /// # Errors
    /// Returns [`GraphError::InvalidNodeData`] describing the first problem.
    pub fn validate(&self) -> GraphResult<()> {
        let invalid = |reason: &str| GraphError::InvalidNodeData {
            node_id: self.id,
            reason: reason.to_string(),
        };

        if self.custom_type.is_some() && self.node_type != NodeType::Custom {
            return Err(invalid("custom type set on a non-custom node"));
        }
        match (self.category(), self.argued_diagram_part_id) {
            (Category::Justification, None) => {
                Err(invalid("justification node without an argued diagram part"))
            }
            (Category::Breakdown | Category::Research, Some(_)) => {
                Err(invalid("argued diagram part set on a non-justification node"))
            }
            _ => Ok(()),
        }
    }
}

/// A directed, typed arc: `source` is the parent, `target` the child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub relation: RelationName,
    /// Only for [`RelationName::Custom`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
    #[serde(default)]
    pub notes: String,
    /// Only for justification relations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argued_diagram_part_id: Option<GraphPartId>,
}

impl Edge {
    /// Create an edge `source --relation--> target`
    #[must_use]
    pub fn new(source: NodeId, relation: RelationName, target: NodeId) -> Self {
        Self {
            id: EdgeId::new(),
            source,
            target,
            relation,
            custom_label: None,
            notes: String::new(),
            argued_diagram_part_id: None,
        }
    }

    /// Replace the generated id (fixtures, imports)
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: EdgeId) -> Self {
        self.id = id;
        self
    }

    /// Set the custom label (custom relations only; checked on insert)
    #[inline]
    #[must_use]
    pub fn with_custom_label(mut self, label: impl Into<String>) -> Self {
        self.custom_label = Some(label.into());
        self
    }

    /// Mark this edge as part of a justification tree about `part`
    #[inline]
    #[must_use]
    pub fn arguing(mut self, part: GraphPartId) -> Self {
        self.argued_diagram_part_id = Some(part);
        self
    }

    /// Whether `node` is an endpoint
    #[inline]
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint
    #[inline]
    #[must_use]
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    /// Check field consistency against the relation
    ///
    /// # Errors
    /// Returns [`GraphError::InvalidEdgeData`] or [`GraphError::SelfLoop`].
    pub fn validate(&self) -> GraphResult<()> {
        let invalid = |reason: &str| GraphError::InvalidEdgeData {
            edge_id: self.id,
            reason: reason.to_string(),
        };

        if self.source == self.target {
            return Err(GraphError::SelfLoop(self.id));
        }
        if self.custom_label.is_some() && self.relation != RelationName::Custom {
            return Err(invalid("custom label set on a non-custom relation"));
        }
        let justification = self.relation.category() == Category::Justification;
        match (justification, self.argued_diagram_part_id) {
            (true, None) => Err(invalid("justification edge without an argued diagram part")),
            (false, Some(_)) => Err(invalid("argued diagram part set on a non-justification edge")),
            _ => Ok(()),
        }
    }
}

/// Parts removed by a cascading delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removed {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Removed {
    /// Nothing was removed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Wire shape of a graph: plain lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphParts {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// The topic graph: nodes and edges keyed by id
///
/// Deserialization does not validate; call [`Graph::validate`] (or build
/// with [`Graph::from_parts`]) before trusting foreign data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GraphParts", into = "GraphParts")]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
}

impl From<GraphParts> for Graph {
    fn from(parts: GraphParts) -> Self {
        Self {
            nodes: parts.nodes.into_iter().map(|node| (node.id, node)).collect(),
            edges: parts.edges.into_iter().map(|edge| (edge.id, edge)).collect(),
        }
    }
}

impl From<Graph> for GraphParts {
    fn from(graph: Graph) -> Self {
        Self {
            nodes: graph.nodes.into_values().collect(),
            edges: graph.edges.into_values().collect(),
        }
    }
}

impl Graph {
    /// Empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph, validating every part
    ///
    /// Nodes are inserted first, then edges, then justification references
    /// are checked, so edge order does not matter.
    ///
    /// # Errors
    /// Returns the first integrity or data error found.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> GraphResult<Self> {
        let mut graph = Self::new();
        for node in nodes {
            node.validate()?;
            if graph.nodes.contains_key(&node.id) {
                return Err(GraphError::DuplicateId(node.id.into()));
            }
            graph.nodes.insert(node.id, node);
        }
        for edge in edges {
            graph.check_edge(&edge)?;
            // node and edge ids share one namespace
            if graph.contains_part(edge.id.into()) {
                return Err(GraphError::DuplicateId(edge.id.into()));
            }
            graph.edges.insert(edge.id, edge);
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Node by id
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Edge by id
    #[inline]
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Mutable node by id
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Mutable edge by id
    #[inline]
    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(&id)
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// Edges in id order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Whether a node or edge with this id exists
    #[must_use]
    pub fn contains_part(&self, part: GraphPartId) -> bool {
        self.nodes.contains_key(&NodeId(part.0)) || self.edges.contains_key(&EdgeId(part.0))
    }

    /// Edges where `node` is the target (leading to parents)
    pub fn edges_into(&self, node: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values().filter(move |edge| edge.target == node)
    }

    /// Edges where `node` is the source (leading to children)
    pub fn edges_out_of(&self, node: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values().filter(move |edge| edge.source == node)
    }

    /// Edges touching `node` in either direction
    pub fn incident_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values().filter(move |edge| edge.touches(node))
    }

    /// Parts (nodes and edges) whose justification argues about `part`
    #[must_use]
    pub fn parts_arguing_about(&self, part: GraphPartId) -> Vec<GraphPartId> {
        let nodes = self
            .nodes
            .values()
            .filter(|node| node.argued_diagram_part_id == Some(part))
            .map(|node| GraphPartId::from(node.id));
        let edges = self
            .edges
            .values()
            .filter(|edge| edge.argued_diagram_part_id == Some(part))
            .map(|edge| GraphPartId::from(edge.id));
        nodes.chain(edges).collect()
    }

    /// Insert a node
    ///
    /// # Errors
    /// Duplicate id, inconsistent fields, or an argued part that is missing.
    pub fn insert_node(&mut self, node: Node) -> GraphResult<()> {
        node.validate()?;
        if self.contains_part(node.id.into()) {
            return Err(GraphError::DuplicateId(node.id.into()));
        }
        if let Some(argued) = node.argued_diagram_part_id {
            if !self.contains_part(argued) {
                return Err(GraphError::MissingArguedPart {
                    part_id: node.id.into(),
                    argued_part_id: argued,
                });
            }
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Insert an edge after checking fields, endpoints and the ontology
    ///
    /// # Errors
    /// See [`Graph::check_edge`]; also rejects duplicate ids and missing
    /// argued parts.
    pub fn insert_edge(&mut self, edge: Edge) -> GraphResult<()> {
        self.check_edge(&edge)?;
        if self.contains_part(edge.id.into()) {
            return Err(GraphError::DuplicateId(edge.id.into()));
        }
        if let Some(argued) = edge.argued_diagram_part_id {
            if !self.contains_part(argued) {
                return Err(GraphError::MissingArguedPart {
                    part_id: edge.id.into(),
                    argued_part_id: argued,
                });
            }
        }
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    /// Check an edge against this graph without inserting it
    ///
    /// # Errors
    /// Inconsistent fields, missing endpoints (referential integrity) or an
    /// illegal relation for the endpoint types (ontology).
    pub fn check_edge(&self, edge: &Edge) -> GraphResult<()> {
        edge.validate()?;
        let source = self.nodes.get(&edge.source).ok_or(GraphError::MissingNode {
            edge_id: edge.id,
            node_id: edge.source,
        })?;
        let target = self.nodes.get(&edge.target).ok_or(GraphError::MissingNode {
            edge_id: edge.id,
            node_id: edge.target,
        })?;
        if !is_legal_relation(source.node_type, edge.relation, target.node_type) {
            return Err(GraphError::OntologyViolation {
                edge_id: edge.id,
                source_type: source.node_type,
                relation: edge.relation,
                target_type: target.node_type,
            });
        }
        Ok(())
    }

    /// Remove a node, its edges and every justification part about them
    ///
    /// # Errors
    /// [`GraphError::NodeNotFound`] if the node is absent.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<Removed> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::NodeNotFound(id));
        }
        Ok(self.cascade_remove(id.into()))
    }

    /// Remove an edge and every justification part about it
    ///
    /// # Errors
    /// [`GraphError::EdgeNotFound`] if the edge is absent.
    pub fn remove_edge(&mut self, id: EdgeId) -> GraphResult<Removed> {
        if !self.edges.contains_key(&id) {
            return Err(GraphError::EdgeNotFound(id));
        }
        Ok(self.cascade_remove(id.into()))
    }

    fn cascade_remove(&mut self, start: GraphPartId) -> Removed {
        let mut removed = Removed::default();
        let mut queued = BTreeSet::from([start]);
        let mut pending = vec![start];

        while let Some(part) = pending.pop() {
            let mut dependents = self.parts_arguing_about(part);

            if let Some(node) = self.nodes.remove(&NodeId(part.0)) {
                dependents.extend(self.incident_edges(node.id).map(|edge| GraphPartId::from(edge.id)));
                removed.nodes.push(node);
            } else if let Some(edge) = self.edges.remove(&EdgeId(part.0)) {
                removed.edges.push(edge);
            }

            for dependent in dependents {
                if queued.insert(dependent) {
                    pending.push(dependent);
                }
            }
        }

        removed
    }

    /// Full integrity check
    ///
    /// # Errors
    /// Returns the first violation; see [`Graph::violations`] for all.
    pub fn validate(&self) -> GraphResult<()> {
        match self.violations().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Every integrity or data violation in the graph
    #[must_use]
    pub fn violations(&self) -> Vec<GraphError> {
        let mut violations = Vec::new();
        for node in self.nodes.values() {
            if let Err(err) = node.validate() {
                violations.push(err);
            }
            if let Some(argued) = node.argued_diagram_part_id {
                if !self.contains_part(argued) {
                    violations.push(GraphError::MissingArguedPart {
                        part_id: node.id.into(),
                        argued_part_id: argued,
                    });
                }
            }
        }
        for edge in self.edges.values() {
            if let Err(err) = self.check_edge(edge) {
                violations.push(err);
            }
            if let Some(argued) = edge.argued_diagram_part_id {
                if !self.contains_part(argued) {
                    violations.push(GraphError::MissingArguedPart {
                        part_id: edge.id.into(),
                        argued_part_id: argued,
                    });
                }
            }
        }
        violations
    }

    /// Copy of the nodes with the given ids, skipping unknown ids, in id order
    #[must_use]
    pub fn nodes_by_ids(&self, ids: &BTreeSet<NodeId>) -> Vec<Node> {
        ids.iter().filter_map(|id| self.nodes.get(id)).cloned().collect()
    }
}
