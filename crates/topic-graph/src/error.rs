//! Error types for the topic graph
//!
//! Two classes matter to callers:
//! - integrity violations (ontology, referential) which reject one record
//! - lookups of parts that do not exist
//!
//! Traversals and filters never produce these; they return empty results
//! for stale ids instead.

use crate::ids::{EdgeId, GraphPartId, NodeId};
use crate::ontology::{Category, NodeType, RelationName};

/// Errors raised while mutating or validating a graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Edge relation is not legal for its endpoint types
    #[error("ontology violation on edge {edge_id}: {source_type} -{relation}-> {target_type} is not allowed")]
    OntologyViolation {
        edge_id: EdgeId,
        source_type: NodeType,
        relation: RelationName,
        target_type: NodeType,
    },

    /// Edge references a node that is not in the graph
    #[error("edge {edge_id} references missing node {node_id}")]
    MissingNode { edge_id: EdgeId, node_id: NodeId },

    /// Justification part argues about a part that is not in the graph
    #[error("part {part_id} argues about missing part {argued_part_id}")]
    MissingArguedPart {
        part_id: GraphPartId,
        argued_part_id: GraphPartId,
    },

    /// Node lookup failed
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Edge lookup failed
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// Lookup of a part that may be a node or an edge failed
    #[error("graph part not found: {0}")]
    PartNotFound(GraphPartId),

    /// Id already present
    #[error("duplicate id: {0}")]
    DuplicateId(GraphPartId),

    /// Node fields inconsistent with its type
    #[error("invalid node {node_id}: {reason}")]
    InvalidNodeData { node_id: NodeId, reason: String },

    /// Edge fields inconsistent with its relation
    #[error("invalid edge {edge_id}: {reason}")]
    InvalidEdgeData { edge_id: EdgeId, reason: String },

    /// Type change would move a node to another category
    #[error("cannot change node {node_id} from {from:?} category to {to:?}")]
    CategoryChange {
        node_id: NodeId,
        from: Category,
        to: Category,
    },

    /// Type change would add or remove the root of a justification tree
    #[error("node {0} cannot change between root claim and argument")]
    RootClaimChange(NodeId),

    /// Edge from a node to itself
    #[error("edge {0} connects a node to itself")]
    SelfLoop(EdgeId),
}

impl GraphError {
    /// Ontology or referential integrity violation (data corruption class)
    #[inline]
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::OntologyViolation { .. } | Self::MissingNode { .. } | Self::MissingArguedPart { .. }
        )
    }

    /// Lookup of a part that does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound(_) | Self::EdgeNotFound(_) | Self::PartNotFound(_)
        )
    }
}

/// Result alias for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
