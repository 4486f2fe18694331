//! Topic Graph - typed problem-solving graphs
//!
//! The pure core of the engine:
//! - The ontology deciding which relations may join which node types
//! - The graph model with cascading deletes and integrity checks
//! - Ancestor/descendant traversal along relation allow-lists
//! - Aspect filters ("benefits of this solution") split into direct and indirect
//! - The view filter pipeline and multi-perspective score aggregation
//!
//! Everything here works on an immutable snapshot except [`TopicState`]'s
//! mutation actions, which the sync crate wraps in a commit path.
//!
//! # Example
//!
//! ```rust,ignore
//! use topic_graph::prelude::*;
//!
//! let mut state = TopicState::new();
//! let problem = state.create_node(NodeType::Problem, "Traffic")?;
//! let (solution, _) = state.create_connected_node(
//!     problem,
//!     Attach::AsChild,
//!     RelationName::Addresses,
//!     NodeType::Solution,
//!     "Bike lanes",
//! )?;
//!
//! let found = aspects::solutions(problem, &state.graph);
//! assert_eq!(found.direct[0].id, solution);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aspects;
pub mod error;
pub mod graph;
pub mod ids;
pub mod ontology;
pub mod score;
pub mod state;
pub mod traversal;
pub mod view;

// Re-exports for convenience
pub use aspects::AspectNodes;
pub use error::{GraphError, GraphResult};
pub use graph::{Edge, Graph, GraphParts, Node, NodeKind, Removed};
pub use ids::{EdgeId, GraphPartId, NodeId};
pub use ontology::{
    category_of, is_legal_relation, is_legal_relation_name, legal_relations, node_types_by_category,
    relation_phrase, relation_rules, relations_by_category, Category, NodeType, RelationName,
    RelationRule,
};
pub use score::{get_display_scores, AggregationMode, Perspective, Score, UserScores};
pub use state::{Attach, ImportReport, TopicState};
pub use traversal::{
    ancestors, descendants, split_nodes_by_direct_and_indirect, DirectAndIndirect, Traversal,
};
pub use view::{filter_view, Comparator, ScoreFilter, ViewConfig, ViewOutput, ViewType};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with topic graphs
    pub use crate::{
        aspects, filter_view, AggregationMode, Attach, Category, Edge, Graph, GraphError,
        GraphPartId, Node, NodeId, NodeType, Perspective, RelationName, Score, TopicState,
        ViewConfig, ViewType,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
