//! Identifiers for graph parts
//!
//! Every node and edge gets a UUIDv4 at creation. Ids are never reused, and
//! their `Ord` impl is what gives the view pipeline its stable ordering.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! part_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Build an id from a fixed integer (fixtures, imports)
            #[inline]
            #[must_use]
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            /// Underlying UUID
            #[inline]
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

part_id!(
    /// Unique node identifier
    NodeId
);

part_id!(
    /// Unique edge identifier
    EdgeId
);

part_id!(
    /// Id of any graph part (node or edge)
    ///
    /// Scores and justification trees refer to parts without caring which
    /// kind they are.
    GraphPartId
);

impl From<NodeId> for GraphPartId {
    fn from(value: NodeId) -> Self {
        Self(value.0)
    }
}

impl From<EdgeId> for GraphPartId {
    fn from(value: EdgeId) -> Self {
        Self(value.0)
    }
}

impl PartialEq<NodeId> for GraphPartId {
    fn eq(&self, other: &NodeId) -> bool {
        self.0 == other.0
    }
}

impl PartialEq<EdgeId> for GraphPartId {
    fn eq(&self, other: &EdgeId) -> bool {
        self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ids_are_unique() {
        assert_ne!(NodeId::new(), NodeId::new());
    }

    #[test]
    fn part_id_compares_with_node_and_edge_ids() {
        let node = NodeId::from_u128(7);
        let edge = EdgeId::from_u128(7);
        let part = GraphPartId::from(node);
        assert_eq!(part, node);
        assert_eq!(part, edge);
        assert_eq!(GraphPartId::from(edge), part);
    }

    #[test]
    fn id_parses_from_display() {
        let id = NodeId::new();
        let parsed = NodeId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn id_serializes_transparently() {
        let id = EdgeId::from_u128(1);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
