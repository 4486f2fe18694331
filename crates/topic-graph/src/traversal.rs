//! Traversal engine
//!
//! Ancestor/descendant search over a fixed [`Graph`] snapshot, parameterised
//! by the relations to walk through and the relations (and node types) to
//! report. Walks are breadth-first over a petgraph index and track visited
//! nodes, so cycles terminate and the start node is never reported.

use crate::graph::{Graph, Node};
use crate::ids::{EdgeId, NodeId};
use crate::ontology::{NodeType, RelationName};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Nodes partitioned by how they relate to a center node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectAndIndirect<N> {
    /// Connected to the center by one edge of a direct relation
    pub direct: Vec<N>,
    /// Everything else (reached through intermediate parts)
    pub indirect: Vec<N>,
}

impl<N> Default for DirectAndIndirect<N> {
    fn default() -> Self {
        Self {
            direct: Vec::new(),
            indirect: Vec::new(),
        }
    }
}

impl<N> DirectAndIndirect<N> {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.indirect.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.direct.len() + self.indirect.len()
    }

    /// Map both halves
    pub fn map<M>(self, f: impl Fn(N) -> M) -> DirectAndIndirect<M> {
        DirectAndIndirect {
            direct: self.direct.into_iter().map(&f).collect(),
            indirect: self.indirect.into_iter().map(&f).collect(),
        }
    }
}

/// Traversal index over one graph snapshot
///
/// Build once and reuse when several walks run against the same snapshot.
#[derive(Debug)]
pub struct Traversal<'g> {
    graph: &'g Graph,
    index: DiGraph<NodeId, (EdgeId, RelationName)>,
    lookup: HashMap<NodeId, NodeIndex>,
}

impl<'g> Traversal<'g> {
    /// Index `graph`
    #[must_use]
    pub fn new(graph: &'g Graph) -> Self {
        let mut index = DiGraph::with_capacity(graph.node_count(), graph.edge_count());
        let mut lookup = HashMap::with_capacity(graph.node_count());

        for node in graph.nodes() {
            lookup.insert(node.id, index.add_node(node.id));
        }
        for edge in graph.edges() {
            if let (Some(&source), Some(&target)) = (lookup.get(&edge.source), lookup.get(&edge.target)) {
                index.add_edge(source, target, (edge.id, edge.relation));
            }
        }

        Self {
            graph,
            index,
            lookup,
        }
    }

    /// Graph this index was built from
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Parents, grandparents, ... of `node`
    ///
    /// Walks edges where the current node is the target, through any relation
    /// in `edges_to_traverse`. With `edges_to_include`, only nodes reached by
    /// an edge of one of those relations are reported; with
    /// `node_types_to_include`, only nodes of those types. An empty
    /// `edges_to_traverse` checks direct parents only.
    ///
    /// Unknown `node` yields an empty result.
    #[must_use]
    pub fn ancestors(
        &self,
        node: NodeId,
        edges_to_traverse: &[RelationName],
        edges_to_include: Option<&[RelationName]>,
        node_types_to_include: Option<&[NodeType]>,
    ) -> Vec<&'g Node> {
        self.walk(node, Direction::Incoming, edges_to_traverse, edges_to_include)
            .into_iter()
            .filter_map(|id| self.graph.node(id))
            .filter(|found| node_types_to_include.map_or(true, |types| types.contains(&found.node_type)))
            .collect()
    }

    /// Children, grandchildren, ... of `node`
    ///
    /// Mirror of [`Traversal::ancestors`] walking edges where the current node
    /// is the source; nodes of `node_types_to_exclude` are dropped.
    #[must_use]
    pub fn descendants(
        &self,
        node: NodeId,
        edges_to_traverse: &[RelationName],
        edges_to_include: Option<&[RelationName]>,
        node_types_to_exclude: Option<&[NodeType]>,
    ) -> Vec<&'g Node> {
        self.walk(node, Direction::Outgoing, edges_to_traverse, edges_to_include)
            .into_iter()
            .filter_map(|id| self.graph.node(id))
            .filter(|found| node_types_to_exclude.map_or(true, |types| !types.contains(&found.node_type)))
            .collect()
    }

    /// Partition `candidates` into direct and indirect relatives of `center`
    ///
    /// A candidate is direct when one edge of a relation in
    /// `direct_relations` joins it to `center`, in either direction.
    #[must_use]
    pub fn split_by_direct_and_indirect(
        &self,
        center: NodeId,
        direct_relations: &[RelationName],
        candidates: Vec<&'g Node>,
    ) -> DirectAndIndirect<&'g Node> {
        let direct_ids: HashSet<NodeId> = self
            .graph
            .incident_edges(center)
            .filter(|edge| direct_relations.contains(&edge.relation))
            .filter_map(|edge| edge.other_end(center))
            .collect();

        let (direct, indirect) = candidates
            .into_iter()
            .partition(|candidate| direct_ids.contains(&candidate.id));

        DirectAndIndirect { direct, indirect }
    }

    fn walk(
        &self,
        start: NodeId,
        direction: Direction,
        edges_to_traverse: &[RelationName],
        edges_to_include: Option<&[RelationName]>,
    ) -> BTreeSet<NodeId> {
        let mut reported = BTreeSet::new();
        let Some(&start_ix) = self.lookup.get(&start) else {
            return reported;
        };

        let direct_only = edges_to_traverse.is_empty();
        let includes = |relation: RelationName| edges_to_include.map_or(true, |set| set.contains(&relation));

        let mut visited = HashSet::from([start_ix]);
        let mut queue = VecDeque::from([start_ix]);

        while let Some(current) = queue.pop_front() {
            for edge in self.index.edges_directed(current, direction) {
                let (_, relation) = *edge.weight();
                let followable = if direct_only {
                    includes(relation)
                } else {
                    edges_to_traverse.contains(&relation)
                };
                if !followable {
                    continue;
                }

                let next = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                if next == start_ix {
                    continue;
                }
                if includes(relation) {
                    reported.insert(self.index[next]);
                }
                if !direct_only && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        tracing::trace!(%start, ?direction, found = reported.len(), "walked graph");
        reported
    }
}

/// Ancestors of `node` in `graph`; see [`Traversal::ancestors`]
#[must_use]
pub fn ancestors<'g>(
    node: NodeId,
    graph: &'g Graph,
    edges_to_traverse: &[RelationName],
    edges_to_include: Option<&[RelationName]>,
    node_types_to_include: Option<&[NodeType]>,
) -> Vec<&'g Node> {
    Traversal::new(graph).ancestors(node, edges_to_traverse, edges_to_include, node_types_to_include)
}

/// Descendants of `node` in `graph`; see [`Traversal::descendants`]
#[must_use]
pub fn descendants<'g>(
    node: NodeId,
    graph: &'g Graph,
    edges_to_traverse: &[RelationName],
    edges_to_include: Option<&[RelationName]>,
    node_types_to_exclude: Option<&[NodeType]>,
) -> Vec<&'g Node> {
    Traversal::new(graph).descendants(node, edges_to_traverse, edges_to_include, node_types_to_exclude)
}

/// See [`Traversal::split_by_direct_and_indirect`]
#[must_use]
pub fn split_nodes_by_direct_and_indirect<'g>(
    center: NodeId,
    graph: &'g Graph,
    direct_relations: &[RelationName],
    candidates: Vec<&'g Node>,
) -> DirectAndIndirect<&'g Node> {
    Traversal::new(graph).split_by_direct_and_indirect(center, direct_relations, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use RelationName::{Addresses, Causes, Creates, Has};

    fn node(node_type: NodeType, n: u128) -> Node {
        Node::new(node_type, format!("{node_type} {n}"))
            .unwrap()
            .with_id(NodeId::from_u128(n))
    }

    fn edge(source: u128, relation: RelationName, target: u128, n: u128) -> Edge {
        Edge::new(NodeId::from_u128(source), relation, NodeId::from_u128(target))
            .with_id(EdgeId::from_u128(n))
    }

    fn ids(nodes: &[&Node]) -> Vec<u128> {
        nodes.iter().map(|node| node.id.as_uuid().as_u128()).collect()
    }

    /// solution(1) has component(2); component creates benefit(3);
    /// solution creates benefit(4); benefit(4) sits under a problem via addresses
    fn solution_graph() -> Graph {
        Graph::from_parts(
            vec![
                node(NodeType::Solution, 1),
                node(NodeType::SolutionComponent, 2),
                node(NodeType::Benefit, 3),
                node(NodeType::Benefit, 4),
                node(NodeType::Problem, 5),
            ],
            vec![
                edge(2, Has, 1, 100),
                edge(3, Creates, 2, 101),
                edge(4, Creates, 1, 102),
                edge(5, Addresses, 4, 103),
            ],
        )
        .unwrap()
    }

    #[test]
    fn ancestors_walk_through_has_but_report_creates() {
        let graph = solution_graph();
        let found = ancestors(
            NodeId::from_u128(1),
            &graph,
            &[Has, Creates],
            Some(&[Creates]),
            None,
        );
        assert_eq!(ids(&found), vec![3, 4]);
    }

    #[test]
    fn ancestors_respect_node_type_filter() {
        let graph = solution_graph();
        let found = ancestors(
            NodeId::from_u128(1),
            &graph,
            &[Has, Creates],
            None,
            Some(&[NodeType::SolutionComponent]),
        );
        assert_eq!(ids(&found), vec![2]);
    }

    #[test]
    fn empty_traverse_means_direct_only() {
        let graph = solution_graph();
        let found = ancestors(NodeId::from_u128(1), &graph, &[], Some(&[Creates]), None);
        assert_eq!(ids(&found), vec![4]);

        let found = ancestors(NodeId::from_u128(1), &graph, &[], None, None);
        assert_eq!(ids(&found), vec![2, 4]);
    }

    #[test]
    fn descendants_walk_forward() {
        let graph = solution_graph();
        let found = descendants(NodeId::from_u128(3), &graph, &[Has, Creates], None, None);
        assert_eq!(ids(&found), vec![1, 2]);

        let found = descendants(
            NodeId::from_u128(3),
            &graph,
            &[Has, Creates],
            None,
            Some(&[NodeType::SolutionComponent]),
        );
        assert_eq!(ids(&found), vec![1]);
    }

    #[test]
    fn cycles_terminate_and_exclude_self() {
        let graph = Graph::from_parts(
            vec![
                node(NodeType::Cause, 1),
                node(NodeType::Cause, 2),
                node(NodeType::Cause, 3),
            ],
            vec![
                edge(1, Causes, 2, 100),
                edge(2, Causes, 3, 101),
                edge(3, Causes, 1, 102),
            ],
        )
        .unwrap();

        let found = descendants(NodeId::from_u128(1), &graph, &[Causes], None, None);
        assert_eq!(ids(&found), vec![2, 3]);
        let found = ancestors(NodeId::from_u128(1), &graph, &[Causes], None, None);
        assert_eq!(ids(&found), vec![2, 3]);
    }

    #[test]
    fn unknown_node_yields_nothing() {
        let graph = solution_graph();
        assert!(ancestors(NodeId::from_u128(42), &graph, &[Has], None, None).is_empty());
    }

    #[test]
    fn split_partitions_candidates() {
        let graph = solution_graph();
        let traversal = Traversal::new(&graph);
        let candidates = traversal.ancestors(NodeId::from_u128(1), &[Has, Creates], Some(&[Creates]), None);

        let split = traversal.split_by_direct_and_indirect(NodeId::from_u128(1), &[Creates], candidates);

        assert_eq!(ids(&split.direct), vec![4]);
        assert_eq!(ids(&split.indirect), vec![3]);
    }
}
