//! Testing utilities for the topic graph workspace
//!
//! Shared fixtures: deterministic ids, a topic builder, a canned sample
//! topic and proptest strategies for arbitrary graphs.

#![allow(missing_docs)]

use proptest::prelude::*;
use topic_graph::{
    Edge, EdgeId, Graph, GraphPartId, Node, NodeId, NodeType, Perspective, RelationName, Score,
    TopicState,
};

/// Node id from a small integer
#[must_use]
pub fn node_id(n: u128) -> NodeId {
    NodeId::from_u128(n)
}

/// Edge id from a small integer
#[must_use]
pub fn edge_id(n: u128) -> EdgeId {
    EdgeId::from_u128(n)
}

/// Part id of the node numbered `n`
#[must_use]
pub fn node_part(n: u128) -> GraphPartId {
    node_id(n).into()
}

/// Part id of the edge numbered `n`
#[must_use]
pub fn edge_part(n: u128) -> GraphPartId {
    edge_id(n).into()
}

/// Builds topics with fixed ids; panics on illegal parts
#[derive(Debug, Default)]
pub struct TopicBuilder {
    state: TopicState,
}

impl TopicBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn node(mut self, n: u128, node_type: NodeType, label: &str) -> Self {
        let node = Node::new(node_type, label).unwrap().with_id(node_id(n));
        self.state.add_node(node).unwrap();
        self
    }

    /// `source` (parent) `--relation-->` `target` (child)
    #[must_use]
    pub fn edge(mut self, n: u128, source: u128, relation: RelationName, target: u128) -> Self {
        let edge = Edge::new(node_id(source), relation, node_id(target)).with_id(edge_id(n));
        self.state.add_edge(edge).unwrap();
        self
    }

    /// Root claim `n` arguing about `part`
    #[must_use]
    pub fn claim(mut self, n: u128, part: GraphPartId, label: &str) -> Self {
        let node = Node::justification(NodeType::RootClaim, label, part)
            .unwrap()
            .with_id(node_id(n));
        self.state.add_node(node).unwrap();
        self
    }

    /// Support or critique `n` under `parent`, joined by edge `edge`
    #[must_use]
    pub fn argument(mut self, n: u128, edge: u128, parent: u128, node_type: NodeType, label: &str) -> Self {
        let part = self
            .state
            .graph
            .node(node_id(parent))
            .and_then(|node| node.argued_diagram_part_id)
            .unwrap();
        let relation = if node_type == NodeType::Critique {
            RelationName::Critiques
        } else {
            RelationName::Supports
        };
        let node = Node::justification(node_type, label, part)
            .unwrap()
            .with_id(node_id(n));
        self.state.add_node(node).unwrap();
        let edge = Edge::new(node_id(parent), relation, node_id(n))
            .with_id(edge_id(edge))
            .arguing(part);
        self.state.add_edge(edge).unwrap();
        self
    }

    #[must_use]
    pub fn score(mut self, user: &str, part: GraphPartId, score: Score) -> Self {
        self.state
            .set_score(Perspective::new(user), part, score)
            .unwrap();
        self
    }

    #[must_use]
    pub fn anchor(mut self, n: u128) -> Self {
        self.state.set_anchor(Some(node_id(n))).unwrap();
        self
    }

    #[must_use]
    pub fn build(self) -> TopicState {
        self.state
    }
}

/// A small commuting topic
///
/// ```text
/// 1 problem "Commute takes too long"        (anchor)
/// 2 cause "Car traffic"                      causes 1
/// 3 criterion "Cheap"                        criterion for 1
/// 4 solution "Bike lanes"                    addresses 1
/// 5 solution "Congestion charge"             addresses 2
/// 6 component "Protected lanes"              4 has 6
/// 7 benefit "Exercise"                       4 creates 7
/// 8 benefit "Safety"                         6 creates 8
/// 9 detriment "Less parking"                 4 creates 9
/// 10 obstacle "Winter weather"               impedes 4
/// 11 mitigation "Snow clearing"              mitigates 10
/// 12 question "How many cyclists?"           asks about 4
/// 13 effect "Late to work"                   1 causes 13
/// 20 root claim about edge 102, 21 support, 22 critique
/// ```
///
/// Scores: ann and bob score solution 4 (2 and 8), ann scores solution 5 (9).
#[must_use]
pub fn sample_topic() -> TopicState {
    TopicBuilder::new()
        .node(1, NodeType::Problem, "Commute takes too long")
        .node(2, NodeType::Cause, "Car traffic")
        .node(3, NodeType::Criterion, "Cheap")
        .node(4, NodeType::Solution, "Bike lanes")
        .node(5, NodeType::Solution, "Congestion charge")
        .node(6, NodeType::SolutionComponent, "Protected lanes")
        .node(7, NodeType::Benefit, "Exercise")
        .node(8, NodeType::Benefit, "Safety")
        .node(9, NodeType::Detriment, "Less parking")
        .node(10, NodeType::Obstacle, "Winter weather")
        .node(11, NodeType::Mitigation, "Snow clearing")
        .node(12, NodeType::Question, "How many cyclists?")
        .node(13, NodeType::Effect, "Late to work")
        .edge(100, 1, RelationName::Causes, 2)
        .edge(101, 1, RelationName::CriterionFor, 3)
        .edge(102, 1, RelationName::Addresses, 4)
        .edge(103, 2, RelationName::Addresses, 5)
        .edge(104, 6, RelationName::Has, 4)
        .edge(105, 7, RelationName::Creates, 4)
        .edge(106, 8, RelationName::Creates, 6)
        .edge(107, 9, RelationName::Creates, 4)
        .edge(108, 4, RelationName::Impedes, 10)
        .edge(109, 10, RelationName::Mitigates, 11)
        .edge(110, 4, RelationName::AsksAbout, 12)
        .edge(111, 13, RelationName::Causes, 1)
        .edge(112, 3, RelationName::Fulfills, 7)
        .claim(20, edge_part(102), "Bike lanes shorten commutes")
        .argument(21, 200, 20, NodeType::Support, "Cyclists skip traffic")
        .argument(22, 201, 21, NodeType::Critique, "Only for short distances")
        .score("ann", node_part(4), Score::Two)
        .score("bob", node_part(4), Score::Eight)
        .score("ann", node_part(5), Score::Nine)
        .anchor(1)
        .build()
}

const BREAKDOWN: [NodeType; 11] = [
    NodeType::Problem,
    NodeType::Cause,
    NodeType::Criterion,
    NodeType::Benefit,
    NodeType::Effect,
    NodeType::Detriment,
    NodeType::SolutionComponent,
    NodeType::Solution,
    NodeType::Obstacle,
    NodeType::MitigationComponent,
    NodeType::Mitigation,
];

prop_compose! {
    /// Arbitrary legal breakdown graph; cycles allowed, illegal triples dropped
    pub fn arb_graph(max_nodes: usize, max_edges: usize)(
        types in proptest::collection::vec(0..BREAKDOWN.len(), 1..=max_nodes),
        edges in proptest::collection::vec(
            (0..max_nodes, 0..RelationName::ALL.len(), 0..max_nodes),
            0..=max_edges,
        ),
    ) -> Graph {
        let nodes: Vec<Node> = types
            .iter()
            .enumerate()
            .map(|(i, t)| Node::new(BREAKDOWN[*t], format!("n{i}")).unwrap().with_id(node_id(i as u128 + 1)))
            .collect();
        let edges: Vec<Edge> = edges
            .into_iter()
            .enumerate()
            .filter(|(_, (source, _, target))| *source < nodes.len() && *target < nodes.len())
            .map(|(i, (source, relation, target))| {
                Edge::new(nodes[source].id, RelationName::ALL[relation], nodes[target].id)
                    .with_id(edge_id(1000 + i as u128))
            })
            .collect();

        let mut state = TopicState::new();
        state.import(nodes, edges);
        state.graph
    }
}
