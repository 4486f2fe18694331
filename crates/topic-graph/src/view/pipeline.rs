//! View filter pipeline
//!
//! Stages run in a fixed order, each narrowing or widening the node set
//! produced by the one before:
//!
//! 1. view-type selection, restricted to enabled categories
//! 2. node-type allow-list
//! 3. score filter (shown nodes are exempt)
//! 4. show-list union
//! 5. secondary neighbours, one hop and regardless of category
//! 6. hide-list subtraction
//! 7. edges with both endpoints visible
//! 8. implied-edge suppression
//! 9. problem/criterion/solution edge suppression
//!
//! The output is sorted by id.

use super::config::{ViewConfig, ViewType};
use crate::aspects;
use crate::graph::{Edge, Graph, Node};
use crate::ids::{EdgeId, GraphPartId, NodeId};
use crate::ontology::{Category, NodeType, RelationName};
use crate::score::{get_display_scores, UserScores};
use crate::traversal::Traversal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filtered nodes and edges, sorted by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOutput {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl ViewOutput {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Ids of the visible nodes
    #[must_use]
    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.nodes.iter().map(|node| node.id).collect()
    }

    /// Ids of the visible edges
    #[must_use]
    pub fn edge_ids(&self) -> BTreeSet<EdgeId> {
        self.edges.iter().map(|edge| edge.id).collect()
    }
}

/// Run the full pipeline over one snapshot
#[must_use]
pub fn filter_view(graph: &Graph, user_scores: &UserScores, config: &ViewConfig) -> ViewOutput {
    let mut visible = select(graph, config);

    if let Some(allowed) = &config.node_types {
        visible.retain(|id| graph.node(*id).is_some_and(|node| allowed.contains(&node.node_type)));
    }

    if let Some(score_filter) = &config.score_filter {
        let parts: Vec<GraphPartId> = visible.iter().map(|id| GraphPartId::from(*id)).collect();
        let scores = get_display_scores(&parts, &config.perspectives, user_scores, config.aggregation);
        visible.retain(|id| {
            config.show.contains(id)
                || scores
                    .get(&GraphPartId::from(*id))
                    .map_or(true, |score| score_filter.passes(*score))
        });
    }

    visible.extend(config.show.iter().filter(|id| graph.node(**id).is_some()));

    if config.secondary_neighbors {
        let neighbors: Vec<NodeId> = visible
            .iter()
            .flat_map(|id| graph.incident_edges(*id).filter_map(move |edge| edge.other_end(*id)))
            .filter(|id| !config.hide.contains(id))
            .collect();
        visible.extend(neighbors);
    }

    for hidden in &config.hide {
        visible.remove(hidden);
    }

    let implied: BTreeSet<GraphPartId> = if config.show_implied_edges {
        BTreeSet::new()
    } else {
        implied_parts(graph)
    };

    let edges: Vec<Edge> = graph
        .edges()
        .filter(|edge| visible.contains(&edge.source) && visible.contains(&edge.target))
        .filter(|edge| !implied.contains(&GraphPartId::from(edge.id)))
        .filter(|edge| !(config.hide_problem_criterion_solution_edges && is_tradeoff_edge(graph, edge)))
        .cloned()
        .collect();

    let output = ViewOutput {
        nodes: graph.nodes_by_ids(&visible),
        edges,
    };
    tracing::debug!(
        nodes = output.nodes.len(),
        edges = output.edges.len(),
        "filtered view"
    );
    output
}

/// Stage 1: nodes chosen by the view type, restricted to enabled categories
fn select(graph: &Graph, config: &ViewConfig) -> BTreeSet<NodeId> {
    match &config.view {
        ViewType::All => graph
            .nodes()
            .filter(|node| config.category_enabled(node.category()))
            .map(|node| node.id)
            .collect(),
        ViewType::ProblemFocused { problem, details } => {
            if graph.node(*problem).is_none() {
                return BTreeSet::new();
            }
            let mut selected = BTreeSet::from([*problem]);
            if details.causes {
                selected.extend(ids(aspects::causes(*problem, graph)));
            }
            if details.effects {
                selected.extend(ids(aspects::effects(*problem, graph)));
                selected.extend(ids(aspects::detriments(*problem, graph)));
            }
            if details.subproblems {
                let traversal = Traversal::new(graph);
                selected.extend(
                    traversal
                        .descendants(*problem, &[RelationName::SubproblemOf], None, None)
                        .into_iter()
                        .map(|node| node.id),
                );
            }
            if details.criteria {
                selected.extend(ids(aspects::criteria(*problem, graph)));
            }
            if details.solutions {
                selected.extend(ids(aspects::solutions(*problem, graph)));
            }
            with_attached_parts(graph, config, selected)
        }
        ViewType::SolutionFocused { solution, details } => {
            if graph.node(*solution).is_none() {
                return BTreeSet::new();
            }
            let mut selected = BTreeSet::from([*solution]);
            if details.components {
                selected.extend(ids(aspects::components(*solution, graph)));
            }
            if details.benefits {
                selected.extend(ids(aspects::benefits(*solution, graph)));
            }
            if details.effects {
                selected.extend(ids(aspects::effects(*solution, graph)));
            }
            let mut threats = Vec::new();
            if details.detriments {
                threats.extend(ids(aspects::detriments(*solution, graph)));
            }
            if details.obstacles {
                threats.extend(ids(aspects::obstacles(*solution, graph)));
            }
            if details.mitigations {
                for threat in &threats {
                    selected.extend(ids(aspects::mitigations(*threat, graph)));
                }
            }
            selected.extend(threats);
            if details.problems {
                let traversal = Traversal::new(graph);
                selected.extend(
                    traversal
                        .ancestors(*solution, &[], Some(&[RelationName::Addresses]), None)
                        .into_iter()
                        .map(|node| node.id),
                );
            }
            with_attached_parts(graph, config, selected)
        }
        ViewType::TradeoffsTable { problem } => {
            if graph.node(*problem).is_none() {
                return BTreeSet::new();
            }
            let mut selected = BTreeSet::from([*problem]);
            selected.extend(ids(aspects::criteria(*problem, graph)));
            selected.extend(ids(aspects::solutions(*problem, graph)));
            in_enabled_categories(graph, config, selected)
        }
        ViewType::JustificationTree { part } => justification_tree(graph, *part),
    }
}

/// The argued part (a node, or both ends of an edge), its root claim and
/// every argument below it. Not restricted by category.
fn justification_tree(graph: &Graph, part: GraphPartId) -> BTreeSet<NodeId> {
    let Some(claim) = aspects::root_claim(part, graph) else {
        return BTreeSet::new();
    };
    let mut selected = BTreeSet::from([claim.id]);
    if let Some(node) = graph.node(NodeId(part.0)) {
        selected.insert(node.id);
    } else if let Some(edge) = graph.edge(EdgeId(part.0)) {
        selected.insert(edge.source);
        selected.insert(edge.target);
    }
    selected.extend(ids(aspects::justification(part, graph)));
    selected
}

/// Research and justification parts attached to the selection, when
/// those categories are enabled
fn with_attached_parts(graph: &Graph, config: &ViewConfig, selected: BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    let mut attached = BTreeSet::new();
    for id in &selected {
        if config.category_enabled(Category::Research) {
            attached.extend(ids(aspects::research(*id, graph)));
        }
        if config.category_enabled(Category::Justification) {
            let part = GraphPartId::from(*id);
            if let Some(claim) = aspects::root_claim(part, graph) {
                attached.insert(claim.id);
            }
            attached.extend(ids(aspects::justification(part, graph)));
        }
    }
    let mut all = selected;
    all.extend(attached);
    in_enabled_categories(graph, config, all)
}

fn in_enabled_categories(graph: &Graph, config: &ViewConfig, mut selected: BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    selected.retain(|id| {
        graph
            .node(*id)
            .is_some_and(|node| config.category_enabled(node.category()))
    });
    selected
}

fn ids(nodes: aspects::AspectNodes) -> Vec<NodeId> {
    nodes
        .direct
        .iter()
        .chain(&nodes.indirect)
        .map(|node| node.id)
        .collect()
}

/// Parts some justification edge argues about
fn implied_parts(graph: &Graph) -> BTreeSet<GraphPartId> {
    graph
        .edges()
        .filter(|edge| edge.relation.category() == Category::Justification)
        .filter_map(|edge| edge.argued_diagram_part_id)
        .collect()
}

/// Edge joining problem/criterion, criterion/solution or problem/solution
fn is_tradeoff_edge(graph: &Graph, edge: &Edge) -> bool {
    let (Some(source), Some(target)) = (graph.node(edge.source), graph.node(edge.target)) else {
        return false;
    };
    matches!(
        (source.node_type, target.node_type),
        (NodeType::Problem, NodeType::Criterion)
            | (NodeType::Criterion, NodeType::Problem)
            | (NodeType::Criterion, NodeType::Solution)
            | (NodeType::Solution, NodeType::Criterion)
            | (NodeType::Problem, NodeType::Solution)
            | (NodeType::Solution, NodeType::Problem)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::RelationName as R;
    use crate::score::{AggregationMode, Perspective, Score};
    use crate::view::Comparator;
    use pretty_assertions::assert_eq;

    fn node(node_type: NodeType, n: u128) -> Node {
        Node::new(node_type, format!("{node_type} {n}"))
            .unwrap()
            .with_id(NodeId::from_u128(n))
    }

    fn edge(source: u128, relation: RelationName, target: u128, n: u128) -> Edge {
        Edge::new(NodeId::from_u128(source), relation, NodeId::from_u128(target))
            .with_id(EdgeId::from_u128(n))
    }

    fn id(n: u128) -> NodeId {
        NodeId::from_u128(n)
    }

    fn node_ids(output: &ViewOutput) -> Vec<u128> {
        output.nodes.iter().map(|node| node.id.as_uuid().as_u128()).collect()
    }

    /// problem(1), criterion(2), solution(3), cause(4), question(5) about the problem,
    /// unrelated problem(6); a root claim(7) and support(8) argue about edge 102
    fn topic() -> Graph {
        let argued = GraphPartId::from(EdgeId::from_u128(102));
        let claim = Node::justification(NodeType::RootClaim, "claim", argued)
            .unwrap()
            .with_id(id(7));
        let support = Node::justification(NodeType::Support, "support", argued)
            .unwrap()
            .with_id(id(8));
        Graph::from_parts(
            vec![
                node(NodeType::Problem, 1),
                node(NodeType::Criterion, 2),
                node(NodeType::Solution, 3),
                node(NodeType::Cause, 4),
                node(NodeType::Question, 5),
                node(NodeType::Problem, 6),
                claim,
                support,
            ],
            vec![
                edge(1, R::CriterionFor, 2, 100),
                edge(2, R::Fulfills, 3, 101),
                edge(1, R::Addresses, 3, 102),
                edge(1, R::Causes, 4, 103),
                edge(1, R::AsksAbout, 5, 104),
                edge(7, R::Supports, 8, 105).arguing(argued),
            ],
        )
        .unwrap()
    }

    #[test]
    fn all_view_keeps_enabled_categories() {
        let graph = topic();
        let output = filter_view(&graph, &UserScores::new(), &ViewConfig::default());
        assert_eq!(node_ids(&output), vec![1, 2, 3, 4, 6]);
        // 102 is argued about, so it is implied
        let edges: Vec<u128> = output.edges.iter().map(|e| e.id.as_uuid().as_u128()).collect();
        assert_eq!(edges, vec![100, 101, 103]);
    }

    #[test]
    fn implied_edges_can_be_shown() {
        let graph = topic();
        let config = ViewConfig::default().with_implied_edges(true);
        let output = filter_view(&graph, &UserScores::new(), &config);
        assert!(output.edge_ids().contains(&EdgeId::from_u128(102)));
    }

    #[test]
    fn hide_wins_over_show() {
        let graph = topic();
        let config = ViewConfig::default().with_shown(id(5)).with_hidden(id(5)).with_hidden(id(6));
        let output = filter_view(&graph, &UserScores::new(), &config);
        assert_eq!(node_ids(&output), vec![1, 2, 3, 4]);
    }

    #[test]
    fn show_list_overrides_category() {
        let graph = topic();
        let config = ViewConfig::default().with_shown(id(5));
        let output = filter_view(&graph, &UserScores::new(), &config);
        assert!(output.node_ids().contains(&id(5)));
        assert!(output.edge_ids().contains(&EdgeId::from_u128(104)));
    }

    #[test]
    fn problem_focused_adds_research_when_enabled() {
        let graph = topic();
        let view = ViewType::ProblemFocused {
            problem: id(1),
            details: Default::default(),
        };
        let output = filter_view(&graph, &UserScores::new(), &ViewConfig::new(view.clone()));
        assert_eq!(node_ids(&output), vec![1, 2, 3, 4]);

        let config = ViewConfig::new(view).with_categories([Category::Breakdown, Category::Research]);
        let output = filter_view(&graph, &UserScores::new(), &config);
        assert_eq!(node_ids(&output), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn missing_center_yields_empty_view() {
        let graph = topic();
        let config = ViewConfig::new(ViewType::TradeoffsTable { problem: id(99) });
        assert!(filter_view(&graph, &UserScores::new(), &config).is_empty());
    }

    #[test]
    fn tradeoffs_table_edges_can_be_suppressed() {
        let graph = topic();
        let config = ViewConfig::new(ViewType::TradeoffsTable { problem: id(1) })
            .with_problem_criterion_solution_edges_hidden(true);
        let output = filter_view(&graph, &UserScores::new(), &config);
        assert_eq!(node_ids(&output), vec![1, 2, 3]);
        assert!(output.edges.is_empty());
    }

    #[test]
    fn justification_tree_ignores_categories() {
        let graph = topic();
        let config = ViewConfig::new(ViewType::JustificationTree {
            part: EdgeId::from_u128(102).into(),
        });
        let output = filter_view(&graph, &UserScores::new(), &config);
        assert_eq!(node_ids(&output), vec![1, 3, 7, 8]);
    }

    #[test]
    fn score_filter_drops_low_scores_but_keeps_unscored_and_shown() {
        let graph = topic();
        let mut scores = UserScores::new();
        scores.set(Perspective::new("ann"), id(2).into(), Score::Two);
        scores.set(Perspective::new("ann"), id(3).into(), Score::Eight);
        scores.set(Perspective::new("ann"), id(4).into(), Score::One);

        let config = ViewConfig::default()
            .with_perspectives(vec![Perspective::new("ann")], AggregationMode::Single)
            .with_score_filter(Comparator::Ge, Score::Five)
            .with_shown(id(4));
        let output = filter_view(&graph, &scores, &config);
        assert_eq!(node_ids(&output), vec![1, 3, 4, 6]);
    }

    #[test]
    fn secondary_neighbors_cross_categories() {
        let graph = topic();
        let plain = filter_view(&graph, &UserScores::new(), &ViewConfig::default());
        assert!(!node_ids(&plain).contains(&5));

        let config = ViewConfig::default().with_secondary_neighbors(true);
        let output = filter_view(&graph, &UserScores::new(), &config);
        assert_eq!(node_ids(&output), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn secondary_neighbors_respect_hide() {
        let graph = topic();
        let config = ViewConfig::new(ViewType::SolutionFocused {
            solution: id(3),
            details: Default::default(),
        })
        .with_secondary_neighbors(true)
        .with_hidden(id(2));
        let output = filter_view(&graph, &UserScores::new(), &config);
        assert_eq!(node_ids(&output), vec![1, 3]);
    }

    #[test]
    fn pipeline_is_deterministic() {
        let graph = topic();
        let config = ViewConfig::default().with_secondary_neighbors(true);
        let first = serde_json::to_string(&filter_view(&graph, &UserScores::new(), &config)).unwrap();
        let second = serde_json::to_string(&filter_view(&graph, &UserScores::new(), &config)).unwrap();
        assert_eq!(first, second);
    }
}
