//! Aspect filters
//!
//! Named queries answering "what are the X of this node", each split into
//! parts directly attached to the node and parts reached through
//! intermediates (a benefit created by one of a solution's components is an
//! indirect benefit of the solution).
//!
//! # Relation sets
//!
//! | Aspect | Direction | Walk through | Report via | Types |
//! |--------|-----------|--------------|------------|-------|
//! | solutions of a problem | down | causes, subproblemOf, addresses, has | any | solution |
//! | criteria of a problem | down | criterionFor | any | criterion |
//! | solutions fulfilling a criterion | down | fulfills, has, creates | any | solution |
//! | causes | down | causes | any | cause |
//! | effects / detriments of a problem | up | causes | any | effect / detriment |
//! | benefits / effects / detriments of a solution | up | has, creates | creates | benefit / effect / detriment |
//! | components of a solution or mitigation | up | has | any | solutionComponent, mitigationComponent |
//! | obstacles of a solution | down from it and its components | impedes | any | obstacle |
//! | mitigations | down | mitigates, has | any | mitigation |
//! | research | down | research relations | any | research types |
//! | justification of a part | down from its root claim | supports, critiques | any | support, critique |
//!
//! Unknown ids yield empty results; callers may hold stale ids while a
//! delete propagates.

use crate::graph::{Graph, Node};
use crate::ids::{GraphPartId, NodeId};
use crate::ontology::{relations_by_category, Category, NodeType, RelationName};
use crate::traversal::{DirectAndIndirect, Traversal};
use std::collections::{BTreeMap, BTreeSet};

use RelationName as R;

/// Result of an aspect filter
pub type AspectNodes = DirectAndIndirect<Node>;

const SOLUTION_TRAVERSE: &[RelationName] = &[R::Causes, R::SubproblemOf, R::Addresses, R::Has];
const CRITERION_SOLUTION_TRAVERSE: &[RelationName] = &[R::Fulfills, R::Has, R::Creates];
const OUTCOME_TRAVERSE: &[RelationName] = &[R::Has, R::Creates];
const MITIGATION_TRAVERSE: &[RelationName] = &[R::Mitigates, R::Has];
const JUSTIFICATION_RELATIONS: &[RelationName] = &[R::Supports, R::Critiques];

fn partition(traversal: &Traversal<'_>, center: NodeId, direct: &[RelationName], found: Vec<&Node>) -> AspectNodes {
    traversal
        .split_by_direct_and_indirect(center, direct, found)
        .map(Node::clone)
}

fn only<'g>(nodes: Vec<&'g Node>, types: &[NodeType]) -> Vec<&'g Node> {
    nodes
        .into_iter()
        .filter(|node| types.contains(&node.node_type))
        .collect()
}

fn is_solution_like(graph: &Graph, node: NodeId) -> bool {
    graph.node(node).is_some_and(|found| {
        matches!(
            found.node_type,
            NodeType::Solution | NodeType::SolutionComponent | NodeType::Mitigation | NodeType::MitigationComponent
        )
    })
}

/// Solutions addressing a problem, directly or through its causes,
/// subproblems and solution components
#[must_use]
pub fn solutions(problem: NodeId, graph: &Graph) -> AspectNodes {
    let traversal = Traversal::new(graph);
    let found = only(
        traversal.descendants(problem, SOLUTION_TRAVERSE, None, None),
        &[NodeType::Solution],
    );
    partition(&traversal, problem, &[R::Addresses], found)
}

/// Criteria of a problem (all direct)
#[must_use]
pub fn criteria(problem: NodeId, graph: &Graph) -> AspectNodes {
    let traversal = Traversal::new(graph);
    let found = only(
        traversal.descendants(problem, &[R::CriterionFor], None, None),
        &[NodeType::Criterion],
    );
    partition(&traversal, problem, &[R::CriterionFor], found)
}

/// Solutions fulfilling a criterion, directly or through the benefits and
/// components they create
#[must_use]
pub fn solutions_fulfilling(criterion: NodeId, graph: &Graph) -> AspectNodes {
    let traversal = Traversal::new(graph);
    let found = only(
        traversal.descendants(criterion, CRITERION_SOLUTION_TRAVERSE, None, None),
        &[NodeType::Solution],
    );
    partition(&traversal, criterion, &[R::Fulfills], found)
}

/// Causes of a problem, effect or cause
#[must_use]
pub fn causes(node: NodeId, graph: &Graph) -> AspectNodes {
    let traversal = Traversal::new(graph);
    let found = only(
        traversal.descendants(node, &[R::Causes], None, None),
        &[NodeType::Cause],
    );
    partition(&traversal, node, &[R::Causes], found)
}

fn outcomes(node: NodeId, graph: &Graph, node_type: NodeType) -> AspectNodes {
    let traversal = Traversal::new(graph);
    if is_solution_like(graph, node) {
        let found = traversal.ancestors(node, OUTCOME_TRAVERSE, Some(&[R::Creates]), Some(&[node_type]));
        return partition(&traversal, node, &[R::Creates], found);
    }
    let found = traversal.ancestors(node, &[R::Causes], None, Some(&[node_type]));
    partition(&traversal, node, &[R::Causes], found)
}

/// Benefits a solution (or mitigation) creates, including through its components
#[must_use]
pub fn benefits(solution: NodeId, graph: &Graph) -> AspectNodes {
    if !is_solution_like(graph, solution) {
        return AspectNodes::default();
    }
    outcomes(solution, graph, NodeType::Benefit)
}

/// Effects of a problem (what it causes) or of a solution (what it creates)
#[must_use]
pub fn effects(node: NodeId, graph: &Graph) -> AspectNodes {
    outcomes(node, graph, NodeType::Effect)
}

/// Detriments of a problem or a solution; see [`effects`]
#[must_use]
pub fn detriments(node: NodeId, graph: &Graph) -> AspectNodes {
    outcomes(node, graph, NodeType::Detriment)
}

/// Components a solution has, including nested components
#[must_use]
pub fn components(solution: NodeId, graph: &Graph) -> AspectNodes {
    let traversal = Traversal::new(graph);
    let found = traversal.ancestors(
        solution,
        &[R::Has],
        None,
        Some(&[NodeType::SolutionComponent, NodeType::MitigationComponent]),
    );
    partition(&traversal, solution, &[R::Has], found)
}

/// Obstacles impeding a solution or any of its components
#[must_use]
pub fn obstacles(solution: NodeId, graph: &Graph) -> AspectNodes {
    let traversal = Traversal::new(graph);
    let holders: Vec<NodeId> = std::iter::once(solution)
        .chain(
            traversal
                .ancestors(solution, &[R::Has], None, None)
                .into_iter()
                .map(|component| component.id),
        )
        .collect();

    let mut seen = BTreeSet::new();
    let found: Vec<&Node> = holders
        .into_iter()
        .flat_map(|holder| traversal.descendants(holder, &[R::Impedes], None, None))
        .filter(|node| node.node_type == NodeType::Obstacle && seen.insert(node.id))
        .collect();

    partition(&traversal, solution, &[R::Impedes], found)
}

/// Mitigations of a detriment or obstacle
#[must_use]
pub fn mitigations(node: NodeId, graph: &Graph) -> AspectNodes {
    let traversal = Traversal::new(graph);
    let found = only(
        traversal.descendants(node, MITIGATION_TRAVERSE, None, None),
        &[NodeType::Mitigation],
    );
    partition(&traversal, node, &[R::Mitigates], found)
}

/// Questions, answers, facts and sources about a node
#[must_use]
pub fn research(node: NodeId, graph: &Graph) -> AspectNodes {
    let traversal = Traversal::new(graph);
    let relations: Vec<RelationName> = relations_by_category(Category::Research).into_iter().collect();
    let found = traversal.descendants(node, &relations, None, None);
    partition(&traversal, node, &relations, found)
}

/// The root claim arguing about `part`, if one exists
#[must_use]
pub fn root_claim(part: GraphPartId, graph: &Graph) -> Option<&Node> {
    graph
        .nodes()
        .find(|node| node.node_type == NodeType::RootClaim && node.argued_diagram_part_id == Some(part))
}

/// Supports and critiques in the justification tree about `part`
///
/// Direct arguments are attached to the root claim itself.
#[must_use]
pub fn justification(part: GraphPartId, graph: &Graph) -> AspectNodes {
    let Some(claim) = root_claim(part, graph) else {
        return AspectNodes::default();
    };
    let traversal = Traversal::new(graph);
    let found = traversal.descendants(claim.id, JUSTIFICATION_RELATIONS, None, None);
    partition(&traversal, claim.id, JUSTIFICATION_RELATIONS, found)
}

/// Neighbours keyed by how they read against `node`
///
/// A child reads "<relation> this" (e.g. "addresses this") and a parent
/// reads "this <relation>" (e.g. "this causes"). Custom edges use their own
/// label. Justification edges are not neighbourhood and are skipped.
#[must_use]
pub fn neighbors(node: NodeId, graph: &Graph) -> BTreeMap<String, Vec<Node>> {
    let mut by_description: BTreeMap<String, BTreeMap<NodeId, Node>> = BTreeMap::new();

    for edge in graph.incident_edges(node) {
        if edge.relation.category() == Category::Justification {
            continue;
        }
        let Some(other) = edge.other_end(node).and_then(|id| graph.node(id)) else {
            continue;
        };
        let phrase = match (&edge.custom_label, edge.relation) {
            (Some(label), R::Custom) => label.clone(),
            (_, relation) => relation.phrase(),
        };
        let description = if edge.source == node {
            format!("{phrase} this")
        } else {
            format!("this {phrase}")
        };
        by_description
            .entry(description)
            .or_default()
            .insert(other.id, other.clone());
    }

    by_description
        .into_iter()
        .map(|(description, nodes)| (description, nodes.into_values().collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use crate::ids::EdgeId;

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

    fn ids(nodes: &[Node]) -> Vec<u128> {
        nodes.iter().map(|node| node.id.as_uuid().as_u128()).collect()
    }

    /// problem(1) with cause(2), criterion(3), solution(4) addressing it,
    /// solution(5) addressing the cause, component(6) of solution 4,
    /// benefit(7) created by component 6, benefit(8) created by solution 4,
    /// obstacle(9) impeding component 6, mitigation(10) mitigating obstacle 9,
    /// question(11) about the problem, answer(12) to the question,
    /// effect(13) the problem causes
    fn topic() -> Graph {
        Graph::from_parts(
            vec![
                node(NodeType::Problem, 1),
                node(NodeType::Cause, 2),
                node(NodeType::Criterion, 3),
                node(NodeType::Solution, 4),
                node(NodeType::Solution, 5),
                node(NodeType::SolutionComponent, 6),
                node(NodeType::Benefit, 7),
                node(NodeType::Benefit, 8),
                node(NodeType::Obstacle, 9),
                node(NodeType::Mitigation, 10),
                node(NodeType::Question, 11),
                node(NodeType::Answer, 12),
                node(NodeType::Effect, 13),
            ],
            vec![
                edge(1, R::Causes, 2, 100),
                edge(1, R::CriterionFor, 3, 101),
                edge(1, R::Addresses, 4, 102),
                edge(2, R::Addresses, 5, 103),
                edge(6, R::Has, 4, 104),
                edge(7, R::Creates, 6, 105),
                edge(8, R::Creates, 4, 106),
                edge(6, R::Impedes, 9, 107),
                edge(9, R::Mitigates, 10, 108),
                edge(1, R::AsksAbout, 11, 109),
                edge(11, R::PotentialAnswerTo, 12, 110),
                edge(13, R::Causes, 1, 111),
                edge(3, R::Fulfills, 8, 112),
            ],
        )
        .unwrap()
    }

    #[test]
    fn solutions_split_direct_and_through_causes() {
        let found = solutions(id(1), &topic());
        assert_eq!(ids(&found.direct), vec![4]);
        assert_eq!(ids(&found.indirect), vec![5]);
    }

    #[test]
    fn benefits_come_through_components() {
        let found = benefits(id(4), &topic());
        assert_eq!(ids(&found.direct), vec![8]);
        assert_eq!(ids(&found.indirect), vec![7]);
    }

    #[test]
    fn benefits_of_a_problem_are_empty() {
        assert!(benefits(id(1), &topic()).is_empty());
    }

    #[test]
    fn problem_effects_walk_up_causes() {
        let found = effects(id(1), &topic());
        assert_eq!(ids(&found.direct), vec![13]);
        assert!(found.indirect.is_empty());
    }

    #[test]
    fn criteria_and_fulfilling_solutions() {
        let graph = topic();
        assert_eq!(ids(&criteria(id(1), &graph).direct), vec![3]);

        let found = solutions_fulfilling(id(3), &graph);
        assert!(found.direct.is_empty());
        assert_eq!(ids(&found.indirect), vec![4]);
    }

    #[test]
    fn causes_of_problem() {
        assert_eq!(ids(&causes(id(1), &topic()).direct), vec![2]);
    }

    #[test]
    fn obstacles_include_component_obstacles() {
        let graph = topic();
        let found = obstacles(id(4), &graph);
        assert!(found.direct.is_empty());
        assert_eq!(ids(&found.indirect), vec![9]);

        assert_eq!(ids(&components(id(4), &graph).direct), vec![6]);
        assert_eq!(ids(&mitigations(id(9), &graph).direct), vec![10]);
    }

    #[test]
    fn research_walks_research_relations_only() {
        let found = research(id(1), &topic());
        assert_eq!(ids(&found.direct), vec![11]);
        assert_eq!(ids(&found.indirect), vec![12]);
    }

    #[test]
    fn justification_tree_of_a_part() {
        let mut graph = topic();
        let part = GraphPartId::from(id(4));
        let claim = Node::justification(NodeType::RootClaim, "claim", part)
            .unwrap()
            .with_id(id(20));
        let support = Node::justification(NodeType::Support, "yes", part)
            .unwrap()
            .with_id(id(21));
        let critique = Node::justification(NodeType::Critique, "but", part)
            .unwrap()
            .with_id(id(22));
        graph.insert_node(claim).unwrap();
        graph.insert_node(support).unwrap();
        graph.insert_node(critique).unwrap();
        graph.insert_edge(edge(20, R::Supports, 21, 200).arguing(part)).unwrap();
        graph.insert_edge(edge(21, R::Critiques, 22, 201).arguing(part)).unwrap();

        assert_eq!(root_claim(part, &graph).map(|claim| claim.id), Some(id(20)));
        let found = justification(part, &graph);
        assert_eq!(ids(&found.direct), vec![21]);
        assert_eq!(ids(&found.indirect), vec![22]);
    }

    #[test]
    fn stale_ids_yield_empty_results() {
        let graph = topic();
        assert!(solutions(id(999), &graph).is_empty());
        assert!(obstacles(id(999), &graph).is_empty());
        assert!(justification(id(999).into(), &graph).is_empty());
        assert!(neighbors(id(999), &graph).is_empty());
    }

    #[test]
    fn neighbors_describe_direction() {
        let described = neighbors(id(1), &topic());
        assert_eq!(ids(&described["addresses this"]), vec![4]);
        assert_eq!(ids(&described["criterion for this"]), vec![3]);
        assert_eq!(ids(&described["causes this"]), vec![2]);
        assert_eq!(ids(&described["this causes"]), vec![13]);
        assert_eq!(ids(&described["asks about this"]), vec![11]);
    }
}
