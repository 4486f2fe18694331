//! Aspect filters over the shared sample topic

use pretty_assertions::assert_eq;
use topic_graph::aspects;
use topic_graph::{AspectNodes, Category, NodeId, UserScores, ViewConfig, ViewType};
use topic_test_utils::{edge_id, edge_part, node_id, sample_topic};

fn ids(found: &AspectNodes) -> (Vec<NodeId>, Vec<NodeId>) {
    (
        found.direct.iter().map(|node| node.id).collect(),
        found.indirect.iter().map(|node| node.id).collect(),
    )
}

fn n(values: &[u128]) -> Vec<NodeId> {
    values.iter().copied().map(node_id).collect()
}

#[test]
fn test_problem_aspects() {
    let state = sample_topic();
    let graph = &state.graph;

    assert_eq!(ids(&aspects::solutions(node_id(1), graph)), (n(&[4]), n(&[5])));
    assert_eq!(ids(&aspects::criteria(node_id(1), graph)), (n(&[3]), n(&[])));
    assert_eq!(ids(&aspects::causes(node_id(1), graph)), (n(&[2]), n(&[])));
    assert_eq!(ids(&aspects::effects(node_id(1), graph)), (n(&[13]), n(&[])));
}

#[test]
fn test_solution_aspects() {
    let state = sample_topic();
    let graph = &state.graph;

    assert_eq!(ids(&aspects::benefits(node_id(4), graph)), (n(&[7]), n(&[8])));
    assert_eq!(ids(&aspects::detriments(node_id(4), graph)), (n(&[9]), n(&[])));
    assert_eq!(ids(&aspects::components(node_id(4), graph)), (n(&[6]), n(&[])));
    assert_eq!(ids(&aspects::obstacles(node_id(4), graph)), (n(&[10]), n(&[])));
    assert_eq!(ids(&aspects::research(node_id(4), graph)), (n(&[12]), n(&[])));
}

#[test]
fn test_criterion_reaches_solution_through_benefit() {
    let state = sample_topic();
    let found = aspects::solutions_fulfilling(node_id(3), &state.graph);
    assert_eq!(ids(&found), (n(&[]), n(&[4])));
}

#[test]
fn test_mitigations_of_obstacle() {
    let state = sample_topic();
    assert_eq!(
        ids(&aspects::mitigations(node_id(10), &state.graph)),
        (n(&[11]), n(&[]))
    );
}

#[test]
fn test_justification_tree() {
    let state = sample_topic();
    let claim = aspects::root_claim(edge_part(102), &state.graph).unwrap();
    assert_eq!(claim.id, node_id(20));
    assert_eq!(
        ids(&aspects::justification(edge_part(102), &state.graph)),
        (n(&[21]), n(&[22]))
    );
    assert!(aspects::justification(edge_part(103), &state.graph).is_empty());
}

#[test]
fn test_neighbors_read_from_the_node() {
    let state = sample_topic();
    let neighbors = aspects::neighbors(node_id(4), &state.graph);

    let described = |key: &str| -> Vec<NodeId> {
        neighbors[key].iter().map(|node| node.id).collect()
    };
    assert_eq!(described("this addresses"), n(&[1]));
    assert_eq!(described("this creates"), n(&[7, 9]));
    assert_eq!(described("this has"), n(&[6]));
    assert_eq!(described("impedes this"), n(&[10]));
}

#[test]
fn test_unknown_node_is_empty() {
    let state = sample_topic();
    assert!(aspects::solutions(NodeId::new(), &state.graph).is_empty());
    assert!(aspects::neighbors(NodeId::new(), &state.graph).is_empty());
}

#[test]
fn test_default_view_hides_research_and_implied_edge() {
    let state = sample_topic();
    let view = topic_graph::filter_view(&state.graph, &state.user_scores, &ViewConfig::default());

    assert!(!view.node_ids().contains(&node_id(12)));
    assert!(!view.node_ids().contains(&node_id(20)));
    assert!(view.node_ids().contains(&node_id(4)));
    assert!(!view.edge_ids().contains(&edge_id(102)));
}

#[test]
fn test_justification_view_shows_tree_and_argued_edge() {
    let state = sample_topic();
    let config = ViewConfig::new(ViewType::JustificationTree {
        part: edge_part(102),
    })
    .with_categories([Category::Breakdown]);
    let view = topic_graph::filter_view(&state.graph, &UserScores::new(), &config);

    let shown = view.node_ids();
    for expected in [1, 4, 20, 21, 22] {
        assert!(shown.contains(&node_id(expected)), "missing node {expected}");
    }
    assert!(!shown.contains(&node_id(5)));
}
