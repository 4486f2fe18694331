//! Schema migrations for stored snapshots
//!
//! [`MIGRATIONS`] is indexed by version: entry `i` turns a version `i`
//! snapshot into a version `i + 1` one. Steps are pure functions over raw
//! JSON and run strictly in order; a snapshot is only accepted once it has
//! reached [`CURRENT_SCHEMA_VERSION`] and validates as a graph.
//!
//! | step   | change                                                        |
//! |--------|---------------------------------------------------------------|
//! | 0 -> 1 | node `text` renamed to `label`                                |
//! | 1 -> 2 | edge `label` renamed to `relation`, `relatesTo` -> `custom`    |
//! | 2 -> 3 | per-node `scores` hoisted into top-level `userScores`          |

use crate::error::MigrationError;
use crate::storage::PersistedTopic;
use serde_json::{Map, Value};
use topic_graph::TopicState;

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// One version bump
pub type MigrationStep = fn(Value) -> Result<Value, String>;

/// Ordered steps; `MIGRATIONS[v]` migrates version `v` to `v + 1`
pub const MIGRATIONS: [MigrationStep; CURRENT_SCHEMA_VERSION as usize] =
    [rename_node_text, rename_edge_label, hoist_node_scores];

/// Bring `state` from `version` up to [`CURRENT_SCHEMA_VERSION`]
///
/// # Errors
/// [`MigrationError::UnsupportedVersion`] for snapshots newer than this
/// build, [`MigrationError::StepFailed`] when a step cannot transform the
/// input.
pub fn migrate(version: u32, mut state: Value) -> Result<Value, MigrationError> {
    if version > CURRENT_SCHEMA_VERSION {
        return Err(MigrationError::UnsupportedVersion {
            found: version,
            current: CURRENT_SCHEMA_VERSION,
        });
    }
    for (from_version, step) in (version..).zip(&MIGRATIONS[version as usize..]) {
        state = step(state).map_err(|reason| MigrationError::StepFailed { from_version, reason })?;
        tracing::debug!(from_version, to_version = from_version + 1, "migrated snapshot");
    }
    Ok(state)
}

/// Migrate and decode a stored envelope
///
/// # Errors
/// Any migration error, or [`MigrationError::Invalid`] when the migrated
/// snapshot does not decode or validate. Nothing partial is returned.
pub fn restore(envelope: PersistedTopic) -> Result<TopicState, MigrationError> {
    let value = migrate(envelope.version, envelope.state)?;
    let state: TopicState =
        serde_json::from_value(value).map_err(|err| MigrationError::Invalid(err.to_string()))?;
    state
        .graph
        .validate()
        .map_err(|err| MigrationError::Invalid(err.to_string()))?;
    if let Some(anchor) = state.anchor {
        if state.graph.node(anchor).is_none() {
            return Err(MigrationError::Invalid(format!("anchor {anchor} is not a node")));
        }
    }
    Ok(state)
}

fn root(state: &mut Value) -> Result<&mut Map<String, Value>, String> {
    state
        .as_object_mut()
        .ok_or_else(|| "snapshot is not an object".to_string())
}

fn records<'a>(state: &'a mut Value, field: &str) -> Result<Vec<&'a mut Map<String, Value>>, String> {
    match root(state)?.get_mut(field) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter_mut()
            .map(|item| {
                item.as_object_mut()
                    .ok_or_else(|| format!("{field} entry is not an object"))
            })
            .collect(),
        Some(_) => Err(format!("{field} is not an array")),
    }
}

fn rename_node_text(mut state: Value) -> Result<Value, String> {
    for node in records(&mut state, "nodes")? {
        if let Some(text) = node.remove("text") {
            node.entry("label").or_insert(text);
        }
    }
    Ok(state)
}

fn rename_edge_label(mut state: Value) -> Result<Value, String> {
    for edge in records(&mut state, "edges")? {
        let Some(label) = edge.remove("label") else {
            continue;
        };
        let relation = match label {
            Value::String(name) if name == "relatesTo" => Value::String("custom".to_string()),
            Value::String(name) => Value::String(name),
            other => return Err(format!("edge label {other} is not a string")),
        };
        edge.insert("relation".to_string(), relation);
    }
    Ok(state)
}

fn hoist_node_scores(mut state: Value) -> Result<Value, String> {
    let mut hoisted: Map<String, Value> = Map::new();
    for node in records(&mut state, "nodes")? {
        let Some(scores) = node.remove("scores") else {
            continue;
        };
        let id = node
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| "scored node has no id".to_string())?
            .to_string();
        let Value::Object(scores) = scores else {
            return Err(format!("scores of node {id} are not an object"));
        };
        for (username, score) in scores {
            let per_user = hoisted
                .entry(username)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(per_user) = per_user {
                per_user.insert(id.clone(), score);
            }
        }
    }

    let root = root(&mut state)?;
    let user_scores = root
        .entry("userScores")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(user_scores) = user_scores else {
        return Err("userScores is not an object".to_string());
    };
    for (username, parts) in hoisted {
        let Value::Object(parts) = parts else { continue };
        let existing = user_scores
            .entry(username)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(existing) = existing {
            for (part, score) in parts {
                existing.entry(part).or_insert(score);
            }
        }
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PROBLEM: &str = "00000000-0000-0000-0000-000000000001";
    const SOLUTION: &str = "00000000-0000-0000-0000-000000000002";
    const EDGE: &str = "00000000-0000-0000-0000-000000000064";

    fn v0() -> Value {
        json!({
            "nodes": [
                { "id": PROBLEM, "type": "problem", "text": "traffic", "scores": { "ann": "7" } },
                { "id": SOLUTION, "type": "solution", "text": "bike lanes" }
            ],
            "edges": [
                { "id": EDGE, "source": PROBLEM, "target": SOLUTION, "label": "addresses" }
            ]
        })
    }

    #[test]
    fn step_zero_renames_node_text() {
        let migrated = rename_node_text(v0()).unwrap();
        assert_eq!(migrated["nodes"][0]["label"], json!("traffic"));
        assert!(migrated["nodes"][0].get("text").is_none());
        assert_eq!(migrated["edges"], v0()["edges"]);
    }

    #[test]
    fn step_one_renames_edge_label() {
        let input = json!({
            "edges": [
                { "id": EDGE, "label": "addresses" },
                { "id": EDGE, "label": "relatesTo" }
            ]
        });
        let migrated = rename_edge_label(input).unwrap();
        assert_eq!(migrated["edges"][0]["relation"], json!("addresses"));
        assert_eq!(migrated["edges"][1]["relation"], json!("custom"));
        assert!(migrated["edges"][0].get("label").is_none());
    }

    #[test]
    fn step_two_hoists_scores() {
        let input = json!({
            "nodes": [
                { "id": PROBLEM, "scores": { "ann": "7", "bob": "2" } },
                { "id": SOLUTION, "scores": { "ann": "3" } }
            ]
        });
        let migrated = hoist_node_scores(input).unwrap();
        assert_eq!(
            migrated["userScores"],
            json!({
                "ann": { PROBLEM: "7", SOLUTION: "3" },
                "bob": { PROBLEM: "2" }
            })
        );
        assert!(migrated["nodes"][0].get("scores").is_none());
    }

    #[test]
    fn full_chain_restores_a_valid_topic() {
        let envelope = PersistedTopic {
            version: 0,
            saved_at: None,
            state: v0(),
        };
        let state = restore(envelope).unwrap();
        assert_eq!(state.graph.node_count(), 2);
        assert_eq!(state.graph.edge_count(), 1);
        assert!(!state.user_scores.is_empty());
    }

    #[test]
    fn current_version_is_untouched() {
        let value = json!({ "nodes": [], "edges": [] });
        assert_eq!(migrate(CURRENT_SCHEMA_VERSION, value.clone()).unwrap(), value);
    }

    #[test]
    fn newer_version_is_unsupported() {
        let err = migrate(CURRENT_SCHEMA_VERSION + 1, json!({})).unwrap_err();
        assert_eq!(
            err,
            MigrationError::UnsupportedVersion {
                found: CURRENT_SCHEMA_VERSION + 1,
                current: CURRENT_SCHEMA_VERSION
            }
        );
    }

    #[test]
    fn malformed_snapshot_reports_failing_step() {
        let err = migrate(1, json!({ "edges": { "not": "an array" } })).unwrap_err();
        assert!(matches!(err, MigrationError::StepFailed { from_version: 1, .. }));
    }

    #[test]
    fn invalid_graph_is_not_restored() {
        let envelope = PersistedTopic {
            version: CURRENT_SCHEMA_VERSION,
            saved_at: None,
            state: json!({
                "nodes": [],
                "edges": [{ "id": EDGE, "source": PROBLEM, "target": SOLUTION, "relation": "addresses" }]
            }),
        };
        assert!(matches!(restore(envelope), Err(MigrationError::Invalid(_))));
    }
}
