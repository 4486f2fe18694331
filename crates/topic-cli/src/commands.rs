//! Subcommand bodies; each returns the JSON document to print

use anyhow::Context;
use clap::ValueEnum;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use topic_graph::{
    aspects as aspect, filter_view, get_display_scores, AggregationMode, NodeId, Perspective,
    TopicState, ViewConfig,
};
use topic_sync::{migration, EngineConfig, PersistedTopic, CURRENT_SCHEMA_VERSION};

/// Aspect filters the CLI can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Aspect {
    Solutions,
    Criteria,
    SolutionsFulfilling,
    Causes,
    Effects,
    Benefits,
    Detriments,
    Components,
    Obstacles,
    Mitigations,
    Research,
    Justification,
    Neighbors,
}

/// Score aggregation modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Mode {
    Single,
    Average,
    None,
}

impl From<Mode> for AggregationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Single => Self::Single,
            Mode::Average => Self::Average,
            Mode::None => Self::None,
        }
    }
}

/// Envelope of a snapshot file
///
/// Files without a `state` object are taken as a bare topic at the current
/// schema version.
pub(crate) fn parse_envelope(raw: &str) -> anyhow::Result<PersistedTopic> {
    let value: Value = serde_json::from_str(raw).context("snapshot is not JSON")?;
    if value.get("state").is_some_and(Value::is_object) {
        return serde_json::from_value(value).context("malformed snapshot envelope");
    }
    Ok(PersistedTopic {
        version: CURRENT_SCHEMA_VERSION,
        saved_at: None,
        state: value,
    })
}

/// Read, migrate and validate a snapshot
///
/// Unlike the store, the CLI refuses a bad snapshot instead of starting
/// blank.
pub(crate) fn load_snapshot(path: &Path) -> anyhow::Result<TopicState> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let envelope = parse_envelope(&raw)?;
    let version = envelope.version;
    let state = migration::restore(envelope).with_context(|| format!("loading {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        from_version = version,
        nodes = state.graph.node_count(),
        edges = state.graph.edge_count(),
        "loaded snapshot"
    );
    Ok(state)
}

pub(crate) fn load_view(path: &Path) -> anyhow::Result<ViewConfig> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing view {}", path.display()))
}

pub(crate) fn view(state: &TopicState, config: &ViewConfig) -> anyhow::Result<Value> {
    let output = filter_view(&state.graph, &state.user_scores, config);
    Ok(serde_json::to_value(output)?)
}

pub(crate) fn aspects(state: &TopicState, node: NodeId, wanted: &[Aspect]) -> anyhow::Result<Value> {
    let graph = &state.graph;
    if graph.node(node).is_none() {
        anyhow::bail!("node {node} is not in the snapshot");
    }
    let wanted = if wanted.is_empty() {
        Aspect::value_variants()
    } else {
        wanted
    };

    let mut found = BTreeMap::new();
    for which in wanted {
        let value = match which {
            Aspect::Solutions => serde_json::to_value(aspect::solutions(node, graph))?,
            Aspect::Criteria => serde_json::to_value(aspect::criteria(node, graph))?,
            Aspect::SolutionsFulfilling => serde_json::to_value(aspect::solutions_fulfilling(node, graph))?,
            Aspect::Causes => serde_json::to_value(aspect::causes(node, graph))?,
            Aspect::Effects => serde_json::to_value(aspect::effects(node, graph))?,
            Aspect::Benefits => serde_json::to_value(aspect::benefits(node, graph))?,
            Aspect::Detriments => serde_json::to_value(aspect::detriments(node, graph))?,
            Aspect::Components => serde_json::to_value(aspect::components(node, graph))?,
            Aspect::Obstacles => serde_json::to_value(aspect::obstacles(node, graph))?,
            Aspect::Mitigations => serde_json::to_value(aspect::mitigations(node, graph))?,
            Aspect::Research => serde_json::to_value(aspect::research(node, graph))?,
            Aspect::Justification => serde_json::to_value(aspect::justification(node.into(), graph))?,
            Aspect::Neighbors => serde_json::to_value(aspect::neighbors(node, graph))?,
        };
        let name = which
            .to_possible_value()
            .map_or_else(|| format!("{which:?}"), |possible| possible.get_name().to_string());
        found.insert(name, value);
    }
    Ok(serde_json::to_value(found)?)
}

pub(crate) fn scores(
    state: &TopicState,
    config: &EngineConfig,
    perspectives: &[String],
    mode: Option<Mode>,
) -> anyhow::Result<Value> {
    let perspectives: Vec<Perspective> = if !perspectives.is_empty() {
        perspectives.iter().map(Perspective::new).collect()
    } else if !config.scores.perspectives.is_empty() {
        config.scores.perspectives.clone()
    } else {
        state.user_scores.perspectives().cloned().collect()
    };
    let mode = mode.map_or(config.scores.aggregation, AggregationMode::from);

    let display = get_display_scores(&state.part_ids(), &perspectives, &state.user_scores, mode);
    Ok(json!({
        "perspectives": perspectives,
        "aggregation": mode,
        "scores": display,
    }))
}

pub(crate) fn migrated(state: &TopicState) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(PersistedTopic::current(state)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use topic_graph::Score;
    use topic_test_utils::{node_id, node_part, sample_topic};

    fn write_snapshot(dir: &Path, state: &TopicState) -> std::path::PathBuf {
        let path = dir.join("sample.json");
        std::fs::write(&path, migrated(state).unwrap().to_string()).unwrap();
        path
    }

    #[test]
    fn bare_state_is_current_version() {
        let envelope = parse_envelope(r#"{"nodes": [], "edges": []}"#).unwrap();
        assert_eq!(envelope.version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn snapshot_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(dir.path(), &sample_topic());
        assert_eq!(load_snapshot(&path).unwrap(), sample_topic());
    }

    #[test]
    fn aspects_are_keyed_by_cli_name() {
        let state = sample_topic();
        let value = aspects(&state, node_id(4), &[Aspect::Benefits, Aspect::Neighbors]).unwrap();

        assert_eq!(value["benefits"]["direct"][0]["label"], "Exercise");
        assert!(value["neighbors"]["impedes this"].is_array());
        assert!(value.get("solutions").is_none());
    }

    #[test]
    fn unknown_node_is_an_error() {
        assert!(aspects(&sample_topic(), NodeId::new(), &[]).is_err());
    }

    #[test]
    fn scores_average_every_perspective_by_default() {
        let state = sample_topic();
        let value = scores(&state, &EngineConfig::default(), &[], None).unwrap();
        let expected = serde_json::to_value(Score::Five).unwrap();
        assert_eq!(value["scores"][node_part(4).to_string()], expected);
    }

    #[test]
    fn view_uses_given_config() {
        let value = view(&sample_topic(), &ViewConfig::default()).unwrap();
        assert!(value["nodes"].as_array().is_some_and(|nodes| !nodes.is_empty()));
    }
}
