//! View configuration
//!
//! Plain data, serde-friendly, so views can be stored alongside engine
//! config (TOML) or shared between users (JSON).

use crate::ids::{GraphPartId, NodeId};
use crate::ontology::{Category, NodeType};
use crate::score::{AggregationMode, Perspective, Score};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which parts of a problem-focused view are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemDetails {
    pub causes: bool,
    pub effects: bool,
    pub subproblems: bool,
    pub criteria: bool,
    pub solutions: bool,
}

impl Default for ProblemDetails {
    fn default() -> Self {
        Self {
            causes: true,
            effects: true,
            subproblems: true,
            criteria: true,
            solutions: true,
        }
    }
}

/// Which parts of a solution-focused view are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolutionDetails {
    pub components: bool,
    pub benefits: bool,
    pub effects: bool,
    pub detriments: bool,
    pub obstacles: bool,
    /// Mitigations of the shown detriments and obstacles
    pub mitigations: bool,
    /// Problems the solution addresses directly
    pub problems: bool,
}

impl Default for SolutionDetails {
    fn default() -> Self {
        Self {
            components: true,
            benefits: true,
            effects: true,
            detriments: true,
            obstacles: true,
            mitigations: true,
            problems: false,
        }
    }
}

/// Node-selection rule for the first pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewType {
    /// Every node of an enabled category
    #[default]
    All,
    /// One problem and its surroundings
    ProblemFocused {
        problem: NodeId,
        #[serde(default)]
        details: ProblemDetails,
    },
    /// One solution and what it brings
    SolutionFocused {
        solution: NodeId,
        #[serde(default)]
        details: SolutionDetails,
    },
    /// A problem with its criteria and solutions
    TradeoffsTable { problem: NodeId },
    /// A part with the justification tree arguing about it
    JustificationTree { part: GraphPartId },
}

/// Score comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Comparator {
    #[must_use]
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Eq => (value - threshold).abs() < f64::EPSILON,
            Self::Ge => value >= threshold,
            Self::Gt => value > threshold,
        }
    }
}

/// Keep nodes whose display score compares true against `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFilter {
    pub comparator: Comparator,
    pub threshold: Score,
}

impl ScoreFilter {
    /// Whether `score` passes
    ///
    /// Unscored parts always pass, as does everything when the threshold
    /// itself is the sentinel.
    #[must_use]
    pub fn passes(&self, score: Score) -> bool {
        match (score.midpoint(), self.threshold.midpoint()) {
            (Some(value), Some(threshold)) => self.comparator.holds(value, threshold),
            _ => true,
        }
    }
}

/// Full view configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub view: ViewType,
    /// Categories whose nodes may appear
    pub categories: BTreeSet<Category>,
    /// Node-type allow-list; `None` allows every type
    pub node_types: Option<BTreeSet<NodeType>>,
    pub score_filter: Option<ScoreFilter>,
    /// Whose scores feed the score filter
    pub perspectives: Vec<Perspective>,
    pub aggregation: AggregationMode,
    /// Forced visible
    pub show: BTreeSet<NodeId>,
    /// Forced hidden; wins over everything
    pub hide: BTreeSet<NodeId>,
    /// Add direct neighbours of every selected node
    pub secondary_neighbors: bool,
    pub show_implied_edges: bool,
    /// Drop problem/criterion/solution edges (a tradeoffs table shows them)
    pub hide_problem_criterion_solution_edges: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            view: ViewType::All,
            categories: BTreeSet::from([Category::Breakdown]),
            node_types: None,
            score_filter: None,
            perspectives: Vec::new(),
            aggregation: AggregationMode::Average,
            show: BTreeSet::new(),
            hide: BTreeSet::new(),
            secondary_neighbors: false,
            show_implied_edges: false,
            hide_problem_criterion_solution_edges: false,
        }
    }
}

impl ViewConfig {
    #[inline]
    #[must_use]
    pub fn new(view: ViewType) -> Self {
        Self {
            view,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_node_types(mut self, node_types: impl IntoIterator<Item = NodeType>) -> Self {
        self.node_types = Some(node_types.into_iter().collect());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_score_filter(mut self, comparator: Comparator, threshold: Score) -> Self {
        self.score_filter = Some(ScoreFilter {
            comparator,
            threshold,
        });
        self
    }

    #[inline]
    #[must_use]
    pub fn with_perspectives(mut self, perspectives: Vec<Perspective>, aggregation: AggregationMode) -> Self {
        self.perspectives = perspectives;
        self.aggregation = aggregation;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_shown(mut self, node: NodeId) -> Self {
        self.show.insert(node);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_hidden(mut self, node: NodeId) -> Self {
        self.hide.insert(node);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_secondary_neighbors(mut self, enabled: bool) -> Self {
        self.secondary_neighbors = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_implied_edges(mut self, shown: bool) -> Self {
        self.show_implied_edges = shown;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_problem_criterion_solution_edges_hidden(mut self, hidden: bool) -> Self {
        self.hide_problem_criterion_solution_edges = hidden;
        self
    }

    #[inline]
    #[must_use]
    pub fn category_enabled(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscored_always_passes() {
        let filter = ScoreFilter {
            comparator: Comparator::Ge,
            threshold: Score::Seven,
        };
        assert!(filter.passes(Score::Unscored));
        assert!(filter.passes(Score::Eight));
        assert!(!filter.passes(Score::Three));
    }

    #[test]
    fn deserializes_from_partial_json() {
        let json = serde_json::json!({
            "view": { "type": "tradeoffs_table", "problem": NodeId::from_u128(1) },
            "hide_problem_criterion_solution_edges": true
        });
        let config: ViewConfig = serde_json::from_value(json).unwrap();
        assert_eq!(
            config.view,
            ViewType::TradeoffsTable {
                problem: NodeId::from_u128(1)
            }
        );
        assert!(config.category_enabled(Category::Breakdown));
        assert!(config.hide_problem_criterion_solution_edges);
    }
}
