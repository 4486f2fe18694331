//! Ontology: node types, relation names and the legal-triple table
//!
//! # Reading edges
//!
//! An edge's `source` is the *parent* and its `target` is the *child*. The
//! relation reads "child relation parent": an edge `problem -> solution`
//! labelled [`RelationName::Addresses`] reads "solution addresses problem".
//! Ancestors are parents (upward in a diagram), descendants are children.
//!
//! Everything here is a pure lookup. Unknown combinations are reported as
//! illegal (`false`), never as errors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Semantic grouping of node types
///
/// Traversals and view filters treat categories as boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Problem/solution breakdown
    Breakdown,
    /// Questions, answers, facts, sources
    Research,
    /// Argument trees about other parts
    Justification,
}

impl Category {
    /// All categories
    pub const ALL: [Category; 3] = [Self::Breakdown, Self::Research, Self::Justification];
}

/// Node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Problem,
    Cause,
    Criterion,
    Benefit,
    Effect,
    Detriment,
    SolutionComponent,
    Solution,
    Obstacle,
    MitigationComponent,
    Mitigation,
    Question,
    Answer,
    Fact,
    Source,
    RootClaim,
    Support,
    Critique,
    Custom,
}

impl NodeType {
    /// Every node type, in declaration order
    pub const ALL: [NodeType; 19] = [
        Self::Problem,
        Self::Cause,
        Self::Criterion,
        Self::Benefit,
        Self::Effect,
        Self::Detriment,
        Self::SolutionComponent,
        Self::Solution,
        Self::Obstacle,
        Self::MitigationComponent,
        Self::Mitigation,
        Self::Question,
        Self::Answer,
        Self::Fact,
        Self::Source,
        Self::RootClaim,
        Self::Support,
        Self::Critique,
        Self::Custom,
    ];

    /// Category this type belongs to
    #[inline]
    #[must_use]
    pub fn category(self) -> Category {
        category_of(self)
    }

    /// Stable camelCase name (matches the serialized form)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Problem => "problem",
            Self::Cause => "cause",
            Self::Criterion => "criterion",
            Self::Benefit => "benefit",
            Self::Effect => "effect",
            Self::Detriment => "detriment",
            Self::SolutionComponent => "solutionComponent",
            Self::Solution => "solution",
            Self::Obstacle => "obstacle",
            Self::MitigationComponent => "mitigationComponent",
            Self::Mitigation => "mitigation",
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Fact => "fact",
            Self::Source => "source",
            Self::RootClaim => "rootClaim",
            Self::Support => "support",
            Self::Critique => "critique",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation (edge) names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationName {
    Causes,
    SubproblemOf,
    Addresses,
    Accomplishes,
    ContingencyFor,
    Has,
    CriterionFor,
    Creates,
    Fulfills,
    Impedes,
    Mitigates,
    AsksAbout,
    PotentialAnswerTo,
    RelevantFor,
    SourceOf,
    Mentions,
    Supports,
    Critiques,
    /// Free-form relation; the edge carries its own label
    Custom,
}

impl RelationName {
    /// Every relation name, in declaration order
    pub const ALL: [RelationName; 19] = [
        Self::Causes,
        Self::SubproblemOf,
        Self::Addresses,
        Self::Accomplishes,
        Self::ContingencyFor,
        Self::Has,
        Self::CriterionFor,
        Self::Creates,
        Self::Fulfills,
        Self::Impedes,
        Self::Mitigates,
        Self::AsksAbout,
        Self::PotentialAnswerTo,
        Self::RelevantFor,
        Self::SourceOf,
        Self::Mentions,
        Self::Supports,
        Self::Critiques,
        Self::Custom,
    ];

    /// Stable camelCase name (matches the serialized form)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Causes => "causes",
            Self::SubproblemOf => "subproblemOf",
            Self::Addresses => "addresses",
            Self::Accomplishes => "accomplishes",
            Self::ContingencyFor => "contingencyFor",
            Self::Has => "has",
            Self::CriterionFor => "criterionFor",
            Self::Creates => "creates",
            Self::Fulfills => "fulfills",
            Self::Impedes => "impedes",
            Self::Mitigates => "mitigates",
            Self::AsksAbout => "asksAbout",
            Self::PotentialAnswerTo => "potentialAnswerTo",
            Self::RelevantFor => "relevantFor",
            Self::SourceOf => "sourceOf",
            Self::Mentions => "mentions",
            Self::Supports => "supports",
            Self::Critiques => "critiques",
            Self::Custom => "custom",
        }
    }

    /// Parse a camelCase relation name; unknown names yield `None`
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|relation| relation.as_str() == name)
    }

    /// Category whose edges this relation builds
    #[must_use]
    pub fn category(self) -> Category {
        match self {
            Self::AsksAbout
            | Self::PotentialAnswerTo
            | Self::RelevantFor
            | Self::SourceOf
            | Self::Mentions => Category::Research,
            Self::Supports | Self::Critiques => Category::Justification,
            _ => Category::Breakdown,
        }
    }

    /// Human-readable words, e.g. `criterionFor` -> "criterion for"
    #[must_use]
    pub fn phrase(self) -> String {
        relation_phrase(self)
    }
}

impl std::fmt::Display for RelationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the legal-triple table: any `child` may relate to any `parent`
#[derive(Debug, Clone, Copy)]
pub struct RelationRule {
    pub children: &'static [NodeType],
    pub name: RelationName,
    pub parents: &'static [NodeType],
}

impl RelationRule {
    #[inline]
    fn allows(&self, parent: NodeType, name: RelationName, child: NodeType) -> bool {
        self.name == name && self.parents.contains(&parent) && self.children.contains(&child)
    }
}

use NodeType as T;

const BREAKDOWN_TYPES: &[NodeType] = &[
    T::Problem,
    T::Cause,
    T::Criterion,
    T::Benefit,
    T::Effect,
    T::Detriment,
    T::SolutionComponent,
    T::Solution,
    T::Obstacle,
    T::MitigationComponent,
    T::Mitigation,
    T::Custom,
];

const JUSTIFICATION_PARENTS: &[NodeType] = &[T::RootClaim, T::Support, T::Critique];

const RELATION_RULES: &[RelationRule] = &[
    // problem space
    RelationRule {
        children: &[T::Cause, T::Problem, T::Effect, T::Detriment],
        name: RelationName::Causes,
        parents: &[T::Problem, T::Cause, T::Effect, T::Detriment],
    },
    RelationRule {
        children: &[T::Problem],
        name: RelationName::SubproblemOf,
        parents: &[T::Problem],
    },
    RelationRule {
        children: &[T::Criterion],
        name: RelationName::CriterionFor,
        parents: &[T::Problem],
    },
    // solution space
    RelationRule {
        children: &[T::Solution, T::SolutionComponent, T::Benefit, T::Effect],
        name: RelationName::Addresses,
        parents: &[T::Problem, T::Cause],
    },
    RelationRule {
        children: &[T::Solution],
        name: RelationName::Accomplishes,
        parents: &[T::Solution],
    },
    RelationRule {
        children: &[T::Solution],
        name: RelationName::ContingencyFor,
        parents: &[T::Solution],
    },
    RelationRule {
        children: &[T::Solution, T::SolutionComponent],
        name: RelationName::Has,
        parents: &[T::SolutionComponent],
    },
    RelationRule {
        children: &[T::Mitigation, T::MitigationComponent],
        name: RelationName::Has,
        parents: &[T::MitigationComponent],
    },
    RelationRule {
        children: &[
            T::Solution,
            T::SolutionComponent,
            T::Effect,
            T::Mitigation,
            T::MitigationComponent,
        ],
        name: RelationName::Creates,
        parents: &[T::Benefit, T::Effect, T::Detriment],
    },
    RelationRule {
        children: &[T::Solution, T::SolutionComponent, T::Benefit, T::Effect],
        name: RelationName::Fulfills,
        parents: &[T::Criterion],
    },
    RelationRule {
        children: &[T::Obstacle],
        name: RelationName::Impedes,
        parents: &[T::Solution, T::SolutionComponent, T::Mitigation, T::MitigationComponent],
    },
    RelationRule {
        children: &[T::Mitigation, T::MitigationComponent],
        name: RelationName::Mitigates,
        parents: &[T::Detriment, T::Obstacle],
    },
    // research
    RelationRule {
        children: &[T::Question],
        name: RelationName::AsksAbout,
        parents: BREAKDOWN_TYPES,
    },
    RelationRule {
        children: &[T::Answer],
        name: RelationName::PotentialAnswerTo,
        parents: &[T::Question],
    },
    RelationRule {
        children: &[T::Fact, T::Source],
        name: RelationName::RelevantFor,
        parents: BREAKDOWN_TYPES,
    },
    RelationRule {
        children: &[T::Fact, T::Source],
        name: RelationName::RelevantFor,
        parents: &[T::Question, T::Answer],
    },
    RelationRule {
        children: &[T::Source],
        name: RelationName::SourceOf,
        parents: &[T::Fact],
    },
    RelationRule {
        children: &[T::Source],
        name: RelationName::Mentions,
        parents: BREAKDOWN_TYPES,
    },
    // justification
    RelationRule {
        children: &[T::Support],
        name: RelationName::Supports,
        parents: JUSTIFICATION_PARENTS,
    },
    RelationRule {
        children: &[T::Critique],
        name: RelationName::Critiques,
        parents: JUSTIFICATION_PARENTS,
    },
];

/// The legal-triple table
#[inline]
#[must_use]
pub fn relation_rules() -> &'static [RelationRule] {
    RELATION_RULES
}

/// Category of a node type (total)
#[must_use]
pub fn category_of(node_type: NodeType) -> Category {
    match node_type {
        NodeType::Question | NodeType::Answer | NodeType::Fact | NodeType::Source => {
            Category::Research
        }
        NodeType::RootClaim | NodeType::Support | NodeType::Critique => Category::Justification,
        _ => Category::Breakdown,
    }
}

/// Whether `source --relation--> target` is allowed
///
/// `source` is the parent and `target` the child. Custom relations may join
/// any two non-justification nodes.
#[must_use]
pub fn is_legal_relation(source: NodeType, relation: RelationName, target: NodeType) -> bool {
    if relation == RelationName::Custom {
        return source.category() != Category::Justification
            && target.category() != Category::Justification;
    }

    RELATION_RULES
        .iter()
        .any(|rule| rule.allows(source, relation, target))
}

/// Like [`is_legal_relation`], for relation names that arrive as text
#[must_use]
pub fn is_legal_relation_name(source: NodeType, relation: &str, target: NodeType) -> bool {
    RelationName::parse(relation).is_some_and(|name| is_legal_relation(source, name, target))
}

/// Relations the UI may offer when connecting `source` (parent) to `target` (child)
#[must_use]
pub fn legal_relations(source: NodeType, target: NodeType) -> Vec<RelationName> {
    RelationName::ALL
        .into_iter()
        .filter(|relation| is_legal_relation(source, *relation, target))
        .collect()
}

/// Relation names whose edges belong to `category`
#[must_use]
pub fn relations_by_category(category: Category) -> BTreeSet<RelationName> {
    RelationName::ALL
        .into_iter()
        .filter(|relation| relation.category() == category)
        .collect()
}

/// Node types in `category`
#[must_use]
pub fn node_types_by_category(category: Category) -> Vec<NodeType> {
    NodeType::ALL
        .into_iter()
        .filter(|node_type| node_type.category() == category)
        .collect()
}

/// Split a camelCase relation name into lower-case words
#[must_use]
pub fn relation_phrase(relation: RelationName) -> String {
    let mut phrase = String::new();
    for ch in relation.as_str().chars() {
        if ch.is_ascii_uppercase() {
            phrase.push(' ');
            phrase.push(ch.to_ascii_lowercase());
        } else {
            phrase.push(ch);
        }
    }
    phrase
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_node_type_has_a_category() {
        for node_type in NodeType::ALL {
            let _ = category_of(node_type);
        }
        assert_eq!(category_of(NodeType::Custom), Category::Breakdown);
        assert_eq!(category_of(NodeType::Fact), Category::Research);
        assert_eq!(category_of(NodeType::Critique), Category::Justification);
    }

    #[test]
    fn solution_addresses_problem() {
        assert!(is_legal_relation(
            NodeType::Problem,
            RelationName::Addresses,
            NodeType::Solution
        ));
        // reversed direction is not a thing
        assert!(!is_legal_relation(
            NodeType::Solution,
            RelationName::Addresses,
            NodeType::Problem
        ));
    }

    #[test]
    fn solution_creates_benefit_through_component() {
        assert!(is_legal_relation(
            NodeType::SolutionComponent,
            RelationName::Has,
            NodeType::Solution
        ));
        assert!(is_legal_relation(
            NodeType::Benefit,
            RelationName::Creates,
            NodeType::SolutionComponent
        ));
    }

    #[test]
    fn unknown_relation_name_is_illegal() {
        assert!(!is_legal_relation_name(
            NodeType::Problem,
            "frobnicates",
            NodeType::Solution
        ));
        assert!(is_legal_relation_name(
            NodeType::Problem,
            "criterionFor",
            NodeType::Criterion
        ));
    }

    #[test]
    fn custom_relation_excludes_justification() {
        assert!(is_legal_relation(
            NodeType::Fact,
            RelationName::Custom,
            NodeType::Solution
        ));
        assert!(!is_legal_relation(
            NodeType::RootClaim,
            RelationName::Custom,
            NodeType::Solution
        ));
    }

    #[test]
    fn justification_relations_stay_in_category() {
        assert!(is_legal_relation(
            NodeType::RootClaim,
            RelationName::Supports,
            NodeType::Support
        ));
        assert!(is_legal_relation(
            NodeType::Support,
            RelationName::Critiques,
            NodeType::Critique
        ));
        assert!(!is_legal_relation(
            NodeType::Problem,
            RelationName::Supports,
            NodeType::Support
        ));
    }

    #[test]
    fn relations_by_category_partition_all_names() {
        let total: usize = Category::ALL
            .into_iter()
            .map(|category| relations_by_category(category).len())
            .sum();
        assert_eq!(total, RelationName::ALL.len());
        assert!(relations_by_category(Category::Research).contains(&RelationName::AsksAbout));
        assert!(relations_by_category(Category::Justification).contains(&RelationName::Critiques));
    }

    #[test]
    fn legal_relations_lists_offers() {
        let offers = legal_relations(NodeType::Criterion, NodeType::Solution);
        assert_eq!(offers, vec![RelationName::Fulfills, RelationName::Custom]);
    }

    #[test]
    fn phrase_splits_camel_case() {
        assert_eq!(relation_phrase(RelationName::CriterionFor), "criterion for");
        assert_eq!(relation_phrase(RelationName::PotentialAnswerTo), "potential answer to");
        assert_eq!(RelationName::Causes.phrase(), "causes");
    }

    #[test]
    fn parse_round_trips_names() {
        for relation in RelationName::ALL {
            assert_eq!(RelationName::parse(relation.as_str()), Some(relation));
        }
    }
}
