//! Closed label vocabulary for extracted entities.
//!
//! - `EntityLabel`: domain type labels, with the fixed priority order used
//!   to pick a canonical label for cross-label duplicates
//! - `SystemLabel`: graph-membership and provenance markers, never used
//!   for deduplication decisions

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Type label of an extracted entity node.
///
/// Variant names are the labels stored in the graph. Declaration order is
/// the priority order: intrinsic types first (the extractor is almost always
/// right when it assigns these), then the generic catch-all `Concept`, then
/// contextual types that depend on how the source text frames the entity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum EntityLabel {
    /// A published standard or regulation (e.g., "iso 26262").
    Standard,
    /// A software tool or product.
    Tool,
    /// An industry vertical (closed vocabulary, see `taxonomy`).
    Industry,
    /// A company, agency or standards body.
    Organization,
    /// A job role or stakeholder type.
    Role,
    /// A named methodology or framework.
    Methodology,
    /// Generic concept. Default when nothing more specific applies.
    Concept,
    /// A work product such as a document or model.
    Artifact,
    /// A lifecycle stage.
    Processstage,
    /// A recommended practice.
    Bestpractice,
    /// A problem or risk.
    Challenge,
}

impl EntityLabel {
    /// The generic catch-all label.
    pub const GENERIC: EntityLabel = EntityLabel::Concept;

    /// Priority rank; lower wins.
    pub fn priority(&self) -> usize {
        *self as usize
    }

    /// Whether this is an intrinsic (high-confidence) type.
    pub fn is_intrinsic(&self) -> bool {
        self.priority() < Self::GENERIC.priority()
    }

    /// Whether this is a contextual (framing-dependent) type.
    pub fn is_contextual(&self) -> bool {
        self.priority() > Self::GENERIC.priority()
    }

    /// Get all entity labels in priority order.
    pub fn all() -> Vec<EntityLabel> {
        Self::iter().collect()
    }

    /// Label as stored in the graph.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Parse a label with flexible matching ("process stage", "BEST_PRACTICE", "org").
    pub fn from_str_flexible(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();

        match normalized.as_str() {
            "standard" | "regulation" => Some(Self::Standard),
            "tool" | "software" | "product" => Some(Self::Tool),
            "industry" | "sector" => Some(Self::Industry),
            "organization" | "organisation" | "org" | "company" => Some(Self::Organization),
            "role" | "stakeholder" => Some(Self::Role),
            "methodology" | "method" | "framework" => Some(Self::Methodology),
            "concept" => Some(Self::Concept),
            "artifact" | "artefact" => Some(Self::Artifact),
            "processstage" | "stage" | "phase" => Some(Self::Processstage),
            "bestpractice" | "practice" => Some(Self::Bestpractice),
            "challenge" | "problem" | "risk" => Some(Self::Challenge),
            _ => None,
        }
    }

    /// Pick the winning label from a set by priority.
    ///
    /// Returns `Concept` when the set is empty.
    pub fn resolve_winner<'a>(labels: impl IntoIterator<Item = &'a EntityLabel>) -> EntityLabel {
        labels
            .into_iter()
            .min_by_key(|label| label.priority())
            .copied()
            .unwrap_or(Self::GENERIC)
    }
}

/// Labels marking graph membership or extraction provenance.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum SystemLabel {
    /// Every extracted entity carries this label.
    #[strum(serialize = "__Entity__")]
    #[serde(rename = "__Entity__")]
    Entity,
    /// Node created by the knowledge-graph builder.
    #[strum(serialize = "__KGBuilder__")]
    #[serde(rename = "__KGBuilder__")]
    KgBuilder,
}

impl SystemLabel {
    /// Label as stored in the graph.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Set of type labels, ordered by priority.
pub type LabelSet = BTreeSet<EntityLabel>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_priority_order() {
        assert!(EntityLabel::Standard.priority() < EntityLabel::Tool.priority());
        assert!(EntityLabel::Methodology.priority() < EntityLabel::Concept.priority());
        assert!(EntityLabel::Concept.priority() < EntityLabel::Challenge.priority());
        assert!(EntityLabel::Industry.is_intrinsic());
        assert!(EntityLabel::Artifact.is_contextual());
        assert!(!EntityLabel::Concept.is_intrinsic());
        assert!(!EntityLabel::Concept.is_contextual());
    }

    #[test]
    fn test_resolve_winner() {
        let labels = [EntityLabel::Challenge, EntityLabel::Concept];
        assert_eq!(EntityLabel::resolve_winner(&labels), EntityLabel::Concept);

        let labels = [EntityLabel::Artifact, EntityLabel::Standard, EntityLabel::Tool];
        assert_eq!(EntityLabel::resolve_winner(&labels), EntityLabel::Standard);

        let empty: [EntityLabel; 0] = [];
        assert_eq!(EntityLabel::resolve_winner(&empty), EntityLabel::Concept);
    }

    #[test]
    fn test_resolve_winner_is_order_independent() {
        let forward = [EntityLabel::Bestpractice, EntityLabel::Role, EntityLabel::Concept];
        let backward = [EntityLabel::Concept, EntityLabel::Role, EntityLabel::Bestpractice];
        assert_eq!(
            EntityLabel::resolve_winner(&forward),
            EntityLabel::resolve_winner(&backward)
        );
    }

    #[test]
    fn test_label_strings() {
        assert_eq!(EntityLabel::Processstage.as_str(), "Processstage");
        assert_eq!(EntityLabel::from_str("Bestpractice").unwrap(), EntityLabel::Bestpractice);
        assert!(EntityLabel::from_str("Person").is_err());
        assert_eq!(SystemLabel::Entity.as_str(), "__Entity__");
        assert_eq!(SystemLabel::from_str("__KGBuilder__").unwrap(), SystemLabel::KgBuilder);
    }

    #[test]
    fn test_from_str_flexible() {
        assert_eq!(EntityLabel::from_str_flexible("process stage"), Some(EntityLabel::Processstage));
        assert_eq!(EntityLabel::from_str_flexible("BEST_PRACTICE"), Some(EntityLabel::Bestpractice));
        assert_eq!(EntityLabel::from_str_flexible("  org "), Some(EntityLabel::Organization));
        assert_eq!(EntityLabel::from_str_flexible("unknown"), None);
        assert_eq!(EntityLabel::from_str_flexible(""), None);
    }

    #[test]
    fn test_serde_uses_graph_labels() {
        let json = serde_json::to_string(&EntityLabel::Challenge).unwrap();
        assert_eq!(json, "\"Challenge\"");
        let json = serde_json::to_string(&SystemLabel::KgBuilder).unwrap();
        assert_eq!(json, "\"__KGBuilder__\"");
    }

    #[test]
    fn test_all_labels() {
        let all = EntityLabel::all();
        assert_eq!(all.len(), 11);
        assert_eq!(all[0], EntityLabel::Standard);
        assert_eq!(all[10], EntityLabel::Challenge);
    }
}
