//! Entity node and relationship records as read from the graph store.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::label::{EntityLabel, LabelSet, SystemLabel};
use crate::error::{ErrorCode, GraphCleanError, GraphCleanResult};

/// Property bag carried by relationships.
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;

/// Opaque node identifier assigned by the graph store.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque relationship identifier assigned by the graph store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(String);

impl RelationshipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static RELATIONSHIP_TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid relationship type pattern"));

static STORED_TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid stored type pattern"));

/// Validated relationship type name (e.g. `MENTIONED_IN`).
///
/// Only upper-case identifiers are accepted, so a type can be placed in
/// query text by a store driver without any escaping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RelationshipType(String);

impl RelationshipType {
    /// Validate and wrap a relationship type.
    pub fn new(name: impl Into<String>) -> GraphCleanResult<Self> {
        let name = name.into();
        if RELATIONSHIP_TYPE_PATTERN.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(GraphCleanError::validation_with_code(
                format!("Invalid relationship type: {:?}", name),
                ErrorCode::ValInvalidRelationshipType,
            ))
        }
    }

    /// Wrap a type read back from a store.
    ///
    /// Stores may hold types written by other tools, so any unquoted
    /// identifier is accepted; names that would need quoting are rejected.
    pub fn from_stored(name: impl Into<String>) -> GraphCleanResult<Self> {
        let name = name.into();
        if STORED_TYPE_PATTERN.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(GraphCleanError::validation_with_code(
                format!("Unsupported stored relationship type: {:?}", name),
                ErrorCode::ValInvalidRelationshipType,
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RelationshipType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RelationshipType::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Direction of a relationship relative to the node it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// One relationship as seen from a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub id: RelationshipId,
    pub rel_type: RelationshipType,
    pub direction: Direction,
    /// The endpoint that is not the node being scanned (itself for self-loops).
    pub other: NodeId,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl RelationshipRecord {
    /// Identity used when coalescing edges during a merge.
    pub fn key(&self) -> RelationshipKey {
        RelationshipKey {
            rel_type: self.rel_type.clone(),
            direction: self.direction,
            other: self.other.clone(),
        }
    }
}

/// Relationship identity: type, direction and other endpoint, not instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationshipKey {
    pub rel_type: RelationshipType,
    pub direction: Direction,
    pub other: NodeId,
}

/// An extracted entity node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub id: NodeId,
    /// Domain type labels (usually exactly one).
    pub type_labels: LabelSet,
    #[serde(default)]
    pub system_labels: Vec<SystemLabel>,
    /// Canonical dedup key.
    pub name: String,
    /// First-seen original casing.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub source_spans: Vec<String>,
    /// Assigned by community detection; never written here.
    #[serde(default)]
    pub community_id: Option<i64>,
}

impl EntityNode {
    /// Create a node with a single type label.
    pub fn new(id: impl Into<String>, label: EntityLabel, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            type_labels: LabelSet::from([label]),
            system_labels: vec![SystemLabel::Entity],
            name: name.into(),
            display_name: None,
            definition: None,
            aliases: Vec::new(),
            source_spans: Vec::new(),
            community_id: None,
        }
    }

    /// Set display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set definition.
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Set aliases.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Set source spans.
    pub fn with_source_spans<I, S>(mut self, spans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_spans = spans.into_iter().map(Into::into).collect();
        self
    }

    /// Add another type label.
    pub fn with_label(mut self, label: EntityLabel) -> Self {
        self.type_labels.insert(label);
        self
    }

    /// Highest-priority type label carried by this node.
    pub fn primary_label(&self) -> Option<EntityLabel> {
        self.type_labels.iter().next().copied()
    }

    pub fn has_label(&self, label: EntityLabel) -> bool {
        self.type_labels.contains(&label)
    }

    /// Definition, treating an empty string as absent.
    pub fn definition_text(&self) -> Option<&str> {
        self.definition.as_deref().filter(|d| !d.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_type_validation() {
        assert!(RelationshipType::new("MENTIONED_IN").is_ok());
        assert!(RelationshipType::new("APPLIES_TO2").is_ok());
        assert!(RelationshipType::new("mentioned_in").is_err());
        assert!(RelationshipType::new("X]->() DETACH DELETE n //").is_err());
        assert!(RelationshipType::new("").is_err());
    }

    #[test]
    fn test_stored_relationship_types_accept_identifiers() {
        assert_eq!(
            RelationshipType::from_stored("mentionedIn").unwrap().as_str(),
            "mentionedIn"
        );
        assert!(RelationshipType::from_stored("_legacy_link").is_ok());
        assert!(RelationshipType::from_stored("HAS PART").is_err());
        assert!(RelationshipType::from_stored("X]->()").is_err());
    }

    #[test]
    fn test_relationship_type_deserialize_validates() {
        let ok: Result<RelationshipType, _> = serde_json::from_str("\"RELATED_TO\"");
        assert!(ok.is_ok());
        let bad: Result<RelationshipType, _> = serde_json::from_str("\"related to\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_primary_label_uses_priority() {
        let node = EntityNode::new("n1", EntityLabel::Challenge, "traceability")
            .with_label(EntityLabel::Concept);
        assert_eq!(node.primary_label(), Some(EntityLabel::Concept));
        assert!(node.has_label(EntityLabel::Challenge));
    }

    #[test]
    fn test_definition_text_ignores_blank() {
        let node = EntityNode::new("n1", EntityLabel::Concept, "x").with_definition("   ");
        assert_eq!(node.definition_text(), None);
    }
}
