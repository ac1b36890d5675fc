//! Typed mutation requests issued to a graph store.
//!
//! Every mutation the engine performs is one of these structs. Requests are
//! validated before they reach a store driver; labels are enum variants and
//! relationship types are pre-validated identifiers, so drivers never splice
//! caller-provided text into a query.

use serde::{Deserialize, Serialize};

use super::label::EntityLabel;
use super::node::{NodeId, PropertyMap, RelationshipType};
use crate::error::{ErrorCode, GraphCleanError, GraphCleanResult};

/// Merge `duplicate` into `primary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub primary: NodeId,
    pub duplicate: NodeId,
}

impl MergeRequest {
    /// Build a validated merge request.
    pub fn new(primary: NodeId, duplicate: NodeId) -> GraphCleanResult<Self> {
        if primary == duplicate {
            return Err(GraphCleanError::validation_with_code(
                format!("Cannot merge node '{}' into itself", primary),
                ErrorCode::ValSelfMerge,
            ));
        }
        Ok(Self { primary, duplicate })
    }
}

/// Delete a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub id: NodeId,
    /// When set, the store refuses to delete a node not carrying this label.
    pub expected_label: Option<EntityLabel>,
    /// Remove incident relationships too. When false the store refuses to
    /// delete a node that still has relationships.
    pub detach: bool,
}

impl DeleteRequest {
    /// Detach-delete a node carrying `label`.
    pub fn detach(id: NodeId, label: EntityLabel) -> Self {
        Self {
            id,
            expected_label: Some(label),
            detach: true,
        }
    }

    /// Delete a node that must already be relationship-free.
    pub fn strict(id: NodeId) -> Self {
        Self {
            id,
            expected_label: None,
            detach: false,
        }
    }
}

/// Swap one type label for another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelabelRequest {
    pub id: NodeId,
    pub remove: EntityLabel,
    pub add: EntityLabel,
}

impl RelabelRequest {
    pub fn new(id: NodeId, remove: EntityLabel, add: EntityLabel) -> GraphCleanResult<Self> {
        if remove == add {
            return Err(GraphCleanError::validation_with_code(
                format!("Relabel of '{}' is a no-op ({} -> {})", id, remove, add),
                ErrorCode::ValInvalidLabel,
            ));
        }
        Ok(Self { id, remove, add })
    }
}

/// Create a relationship `start -[rel_type]-> end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRelationship {
    pub start: NodeId,
    pub end: NodeId,
    pub rel_type: RelationshipType,
    #[serde(default)]
    pub properties: PropertyMap,
}

/// Property update on an entity node.
///
/// Scalars overwrite when `Some`; collections are unioned into the stored
/// values, never replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub id: NodeId,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub definition: Option<String>,
    pub add_aliases: Vec<String>,
    pub add_source_spans: Vec<String>,
}

impl NodeUpdate {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// True when applying the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.display_name.is_none()
            && self.definition.is_none()
            && self.add_aliases.is_empty()
            && self.add_source_spans.is_empty()
    }
}

/// Relationship counts reported by a migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCounts {
    /// Outgoing relationships moved onto the primary.
    pub outgoing: usize,
    /// Incoming relationships moved onto the primary.
    pub incoming: usize,
    /// Relationships folded into an equivalent edge that already existed.
    pub collapsed: usize,
}

impl MigrationCounts {
    pub fn total(&self) -> usize {
        self.outgoing + self.incoming
    }
}
