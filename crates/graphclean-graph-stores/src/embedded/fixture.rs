//! JSON graph fixture format.
//!
//! ```json
//! {
//!   "nodes": [
//!     {"id": "n1", "type_labels": ["Standard"], "name": "ISO 26262"}
//!   ],
//!   "relationships": [
//!     {"start": "n1", "end": "n2", "type": "APPLIES_TO"}
//!   ],
//!   "glossary": {"iso 26262": "Functional safety for road vehicles."}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use graphclean_core::error::{ErrorCode, GraphCleanError, GraphCleanResult};
use graphclean_core::types::{EntityNode, NodeId, PropertyMap, RelationshipId, RelationshipType};

/// One relationship in a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRelationship {
    /// Assigned on load when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RelationshipId>,
    pub start: NodeId,
    pub end: NodeId,
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
}

/// Serialized graph: nodes, relationships and glossary definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFixture {
    #[serde(default)]
    pub nodes: Vec<EntityNode>,
    #[serde(default)]
    pub relationships: Vec<FixtureRelationship>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub glossary: BTreeMap<String, String>,
}

impl GraphFixture {
    /// Read a fixture from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> GraphCleanResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| GraphCleanError::Parse {
            message: format!("Invalid graph fixture {}: {}", path.display(), e),
            code: ErrorCode::ParseInvalidFixture,
        })
    }

    /// Write the fixture as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> GraphCleanResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
