//! Graph store trait and related configuration.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{GraphCleanError, GraphCleanResult};
use crate::types::{
    CreateRelationship, DeleteRequest, EntityLabel, EntityNode, MergeRequest, MigrationCounts,
    NodeId, NodeUpdate, PropertyMap, RelabelRequest, RelationshipId, RelationshipRecord,
};

/// Core EntityGraphStore trait - every graph backend implements this.
///
/// The primitives are deliberately small so a manual merge can be expressed
/// on any backend. Backends with a server-side procedure library may also
/// offer an atomic bulk merge.
#[async_trait]
pub trait EntityGraphStore: Send + Sync {
    /// All entity nodes carrying `label`, in a stable scan order.
    async fn scan_label(&self, label: EntityLabel) -> GraphCleanResult<Vec<EntityNode>>;

    /// Fetch one node.
    async fn get_node(&self, id: &NodeId) -> GraphCleanResult<Option<EntityNode>>;

    /// All relationships incident on a node, both directions.
    ///
    /// A self-loop is reported once, as outgoing with `other` set to the node.
    async fn relationships(&self, id: &NodeId) -> GraphCleanResult<Vec<RelationshipRecord>>;

    /// Create a relationship.
    async fn create_relationship(
        &self,
        request: &CreateRelationship,
    ) -> GraphCleanResult<RelationshipId>;

    /// Set (overwrite) the given properties on a relationship, leaving others.
    async fn set_relationship_properties(
        &self,
        id: &RelationshipId,
        properties: &PropertyMap,
    ) -> GraphCleanResult<()>;

    /// Delete a relationship. Deleting a missing relationship is a no-op.
    async fn delete_relationship(&self, id: &RelationshipId) -> GraphCleanResult<()>;

    /// Apply a property update: scalars overwrite, collections union.
    async fn update_node(&self, update: &NodeUpdate) -> GraphCleanResult<()>;

    /// Swap one type label for another.
    async fn relabel(&self, request: &RelabelRequest) -> GraphCleanResult<()>;

    /// Delete a node, returning the number of relationships removed with it.
    async fn delete_node(&self, request: &DeleteRequest) -> GraphCleanResult<usize>;

    /// Whether `bulk_merge` is available on this backend.
    async fn supports_bulk_merge(&self) -> GraphCleanResult<bool> {
        Ok(false)
    }

    /// Atomically migrate relationships, apply `update` to the primary and
    /// delete the duplicate.
    ///
    /// Must return [`GraphCleanError::AcceleratorUnavailable`] without
    /// mutating anything when the backend cannot do this.
    async fn bulk_merge(
        &self,
        request: &MergeRequest,
        update: &NodeUpdate,
    ) -> GraphCleanResult<MigrationCounts> {
        let _ = update;
        Err(GraphCleanError::accelerator_unavailable(format!(
            "bulk merge of '{}' into '{}' is not supported by this store",
            request.duplicate, request.primary
        )))
    }

    /// Glossary definitions keyed by canonical term name.
    async fn glossary_definitions(&self) -> GraphCleanResult<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}

/// Graph store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphStoreConfig {
    /// Provider type.
    pub provider: GraphStoreProvider,
    /// Connection URL, or fixture path for the embedded provider.
    pub url: String,
    /// Username for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Database name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            provider: GraphStoreProvider::Embedded,
            url: String::new(),
            username: None,
            password: None,
            database: None,
        }
    }
}

impl GraphStoreConfig {
    /// Neo4j connection on `url`.
    pub fn neo4j(url: impl Into<String>) -> Self {
        Self {
            provider: GraphStoreProvider::Neo4j,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Embedded store loaded from a JSON fixture (empty when `path` is empty).
    pub fn embedded(path: impl Into<String>) -> Self {
        Self {
            provider: GraphStoreProvider::Embedded,
            url: path.into(),
            ..Default::default()
        }
    }
}

/// Graph store provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphStoreProvider {
    #[default]
    Embedded,
    Neo4j,
}

impl GraphStoreProvider {
    /// Parse a provider name, case-insensitive.
    pub fn parse(s: &str) -> GraphCleanResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "embedded" | "memory" | "fixture" => Ok(Self::Embedded),
            "neo4j" => Ok(Self::Neo4j),
            other => Err(GraphCleanError::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(GraphStoreProvider::parse("Neo4j").unwrap(), GraphStoreProvider::Neo4j);
        assert_eq!(GraphStoreProvider::parse("memory").unwrap(), GraphStoreProvider::Embedded);
        assert!(matches!(
            GraphStoreProvider::parse("kuzu"),
            Err(GraphCleanError::UnsupportedProvider { .. })
        ));
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: GraphStoreConfig =
            serde_json::from_str(r#"{"provider": "neo4j", "url": "bolt://db:7687"}"#).unwrap();
        assert_eq!(config.provider, GraphStoreProvider::Neo4j);
        assert!(config.username.is_none());
    }
}
