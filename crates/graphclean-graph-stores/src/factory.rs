//! Factory for creating graph store providers.

use std::sync::Arc;

use graphclean_core::error::{GraphCleanError, GraphCleanResult};
use graphclean_core::traits::{EntityGraphStore, GraphStoreConfig, GraphStoreProvider};

/// Factory for creating graph store providers.
pub struct GraphStoreFactory;

impl GraphStoreFactory {
    /// Create a graph store from the given configuration.
    pub async fn create(config: GraphStoreConfig) -> GraphCleanResult<Arc<dyn EntityGraphStore>> {
        match config.provider {
            #[cfg(feature = "embedded")]
            GraphStoreProvider::Embedded => {
                let store = crate::embedded::MemoryGraphStore::from_config(&config)?;
                Ok(Arc::new(store))
            }

            #[cfg(feature = "neo4j")]
            GraphStoreProvider::Neo4j => {
                let store = crate::neo4j::Neo4jGraphStore::new(config).await?;
                Ok(Arc::new(store))
            }

            #[allow(unreachable_patterns)]
            provider => Err(GraphCleanError::UnsupportedProvider {
                provider: format!("{:?} (not compiled in)", provider),
            }),
        }
    }

    /// Create a Neo4j graph store.
    #[cfg(feature = "neo4j")]
    pub async fn neo4j(
        uri: &str,
        username: &str,
        password: &str,
    ) -> GraphCleanResult<Arc<dyn EntityGraphStore>> {
        let config = GraphStoreConfig {
            provider: GraphStoreProvider::Neo4j,
            url: uri.to_string(),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            database: None,
        };
        Self::create(config).await
    }
}

#[cfg(all(test, feature = "embedded"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_empty_embedded_store() {
        let store = GraphStoreFactory::create(GraphStoreConfig::default())
            .await
            .unwrap();
        let nodes = store
            .scan_label(graphclean_core::EntityLabel::Concept)
            .await
            .unwrap();
        assert!(nodes.is_empty());
        assert!(store.supports_bulk_merge().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_fixture_is_an_error() {
        let config = GraphStoreConfig::embedded("/nonexistent/graph.json");
        assert!(GraphStoreFactory::create(config).await.is_err());
    }
}
