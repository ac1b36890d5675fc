//! Embedded graph store backed by an in-memory petgraph graph.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           MemoryGraphStore              │
//! ├─────────────────────────────────────────┤
//! │  ┌─────────────┐    ┌────────────────┐  │
//! │  │ JSON fixture│    │   petgraph     │  │
//! │  │ (load/save) │◄──►│ StableDiGraph  │  │
//! │  └─────────────┘    └────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Every primitive runs under one lock, which also makes `bulk_merge`
//! atomic. The accelerator can be switched off to exercise the manual
//! merge path.

mod fixture;
pub mod petgraph_ops;

pub use fixture::{FixtureRelationship, GraphFixture};

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use graphclean_core::error::{GraphCleanError, GraphCleanResult};
use graphclean_core::traits::{EntityGraphStore, GraphStoreConfig};
use graphclean_core::types::{
    CreateRelationship, DeleteRequest, EntityLabel, EntityNode, MergeRequest, MigrationCounts,
    NodeId, NodeUpdate, PropertyMap, RelabelRequest, RelationshipId, RelationshipRecord,
    RelationshipType,
};

use petgraph_ops::GraphState;

/// Embedded entity graph store.
///
/// Thread-safe via Mutex on the graph state.
pub struct MemoryGraphStore {
    state: Mutex<GraphState>,
    glossary: Mutex<HashMap<String, String>>,
    bulk_merge: bool,
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraphStore {
    /// Create an empty store with bulk merge enabled.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GraphState::new()),
            glossary: Mutex::new(HashMap::new()),
            bulk_merge: true,
        }
    }

    /// Disable the bulk-merge accelerator.
    pub fn without_bulk_merge(mut self) -> Self {
        self.bulk_merge = false;
        self
    }

    /// Build a store from a fixture.
    pub fn from_fixture(fixture: GraphFixture) -> GraphCleanResult<Self> {
        let store = Self::new();
        {
            let mut state = store.state()?;
            for node in fixture.nodes {
                state.add_node(node)?;
            }
            for rel in fixture.relationships {
                state.add_edge(&rel.start, &rel.end, rel.rel_type, rel.properties, rel.id)?;
            }
        }
        store.set_glossary(fixture.glossary)?;
        Ok(store)
    }

    /// Load a store from a JSON fixture file.
    pub fn load(path: impl AsRef<Path>) -> GraphCleanResult<Self> {
        let path = path.as_ref();
        let store = Self::from_fixture(GraphFixture::load(path)?)?;
        tracing::info!(
            path = %path.display(),
            nodes = store.node_count()?,
            relationships = store.edge_count()?,
            "Loaded graph fixture"
        );
        Ok(store)
    }

    /// Create from a GraphStoreConfig.
    pub fn from_config(config: &GraphStoreConfig) -> GraphCleanResult<Self> {
        // URL is the fixture path for the embedded store
        if config.url.is_empty() || config.url == ":memory:" {
            Ok(Self::new())
        } else {
            Self::load(&config.url)
        }
    }

    /// Current contents as a fixture.
    pub fn to_fixture(&self) -> GraphCleanResult<GraphFixture> {
        let state = self.state()?;
        let relationships = state
            .all_edges()
            .into_iter()
            .map(|(start, end, edge)| FixtureRelationship {
                id: Some(edge.id),
                start,
                end,
                rel_type: edge.rel_type,
                properties: edge.properties,
            })
            .collect();
        let glossary = self.glossary()?.clone().into_iter().collect();
        Ok(GraphFixture {
            nodes: state.all_nodes(),
            relationships,
            glossary,
        })
    }

    /// Write the current contents to a JSON fixture file.
    pub fn save(&self, path: impl AsRef<Path>) -> GraphCleanResult<()> {
        self.to_fixture()?.save(path)
    }

    /// Add a node.
    pub fn insert_node(&self, node: EntityNode) -> GraphCleanResult<()> {
        self.state()?.add_node(node)?;
        Ok(())
    }

    /// Add a relationship `start -[rel_type]-> end`.
    pub fn insert_relationship(
        &self,
        start: impl Into<NodeId>,
        end: impl Into<NodeId>,
        rel_type: &str,
    ) -> GraphCleanResult<RelationshipId> {
        let rel_type = RelationshipType::new(rel_type)?;
        self.state()?
            .add_edge(&start.into(), &end.into(), rel_type, PropertyMap::new(), None)
    }

    /// Replace the glossary. Terms are matched by canonical name.
    pub fn set_glossary<I, K, V>(&self, entries: I) -> GraphCleanResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        *self.glossary()? = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Ok(())
    }

    /// Get the number of nodes in the graph.
    pub fn node_count(&self) -> GraphCleanResult<usize> {
        Ok(self.state()?.node_count())
    }

    /// Get the number of edges in the graph.
    pub fn edge_count(&self) -> GraphCleanResult<usize> {
        Ok(self.state()?.edge_count())
    }

    fn state(&self) -> GraphCleanResult<MutexGuard<'_, GraphState>> {
        self.state
            .lock()
            .map_err(|e| GraphCleanError::internal(e.to_string()))
    }

    fn glossary(&self) -> GraphCleanResult<MutexGuard<'_, HashMap<String, String>>> {
        self.glossary
            .lock()
            .map_err(|e| GraphCleanError::internal(e.to_string()))
    }
}

#[async_trait]
impl EntityGraphStore for MemoryGraphStore {
    async fn scan_label(&self, label: EntityLabel) -> GraphCleanResult<Vec<EntityNode>> {
        Ok(self.state()?.scan(label))
    }

    async fn get_node(&self, id: &NodeId) -> GraphCleanResult<Option<EntityNode>> {
        Ok(self.state()?.node(id).cloned())
    }

    async fn relationships(&self, id: &NodeId) -> GraphCleanResult<Vec<RelationshipRecord>> {
        self.state()?.relationships(id)
    }

    async fn create_relationship(
        &self,
        request: &CreateRelationship,
    ) -> GraphCleanResult<RelationshipId> {
        self.state()?.create_relationship(request)
    }

    async fn set_relationship_properties(
        &self,
        id: &RelationshipId,
        properties: &PropertyMap,
    ) -> GraphCleanResult<()> {
        self.state()?.set_relationship_properties(id, properties)
    }

    async fn delete_relationship(&self, id: &RelationshipId) -> GraphCleanResult<()> {
        self.state()?.delete_relationship(id);
        Ok(())
    }

    async fn update_node(&self, update: &NodeUpdate) -> GraphCleanResult<()> {
        self.state()?.update_node(update)
    }

    async fn relabel(&self, request: &RelabelRequest) -> GraphCleanResult<()> {
        self.state()?.relabel(request)
    }

    async fn delete_node(&self, request: &DeleteRequest) -> GraphCleanResult<usize> {
        self.state()?.delete_node(request)
    }

    async fn supports_bulk_merge(&self) -> GraphCleanResult<bool> {
        Ok(self.bulk_merge)
    }

    async fn bulk_merge(
        &self,
        request: &MergeRequest,
        update: &NodeUpdate,
    ) -> GraphCleanResult<MigrationCounts> {
        if !self.bulk_merge {
            return Err(GraphCleanError::accelerator_unavailable(
                "bulk merge disabled on this embedded store",
            ));
        }
        self.state()?.merge_nodes(request, update)
    }

    async fn glossary_definitions(&self) -> GraphCleanResult<HashMap<String, String>> {
        Ok(self.glossary()?.clone())
    }
}
