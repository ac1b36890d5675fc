//! Store selection for the command line.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};

use graphclean_core::{EntityGraphStore, GraphStoreProvider, ResolutionConfig};
use graphclean_graph_stores::{GraphStoreFactory, MemoryGraphStore};

/// The store a run operates on.
///
/// The embedded store is kept concrete so the cleaned graph can be saved.
pub enum Backend {
    Embedded(Arc<MemoryGraphStore>),
    Remote(Arc<dyn EntityGraphStore>),
}

impl Backend {
    pub async fn connect(config: &ResolutionConfig) -> Result<Self> {
        match config.store.provider {
            GraphStoreProvider::Embedded => {
                let store = MemoryGraphStore::from_config(&config.store)?;
                Ok(Self::Embedded(Arc::new(store)))
            }
            _ => {
                let store = GraphStoreFactory::create(config.store.clone()).await?;
                tracing::info!(provider = ?config.store.provider, url = %config.store.url, "Connected to graph store");
                Ok(Self::Remote(store))
            }
        }
    }

    pub fn store(&self) -> Arc<dyn EntityGraphStore> {
        match self {
            Self::Embedded(store) => Arc::clone(store) as Arc<dyn EntityGraphStore>,
            Self::Remote(store) => store.clone(),
        }
    }

    /// Write the graph to a fixture file.
    pub fn save(&self, path: &Path) -> Result<()> {
        match self {
            Self::Embedded(store) => {
                store.save(path)?;
                tracing::info!(path = %path.display(), "Saved cleaned graph");
                Ok(())
            }
            Self::Remote(_) => bail!("--output is only supported for fixture-backed runs"),
        }
    }
}
