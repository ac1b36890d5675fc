//! graphclean-graph-stores - Graph store implementations for graphclean.
//!
//! # Supported Backends
//!
//! - **Embedded** (feature: `embedded`, default) - petgraph graph held in
//!   memory, loaded from and saved to a JSON fixture file
//! - **Neo4j** (feature: `neo4j`) - Neo4j graph database, APOC as the
//!   bulk-merge accelerator

mod factory;

#[cfg(feature = "embedded")]
pub mod embedded;

#[cfg(feature = "neo4j")]
mod neo4j;

pub use factory::GraphStoreFactory;

#[cfg(feature = "embedded")]
pub use embedded::{GraphFixture, FixtureRelationship, MemoryGraphStore};

#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jGraphStore;

// Re-export core types
pub use graphclean_core::traits::{EntityGraphStore, GraphStoreConfig, GraphStoreProvider};
