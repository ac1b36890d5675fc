//! graphclean-core - Core library for graphclean.
//!
//! Entity resolution and consolidation for LLM-extracted knowledge graphs:
//! name normalization, duplicate detection, relationship-preserving merges,
//! industry taxonomy consolidation, label corrections and generic-term
//! removal, driven by a
//! single orchestrator against any [`EntityGraphStore`].
//!
//! # Example
//!
//! ```ignore
//! use graphclean_core::{ResolutionConfig, ValidationFixOrchestrator};
//!
//! let config = ResolutionConfig::from_file("graphclean.toml")?;
//! let orchestrator = ValidationFixOrchestrator::new(store, config);
//!
//! // Inspect what would change
//! let preview = orchestrator.preview().await?;
//! println!("{}", graphclean_core::orchestrator::render_preview(&preview, 20));
//!
//! // Apply every fix
//! let summary = orchestrator.apply().await;
//! assert!(summary.converged());
//! ```

pub mod backfill;
pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod merge;
pub mod normalize;
pub mod orchestrator;
pub mod outcome;
pub mod relabel;
pub mod retry;
pub mod snapshot;
pub mod taxonomy;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use backfill::DefinitionBackfill;
pub use config::{ResolutionConfig, RetryPolicy};
pub use dedup::{
    CrossLabelResolver, DuplicateGroup, GroupKind, GroupMember, LexicalVariantMerger,
    SameLabelDeduplicator,
};
pub use error::{ErrorCode, GraphCleanError, GraphCleanResult};
pub use filter::{DeletionCandidate, GenericTermFilter};
pub use merge::{MergeExecutor, MergeResult, MergeStrategy};
pub use normalize::{names_equivalent, normalize, NameNormalizer};
pub use orchestrator::{
    render_preview, render_summary, ApplySummary, CandidateCounts, DetectionReport, FixPreview,
    ValidationFixOrchestrator,
};
pub use outcome::{FixStage, StageOutcome};
pub use relabel::MislabeledChallengeFixer;
pub use retry::RetryingStore;
pub use snapshot::GraphSnapshot;
pub use taxonomy::{Classification, TaxonomyConsolidator};
pub use traits::{EntityGraphStore, GraphStoreConfig, GraphStoreProvider};
pub use types::{
    EntityLabel, EntityNode, MergeRequest, NodeId, RelationshipRecord, RelationshipType,
    SystemLabel,
};
