//! Merge executor: fold a duplicate node into a primary without losing
//! any relationship.
//!
//! Two strategies exist. `Bulk` hands the whole merge to the store as one
//! atomic call. `Manual` composes store primitives; every step is written
//! so that re-running the merge from scratch after a partial failure
//! converges to the same result:
//!
//! 1. each duplicate edge is first re-created on the primary (or folded into
//!    an equivalent edge already there) and only then deleted
//! 2. the property update is a union, so applying it twice is harmless
//! 3. the duplicate is deleted last with a strict (non-detach) delete,
//!    which fails instead of dropping an edge that was not migrated
//!
//! Relationship creation is not idempotent, so a create that fails with a
//! transient error is checked against the primary's edges before the error
//! is surfaced: a create the store committed anyway is adopted.

mod properties;

pub use properties::{plan_property_merge, DefinitionChoice, PropertyMergeRule};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::{GraphCleanError, GraphCleanResult};
use crate::traits::EntityGraphStore;
use crate::types::{
    CreateRelationship, DeleteRequest, Direction, EntityNode, MergeRequest, MigrationCounts,
    NodeId, NodeUpdate, PropertyMap, RelationshipId, RelationshipKey, RelationshipRecord,
};

/// How merges are carried out against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Store-provided atomic merge.
    Bulk,
    /// Composition of store primitives.
    Manual,
}

/// Outcome of one merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub primary: NodeId,
    pub absorbed: NodeId,
    pub outgoing_migrated: usize,
    pub incoming_migrated: usize,
    /// Duplicate edges folded into an equivalent edge on the primary.
    pub collapsed: usize,
    pub rule: PropertyMergeRule,
    pub strategy: MergeStrategy,
    /// Set when a bulk merge had to fall back to the manual path.
    pub degraded: bool,
    pub relationships_before: usize,
    pub relationships_after: usize,
}

impl MergeResult {
    pub fn migrated(&self) -> usize {
        self.outgoing_migrated + self.incoming_migrated
    }
}

/// Executes merges against one store.
pub struct MergeExecutor {
    store: Arc<dyn EntityGraphStore>,
    strategy: OnceCell<MergeStrategy>,
    degraded: AtomicBool,
}

impl MergeExecutor {
    pub fn new(store: Arc<dyn EntityGraphStore>) -> Self {
        Self {
            store,
            strategy: OnceCell::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Executor with a fixed strategy, skipping the capability probe.
    pub fn with_strategy(store: Arc<dyn EntityGraphStore>, strategy: MergeStrategy) -> Self {
        Self {
            store,
            strategy: OnceCell::new_with(Some(strategy)),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityGraphStore> {
        &self.store
    }

    /// Probe the store once and report the effective strategy.
    ///
    /// After a bulk merge reported the accelerator missing, this is
    /// `Manual` for the rest of the executor's life.
    pub async fn probe(&self) -> GraphCleanResult<MergeStrategy> {
        let probed = *self
            .strategy
            .get_or_try_init(|| async {
                let strategy = if self.store.supports_bulk_merge().await? {
                    MergeStrategy::Bulk
                } else {
                    MergeStrategy::Manual
                };
                tracing::info!(?strategy, "Merge strategy selected");
                GraphCleanResult::Ok(strategy)
            })
            .await?;

        if self.is_degraded() {
            Ok(MergeStrategy::Manual)
        } else {
            Ok(probed)
        }
    }

    /// Whether a bulk merge has fallen back to the manual path.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Merge `request.duplicate` into `request.primary`.
    pub async fn merge(&self, request: &MergeRequest) -> GraphCleanResult<MergeResult> {
        let primary = self.require_node(&request.primary).await?;
        let duplicate = self.require_node(&request.duplicate).await?;

        let (update, rule) = plan_property_merge(&primary, &duplicate);
        let primary_before = self.store.relationships(&primary.id).await?.len();
        let duplicate_before = self.store.relationships(&duplicate.id).await?.len();

        let strategy = self.probe().await?;
        let mut degraded = false;
        let counts = match strategy {
            MergeStrategy::Bulk => match self.store.bulk_merge(request, &update).await {
                Ok(counts) => counts,
                Err(GraphCleanError::AcceleratorUnavailable { message }) => {
                    self.degraded.store(true, Ordering::Relaxed);
                    degraded = true;
                    tracing::warn!(
                        primary = %primary.id,
                        duplicate = %duplicate.id,
                        reason = %message,
                        "Bulk merge unavailable, falling back to manual merge (degraded mode)"
                    );
                    self.manual_merge(&primary, &duplicate, &update).await?
                }
                Err(e) => return Err(e),
            },
            MergeStrategy::Manual => self.manual_merge(&primary, &duplicate, &update).await?,
        };

        let primary_after = self.store.relationships(&primary.id).await?.len();
        tracing::debug!(
            primary = %primary.id,
            duplicate = %duplicate.id,
            name = %duplicate.name,
            primary_before,
            duplicate_before,
            primary_after,
            outgoing = counts.outgoing,
            incoming = counts.incoming,
            collapsed = counts.collapsed,
            rules = %rule.describe(),
            "Merged duplicate"
        );

        Ok(MergeResult {
            primary: primary.id,
            absorbed: duplicate.id,
            outgoing_migrated: counts.outgoing,
            incoming_migrated: counts.incoming,
            collapsed: counts.collapsed,
            rule,
            strategy: if degraded { MergeStrategy::Manual } else { strategy },
            degraded,
            relationships_before: primary_before + duplicate_before,
            relationships_after: primary_after,
        })
    }

    async fn require_node(&self, id: &NodeId) -> GraphCleanResult<EntityNode> {
        self.store
            .get_node(id)
            .await?
            .ok_or_else(|| GraphCleanError::not_found(id.as_str()))
    }

    async fn manual_merge(
        &self,
        primary: &EntityNode,
        duplicate: &EntityNode,
        update: &NodeUpdate,
    ) -> GraphCleanResult<MigrationCounts> {
        let mut kept: HashMap<RelationshipKey, RelationshipRecord> = self
            .store
            .relationships(&primary.id)
            .await?
            .into_iter()
            .map(|rel| (rel.key(), rel))
            .collect();

        let mut counts = MigrationCounts::default();
        let mut seen = HashSet::new();

        for rel in self.store.relationships(&duplicate.id).await? {
            if !seen.insert(rel.id.clone()) {
                continue;
            }

            let retargeted = retarget(&rel, &duplicate.id, &primary.id);
            let key = RelationshipKey {
                rel_type: rel.rel_type.clone(),
                direction: retargeted.direction,
                other: retargeted.other.clone(),
            };

            if let Some(existing) = kept.get_mut(&key) {
                let missing: PropertyMap = rel
                    .properties
                    .iter()
                    .filter(|(k, _)| !existing.properties.contains_key(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if !missing.is_empty() {
                    self.store
                        .set_relationship_properties(&existing.id, &missing)
                        .await?;
                    existing.properties.extend(missing);
                }
                counts.collapsed += 1;
            } else {
                let (start, end) = match retargeted.direction {
                    Direction::Outgoing => (primary.id.clone(), retargeted.other.clone()),
                    Direction::Incoming => (retargeted.other.clone(), primary.id.clone()),
                };
                let request = CreateRelationship {
                    start,
                    end,
                    rel_type: rel.rel_type.clone(),
                    properties: rel.properties.clone(),
                };
                let id = match self.store.create_relationship(&request).await {
                    Ok(id) => id,
                    Err(e) if e.is_transient() => {
                        self.find_committed(&primary.id, &key, &kept).await?.ok_or(e)?
                    }
                    Err(e) => return Err(e),
                };
                match rel.direction {
                    Direction::Outgoing => counts.outgoing += 1,
                    Direction::Incoming => counts.incoming += 1,
                }
                kept.insert(
                    key.clone(),
                    RelationshipRecord {
                        id,
                        rel_type: key.rel_type,
                        direction: key.direction,
                        other: key.other,
                        properties: rel.properties.clone(),
                    },
                );
            }

            self.store.delete_relationship(&rel.id).await?;
        }

        if !update.is_empty() {
            self.store.update_node(update).await?;
        }
        self.store
            .delete_node(&DeleteRequest::strict(duplicate.id.clone()))
            .await?;

        Ok(counts)
    }
}

impl MergeExecutor {
    /// Look for an edge matching `key` on the primary that is not yet
    /// tracked, i.e. one created by a call whose answer was lost.
    async fn find_committed(
        &self,
        primary: &NodeId,
        key: &RelationshipKey,
        kept: &HashMap<RelationshipKey, RelationshipRecord>,
    ) -> GraphCleanResult<Option<RelationshipId>> {
        let tracked: HashSet<&RelationshipId> = kept.values().map(|r| &r.id).collect();
        let found = self
            .store
            .relationships(primary)
            .await?
            .into_iter()
            .find(|rel| &rel.key() == key && !tracked.contains(&rel.id))
            .map(|rel| rel.id);
        if let Some(id) = &found {
            tracing::warn!(
                primary = %primary,
                relationship = %id,
                "Relationship create timed out but was committed, adopting it"
            );
        }
        Ok(found)
    }
}

/// Where a duplicate's edge lands once moved onto the primary.
struct Retargeted {
    direction: Direction,
    other: NodeId,
}

/// Re-point an edge of `duplicate` at `primary`.
///
/// Edges between the duplicate and itself or the primary become self-loops
/// on the primary, which are always keyed as outgoing.
fn retarget(rel: &RelationshipRecord, duplicate: &NodeId, primary: &NodeId) -> Retargeted {
    let other = if &rel.other == duplicate {
        primary.clone()
    } else {
        rel.other.clone()
    };
    let direction = if &other == primary {
        Direction::Outgoing
    } else {
        rel.direction
    };
    Retargeted { direction, other }
}
