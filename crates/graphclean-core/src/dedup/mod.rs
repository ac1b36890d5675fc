//! Duplicate detection and group merging.
//!
//! Each deduplicator is a pure function from a [`GraphSnapshot`] to a list
//! of [`DuplicateGroup`]s. Groups are then applied through the
//! [`MergeExecutor`]: every absorbed member merges into the group's primary,
//! after which the primary may be renamed.
//!
//! [`GraphSnapshot`]: crate::snapshot::GraphSnapshot

mod cross_label;
mod lexical;
mod same_label;

pub use cross_label::{absorbed_by_label, CrossLabelResolver};
pub use lexical::LexicalVariantMerger;
pub use same_label::SameLabelDeduplicator;

use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{GraphCleanError, GraphCleanResult};
use crate::merge::{MergeExecutor, MergeStrategy};
use crate::outcome::{FixStage, StageOutcome};
use crate::traits::EntityGraphStore;
use crate::types::{EntityLabel, EntityNode, LabelSet, MergeRequest, NodeId, NodeUpdate};

/// Why a set of nodes was grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupKind {
    /// Same type label, same canonical name.
    SameLabel { label: EntityLabel },
    /// Same canonical name across several type labels.
    CrossLabel {
        winning_label: EntityLabel,
        labels: LabelSet,
    },
    /// Singular/plural pair under one label.
    LexicalVariant { label: EntityLabel },
    /// Industry variants of one canonical taxonomy term.
    Taxonomy { canonical: String },
}

/// One node in a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: NodeId,
    pub name: String,
    pub label: EntityLabel,
    /// Filled in by preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_count: Option<usize>,
}

impl GroupMember {
    pub fn from_node(node: &EntityNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            label: node.primary_label().unwrap_or(EntityLabel::GENERIC),
            relationship_count: None,
        }
    }

    /// Same member, reported under a specific label.
    pub fn with_label(mut self, label: EntityLabel) -> Self {
        self.label = label;
        self
    }

    pub fn describe(&self) -> String {
        format!("{}: {} ({})", self.label, self.name, self.id)
    }
}

/// Rename applied to a group's primary after its members merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub to: String,
    /// Record the pre-rename name as an alias.
    pub keep_old_as_alias: bool,
}

/// A set of nodes that will collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    #[serde(flatten)]
    pub kind: GroupKind,
    /// Dedup key shared by the members.
    pub key: String,
    pub primary: GroupMember,
    pub absorbed: Vec<GroupMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<Rename>,
}

impl DuplicateGroup {
    /// Primary followed by the absorbed members.
    pub fn members(&self) -> impl Iterator<Item = &GroupMember> {
        std::iter::once(&self.primary).chain(self.absorbed.iter())
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut GroupMember> {
        std::iter::once(&mut self.primary).chain(self.absorbed.iter_mut())
    }

    /// Relationships that would move onto the primary, when annotated.
    pub fn relationships_to_retarget(&self) -> usize {
        self.absorbed
            .iter()
            .filter_map(|m| m.relationship_count)
            .sum()
    }
}

/// Apply groups, one task per group.
///
/// Groups may share nodes: a node carrying several type labels appears in
/// one same-label group per label, possibly as primary in one and absorbed
/// in another. Groups are therefore scheduled in waves where no node is
/// touched by two groups, and a group always runs after every earlier group
/// it overlaps. Under the bulk strategy each wave runs with up to
/// `max_concurrency` in flight; under the manual strategy one at a time.
pub async fn apply_groups(
    executor: &MergeExecutor,
    stage: FixStage,
    groups: &[DuplicateGroup],
    max_concurrency: usize,
) -> GraphCleanResult<StageOutcome> {
    let mut outcome = StageOutcome::new(stage);
    if groups.is_empty() {
        return Ok(outcome);
    }

    let concurrency = match executor.probe().await? {
        MergeStrategy::Bulk => max_concurrency.max(1),
        MergeStrategy::Manual => 1,
    };

    for wave in conflict_free_waves(groups) {
        let results: Vec<GraphCleanResult<StageOutcome>> = stream::iter(wave)
            .map(|group| apply_group(executor, stage, group))
            .buffered(concurrency)
            .collect()
            .await;

        for result in results {
            outcome.absorb(result?);
        }
    }

    tracing::info!(
        stage = %stage,
        groups = groups.len(),
        merged = outcome.applied,
        migrated = outcome.relationships_migrated,
        collapsed = outcome.relationships_collapsed,
        errors = outcome.errors.len(),
        "Merge stage complete"
    );
    Ok(outcome)
}

/// Partition groups into waves of pairwise node-disjoint groups.
///
/// A group lands one wave after the latest earlier group it shares a node
/// with, so overlapping groups keep their input order.
fn conflict_free_waves(groups: &[DuplicateGroup]) -> Vec<Vec<&DuplicateGroup>> {
    let mut last_wave: HashMap<&NodeId, usize> = HashMap::new();
    let mut waves: Vec<Vec<&DuplicateGroup>> = Vec::new();

    for group in groups {
        let wave = group
            .members()
            .filter_map(|m| last_wave.get(&m.id).map(|w| w + 1))
            .max()
            .unwrap_or(0);
        for member in group.members() {
            last_wave.insert(&member.id, wave);
        }
        if waves.len() <= wave {
            waves.resize_with(wave + 1, Vec::new);
        }
        waves[wave].push(group);
    }
    waves
}

/// Merge every absorbed member into the primary, then rename it.
pub async fn apply_group(
    executor: &MergeExecutor,
    stage: FixStage,
    group: &DuplicateGroup,
) -> GraphCleanResult<StageOutcome> {
    let mut outcome = StageOutcome::new(stage);

    for member in &group.absorbed {
        let result = match MergeRequest::new(group.primary.id.clone(), member.id.clone()) {
            Ok(request) => executor.merge(&request).await,
            Err(e) => Err(e),
        };
        if let Some(merged) = outcome.record(member.describe(), result)? {
            outcome.relationships_migrated += merged.migrated();
            outcome.relationships_collapsed += merged.collapsed;
        }
    }

    if let Some(rename) = &group.rename {
        match rename_node(executor.store().as_ref(), &group.primary.id, rename).await {
            Ok(true) => outcome.applied += 1,
            Ok(false) => {}
            Err(e) => {
                outcome.record::<()>(group.primary.describe(), Err(e))?;
            }
        }
    }

    Ok(outcome)
}

/// Rename a node, filling its display name from the old name when unset.
///
/// Reads the node fresh so that properties merged in moments before are
/// not overwritten. Renaming to the current name is a no-op.
pub async fn rename_node(
    store: &dyn EntityGraphStore,
    id: &NodeId,
    rename: &Rename,
) -> GraphCleanResult<bool> {
    let node = store
        .get_node(id)
        .await?
        .ok_or_else(|| GraphCleanError::not_found(id.as_str()))?;
    if node.name == rename.to {
        return Ok(false);
    }

    let mut update = NodeUpdate::new(id.clone());
    update.name = Some(rename.to.clone());
    if node.display_name.is_none() {
        update.display_name = Some(node.name.clone());
    }
    if rename.keep_old_as_alias && !node.name.is_empty() {
        update.add_aliases.push(node.name.clone());
    }
    store.update_node(&update).await?;
    tracing::debug!(id = %id, from = %node.name, to = %rename.to, "Renamed primary");
    Ok(true)
}

/// Group nodes by key, keeping first-seen order of keys and of members.
pub(crate) fn group_by_key<'a, I, F>(nodes: I, key: F) -> Vec<(String, Vec<&'a EntityNode>)>
where
    I: IntoIterator<Item = &'a EntityNode>,
    F: Fn(&EntityNode) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&'a EntityNode>)> = Vec::new();
    for node in nodes {
        let k = key(node);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(node),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![node]));
            }
        }
    }
    groups
}
