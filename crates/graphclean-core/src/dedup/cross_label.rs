//! Cross-label resolution.
//!
//! The extractor sometimes classifies the same real-world entity under
//! different type labels in different documents ("traceability" as both
//! Concept and Challenge). Such groups collapse into one node carrying the
//! highest-priority label.

use std::collections::BTreeMap;

use super::{apply_groups, group_by_key, DuplicateGroup, GroupKind, GroupMember, Rename};
use crate::error::GraphCleanResult;
use crate::merge::MergeExecutor;
use crate::normalize::normalize;
use crate::outcome::{FixStage, StageOutcome};
use crate::snapshot::GraphSnapshot;
use crate::types::{EntityLabel, EntityNode, LabelSet};

/// Collapses nodes sharing a canonical name across type labels.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossLabelResolver;

impl CrossLabelResolver {
    pub fn new() -> Self {
        Self
    }

    /// Groups whose members span at least two distinct type labels.
    pub fn detect(&self, snapshot: &GraphSnapshot) -> Vec<DuplicateGroup> {
        let groups: Vec<DuplicateGroup> = group_by_key(snapshot.nodes(), |n| normalize(&n.name))
            .into_iter()
            .filter_map(|(key, members)| {
                let labels = distinct_labels(&members);
                if members.len() < 2 || labels.len() < 2 {
                    return None;
                }
                Some(build_group(key, &members, labels))
            })
            .collect();

        tracing::debug!(groups = groups.len(), "Detected cross-label duplicates");
        groups
    }

    /// Resolution for a single canonical name.
    ///
    /// Unlike [`detect`](Self::detect), any group of two or more nodes
    /// qualifies, so same-label members collapse too.
    pub fn group_for(&self, snapshot: &GraphSnapshot, name: &str) -> Option<DuplicateGroup> {
        let key = normalize(name);
        let members: Vec<&EntityNode> = snapshot
            .nodes()
            .into_iter()
            .filter(|n| normalize(&n.name) == key)
            .collect();
        if members.len() < 2 {
            return None;
        }
        let labels = distinct_labels(&members);
        Some(build_group(key, &members, labels))
    }

    pub async fn apply(
        &self,
        executor: &MergeExecutor,
        groups: &[DuplicateGroup],
        max_concurrency: usize,
    ) -> GraphCleanResult<StageOutcome> {
        apply_groups(executor, FixStage::CrossLabel, groups, max_concurrency).await
    }

    /// Capture a fresh snapshot and collapse every node named `name`.
    pub async fn resolve_name(
        &self,
        executor: &MergeExecutor,
        name: &str,
    ) -> GraphCleanResult<StageOutcome> {
        let snapshot = GraphSnapshot::capture(executor.store().as_ref()).await?;
        match self.group_for(&snapshot, name) {
            Some(group) => apply_groups(executor, FixStage::CrossLabel, &[group], 1).await,
            None => Ok(StageOutcome::new(FixStage::CrossLabel)),
        }
    }
}

fn distinct_labels(members: &[&EntityNode]) -> LabelSet {
    members
        .iter()
        .flat_map(|n| n.type_labels.iter().copied())
        .collect()
}

fn build_group(key: String, members: &[&EntityNode], labels: LabelSet) -> DuplicateGroup {
    let winning_label = EntityLabel::resolve_winner(&labels);
    let primary_idx = members
        .iter()
        .position(|n| n.has_label(winning_label))
        .unwrap_or(0);
    let primary = members[primary_idx];

    let absorbed = members
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != primary_idx)
        .map(|(_, n)| GroupMember::from_node(n))
        .collect();

    let rename = (primary.name != key).then(|| Rename {
        to: key.clone(),
        keep_old_as_alias: false,
    });

    DuplicateGroup {
        kind: GroupKind::CrossLabel {
            winning_label,
            labels,
        },
        key,
        primary: GroupMember::from_node(primary).with_label(winning_label),
        absorbed,
        rename,
    }
}

/// Per winning label, how many nodes were absorbed from each losing label.
pub fn absorbed_by_label(
    groups: &[DuplicateGroup],
) -> BTreeMap<EntityLabel, BTreeMap<EntityLabel, usize>> {
    let mut table: BTreeMap<EntityLabel, BTreeMap<EntityLabel, usize>> = BTreeMap::new();
    for group in groups {
        if let GroupKind::CrossLabel { winning_label, .. } = &group.kind {
            let row = table.entry(*winning_label).or_default();
            for member in &group.absorbed {
                *row.entry(member.label).or_default() += 1;
            }
        }
    }
    table
}
