//! Type-label corrections.
//!
//! A relabel can make a node collide with an existing node of its new label,
//! so every correction is followed by a cross-label resolution of the
//! relabeled names against a fresh snapshot.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::dedup::{apply_groups, CrossLabelResolver, DuplicateGroup, GroupMember};
use crate::error::GraphCleanResult;
use crate::merge::MergeExecutor;
use crate::normalize::normalize;
use crate::outcome::{FixStage, StageOutcome};
use crate::snapshot::GraphSnapshot;
use crate::types::{EntityLabel, RelabelRequest};

/// Leading words that mark a desired outcome rather than a problem.
const POSITIVE_OUTCOME_WORDS: &[&str] = &[
    "high-quality", "quality", "satisfaction", "success", "successful", "efficient", "efficiency",
    "effective", "effectiveness", "improved", "improvement", "reduced", "reduction", "faster",
    "better", "optimal", "reliable", "reliability", "safe", "safety", "secure", "security",
    "compliant", "compliance", "innovation", "innovative", "productivity", "performance",
    "achievement", "benefit", "advantage",
];

static DEFAULT_OUTCOME_WORDS: Lazy<BTreeSet<String>> =
    Lazy::new(|| POSITIVE_OUTCOME_WORDS.iter().map(|w| w.to_string()).collect());

/// A node whose type label is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclassifyCandidate {
    pub member: GroupMember,
    pub target: EntityLabel,
}

/// Relabel each candidate from `from` to its target, then collapse every
/// relabeled name against same-named nodes.
///
/// Relabels are the applied items; the follow-up merges only contribute
/// relationship counts, skips and errors.
pub async fn relabel_and_resolve(
    executor: &MergeExecutor,
    stage: FixStage,
    from: EntityLabel,
    candidates: &[ReclassifyCandidate],
    max_concurrency: usize,
) -> GraphCleanResult<StageOutcome> {
    let store = executor.store().as_ref();
    let mut outcome = StageOutcome::new(stage);
    let mut relabeled: Vec<String> = Vec::new();

    for candidate in candidates {
        let result = match RelabelRequest::new(candidate.member.id.clone(), from, candidate.target) {
            Ok(request) => store.relabel(&request).await,
            Err(e) => Err(e),
        };
        if outcome.record(candidate.member.describe(), result)?.is_some() {
            tracing::debug!(
                name = %candidate.member.name,
                from = %from,
                target = %candidate.target,
                "Relabeled node"
            );
            relabeled.push(candidate.member.name.clone());
        }
    }

    if relabeled.is_empty() {
        return Ok(outcome);
    }

    let snapshot = GraphSnapshot::capture(store).await?;
    let resolver = CrossLabelResolver::new();
    let mut seen = HashSet::new();
    let groups: Vec<DuplicateGroup> = relabeled
        .iter()
        .filter(|name| seen.insert(normalize(name)))
        .filter_map(|name| resolver.group_for(&snapshot, name))
        .collect();

    let mut merged = apply_groups(executor, stage, &groups, max_concurrency).await?;
    merged.applied = 0;
    outcome.absorb(merged);
    Ok(outcome)
}

/// Moves Challenge nodes named after a positive outcome ("High-Quality
/// Products", "Improved Safety") to Concept.
///
/// Only the first word is checked, as a whole word: "quality issues" is
/// flagged, "poor quality" is not. When a Concept of the same name already
/// exists the two are merged after the relabel.
#[derive(Debug, Clone)]
pub struct MislabeledChallengeFixer {
    words: BTreeSet<String>,
}

impl Default for MislabeledChallengeFixer {
    fn default() -> Self {
        Self {
            words: DEFAULT_OUTCOME_WORDS.clone(),
        }
    }
}

impl MislabeledChallengeFixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mislabeled(&self, name: &str) -> bool {
        normalize(name)
            .split(' ')
            .next()
            .map_or(false, |first| self.words.contains(first))
    }

    pub fn detect(&self, snapshot: &GraphSnapshot) -> Vec<ReclassifyCandidate> {
        let candidates: Vec<ReclassifyCandidate> = snapshot
            .label(EntityLabel::Challenge)
            .iter()
            .filter(|node| self.is_mislabeled(&node.name))
            .map(|node| ReclassifyCandidate {
                member: GroupMember::from_node(node).with_label(EntityLabel::Challenge),
                target: EntityLabel::Concept,
            })
            .collect();

        tracing::debug!(count = candidates.len(), "Detected mislabeled challenges");
        candidates
    }

    pub async fn apply(
        &self,
        executor: &MergeExecutor,
        candidates: &[ReclassifyCandidate],
        max_concurrency: usize,
    ) -> GraphCleanResult<StageOutcome> {
        let outcome = relabel_and_resolve(
            executor,
            FixStage::MislabeledChallenge,
            EntityLabel::Challenge,
            candidates,
            max_concurrency,
        )
        .await?;
        tracing::info!(
            relabeled = outcome.applied,
            migrated = outcome.relationships_migrated,
            "Relabeled mislabeled challenges"
        );
        Ok(outcome)
    }
}
