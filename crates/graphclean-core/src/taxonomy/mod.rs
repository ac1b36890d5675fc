//! Closed-vocabulary consolidation for Industry nodes.
//!
//! Every Industry node is classified against a static [`CanonicalMapping`]:
//!
//! - `Keep(canonical)`: a known variant (exact, or fuzzy above threshold);
//!   variants of one canonical term fold into a single node
//! - `Reclassify(label)`: really a concept or an organization; relabeled and
//!   then resolved against same-named nodes
//! - `Delete`: too vague to be useful
//! - `Unknown`: reported for manual review, never mutated
//!
//! Fuzzy matching only ever yields `Keep`. A name that merely resembles a
//! reclassify or delete term stays `Unknown`.

mod fuzzy;
mod industry;

pub use fuzzy::{best_match, ratio};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dedup::{apply_groups, DuplicateGroup, GroupKind, GroupMember, Rename};
use crate::error::GraphCleanResult;
use crate::filter::{apply_deletions, DeletionCandidate, DeletionReason};
use crate::merge::MergeExecutor;
use crate::normalize::normalize;
use crate::outcome::{FixStage, StageOutcome};
pub use crate::relabel::ReclassifyCandidate;
use crate::relabel::relabel_and_resolve;
use crate::snapshot::GraphSnapshot;
use crate::types::EntityLabel;

/// Default minimum fuzzy similarity for a `Keep` match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 85.0;

/// Disposition of one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum Classification {
    Keep(String),
    Reclassify(EntityLabel),
    Delete,
    Unknown,
}

/// Static variant table plus reclassify and delete sets for one vocabulary.
#[derive(Debug, Clone)]
pub struct CanonicalMapping {
    label: EntityLabel,
    variants: BTreeMap<String, String>,
    reclassify: BTreeMap<String, EntityLabel>,
    delete: BTreeSet<String>,
}

impl CanonicalMapping {
    /// The built-in Industry vocabulary.
    pub fn industry() -> Self {
        Self {
            label: EntityLabel::Industry,
            variants: industry::INDUSTRY_VARIANTS
                .iter()
                .map(|(v, c)| (v.to_string(), c.to_string()))
                .collect(),
            reclassify: industry::reclassify_terms()
                .map(|(t, l)| (t.to_string(), l))
                .collect(),
            delete: industry::VACUOUS_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Label this vocabulary governs.
    pub fn label(&self) -> EntityLabel {
        self.label
    }

    /// Distinct canonical terms, sorted.
    pub fn canonical_terms(&self) -> BTreeSet<&str> {
        self.variants.values().map(String::as_str).collect()
    }

    pub fn canonical_for(&self, variant: &str) -> Option<&str> {
        self.variants.get(variant).map(String::as_str)
    }
}

/// Everything the consolidator would do to the current graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyPlan {
    /// Canonical groups needing a merge or a rename.
    pub keep: Vec<DuplicateGroup>,
    pub reclassify: Vec<ReclassifyCandidate>,
    pub delete: Vec<DeletionCandidate>,
    /// Unclassifiable terms, listed for manual review.
    pub unknown: Vec<GroupMember>,
}

impl TaxonomyPlan {
    /// Number of mutating actions in the plan.
    pub fn action_count(&self) -> usize {
        self.keep
            .iter()
            .map(|g| g.absorbed.len() + usize::from(g.rename.is_some()))
            .sum::<usize>()
            + self.reclassify.len()
            + self.delete.len()
    }
}

/// Classifies and consolidates nodes of one closed vocabulary.
#[derive(Debug, Clone)]
pub struct TaxonomyConsolidator {
    mapping: CanonicalMapping,
    threshold: f64,
}

impl Default for TaxonomyConsolidator {
    fn default() -> Self {
        Self::new(CanonicalMapping::industry(), DEFAULT_FUZZY_THRESHOLD)
    }
}

impl TaxonomyConsolidator {
    pub fn new(mapping: CanonicalMapping, threshold: f64) -> Self {
        Self { mapping, threshold }
    }

    /// Industry consolidator with a custom fuzzy threshold.
    pub fn industry(threshold: f64) -> Self {
        Self::new(CanonicalMapping::industry(), threshold)
    }

    pub fn mapping(&self) -> &CanonicalMapping {
        &self.mapping
    }

    /// Classify one raw term. Total: every input maps to some disposition.
    pub fn classify(&self, raw: &str) -> Classification {
        let term = normalize(raw);
        if term.is_empty() {
            return Classification::Delete;
        }
        if let Some(canonical) = self.mapping.variants.get(&term) {
            return Classification::Keep(canonical.clone());
        }
        if let Some(target) = self.mapping.reclassify.get(&term) {
            return Classification::Reclassify(*target);
        }
        if self.mapping.delete.contains(&term) {
            return Classification::Delete;
        }

        match best_match(&term, self.mapping.variants.keys().map(String::as_str)) {
            Some((variant, score)) if score >= self.threshold => {
                tracing::debug!(term = %term, variant, score, "Fuzzy taxonomy match");
                Classification::Keep(self.mapping.variants[variant].clone())
            }
            best => {
                tracing::debug!(
                    term = %term,
                    best_match = best.map(|(v, _)| v),
                    score = best.map_or(0.0, |(_, s)| s),
                    "Could not classify term"
                );
                Classification::Unknown
            }
        }
    }

    /// Build the consolidation plan for the governed label.
    pub fn detect(&self, snapshot: &GraphSnapshot) -> TaxonomyPlan {
        let label = self.mapping.label;
        let mut plan = TaxonomyPlan::default();
        let mut canonical_groups: Vec<(String, Vec<GroupMember>)> = Vec::new();

        for node in snapshot.label(label) {
            let member = GroupMember::from_node(node).with_label(label);
            match self.classify(&node.name) {
                Classification::Keep(canonical) => {
                    match canonical_groups.iter_mut().find(|(c, _)| *c == canonical) {
                        Some((_, members)) => members.push(member),
                        None => canonical_groups.push((canonical, vec![member])),
                    }
                }
                Classification::Reclassify(target) => {
                    plan.reclassify.push(ReclassifyCandidate { member, target })
                }
                Classification::Delete => plan.delete.push(DeletionCandidate {
                    member,
                    reason: DeletionReason::VacuousIndustry,
                }),
                Classification::Unknown => plan.unknown.push(member),
            }
        }

        for (canonical, mut members) in canonical_groups {
            let primary_idx = members
                .iter()
                .position(|m| m.name == canonical)
                .unwrap_or(0);
            let primary = members.remove(primary_idx);
            let rename = (primary.name != canonical).then(|| Rename {
                to: canonical.clone(),
                keep_old_as_alias: true,
            });
            if members.is_empty() && rename.is_none() {
                continue;
            }
            plan.keep.push(DuplicateGroup {
                kind: GroupKind::Taxonomy {
                    canonical: canonical.clone(),
                },
                key: canonical,
                primary,
                absorbed: members,
                rename,
            });
        }

        tracing::debug!(
            keep = plan.keep.len(),
            reclassify = plan.reclassify.len(),
            delete = plan.delete.len(),
            unknown = plan.unknown.len(),
            "Classified taxonomy terms"
        );
        plan
    }

    /// Detach-delete vacuous terms.
    pub async fn apply_deletes(
        &self,
        executor: &MergeExecutor,
        candidates: &[DeletionCandidate],
    ) -> GraphCleanResult<StageOutcome> {
        apply_deletions(executor.store().as_ref(), FixStage::TaxonomyDelete, candidates).await
    }

    /// Fold each canonical group into one node named canonically.
    pub async fn apply_keep(
        &self,
        executor: &MergeExecutor,
        groups: &[DuplicateGroup],
        max_concurrency: usize,
    ) -> GraphCleanResult<StageOutcome> {
        apply_groups(executor, FixStage::TaxonomyKeep, groups, max_concurrency).await
    }

    /// Relabel mis-typed terms, then collapse each against same-named nodes.
    pub async fn apply_reclassify(
        &self,
        executor: &MergeExecutor,
        candidates: &[ReclassifyCandidate],
        max_concurrency: usize,
    ) -> GraphCleanResult<StageOutcome> {
        relabel_and_resolve(
            executor,
            FixStage::TaxonomyReclassify,
            self.mapping.label,
            candidates,
            max_concurrency,
        )
        .await
    }
}
