//! Detect, preview and apply every fix in a fixed, safety-ordered sequence.
//!
//! Apply order:
//!
//! 1. additive fixes: name normalization, definition backfill
//! 2. deletions: generic terms, vacuous taxonomy terms
//! 3. label corrections: mislabeled challenges
//! 4. merges: same-label, taxonomy keep, taxonomy reclassify, lexical
//!    variants, cross-label
//! 5. definition backfill again, for names the merges produced
//!
//! Every stage captures its own snapshot, so no stage acts on candidates
//! computed before an earlier stage mutated the graph. The pass ends with a
//! fresh detect whose counts go into the summary.

mod report;

pub use report::{render_preview, render_summary};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::backfill::{BackfillCandidate, DefinitionBackfill};
use crate::config::ResolutionConfig;
use crate::dedup::{
    CrossLabelResolver, DuplicateGroup, GroupMember, LexicalVariantMerger, SameLabelDeduplicator,
};
use crate::error::{GraphCleanError, GraphCleanResult};
use crate::filter::{DeletionCandidate, GenericTermFilter};
use crate::merge::{MergeExecutor, MergeStrategy};
use crate::normalize::{NameNormalizer, RenameCandidate};
use crate::outcome::{FixStage, ItemError, SkippedItem, StageOutcome};
use crate::relabel::{MislabeledChallengeFixer, ReclassifyCandidate};
use crate::retry::RetryingStore;
use crate::snapshot::GraphSnapshot;
use crate::taxonomy::{TaxonomyConsolidator, TaxonomyPlan};
use crate::traits::EntityGraphStore;
use crate::types::NodeId;

/// Candidate counts per fix kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCounts {
    pub renames: usize,
    pub definitions: usize,
    pub generic_deletions: usize,
    pub taxonomy_deletions: usize,
    pub mislabeled_challenges: usize,
    /// Nodes absorbed by same-label groups.
    pub same_label_merges: usize,
    /// Absorbed variants plus canonical renames.
    pub taxonomy_merges: usize,
    pub taxonomy_reclassifications: usize,
    pub lexical_merges: usize,
    pub cross_label_merges: usize,
    /// Advisory; never acted on.
    pub unknown_terms: usize,
}

impl CandidateCounts {
    /// Number of pending mutations. Unknown terms are not counted.
    pub fn total(&self) -> usize {
        self.renames
            + self.definitions
            + self.generic_deletions
            + self.taxonomy_deletions
            + self.mislabeled_challenges
            + self.same_label_merges
            + self.taxonomy_merges
            + self.taxonomy_reclassifications
            + self.lexical_merges
            + self.cross_label_merges
    }
}

/// Every candidate computed from one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub captured_at: DateTime<Utc>,
    pub node_count: usize,
    pub renames: Vec<RenameCandidate>,
    pub definitions: Vec<BackfillCandidate>,
    pub generic: Vec<DeletionCandidate>,
    pub taxonomy: TaxonomyPlan,
    #[serde(default)]
    pub mislabeled: Vec<ReclassifyCandidate>,
    pub same_label: Vec<DuplicateGroup>,
    pub lexical: Vec<DuplicateGroup>,
    pub cross_label: Vec<DuplicateGroup>,
}

impl DetectionReport {
    pub fn counts(&self) -> CandidateCounts {
        let absorbed = |groups: &[DuplicateGroup]| -> usize {
            groups.iter().map(|g| g.absorbed.len()).sum()
        };
        CandidateCounts {
            renames: self.renames.len(),
            definitions: self.definitions.len(),
            generic_deletions: self.generic.len(),
            taxonomy_deletions: self.taxonomy.delete.len(),
            mislabeled_challenges: self.mislabeled.len(),
            same_label_merges: absorbed(&self.same_label),
            taxonomy_merges: self
                .taxonomy
                .keep
                .iter()
                .map(|g| g.absorbed.len() + usize::from(g.rename.is_some()))
                .sum(),
            taxonomy_reclassifications: self.taxonomy.reclassify.len(),
            lexical_merges: absorbed(&self.lexical),
            cross_label_merges: absorbed(&self.cross_label),
            unknown_terms: self.taxonomy.unknown.len(),
        }
    }

    /// No pending mutations.
    pub fn is_clean(&self) -> bool {
        self.counts().total() == 0
    }

    fn members_mut(&mut self) -> impl Iterator<Item = &mut GroupMember> {
        let groups = self
            .same_label
            .iter_mut()
            .chain(self.taxonomy.keep.iter_mut())
            .chain(self.lexical.iter_mut())
            .chain(self.cross_label.iter_mut())
            .flat_map(|g| g.members_mut());
        let deletions = self
            .generic
            .iter_mut()
            .chain(self.taxonomy.delete.iter_mut())
            .map(|c| &mut c.member);
        let reclassify = self
            .taxonomy
            .reclassify
            .iter_mut()
            .chain(self.mislabeled.iter_mut())
            .map(|c| &mut c.member);
        groups.chain(deletions).chain(reclassify)
    }
}

/// Detection report annotated with relationship impact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixPreview {
    pub report: DetectionReport,
    /// Edges that merges would move onto a surviving node.
    pub relationships_to_retarget: usize,
    /// Edges that deletions would remove.
    pub relationships_to_delete: usize,
}

/// Result of one apply pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplySummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub strategy: Option<MergeStrategy>,
    /// Bulk merges were unavailable and the executor fell back to manual.
    pub degraded: bool,
    pub stages: Vec<StageOutcome>,
    /// Candidates counted by the closing detect; `None` if it did not run.
    pub remaining: Option<CandidateCounts>,
    pub cancelled: bool,
    /// Fatal error that ended the pass early.
    pub aborted: Option<String>,
}

impl ApplySummary {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            completed_at: None,
            strategy: None,
            degraded: false,
            stages: Vec::new(),
            remaining: None,
            cancelled: false,
            aborted: None,
        }
    }

    fn complete(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }

    /// Items applied across all stages.
    pub fn total_changes(&self) -> usize {
        self.stages.iter().map(|s| s.applied).sum()
    }

    pub fn stage(&self, stage: FixStage) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedItem> {
        self.stages.iter().flat_map(|s| s.skipped.iter())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ItemError> {
        self.stages.iter().flat_map(|s| s.errors.iter())
    }

    pub fn relationships_migrated(&self) -> usize {
        self.stages.iter().map(|s| s.relationships_migrated).sum()
    }

    pub fn relationships_removed(&self) -> usize {
        self.stages.iter().map(|s| s.relationships_removed).sum()
    }

    /// The closing detect found nothing left to do.
    pub fn converged(&self) -> bool {
        self.remaining.map_or(false, |r| r.total() == 0)
    }

    /// Ran to the end without a fatal error or cancellation.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && !self.cancelled
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Runs the full detect / preview / apply pipeline against one store.
pub struct ValidationFixOrchestrator {
    store: Arc<dyn EntityGraphStore>,
    executor: MergeExecutor,
    config: ResolutionConfig,
    normalizer: NameNormalizer,
    backfill: DefinitionBackfill,
    generic: GenericTermFilter,
    taxonomy: TaxonomyConsolidator,
    mislabeled: MislabeledChallengeFixer,
    same_label: SameLabelDeduplicator,
    lexical: LexicalVariantMerger,
    cross_label: CrossLabelResolver,
    cancel: CancellationToken,
}

impl ValidationFixOrchestrator {
    /// Create an orchestrator. The store is wrapped with the configured
    /// timeout and retry policy.
    pub fn new(store: Arc<dyn EntityGraphStore>, config: ResolutionConfig) -> Self {
        let store: Arc<dyn EntityGraphStore> = Arc::new(RetryingStore::from_config(store, &config));
        Self {
            executor: MergeExecutor::new(store.clone()),
            store,
            normalizer: NameNormalizer::new(),
            backfill: DefinitionBackfill::new(),
            generic: GenericTermFilter::new(),
            taxonomy: TaxonomyConsolidator::industry(config.fuzzy_threshold),
            mislabeled: MislabeledChallengeFixer::new(),
            same_label: SameLabelDeduplicator::new(),
            lexical: LexicalVariantMerger::new(config.plural_suffix.clone()),
            cross_label: CrossLabelResolver::new(),
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Use a caller-owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_generic_filter(mut self, filter: GenericTermFilter) -> Self {
        self.generic = filter;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    pub fn executor(&self) -> &MergeExecutor {
        &self.executor
    }

    /// Capture a snapshot and compute every candidate set from it.
    pub async fn detect(&self) -> GraphCleanResult<(GraphSnapshot, DetectionReport)> {
        let (snapshot, glossary) = futures::try_join!(
            GraphSnapshot::capture(self.store.as_ref()),
            self.store.glossary_definitions()
        )?;
        let report = self.detect_in(&snapshot, &glossary);
        let counts = report.counts();
        tracing::info!(
            nodes = report.node_count,
            pending = counts.total(),
            unknown_terms = counts.unknown_terms,
            "Detection complete"
        );
        Ok((snapshot, report))
    }

    /// Compute every candidate set from an existing snapshot.
    pub fn detect_in(
        &self,
        snapshot: &GraphSnapshot,
        glossary: &HashMap<String, String>,
    ) -> DetectionReport {
        DetectionReport {
            captured_at: snapshot.captured_at(),
            node_count: snapshot.len(),
            renames: self.normalizer.detect(snapshot),
            definitions: self.backfill.detect(snapshot, glossary),
            generic: self.generic.detect(snapshot),
            taxonomy: self.taxonomy.detect(snapshot),
            mislabeled: self.mislabeled.detect(snapshot),
            same_label: self.same_label.detect(snapshot),
            lexical: self.lexical.detect(snapshot),
            cross_label: self.cross_label.detect(snapshot),
        }
    }

    /// Detect, then annotate every candidate with its relationship count.
    pub async fn preview(&self) -> GraphCleanResult<FixPreview> {
        let (_, report) = self.detect().await?;
        self.annotate(report).await
    }

    /// Annotate an existing report with relationship counts.
    pub async fn annotate(&self, mut report: DetectionReport) -> GraphCleanResult<FixPreview> {
        let mut seen = HashSet::new();
        let ids: Vec<NodeId> = report
            .members_mut()
            .filter(|m| seen.insert(m.id.clone()))
            .map(|m| m.id.clone())
            .collect();

        let store = self.store.as_ref();
        let results: Vec<(NodeId, GraphCleanResult<usize>)> = stream::iter(ids)
            .map(|id| async move {
                let count = store.relationships(&id).await.map(|rels| rels.len());
                (id, count)
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut counts = HashMap::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(count) => {
                    counts.insert(id, count);
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!(id = %id, "Node vanished during preview");
                }
                Err(e) => return Err(e),
            }
        }
        for member in report.members_mut() {
            member.relationship_count = counts.get(&member.id).copied();
        }

        let relationships_to_retarget = report
            .same_label
            .iter()
            .chain(report.taxonomy.keep.iter())
            .chain(report.lexical.iter())
            .chain(report.cross_label.iter())
            .map(DuplicateGroup::relationships_to_retarget)
            .sum();
        let relationships_to_delete = report
            .generic
            .iter()
            .chain(report.taxonomy.delete.iter())
            .map(DeletionCandidate::relationship_impact)
            .sum();

        Ok(FixPreview {
            report,
            relationships_to_retarget,
            relationships_to_delete,
        })
    }

    /// Run every stage in order, then check convergence.
    ///
    /// Per-item failures are collected in the summary. A fatal store error
    /// or cancellation ends the pass early; the summary records which.
    pub async fn apply(&self) -> ApplySummary {
        let mut summary = ApplySummary::new();
        tracing::info!("Starting fix pass");

        match self.run_stages(&mut summary).await {
            Ok(()) => {}
            Err(GraphCleanError::Cancelled) => {
                tracing::warn!(
                    completed_stages = summary.stages.len(),
                    "Fix pass cancelled"
                );
                summary.cancelled = true;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    completed_stages = summary.stages.len(),
                    "Fix pass aborted"
                );
                summary.aborted = Some(e.to_string());
            }
        }
        summary.degraded = self.executor.is_degraded();

        if summary.aborted.is_none() {
            match self.detect().await {
                Ok((_, report)) => summary.remaining = Some(report.counts()),
                Err(e) => tracing::warn!(error = %e, "Convergence check failed"),
            }
        }

        let summary = summary.complete();
        tracing::info!(
            changes = summary.total_changes(),
            errors = summary.errors().count(),
            skipped = summary.skipped().count(),
            converged = summary.converged(),
            duration_ms = summary.duration_ms().unwrap_or(0),
            "Fix pass complete"
        );
        summary
    }

    fn checkpoint(&self) -> GraphCleanResult<()> {
        if self.cancel.is_cancelled() {
            return Err(GraphCleanError::Cancelled);
        }
        Ok(())
    }

    async fn snapshot(&self) -> GraphCleanResult<GraphSnapshot> {
        self.checkpoint()?;
        GraphSnapshot::capture(self.store.as_ref()).await
    }

    async fn run_stages(&self, summary: &mut ApplySummary) -> GraphCleanResult<()> {
        let store = self.store.as_ref();
        let concurrency = self.config.max_concurrency;

        self.checkpoint()?;
        summary.strategy = Some(self.executor.probe().await?);

        // Additive fixes
        let snapshot = self.snapshot().await?;
        let renames = self.normalizer.detect(&snapshot);
        summary.stages.push(self.normalizer.apply(store, &renames).await?);

        let snapshot = self.snapshot().await?;
        let glossary = store.glossary_definitions().await?;
        let definitions = self.backfill.detect(&snapshot, &glossary);
        summary.stages.push(self.backfill.apply(store, &definitions).await?);

        // Deletions
        let snapshot = self.snapshot().await?;
        let generic = self.generic.detect(&snapshot);
        summary.stages.push(self.generic.apply(store, &generic).await?);

        let snapshot = self.snapshot().await?;
        let plan = self.taxonomy.detect(&snapshot);
        summary
            .stages
            .push(self.taxonomy.apply_deletes(&self.executor, &plan.delete).await?);

        // Label corrections
        let snapshot = self.snapshot().await?;
        let candidates = self.mislabeled.detect(&snapshot);
        summary.stages.push(
            self.mislabeled
                .apply(&self.executor, &candidates, concurrency)
                .await?,
        );

        // Merges
        let snapshot = self.snapshot().await?;
        let groups = self.same_label.detect(&snapshot);
        summary
            .stages
            .push(self.same_label.apply(&self.executor, &groups, concurrency).await?);

        let snapshot = self.snapshot().await?;
        let plan = self.taxonomy.detect(&snapshot);
        summary.stages.push(
            self.taxonomy
                .apply_keep(&self.executor, &plan.keep, concurrency)
                .await?,
        );

        let snapshot = self.snapshot().await?;
        let plan = self.taxonomy.detect(&snapshot);
        summary.stages.push(
            self.taxonomy
                .apply_reclassify(&self.executor, &plan.reclassify, concurrency)
                .await?,
        );

        let snapshot = self.snapshot().await?;
        let groups = self.lexical.detect(&snapshot);
        summary
            .stages
            .push(self.lexical.apply(&self.executor, &groups, concurrency).await?);

        let snapshot = self.snapshot().await?;
        let groups = self.cross_label.detect(&snapshot);
        summary
            .stages
            .push(self.cross_label.apply(&self.executor, &groups, concurrency).await?);

        // Renames and merges can produce names the glossary defines.
        let snapshot = self.snapshot().await?;
        let definitions = self.backfill.detect(&snapshot, &glossary);
        if !definitions.is_empty() {
            let refill = self.backfill.apply(store, &definitions).await?;
            if let Some(stage) = summary
                .stages
                .iter_mut()
                .find(|s| s.stage == FixStage::DefinitionBackfill)
            {
                stage.absorb(refill);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::GroupKind;
    use crate::types::EntityLabel;

    fn member(id: &str, count: Option<usize>) -> GroupMember {
        GroupMember {
            id: NodeId::new(id),
            name: id.to_string(),
            label: EntityLabel::Concept,
            relationship_count: count,
        }
    }

    fn empty_report() -> DetectionReport {
        DetectionReport {
            captured_at: Utc::now(),
            node_count: 0,
            renames: Vec::new(),
            definitions: Vec::new(),
            generic: Vec::new(),
            taxonomy: TaxonomyPlan::default(),
            mislabeled: Vec::new(),
            same_label: Vec::new(),
            lexical: Vec::new(),
            cross_label: Vec::new(),
        }
    }

    #[test]
    fn test_counts_exclude_unknown_terms() {
        let mut report = empty_report();
        report.taxonomy.unknown.push(member("u", None));
        assert_eq!(report.counts().unknown_terms, 1);
        assert!(report.is_clean());

        report.same_label.push(DuplicateGroup {
            kind: GroupKind::SameLabel {
                label: EntityLabel::Concept,
            },
            key: "a".into(),
            primary: member("a", None),
            absorbed: vec![member("b", None), member("c", None)],
            rename: None,
        });
        assert_eq!(report.counts().same_label_merges, 2);
        assert_eq!(report.counts().total(), 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_summary_convergence() {
        let mut summary = ApplySummary::new();
        assert!(!summary.converged());
        summary.remaining = Some(CandidateCounts {
            unknown_terms: 3,
            ..Default::default()
        });
        assert!(summary.converged());
        assert!(summary.is_complete());

        summary.cancelled = true;
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_summary_totals() {
        let mut summary = ApplySummary::new();
        let mut a = StageOutcome::new(FixStage::SameLabel);
        a.applied = 2;
        a.relationships_migrated = 5;
        let mut b = StageOutcome::new(FixStage::GenericFilter);
        b.applied = 1;
        b.relationships_removed = 4;
        b.skip("Concept: tool (t)", "gone");
        summary.stages = vec![a, b];

        assert_eq!(summary.total_changes(), 3);
        assert_eq!(summary.relationships_migrated(), 5);
        assert_eq!(summary.relationships_removed(), 4);
        assert_eq!(summary.skipped().count(), 1);
        assert!(summary.stage(FixStage::CrossLabel).is_none());
    }
}
