//! Per-stage apply outcomes and the per-item error policy.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::error::GraphCleanResult;

/// One step of an apply pass, in execution order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FixStage {
    Normalization,
    DefinitionBackfill,
    GenericFilter,
    TaxonomyDelete,
    MislabeledChallenge,
    SameLabel,
    TaxonomyKeep,
    TaxonomyReclassify,
    LexicalVariant,
    CrossLabel,
}

/// A candidate that no longer applied when its stage ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub stage: FixStage,
    pub item: String,
    pub reason: String,
}

/// A per-item failure that did not abort the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub stage: FixStage,
    pub item: String,
    pub code: String,
    pub message: String,
}

/// What one stage did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: FixStage,
    /// Items successfully applied.
    pub applied: usize,
    /// Relationships moved onto a surviving node.
    pub relationships_migrated: usize,
    /// Relationships folded into an equivalent edge.
    pub relationships_collapsed: usize,
    /// Relationships removed by deletions.
    pub relationships_removed: usize,
    pub skipped: Vec<SkippedItem>,
    pub errors: Vec<ItemError>,
}

impl StageOutcome {
    pub fn new(stage: FixStage) -> Self {
        Self {
            stage,
            applied: 0,
            relationships_migrated: 0,
            relationships_collapsed: 0,
            relationships_removed: 0,
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record the result of applying one item.
    ///
    /// Success counts as applied. A vanished node is skipped and a rejected
    /// request goes to the error list; both let the batch continue. Fatal
    /// errors are returned so the caller aborts the pass.
    pub fn record<T>(
        &mut self,
        item: impl Into<String>,
        result: GraphCleanResult<T>,
    ) -> GraphCleanResult<Option<T>> {
        match result {
            Ok(value) => {
                self.applied += 1;
                Ok(Some(value))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) if e.is_not_found() => {
                let item = item.into();
                tracing::warn!(stage = %self.stage, item = %item, "Candidate vanished before apply, skipping");
                self.skipped.push(SkippedItem {
                    stage: self.stage,
                    item,
                    reason: e.to_string(),
                });
                Ok(None)
            }
            Err(e) => {
                let item = item.into();
                tracing::warn!(stage = %self.stage, item = %item, error = %e, "Fix failed for item");
                self.errors.push(ItemError {
                    stage: self.stage,
                    item,
                    code: e.code().as_str().to_string(),
                    message: e.to_string(),
                });
                Ok(None)
            }
        }
    }

    /// Record an item as skipped without attempting it.
    pub fn skip(&mut self, item: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedItem {
            stage: self.stage,
            item: item.into(),
            reason: reason.into(),
        });
    }

    /// Fold another outcome of the same stage into this one.
    pub fn absorb(&mut self, other: StageOutcome) {
        self.applied += other.applied;
        self.relationships_migrated += other.relationships_migrated;
        self.relationships_collapsed += other.relationships_collapsed;
        self.relationships_removed += other.relationships_removed;
        self.skipped.extend(other.skipped);
        self.errors.extend(other.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphCleanError;

    #[test]
    fn test_record_classifies_errors() {
        let mut outcome = StageOutcome::new(FixStage::SameLabel);

        assert_eq!(outcome.record("a", Ok(1)).unwrap(), Some(1));
        assert!(outcome
            .record::<()>("b", Err(GraphCleanError::not_found("b")))
            .unwrap()
            .is_none());
        assert!(outcome
            .record::<()>("c", Err(GraphCleanError::graph_store("constraint violated")))
            .unwrap()
            .is_none());
        assert!(outcome
            .record::<()>("d", Err(GraphCleanError::store_unavailable("down")))
            .is_err());

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].code, "GRP_002");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(FixStage::TaxonomyReclassify.to_string(), "taxonomy_reclassify");
        assert_eq!(FixStage::MislabeledChallenge.to_string(), "mislabeled_challenge");
    }
}
