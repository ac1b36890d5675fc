//! Stoplist-based removal of vacuous entity names.
//!
//! Deletion is the only relationship-lossy fix, so every candidate carries
//! the number of relationships it would take with it once previewed.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::dedup::GroupMember;
use crate::error::GraphCleanResult;
use crate::normalize::normalize;
use crate::outcome::{FixStage, StageOutcome};
use crate::snapshot::GraphSnapshot;
use crate::traits::EntityGraphStore;
use crate::types::{DeleteRequest, EntityLabel};

const GENERIC_TERMS: &[&str] = &[
    // tools and software
    "tool", "tools", "software", "solution", "solutions", "platform", "platforms", "system",
    "systems", "application", "applications", "product", "products",
    // processes and methods
    "method", "methods", "process", "processes", "approach", "approaches", "technique",
    "techniques", "practice", "practices", "procedure", "procedures",
    // documents
    "document", "documents", "file", "files", "report", "reports",
    // people
    "person", "people", "user", "users", "team", "teams", "member", "members",
    // everything else
    "thing", "things", "item", "items", "element", "elements", "component", "components", "part",
    "parts", "type", "types", "kind", "kinds", "way", "ways", "step", "steps", "stage", "stages",
    "phase", "phases", "level", "levels", "area", "areas", "aspect", "aspects", "factor",
    "factors", "feature", "features", "function", "functions", "activity", "activities", "task",
    "tasks", "action", "actions", "work", "result", "results", "outcome", "outcomes", "output",
    "outputs", "input", "inputs", "data", "information", "content", "resource", "resources",
    "material", "materials",
];

static DEFAULT_STOPLIST: Lazy<BTreeSet<String>> =
    Lazy::new(|| GENERIC_TERMS.iter().map(|t| t.to_string()).collect());

/// Why a node is slated for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionReason {
    /// Name is in the generic stoplist.
    GenericTerm,
    /// Industry term the taxonomy marks as vacuous.
    VacuousIndustry,
}

/// A node slated for detach-deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionCandidate {
    pub member: GroupMember,
    pub reason: DeletionReason,
}

impl DeletionCandidate {
    /// Relationships lost with the node, when annotated.
    pub fn relationship_impact(&self) -> usize {
        self.member.relationship_count.unwrap_or(0)
    }
}

/// Flags nodes whose canonical name carries no information.
///
/// The Industry label is governed by the taxonomy's own delete set and is
/// never scanned here ("software" is a stopword but a valid industry).
#[derive(Debug, Clone)]
pub struct GenericTermFilter {
    stoplist: BTreeSet<String>,
}

impl Default for GenericTermFilter {
    fn default() -> Self {
        Self {
            stoplist: DEFAULT_STOPLIST.clone(),
        }
    }
}

impl GenericTermFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with a custom stoplist (terms are normalized).
    pub fn with_stoplist<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stoplist: terms.into_iter().map(|t| normalize(t.as_ref())).collect(),
        }
    }

    pub fn is_generic(&self, name: &str) -> bool {
        self.stoplist.contains(&normalize(name))
    }

    pub fn detect(&self, snapshot: &GraphSnapshot) -> Vec<DeletionCandidate> {
        let mut candidates = Vec::new();
        for (label, nodes) in snapshot.labels() {
            if label == EntityLabel::Industry {
                continue;
            }
            for node in nodes.iter().filter(|n| self.is_generic(&n.name)) {
                // Multi-label nodes are reported once, under their first label.
                if candidates
                    .iter()
                    .any(|c: &DeletionCandidate| c.member.id == node.id)
                {
                    continue;
                }
                candidates.push(DeletionCandidate {
                    member: GroupMember::from_node(node).with_label(label),
                    reason: DeletionReason::GenericTerm,
                });
            }
        }
        tracing::debug!(candidates = candidates.len(), "Detected generic entities");
        candidates
    }

    pub async fn apply(
        &self,
        store: &dyn EntityGraphStore,
        candidates: &[DeletionCandidate],
    ) -> GraphCleanResult<StageOutcome> {
        apply_deletions(store, FixStage::GenericFilter, candidates).await
    }
}

/// Detach-delete every candidate, counting the relationships removed.
pub async fn apply_deletions(
    store: &dyn EntityGraphStore,
    stage: FixStage,
    candidates: &[DeletionCandidate],
) -> GraphCleanResult<StageOutcome> {
    let mut outcome = StageOutcome::new(stage);

    for candidate in candidates {
        let request = DeleteRequest::detach(candidate.member.id.clone(), candidate.member.label);
        let result = store.delete_node(&request).await;
        if let Some(removed) = outcome.record(candidate.member.describe(), result)? {
            outcome.relationships_removed += removed;
        }
    }

    tracing::info!(
        stage = %stage,
        deleted = outcome.applied,
        relationships_removed = outcome.relationships_removed,
        "Deletion stage complete"
    );
    Ok(outcome)
}
