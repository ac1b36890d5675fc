//! Entity name canonicalization.
//!
//! `normalize` is the dedup key used by every other component. The graph
//! pass rewrites `name` to its canonical form and keeps the original casing
//! in `display_name` when that was unset.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::GraphCleanResult;
use crate::outcome::{FixStage, StageOutcome};
use crate::snapshot::GraphSnapshot;
use crate::traits::EntityGraphStore;
use crate::types::{EntityLabel, NodeId, NodeUpdate};

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

static EDGE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\w]+|[^\w]+$").expect("valid punctuation pattern"));

/// Canonical form of an entity name.
///
/// Lowercases, trims, collapses whitespace runs to one space and strips
/// leading/trailing non-word characters. Internal punctuation is kept.
///
/// ```
/// use graphclean_core::normalize;
///
/// assert_eq!(normalize("  Requirements   Traceability "), "requirements traceability");
/// assert_eq!(normalize("ISO-26262"), "iso-26262");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let lowered = raw.to_lowercase();
    let collapsed = WHITESPACE_RUN.replace_all(lowered.trim(), " ");
    EDGE_PUNCTUATION.replace_all(&collapsed, "").into_owned()
}

/// Whether two names share a canonical form.
pub fn names_equivalent(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// A node whose stored name is not canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameCandidate {
    pub id: NodeId,
    pub label: EntityLabel,
    pub from: String,
    pub to: String,
    /// Display name to record, when the node has none yet.
    pub display_name: Option<String>,
}

/// Name normalization pass over the graph.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameNormalizer;

impl NameNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Nodes whose name differs from its canonical form.
    pub fn detect(&self, snapshot: &GraphSnapshot) -> Vec<RenameCandidate> {
        snapshot
            .nodes()
            .into_iter()
            .filter_map(|node| {
                let canonical = normalize(&node.name);
                if canonical == node.name {
                    return None;
                }
                Some(RenameCandidate {
                    id: node.id.clone(),
                    label: node.primary_label().unwrap_or(EntityLabel::GENERIC),
                    from: node.name.clone(),
                    to: canonical,
                    display_name: match node.display_name {
                        Some(_) => None,
                        None => Some(node.name.clone()),
                    },
                })
            })
            .collect()
    }

    /// Rewrite every candidate's name to its canonical form.
    pub async fn apply(
        &self,
        store: &dyn EntityGraphStore,
        candidates: &[RenameCandidate],
    ) -> GraphCleanResult<StageOutcome> {
        let mut outcome = StageOutcome::new(FixStage::Normalization);

        for candidate in candidates {
            let update = NodeUpdate {
                name: Some(candidate.to.clone()),
                display_name: candidate.display_name.clone(),
                ..NodeUpdate::new(candidate.id.clone())
            };
            let result = store.update_node(&update).await;
            outcome.record(format!("{}: {}", candidate.label, candidate.from), result)?;
        }

        tracing::info!(
            updated = outcome.applied,
            candidates = candidates.len(),
            "Entity name normalization complete"
        );
        Ok(outcome)
    }
}
