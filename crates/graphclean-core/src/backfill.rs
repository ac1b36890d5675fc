//! Definition backfill from glossary terms.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::GraphCleanResult;
use crate::normalize::normalize;
use crate::outcome::{FixStage, StageOutcome};
use crate::snapshot::GraphSnapshot;
use crate::traits::EntityGraphStore;
use crate::types::{EntityLabel, NodeId, NodeUpdate};

/// A node without a definition that a glossary term can fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillCandidate {
    pub id: NodeId,
    pub label: EntityLabel,
    pub name: String,
    pub definition: String,
}

/// Copies glossary definitions onto entities that lack one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefinitionBackfill;

impl DefinitionBackfill {
    pub fn new() -> Self {
        Self
    }

    /// Match nodes lacking a definition against the glossary by canonical name.
    pub fn detect(
        &self,
        snapshot: &GraphSnapshot,
        glossary: &HashMap<String, String>,
    ) -> Vec<BackfillCandidate> {
        let terms: HashMap<String, &str> = glossary
            .iter()
            .filter(|(_, definition)| !definition.trim().is_empty())
            .map(|(term, definition)| (normalize(term), definition.as_str()))
            .collect();

        snapshot
            .nodes()
            .into_iter()
            .filter(|node| node.definition_text().is_none())
            .filter_map(|node| {
                terms.get(&normalize(&node.name)).map(|definition| BackfillCandidate {
                    id: node.id.clone(),
                    label: node.primary_label().unwrap_or(EntityLabel::GENERIC),
                    name: node.name.clone(),
                    definition: definition.to_string(),
                })
            })
            .collect()
    }

    pub async fn apply(
        &self,
        store: &dyn EntityGraphStore,
        candidates: &[BackfillCandidate],
    ) -> GraphCleanResult<StageOutcome> {
        let mut outcome = StageOutcome::new(FixStage::DefinitionBackfill);

        for candidate in candidates {
            let update = NodeUpdate {
                definition: Some(candidate.definition.clone()),
                ..NodeUpdate::new(candidate.id.clone())
            };
            let result = store.update_node(&update).await;
            outcome.record(format!("{}: {}", candidate.label, candidate.name), result)?;
        }

        tracing::info!(count = outcome.applied, "Backfilled definitions");
        Ok(outcome)
    }
}
