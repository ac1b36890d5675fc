//! Plural/singular variant merging.
//!
//! Suffix-only: a name plus the configured suffix is treated as the plural
//! of that name. Irregular plurals ("analyses", "criteria") are not handled.

use std::collections::HashMap;

use super::{apply_groups, DuplicateGroup, GroupKind, GroupMember};
use crate::error::GraphCleanResult;
use crate::merge::MergeExecutor;
use crate::normalize::normalize;
use crate::outcome::{FixStage, StageOutcome};
use crate::snapshot::GraphSnapshot;
use crate::types::EntityNode;

#[derive(Debug, Clone)]
pub struct LexicalVariantMerger {
    suffix: String,
}

impl Default for LexicalVariantMerger {
    fn default() -> Self {
        Self::new("s")
    }
}

impl LexicalVariantMerger {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Singular/plural pairs under the same label; the plural is absorbed.
    pub fn detect(&self, snapshot: &GraphSnapshot) -> Vec<DuplicateGroup> {
        let mut groups = Vec::new();
        if self.suffix.is_empty() {
            return groups;
        }

        for (label, nodes) in snapshot.labels() {
            let mut by_key: HashMap<String, &EntityNode> = HashMap::new();
            for node in nodes {
                by_key.entry(normalize(&node.name)).or_insert(node);
            }

            for node in nodes {
                let singular = normalize(&node.name);
                if singular.is_empty() || singular.ends_with(&self.suffix) {
                    continue;
                }
                let Some(first) = by_key.get(&singular) else {
                    continue;
                };
                if first.id != node.id {
                    continue;
                }
                let plural_key = format!("{}{}", singular, self.suffix);
                if let Some(plural) = by_key.get(&plural_key) {
                    groups.push(DuplicateGroup {
                        kind: GroupKind::LexicalVariant { label },
                        key: singular,
                        primary: GroupMember::from_node(node).with_label(label),
                        absorbed: vec![GroupMember::from_node(plural).with_label(label)],
                        rename: None,
                    });
                }
            }
        }

        tracing::debug!(pairs = groups.len(), suffix = %self.suffix, "Detected lexical variants");
        groups
    }

    pub async fn apply(
        &self,
        executor: &MergeExecutor,
        groups: &[DuplicateGroup],
        max_concurrency: usize,
    ) -> GraphCleanResult<StageOutcome> {
        apply_groups(executor, FixStage::LexicalVariant, groups, max_concurrency).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityLabel;

    #[test]
    fn test_pairs_within_label_only() {
        let snapshot = GraphSnapshot::from_nodes(vec![
            EntityNode::new("r1", EntityLabel::Concept, "requirement"),
            EntityNode::new("r2", EntityLabel::Concept, "requirements"),
            EntityNode::new("t1", EntityLabel::Artifact, "test case"),
            EntityNode::new("t2", EntityLabel::Concept, "test cases"),
            EntityNode::new("p1", EntityLabel::Concept, "process"),
        ]);

        let groups = LexicalVariantMerger::default().detect(&snapshot);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].primary.id.as_str(), "r1");
        assert_eq!(groups[0].absorbed[0].id.as_str(), "r2");
        assert_eq!(groups[0].key, "requirement");
    }

    #[test]
    fn test_custom_suffix() {
        let snapshot = GraphSnapshot::from_nodes(vec![
            EntityNode::new("a", EntityLabel::Concept, "box"),
            EntityNode::new("b", EntityLabel::Concept, "boxes"),
        ]);
        assert!(LexicalVariantMerger::new("s").detect(&snapshot).is_empty());
        assert_eq!(LexicalVariantMerger::new("es").detect(&snapshot).len(), 1);
    }
}
