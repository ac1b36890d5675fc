//! Same-label deduplication.

use super::{apply_groups, group_by_key, DuplicateGroup, GroupKind, GroupMember, Rename};
use crate::error::GraphCleanResult;
use crate::merge::MergeExecutor;
use crate::normalize::normalize;
use crate::outcome::{FixStage, StageOutcome};
use crate::snapshot::GraphSnapshot;

/// Collapses nodes sharing a type label and a canonical name.
///
/// The first node in scan order is the primary.
#[derive(Debug, Default, Clone, Copy)]
pub struct SameLabelDeduplicator;

impl SameLabelDeduplicator {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, snapshot: &GraphSnapshot) -> Vec<DuplicateGroup> {
        let mut groups = Vec::new();

        for (label, nodes) in snapshot.labels() {
            for (key, members) in group_by_key(nodes, |n| normalize(&n.name)) {
                if members.len() < 2 {
                    continue;
                }
                let primary = members[0];
                let rename = (primary.name != key).then(|| Rename {
                    to: key.clone(),
                    keep_old_as_alias: false,
                });
                groups.push(DuplicateGroup {
                    kind: GroupKind::SameLabel { label },
                    key,
                    primary: GroupMember::from_node(primary).with_label(label),
                    absorbed: members[1..]
                        .iter()
                        .map(|n| GroupMember::from_node(n).with_label(label))
                        .collect(),
                    rename,
                });
            }
        }

        tracing::debug!(groups = groups.len(), "Detected same-label duplicates");
        groups
    }

    pub async fn apply(
        &self,
        executor: &MergeExecutor,
        groups: &[DuplicateGroup],
        max_concurrency: usize,
    ) -> GraphCleanResult<StageOutcome> {
        apply_groups(executor, FixStage::SameLabel, groups, max_concurrency).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityLabel, EntityNode};

    #[test]
    fn test_groups_by_label_and_canonical_name() {
        let snapshot = GraphSnapshot::from_nodes(vec![
            EntityNode::new("s1", EntityLabel::Standard, "ISO 26262"),
            EntityNode::new("s2", EntityLabel::Standard, "iso 26262"),
            EntityNode::new("s3", EntityLabel::Standard, " ISO 26262. "),
            EntityNode::new("c1", EntityLabel::Concept, "iso 26262"),
            EntityNode::new("t1", EntityLabel::Tool, "doors"),
        ]);

        let groups = SameLabelDeduplicator::new().detect(&snapshot);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.kind, GroupKind::SameLabel { label: EntityLabel::Standard });
        assert_eq!(group.key, "iso 26262");
        assert_eq!(group.primary.id.as_str(), "s1");
        let absorbed: Vec<&str> = group.absorbed.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(absorbed, vec!["s2", "s3"]);
        assert_eq!(group.rename.as_ref().map(|r| r.to.as_str()), Some("iso 26262"));
    }

    #[test]
    fn test_canonical_primary_needs_no_rename() {
        let snapshot = GraphSnapshot::from_nodes(vec![
            EntityNode::new("a", EntityLabel::Concept, "traceability"),
            EntityNode::new("b", EntityLabel::Concept, "Traceability"),
        ]);
        let groups = SameLabelDeduplicator::new().detect(&snapshot);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].rename.is_none());
    }
}
