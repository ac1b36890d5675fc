//! Immutable view of the entity node set.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use futures::future::try_join_all;

use crate::error::GraphCleanResult;
use crate::traits::EntityGraphStore;
use crate::types::{EntityLabel, EntityNode, NodeId};

/// Entity nodes per type label, in store scan order.
///
/// Detection functions are pure over a snapshot; every apply stage captures
/// a fresh one so it sees the effects of the stages before it.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    captured_at: DateTime<Utc>,
    by_label: BTreeMap<EntityLabel, Vec<EntityNode>>,
}

impl GraphSnapshot {
    /// Scan every entity label concurrently.
    pub async fn capture(store: &dyn EntityGraphStore) -> GraphCleanResult<Self> {
        Self::capture_labels(store, &EntityLabel::all()).await
    }

    /// Scan only the given labels.
    pub async fn capture_labels(
        store: &dyn EntityGraphStore,
        labels: &[EntityLabel],
    ) -> GraphCleanResult<Self> {
        let scans = try_join_all(labels.iter().map(|&label| async move {
            let nodes = store.scan_label(label).await?;
            GraphCleanResult::Ok((label, nodes))
        }))
        .await?;

        let snapshot = Self {
            captured_at: Utc::now(),
            by_label: scans.into_iter().collect(),
        };
        tracing::debug!(
            labels = labels.len(),
            nodes = snapshot.len(),
            "Captured graph snapshot"
        );
        Ok(snapshot)
    }

    /// Build a snapshot from nodes already in hand, keeping their order.
    pub fn from_nodes(nodes: impl IntoIterator<Item = EntityNode>) -> Self {
        let mut by_label: BTreeMap<EntityLabel, Vec<EntityNode>> = BTreeMap::new();
        for node in nodes {
            for label in node.type_labels.iter() {
                by_label.entry(*label).or_default().push(node.clone());
            }
        }
        Self {
            captured_at: Utc::now(),
            by_label,
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Nodes carrying `label`, in scan order.
    pub fn label(&self, label: EntityLabel) -> &[EntityNode] {
        self.by_label.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Scanned labels with their nodes, in priority order.
    pub fn labels(&self) -> impl Iterator<Item = (EntityLabel, &[EntityNode])> {
        self.by_label
            .iter()
            .map(|(label, nodes)| (*label, nodes.as_slice()))
    }

    /// Every distinct node: labels in priority order, then scan order.
    ///
    /// A node carrying several labels appears once, at its first label.
    pub fn nodes(&self) -> Vec<&EntityNode> {
        let mut seen: HashSet<&NodeId> = HashSet::new();
        self.by_label
            .values()
            .flatten()
            .filter(|node| seen.insert(&node.id))
            .collect()
    }

    pub fn get(&self, id: &NodeId) -> Option<&EntityNode> {
        self.by_label.values().flatten().find(|node| &node.id == id)
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_are_distinct_and_ordered() {
        let snapshot = GraphSnapshot::from_nodes(vec![
            EntityNode::new("c1", EntityLabel::Challenge, "traceability"),
            EntityNode::new("s1", EntityLabel::Standard, "iso 26262"),
            EntityNode::new("m1", EntityLabel::Concept, "risk").with_label(EntityLabel::Challenge),
        ]);

        let ids: Vec<&str> = snapshot.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "m1", "c1"]);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.label(EntityLabel::Challenge).len(), 2);
        assert!(snapshot.label(EntityLabel::Tool).is_empty());
        assert!(snapshot.get(&NodeId::from("m1")).is_some());
    }
}
