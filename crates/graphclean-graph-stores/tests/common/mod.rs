//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use graphclean_core::error::{GraphCleanError, GraphCleanResult};
use graphclean_core::types::{
    CreateRelationship, DeleteRequest, EntityLabel, EntityNode, MergeRequest, MigrationCounts,
    NodeId, NodeUpdate, PropertyMap, RelabelRequest, RelationshipId, RelationshipRecord,
};
use graphclean_core::{EntityGraphStore, RetryPolicy};
use graphclean_graph_stores::MemoryGraphStore;

/// A text chunk: a node with no entity type label, never scanned.
pub fn chunk(id: &str) -> EntityNode {
    let mut node = EntityNode::new(id, EntityLabel::Concept, id);
    node.type_labels.clear();
    node
}

/// Retry policy fast enough for tests.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        multiplier: 2.0,
    }
}

/// Graph exhibiting one instance of every defect class.
///
/// - `s1` "ISO 26262" (3 rels) and `s2` "iso 26262" (2 rels): same-label duplicates
/// - `tr1` Concept and `tr2` Challenge "traceability": cross-label duplicates
/// - `ind` Industry "auto" (3 rels): taxonomy synonym of "automotive"
/// - `tool` Concept "tool" (no rels): generic term
/// - `req1` "requirement" and `req2` "requirements": lexical variants
pub fn messy_graph() -> MemoryGraphStore {
    let store = MemoryGraphStore::new();
    for i in 1..=6 {
        store.insert_node(chunk(&format!("c{}", i))).unwrap();
    }

    let nodes = [
        EntityNode::new("s1", EntityLabel::Standard, "ISO 26262"),
        EntityNode::new("s2", EntityLabel::Standard, "iso 26262"),
        EntityNode::new("tr1", EntityLabel::Concept, "traceability"),
        EntityNode::new("tr2", EntityLabel::Challenge, "traceability"),
        EntityNode::new("ind", EntityLabel::Industry, "auto"),
        EntityNode::new("tool", EntityLabel::Concept, "tool"),
        EntityNode::new("req1", EntityLabel::Concept, "requirement"),
        EntityNode::new("req2", EntityLabel::Concept, "requirements"),
    ];
    for node in nodes {
        store.insert_node(node).unwrap();
    }

    let edges = [
        ("s1", "c1"),
        ("s1", "c2"),
        ("s1", "c3"),
        ("s2", "c4"),
        ("s2", "c5"),
        ("tr1", "c1"),
        ("tr2", "c2"),
        ("ind", "c4"),
        ("ind", "c5"),
        ("ind", "c6"),
        ("req1", "c1"),
        ("req2", "c2"),
    ];
    for (start, end) in edges {
        store.insert_relationship(start, end, "MENTIONED_IN").unwrap();
    }

    store
        .set_glossary([(
            "traceability",
            "The ability to trace requirements through the lifecycle.",
        )])
        .unwrap();
    store
}

/// Store wrapper that injects failures: transient scan errors, rejected
/// relationship deletes, slow relationship creates, and a bulk merge it
/// advertises but cannot perform.
pub struct FlakyStore {
    inner: Arc<MemoryGraphStore>,
    scan_failures: AtomicUsize,
    scan_calls: AtomicUsize,
    delete_failures: AtomicUsize,
    create_calls: AtomicUsize,
    create_delay: Option<Duration>,
    advertise_bulk: bool,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryGraphStore>) -> Self {
        Self {
            inner,
            scan_failures: AtomicUsize::new(0),
            scan_calls: AtomicUsize::new(0),
            delete_failures: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            create_delay: None,
            advertise_bulk: false,
        }
    }

    /// Fail the next `n` label scans with `StoreUnavailable`.
    pub fn failing_scans(self, n: usize) -> Self {
        self.scan_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Reject the next `n` relationship deletes with a non-transient error.
    pub fn failing_relationship_deletes(self, n: usize) -> Self {
        self.delete_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Commit every relationship create, then answer only after `delay`.
    pub fn slow_creates(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Claim bulk-merge support, then report the accelerator missing.
    pub fn advertising_bulk_merge(mut self) -> Self {
        self.advertise_bulk = true;
        self
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityGraphStore for FlakyStore {
    async fn scan_label(&self, label: EntityLabel) -> GraphCleanResult<Vec<EntityNode>> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.scan_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.scan_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(GraphCleanError::store_unavailable("connection reset by peer"));
        }
        self.inner.scan_label(label).await
    }

    async fn get_node(&self, id: &NodeId) -> GraphCleanResult<Option<EntityNode>> {
        self.inner.get_node(id).await
    }

    async fn relationships(&self, id: &NodeId) -> GraphCleanResult<Vec<RelationshipRecord>> {
        self.inner.relationships(id).await
    }

    async fn create_relationship(
        &self,
        request: &CreateRelationship,
    ) -> GraphCleanResult<RelationshipId> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.inner.create_relationship(request).await?;
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(id)
    }

    async fn set_relationship_properties(
        &self,
        id: &RelationshipId,
        properties: &PropertyMap,
    ) -> GraphCleanResult<()> {
        self.inner.set_relationship_properties(id, properties).await
    }

    async fn delete_relationship(&self, id: &RelationshipId) -> GraphCleanResult<()> {
        let remaining = self.delete_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.delete_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(GraphCleanError::graph_store("relationship is locked"));
        }
        self.inner.delete_relationship(id).await
    }

    async fn update_node(&self, update: &NodeUpdate) -> GraphCleanResult<()> {
        self.inner.update_node(update).await
    }

    async fn relabel(&self, request: &RelabelRequest) -> GraphCleanResult<()> {
        self.inner.relabel(request).await
    }

    async fn delete_node(&self, request: &DeleteRequest) -> GraphCleanResult<usize> {
        self.inner.delete_node(request).await
    }

    async fn supports_bulk_merge(&self) -> GraphCleanResult<bool> {
        if self.advertise_bulk {
            return Ok(true);
        }
        self.inner.supports_bulk_merge().await
    }

    async fn bulk_merge(
        &self,
        request: &MergeRequest,
        update: &NodeUpdate,
    ) -> GraphCleanResult<MigrationCounts> {
        if self.advertise_bulk {
            return Err(GraphCleanError::accelerator_unavailable(
                "procedure library not installed",
            ));
        }
        self.inner.bulk_merge(request, update).await
    }

    async fn glossary_definitions(&self) -> GraphCleanResult<HashMap<String, String>> {
        self.inner.glossary_definitions().await
    }
}
