//! Integration tests for the retrying store decorator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use graphclean_core::types::{
    CreateRelationship, DeleteRequest, NodeUpdate, PropertyMap, RelabelRequest, RelationshipId,
    RelationshipType,
};
use graphclean_core::{
    EntityGraphStore, EntityLabel, EntityNode, ErrorCode, GraphCleanError, GraphCleanResult,
    NodeId, RelationshipRecord, RetryPolicy, RetryingStore,
};

enum Behaviour {
    Slow(Duration),
    Broken,
}

/// Store whose scans and relationship creates misbehave; every other
/// primitive is inert.
struct ScriptedStore {
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl ScriptedStore {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }

    async fn act(&self) -> GraphCleanResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Behaviour::Broken => Err(GraphCleanError::graph_store("syntax error in query")),
        }
    }
}

#[async_trait]
impl EntityGraphStore for ScriptedStore {
    async fn scan_label(&self, _label: EntityLabel) -> GraphCleanResult<Vec<EntityNode>> {
        self.act().await.map(|_| Vec::new())
    }

    async fn get_node(&self, _id: &NodeId) -> GraphCleanResult<Option<EntityNode>> {
        Ok(None)
    }

    async fn relationships(&self, _id: &NodeId) -> GraphCleanResult<Vec<RelationshipRecord>> {
        Ok(Vec::new())
    }

    async fn create_relationship(
        &self,
        _request: &CreateRelationship,
    ) -> GraphCleanResult<RelationshipId> {
        self.act().await.map(|_| RelationshipId::new("r"))
    }

    async fn set_relationship_properties(
        &self,
        _id: &RelationshipId,
        _properties: &PropertyMap,
    ) -> GraphCleanResult<()> {
        Ok(())
    }

    async fn delete_relationship(&self, _id: &RelationshipId) -> GraphCleanResult<()> {
        Ok(())
    }

    async fn update_node(&self, _update: &NodeUpdate) -> GraphCleanResult<()> {
        Ok(())
    }

    async fn relabel(&self, _request: &RelabelRequest) -> GraphCleanResult<()> {
        Ok(())
    }

    async fn delete_node(&self, _request: &DeleteRequest) -> GraphCleanResult<usize> {
        Ok(0)
    }
}

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay_ms: 1,
        max_delay_ms: 2,
        multiplier: 2.0,
    }
}

/// A slow store times out on every attempt and is retried.
#[tokio::test]
async fn test_timeouts_are_retried_then_reported() {
    let inner = Arc::new(ScriptedStore::new(Behaviour::Slow(Duration::from_millis(200))));
    let store = RetryingStore::new(inner.clone(), policy(2), Duration::from_millis(10));

    let err = store.scan_label(EntityLabel::Concept).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NetTimeout);
    assert!(err.is_transient());
    assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
}

/// Non-transient failures surface on the first attempt.
#[tokio::test]
async fn test_permanent_errors_are_not_retried() {
    let inner = Arc::new(ScriptedStore::new(Behaviour::Broken));
    let store = RetryingStore::new(inner.clone(), policy(5), Duration::from_secs(1));

    let err = store.scan_label(EntityLabel::Tool).await.unwrap_err();
    assert!(!err.is_transient());
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
}

/// Calls within the timeout pass straight through.
#[tokio::test]
async fn test_fast_calls_pass_through() {
    let inner = Arc::new(ScriptedStore::new(Behaviour::Slow(Duration::from_millis(1))));
    let store = RetryingStore::new(inner.clone(), RetryPolicy::none(), Duration::from_secs(1));

    assert!(store.scan_label(EntityLabel::Role).await.unwrap().is_empty());
    assert!(!store.supports_bulk_merge().await.unwrap());
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
}

/// A create that times out may have been committed, so it is tried once.
#[tokio::test]
async fn test_timed_out_creates_are_not_retried() {
    let inner = Arc::new(ScriptedStore::new(Behaviour::Slow(Duration::from_millis(200))));
    let store = RetryingStore::new(inner.clone(), policy(3), Duration::from_millis(10));

    let request = CreateRelationship {
        start: NodeId::from("p"),
        end: NodeId::from("c1"),
        rel_type: RelationshipType::new("MENTIONED_IN").unwrap(),
        properties: PropertyMap::new(),
    };
    let err = store.create_relationship(&request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NetTimeout);
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
}
