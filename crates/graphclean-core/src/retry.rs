//! Timeout and retry decorator for graph stores.
//!
//! Every call on the wrapped store runs under a per-operation timeout.
//! Transient failures (store unavailable, timeout) of idempotent operations
//! are retried with exponential backoff; everything else is returned on the
//! first attempt.
//!
//! `create_relationship` and `bulk_merge` are never retried here: a timed-out
//! attempt may already have been committed by the store, and repeating it
//! would add a parallel edge. Callers reconcile against the store instead.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};

use crate::config::{ResolutionConfig, RetryPolicy};
use crate::error::{GraphCleanError, GraphCleanResult};
use crate::traits::EntityGraphStore;
use crate::types::{
    CreateRelationship, DeleteRequest, EntityLabel, EntityNode, MergeRequest, MigrationCounts,
    NodeId, NodeUpdate, PropertyMap, RelabelRequest, RelationshipId, RelationshipRecord,
};

/// Store wrapper adding timeouts and transient-error retries.
pub struct RetryingStore {
    inner: Arc<dyn EntityGraphStore>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl RetryingStore {
    pub fn new(inner: Arc<dyn EntityGraphStore>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            inner,
            policy,
            timeout,
        }
    }

    /// Wrap a store using the retry policy and timeout from `config`.
    pub fn from_config(inner: Arc<dyn EntityGraphStore>, config: &ResolutionConfig) -> Self {
        Self::new(inner, config.retry.clone(), config.operation_timeout())
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_max_times(self.policy.max_retries as usize)
            .with_min_delay(Duration::from_millis(self.policy.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.policy.max_delay_ms))
            .with_factor(self.policy.multiplier)
    }

    async fn attempt<T, Fut>(&self, operation: &'static str, fut: Fut) -> GraphCleanResult<T>
    where
        Fut: Future<Output = GraphCleanResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GraphCleanError::Timeout {
                operation: operation.to_string(),
                elapsed_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Single attempt under the timeout, for writes that are not idempotent.
    async fn call_once<T, Fut>(&self, operation: &'static str, fut: Fut) -> GraphCleanResult<T>
    where
        Fut: Future<Output = GraphCleanResult<T>> + Send,
    {
        let result = self.attempt(operation, fut).await;
        if let Err(e) = &result {
            if e.is_transient() {
                tracing::warn!(
                    operation,
                    error = %e,
                    "Non-idempotent graph store write failed, not retrying"
                );
            }
        }
        result
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> GraphCleanResult<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = GraphCleanResult<T>> + Send,
        T: Send,
    {
        let f = &f;
        let attempt = move || async move { self.attempt(operation, f()).await };

        let result = attempt
            .retry(self.backoff())
            .when(|e: &GraphCleanError| e.is_transient())
            .notify(|err: &GraphCleanError, dur: Duration| {
                tracing::warn!(
                    operation,
                    retry_in_ms = dur.as_millis() as u64,
                    error = %err,
                    "Transient graph store failure, retrying"
                );
            })
            .await;

        if let Err(e) = &result {
            if e.is_transient() {
                tracing::error!(
                    operation,
                    max_retries = self.policy.max_retries,
                    error = %e,
                    "Graph store operation failed after exhausting retries"
                );
            }
        }
        result
    }
}

#[async_trait]
impl EntityGraphStore for RetryingStore {
    async fn scan_label(&self, label: EntityLabel) -> GraphCleanResult<Vec<EntityNode>> {
        self.call("scan_label", || self.inner.scan_label(label)).await
    }

    async fn get_node(&self, id: &NodeId) -> GraphCleanResult<Option<EntityNode>> {
        self.call("get_node", || self.inner.get_node(id)).await
    }

    async fn relationships(&self, id: &NodeId) -> GraphCleanResult<Vec<RelationshipRecord>> {
        self.call("relationships", || self.inner.relationships(id)).await
    }

    async fn create_relationship(
        &self,
        request: &CreateRelationship,
    ) -> GraphCleanResult<RelationshipId> {
        self.call_once("create_relationship", self.inner.create_relationship(request))
            .await
    }

    async fn set_relationship_properties(
        &self,
        id: &RelationshipId,
        properties: &PropertyMap,
    ) -> GraphCleanResult<()> {
        self.call("set_relationship_properties", || {
            self.inner.set_relationship_properties(id, properties)
        })
        .await
    }

    async fn delete_relationship(&self, id: &RelationshipId) -> GraphCleanResult<()> {
        self.call("delete_relationship", || self.inner.delete_relationship(id))
            .await
    }

    async fn update_node(&self, update: &NodeUpdate) -> GraphCleanResult<()> {
        self.call("update_node", || self.inner.update_node(update)).await
    }

    async fn relabel(&self, request: &RelabelRequest) -> GraphCleanResult<()> {
        self.call("relabel", || self.inner.relabel(request)).await
    }

    async fn delete_node(&self, request: &DeleteRequest) -> GraphCleanResult<usize> {
        self.call("delete_node", || self.inner.delete_node(request)).await
    }

    async fn supports_bulk_merge(&self) -> GraphCleanResult<bool> {
        self.call("supports_bulk_merge", || self.inner.supports_bulk_merge())
            .await
    }

    async fn bulk_merge(
        &self,
        request: &MergeRequest,
        update: &NodeUpdate,
    ) -> GraphCleanResult<MigrationCounts> {
        self.call_once("bulk_merge", self.inner.bulk_merge(request, update))
            .await
    }

    async fn glossary_definitions(&self) -> GraphCleanResult<HashMap<String, String>> {
        self.call("glossary_definitions", || self.inner.glossary_definitions())
            .await
    }
}
