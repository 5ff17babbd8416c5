// Test doubles shared by the in-crate test modules

use crate::graph_store::{
    EdgeOutcome, EdgeRow, GraphStore, NodeLabel, NodeRow, RelType, StoreError, StoreResult,
};
use crate::memory_store::MemoryGraph;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Duration;

/// Retry policy that does not sleep between attempts.
pub fn instant_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
    }
}

/// Wraps a `MemoryGraph`, counting calls and failing the first
/// `fail_first` calls of each kind it is told to break.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryGraph,
    pub fail_first: usize,
    pub break_constraints: bool,
    pub break_nodes: bool,
    pub break_edges: bool,
    pub constraint_calls: AtomicUsize,
    pub node_calls: AtomicUsize,
    pub edge_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn counting() -> Self {
        Self::default()
    }

    pub fn failing_nodes(fail_first: usize) -> Self {
        Self {
            fail_first,
            break_nodes: true,
            ..Self::default()
        }
    }

    pub fn failing_edges(fail_first: usize) -> Self {
        Self {
            fail_first,
            break_edges: true,
            ..Self::default()
        }
    }

    pub fn failing_constraints() -> Self {
        Self {
            fail_first: usize::MAX,
            break_constraints: true,
            ..Self::default()
        }
    }

    fn should_fail(&self, broken: bool, calls: &AtomicUsize) -> bool {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        broken && n < self.fail_first
    }
}

#[async_trait]
impl GraphStore for FlakyStore {
    async fn ensure_unique_constraint(&self, label: NodeLabel) -> StoreResult<()> {
        if self.should_fail(self.break_constraints, &self.constraint_calls) {
            return Err(StoreError::Query("constraint rejected".to_string()));
        }
        self.inner.ensure_unique_constraint(label).await
    }

    async fn merge_nodes(&self, label: NodeLabel, rows: &[NodeRow]) -> StoreResult<()> {
        if self.should_fail(self.break_nodes, &self.node_calls) {
            return Err(StoreError::Connection("connection reset".to_string()));
        }
        self.inner.merge_nodes(label, rows).await
    }

    async fn merge_edges(&self, rel: RelType, rows: &[EdgeRow]) -> StoreResult<Vec<EdgeOutcome>> {
        if self.should_fail(self.break_edges, &self.edge_calls) {
            return Err(StoreError::Connection("connection reset".to_string()));
        }
        self.inner.merge_edges(rel, rows).await
    }
}
