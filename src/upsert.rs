//! Batch Upsert Engine
//!
//! Splits collections into contiguous batches and merges each batch through
//! the graph store, retrying a failed batch before giving up on the run.

use crate::graph_store::{
    EdgeOutcome, EdgeRow, GraphStore, NodeRow, RelType, SkipReason, StoreError, StoreResult,
};
use crate::records::GraphNode;
use crate::retry::RetryPolicy;
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl BatchConfig {
    fn chunk_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeReport {
    /// Input records sent, not distinct nodes in the graph
    pub processed: usize,
    pub batches: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeReport {
    pub processed: usize,
    pub merged: usize,
    pub skipped: HashMap<SkipReason, usize>,
    pub batches: usize,
}

impl EdgeReport {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    fn record(&mut self, outcome: EdgeOutcome) {
        match outcome {
            EdgeOutcome::Created => self.merged += 1,
            EdgeOutcome::Skipped(reason) => *self.skipped.entry(reason).or_insert(0) += 1,
        }
    }
}

// ============================================================================
// Upserts
// ============================================================================

/// Merge `nodes` in batches of at most `config.batch_size`.
pub async fn upsert_nodes<N: GraphNode>(
    store: &dyn GraphStore,
    nodes: &[N],
    config: &BatchConfig,
) -> StoreResult<NodeReport> {
    let label = N::LABEL;
    let mut report = NodeReport::default();

    for chunk in nodes.chunks(config.chunk_size()) {
        let rows: Vec<NodeRow> = chunk.iter().map(N::to_row).collect();
        let rows = &rows;
        let what = format!("{} batch #{}", label.as_str(), report.batches + 1);

        config
            .retry
            .run(&what, move || store.merge_nodes(label, rows))
            .await?;

        report.batches += 1;
        report.processed += chunk.len();
        debug!("   - Processed {} {} nodes...", report.processed, label.as_str());
    }

    info!(
        "   Upserted {} {} nodes in {} batches",
        report.processed,
        label.as_str(),
        report.batches
    );
    Ok(report)
}

/// Merge `edges` in batches; an edge whose endpoints are not both present is
/// skipped on its own without failing its batch.
pub async fn upsert_edges(
    store: &dyn GraphStore,
    rel: RelType,
    edges: &[EdgeRow],
    config: &BatchConfig,
) -> StoreResult<EdgeReport> {
    let mut report = EdgeReport::default();

    for chunk in edges.chunks(config.chunk_size()) {
        let what = format!("{} batch #{}", rel.as_str(), report.batches + 1);

        let outcomes = config
            .retry
            .run(&what, move || store.merge_edges(rel, chunk))
            .await?;

        if outcomes.len() != chunk.len() {
            return Err(StoreError::Decode(format!(
                "{}: store returned {} outcomes for {} edges",
                what,
                outcomes.len(),
                chunk.len()
            )));
        }

        for outcome in outcomes {
            report.record(outcome);
        }
        report.batches += 1;
        report.processed += chunk.len();
        debug!("   - Processed {} {} relationships...", report.processed, rel.as_str());
    }

    if report.skipped_total() > 0 {
        warn!(
            "⚠️  Skipped {} {} edges with a missing endpoint: {:?}",
            report.skipped_total(),
            rel.as_str(),
            report.skipped
        );
    }
    info!(
        "   Merged {} {} edges ({} processed, {} batches)",
        report.merged,
        rel.as_str(),
        report.processed,
        report.batches
    );
    Ok(report)
}
