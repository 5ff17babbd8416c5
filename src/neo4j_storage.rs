//! Neo4j Batch Storage
//!
//! `GraphStore` over Bolt. Every batch is a single UNWIND statement run in
//! its own auto-commit transaction, so a batch either lands whole or not at all.

use crate::graph_store::{
    EdgeOutcome, EdgeRow, GraphStore, NodeLabel, NodeRow, RelType, StoreError, StoreResult,
};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use neo4rs::{query, BoltType, Graph};
use std::collections::HashMap;
use tracing::{debug, info};

// ============================================================================
// Helper: Convert to BoltType-compatible HashMap
// ============================================================================

type BoltMap = HashMap<String, BoltType>;

fn node_row_to_map(row: &NodeRow) -> BoltMap {
    let mut m: BoltMap = HashMap::new();
    m.insert("id".to_string(), row.id.clone().into());
    m.insert("props".to_string(), row.attributes.clone().into());
    m
}

fn edge_row_to_map(idx: usize, row: &EdgeRow) -> BoltMap {
    let mut m: BoltMap = HashMap::new();
    m.insert("idx".to_string(), (idx as i64).into());
    m.insert("source_id".to_string(), row.source_id.clone().into());
    m.insert("target_id".to_string(), row.target_id.clone().into());
    if let Some(date) = row.date {
        m.insert("date".to_string(), date.format("%Y-%m-%d").to_string().into());
    }
    m
}

// ============================================================================
// Cypher
// ============================================================================

fn constraint_cypher(label: NodeLabel) -> String {
    format!(
        "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
        label.constraint_name(),
        label.as_str(),
        label.key_property()
    )
}

fn merge_nodes_cypher(label: NodeLabel) -> String {
    format!(
        "UNWIND $rows AS row
         MERGE (n:{} {{{}: row.id}})
         SET n += row.props",
        label.as_str(),
        label.key_property()
    )
}

fn merge_edge_clause(rel: RelType) -> &'static str {
    match rel {
        RelType::Booked => "MERGE (s)-[:BOOKED {date: date(edge.date)}]->(t)",
        RelType::Manages => "MERGE (s)-[:MANAGES]->(t)",
    }
}

/// Endpoints are looked up optionally so every input row comes back with
/// its lookup result; the MERGE only fires when both were found.
fn merge_edges_cypher(rel: RelType) -> String {
    let source = rel.source();
    let target = rel.target();
    format!(
        "UNWIND $edges AS edge
         OPTIONAL MATCH (s:{} {{{}: edge.source_id}})
         OPTIONAL MATCH (t:{} {{{}: edge.target_id}})
         FOREACH (_ IN CASE WHEN s IS NOT NULL AND t IS NOT NULL THEN [1] ELSE [] END |
             {})
         RETURN edge.idx AS idx, s IS NOT NULL AS source_found, t IS NOT NULL AS target_found",
        source.as_str(),
        source.key_property(),
        target.as_str(),
        target.key_property(),
        merge_edge_clause(rel)
    )
}

// ============================================================================
// Store
// ============================================================================

/// Owns the Bolt connection pool for one import run. The pool is released
/// when the store is dropped.
pub struct Neo4jStore {
    graph: Graph,
    uri: String,
}

impl Neo4jStore {
    /// Connect to Neo4j with exponential backoff retry logic
    pub async fn connect(
        uri: &str,
        user: &str,
        password: &str,
        retry: &RetryPolicy,
    ) -> StoreResult<Self> {
        let graph = retry
            .run("Neo4j connection", move || async move {
                info!("🔄 Attempting to connect to Neo4j at {}...", uri);
                let graph = Graph::new(uri, user, password)
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;

                // Pool creation is lazy; make sure the server actually answers
                graph
                    .run(query("RETURN 1"))
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
                Ok(graph)
            })
            .await?;

        info!("✅ Successfully connected to Neo4j");
        Ok(Self {
            graph,
            uri: uri.to_string(),
        })
    }
}

impl Drop for Neo4jStore {
    fn drop(&mut self) {
        info!("🔌 Releasing Neo4j connection to {}", self.uri);
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn ensure_unique_constraint(&self, label: NodeLabel) -> StoreResult<()> {
        self.graph
            .run(query(&constraint_cypher(label)))
            .await
            .map_err(|e| StoreError::Query(format!("constraint on {}: {}", label.as_str(), e)))
    }

    async fn merge_nodes(&self, label: NodeLabel, rows: &[NodeRow]) -> StoreResult<()> {
        let batch: Vec<BoltMap> = rows.iter().map(node_row_to_map).collect();
        let q = query(&merge_nodes_cypher(label)).param("rows", batch);

        self.graph
            .run(q)
            .await
            .map_err(|e| StoreError::Query(format!("merge {} nodes: {}", label.as_str(), e)))?;

        debug!("   Merged {} {} nodes", rows.len(), label.as_str());
        Ok(())
    }

    async fn merge_edges(&self, rel: RelType, rows: &[EdgeRow]) -> StoreResult<Vec<EdgeOutcome>> {
        let batch: Vec<BoltMap> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| edge_row_to_map(idx, row))
            .collect();
        let q = query(&merge_edges_cypher(rel)).param("edges", batch);

        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| StoreError::Query(format!("merge {} edges: {}", rel.as_str(), e)))?;

        let mut lookups = Vec::with_capacity(rows.len());
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("merge {} edges: {}", rel.as_str(), e)))?
        {
            let idx: i64 = row.get("idx").map_err(|e| StoreError::Decode(e.to_string()))?;
            let source_found: bool = row
                .get("source_found")
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            let target_found: bool = row
                .get("target_found")
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            lookups.push((idx, source_found, target_found));
        }

        place_edge_outcomes(rows.len(), lookups)
    }
}

/// Put each `(idx, source_found, target_found)` result row back at its input
/// position. Every input row must get exactly one result.
fn place_edge_outcomes(
    expected: usize,
    lookups: impl IntoIterator<Item = (i64, bool, bool)>,
) -> StoreResult<Vec<EdgeOutcome>> {
    let mut outcomes: Vec<Option<EdgeOutcome>> = vec![None; expected];
    for (idx, source_found, target_found) in lookups {
        let slot = usize::try_from(idx)
            .ok()
            .and_then(|i| outcomes.get_mut(i))
            .ok_or_else(|| StoreError::Decode(format!("row index {} out of range", idx)))?;
        *slot = Some(EdgeOutcome::from_lookup(source_found, target_found));
    }

    outcomes
        .into_iter()
        .enumerate()
        .map(|(i, o)| o.ok_or_else(|| StoreError::Decode(format!("no result for edge row {}", i))))
        .collect()
}
