//! In-Memory Graph Store
//!
//! A `GraphStore` kept entirely in process memory. Used for dry runs and as
//! the test double for the Neo4j store; it honours the same merge semantics.

use crate::graph_store::{
    EdgeOutcome, EdgeRow, GraphStore, NodeLabel, NodeRow, RelType, StoreResult,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct GraphState {
    constraints: HashSet<NodeLabel>,
    nodes: HashMap<NodeLabel, HashMap<String, HashMap<String, String>>>,
    edges: HashSet<(RelType, EdgeRow)>,
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self, label: NodeLabel) -> usize {
        let state = self.lock();
        state.nodes.get(&label).map(|n| n.len()).unwrap_or(0)
    }

    pub fn edge_count(&self, rel: RelType) -> usize {
        let state = self.lock();
        state.edges.iter().filter(|(r, _)| *r == rel).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GraphState> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
impl MemoryGraph {
    pub fn node_attribute(&self, label: NodeLabel, id: &str, key: &str) -> Option<String> {
        let state = self.lock();
        state
            .nodes
            .get(&label)
            .and_then(|n| n.get(id))
            .and_then(|attrs| attrs.get(key))
            .cloned()
    }

    pub fn has_edge(&self, rel: RelType, edge: &EdgeRow) -> bool {
        self.lock().edges.contains(&(rel, edge.clone()))
    }

    pub fn has_constraint(&self, label: NodeLabel) -> bool {
        self.lock().constraints.contains(&label)
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn ensure_unique_constraint(&self, label: NodeLabel) -> StoreResult<()> {
        self.lock().constraints.insert(label);
        Ok(())
    }

    async fn merge_nodes(&self, label: NodeLabel, rows: &[NodeRow]) -> StoreResult<()> {
        let mut state = self.lock();
        let nodes = state.nodes.entry(label).or_default();
        for row in rows {
            let attrs = nodes.entry(row.id.clone()).or_default();
            for (key, value) in &row.attributes {
                attrs.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn merge_edges(&self, rel: RelType, rows: &[EdgeRow]) -> StoreResult<Vec<EdgeOutcome>> {
        let mut state = self.lock();
        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let source_found = state
                .nodes
                .get(&rel.source())
                .map_or(false, |n| n.contains_key(&row.source_id));
            let target_found = state
                .nodes
                .get(&rel.target())
                .map_or(false, |n| n.contains_key(&row.target_id));

            let outcome = EdgeOutcome::from_lookup(source_found, target_found);
            if outcome == EdgeOutcome::Created {
                state.edges.insert((rel, row.clone()));
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_store::SkipReason;
    use chrono::NaiveDate;

    fn booked(user: &str, property: &str, day: u32) -> EdgeRow {
        EdgeRow {
            source_id: user.to_string(),
            target_id: property.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, day),
        }
    }

    #[tokio::test]
    async fn test_merge_nodes_updates_in_place() {
        let graph = MemoryGraph::new();
        graph
            .merge_nodes(NodeLabel::User, &[NodeRow::new("u1").with("name", "Ada")])
            .await
            .unwrap();
        graph
            .merge_nodes(NodeLabel::User, &[NodeRow::new("u1").with("name", "Bea")])
            .await
            .unwrap();

        assert_eq!(graph.node_count(NodeLabel::User), 1);
        assert_eq!(
            graph.node_attribute(NodeLabel::User, "u1", "name"),
            Some("Bea".to_string())
        );
    }

    #[tokio::test]
    async fn test_merge_edges_requires_both_endpoints() {
        let graph = MemoryGraph::new();
        graph.merge_nodes(NodeLabel::User, &[NodeRow::new("u1")]).await.unwrap();
        graph.merge_nodes(NodeLabel::Property, &[NodeRow::new("p1")]).await.unwrap();

        let outcomes = graph
            .merge_edges(
                RelType::Booked,
                &[booked("u1", "p1", 5), booked("u1", "p404", 5), booked("ghost", "p1", 5)],
            )
            .await
            .unwrap();

        assert_eq!(
            outcomes,
            vec![
                EdgeOutcome::Created,
                EdgeOutcome::Skipped(SkipReason::MissingTarget),
                EdgeOutcome::Skipped(SkipReason::MissingSource),
            ]
        );
        assert_eq!(graph.edge_count(RelType::Booked), 1);
    }

    #[tokio::test]
    async fn test_same_pair_and_date_is_not_duplicated() {
        let graph = MemoryGraph::new();
        graph.merge_nodes(NodeLabel::User, &[NodeRow::new("u1")]).await.unwrap();
        graph.merge_nodes(NodeLabel::Property, &[NodeRow::new("p1")]).await.unwrap();

        let rows = [booked("u1", "p1", 5), booked("u1", "p1", 5), booked("u1", "p1", 6)];
        graph.merge_edges(RelType::Booked, &rows).await.unwrap();
        graph.merge_edges(RelType::Booked, &rows).await.unwrap();

        assert_eq!(graph.edge_count(RelType::Booked), 2);
    }
}
