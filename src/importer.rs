//! Import Orchestrator
//!
//! Runs the graph synchronization stages in order:
//! constraints -> users -> properties -> relationships.
//! Nothing is rolled back on failure; every stage is an idempotent merge, so
//! the recovery path is simply to run the whole import again.

use crate::constraints::ensure_constraints;
use crate::entity_store::Dataset;
use crate::errors::{ImportError, ImportResult};
use crate::graph_store::{GraphStore, NodeLabel, RelType, StoreError};
use crate::records::{tag_users, PropertyNode, UserRecord};
use crate::resolver::{booked_edges, manages_edges, ResolutionReport, RoomIndex};
use crate::upsert::{upsert_edges, upsert_nodes, BatchConfig, EdgeReport, NodeReport};
use std::collections::HashSet;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Init,
    ConstraintsDone,
    UsersLoaded,
    PropertiesLoaded,
    EdgesLoaded,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub users: NodeReport,
    pub properties: NodeReport,
    pub bookings: ResolutionReport,
    pub booked: EdgeReport,
    pub manages: EdgeReport,
    /// Ids present in both the customers and the managers collections
    pub role_collisions: usize,
}

pub struct Importer<'a> {
    store: &'a dyn GraphStore,
    config: BatchConfig,
    stage: ImportStage,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a dyn GraphStore, config: BatchConfig) -> Self {
        Self {
            store,
            config,
            stage: ImportStage::Init,
        }
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub async fn run(&mut self, dataset: &Dataset) -> ImportResult<ImportSummary> {
        self.stage = ImportStage::Init;
        info!(
            "💾 Starting graph import (batch_size={})",
            self.config.batch_size
        );

        match self.run_stages(dataset).await {
            Ok(summary) => {
                self.stage = ImportStage::Done;
                info!("✅ Import completed");
                Ok(summary)
            }
            Err(e) => {
                error!("❌ Import failed after {:?}: {}", self.stage, e);
                self.stage = ImportStage::Failed;
                Err(e)
            }
        }
    }

    async fn run_stages(&mut self, dataset: &Dataset) -> ImportResult<ImportSummary> {
        if dataset.properties.is_empty() {
            return Err(ImportError::EmptyProperties);
        }

        let mut summary = ImportSummary::default();

        // 1. Constraints
        ensure_constraints(self.store, &NodeLabel::ALL, &self.config.retry).await?;
        self.stage = ImportStage::ConstraintsDone;

        // 2. User nodes
        info!("👤 Importing Users...");
        summary.role_collisions = warn_role_collisions(&dataset.customers, &dataset.managers);
        let users = tag_users(&dataset.customers, &dataset.managers);
        summary.users = upsert_nodes(self.store, &users, &self.config)
            .await
            .map_err(|e| self.store_error(e))?;
        self.stage = ImportStage::UsersLoaded;

        // 3. Property nodes
        info!("🏠 Importing Properties...");
        let properties: Vec<PropertyNode> =
            dataset.properties.iter().map(PropertyNode::from).collect();
        summary.properties = upsert_nodes(self.store, &properties, &self.config)
            .await
            .map_err(|e| self.store_error(e))?;
        self.stage = ImportStage::PropertiesLoaded;

        // 4. Relationships, resolving reservations through their rooms
        info!("🗺️  Mapping Rooms to Properties...");
        let index = RoomIndex::build(&dataset.rooms);
        info!("   Indexed {} of {} rooms", index.len(), dataset.rooms.len());

        info!("🔗 Importing BOOKED relationships...");
        let (booked, bookings) = booked_edges(&dataset.reservations, &index);
        if bookings.unresolved_total() > 0 {
            warn!(
                "⚠️  {} reservations could not be resolved: {:?}",
                bookings.unresolved_total(),
                bookings.unresolved
            );
        }
        summary.bookings = bookings;
        summary.booked = upsert_edges(self.store, RelType::Booked, &booked, &self.config)
            .await
            .map_err(|e| self.store_error(e))?;

        info!("🔗 Importing MANAGES relationships...");
        let manages = manages_edges(&dataset.properties);
        summary.manages = upsert_edges(self.store, RelType::Manages, &manages, &self.config)
            .await
            .map_err(|e| self.store_error(e))?;
        self.stage = ImportStage::EdgesLoaded;

        Ok(summary)
    }

    fn store_error(&self, source: StoreError) -> ImportError {
        ImportError::Store {
            stage: self.stage,
            source,
        }
    }
}

/// Customers and managers are assumed to use disjoint ids. A shared id
/// collapses into one user node whose role is whichever was merged last.
fn warn_role_collisions(customers: &[UserRecord], managers: &[UserRecord]) -> usize {
    let customer_ids: HashSet<&str> = customers.iter().map(|c| c.id.as_str()).collect();
    let collisions = managers
        .iter()
        .filter(|m| customer_ids.contains(m.id.as_str()))
        .count();

    if collisions > 0 {
        warn!(
            "⚠️  {} ids appear as both customer and manager; those users will be tagged MANAGER",
            collisions
        );
    }
    collisions
}

impl ImportSummary {
    pub fn log(&self) {
        info!("📊 Import summary:");
        info!("   Users processed:      {}", self.users.processed);
        info!("   Properties processed: {}", self.properties.processed);
        if self.role_collisions > 0 {
            info!("   Shared user ids:      {}", self.role_collisions);
        }
        info!(
            "   Reservations:         {} resolved, {} unresolved",
            self.bookings.resolved,
            self.bookings.unresolved_total()
        );
        info!(
            "   BOOKED edges:         {} merged, {} skipped",
            self.booked.merged,
            self.booked.skipped_total()
        );
        info!(
            "   MANAGES edges:        {} merged, {} skipped",
            self.manages.merged,
            self.manages.skipped_total()
        );
    }
}
