//! Graph Store
//!
//! The write surface the importer needs from a graph database: uniqueness
//! constraints, node merges and relationship merges, one batch at a time.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Failed to decode result row: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Labels and Relationship Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLabel {
    User,
    Property,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 2] = [NodeLabel::User, NodeLabel::Property];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::User => "User",
            NodeLabel::Property => "Property",
        }
    }

    /// Identity property the uniqueness constraint is declared on.
    pub fn key_property(&self) -> &'static str {
        match self {
            NodeLabel::User => "userId",
            NodeLabel::Property => "propertyId",
        }
    }

    pub fn constraint_name(&self) -> &'static str {
        match self {
            NodeLabel::User => "user_id",
            NodeLabel::Property => "property_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelType {
    /// User booked a property (through one of its rooms) on a date
    Booked,
    /// Manager runs a property
    Manages,
}

impl RelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::Booked => "BOOKED",
            RelType::Manages => "MANAGES",
        }
    }

    pub fn source(&self) -> NodeLabel {
        NodeLabel::User
    }

    pub fn target(&self) -> NodeLabel {
        NodeLabel::Property
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One node to merge: its identity plus the attributes to set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRow {
    pub id: String,
    pub attributes: HashMap<String, String>,
}

impl NodeRow {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            attributes: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }
}

/// One relationship to merge, identified by its endpoints and optional date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeRow {
    pub source_id: String,
    pub target_id: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MissingSource,
    MissingTarget,
    MissingBoth,
}

impl SkipReason {
    pub fn from_lookup(source_found: bool, target_found: bool) -> Option<Self> {
        match (source_found, target_found) {
            (true, true) => None,
            (false, true) => Some(SkipReason::MissingSource),
            (true, false) => Some(SkipReason::MissingTarget),
            (false, false) => Some(SkipReason::MissingBoth),
        }
    }
}

/// Per-row result of a relationship merge. `Created` covers both a new edge
/// and a refreshed existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    Created,
    Skipped(SkipReason),
}

impl EdgeOutcome {
    pub fn from_lookup(source_found: bool, target_found: bool) -> Self {
        match SkipReason::from_lookup(source_found, target_found) {
            None => EdgeOutcome::Created,
            Some(reason) => EdgeOutcome::Skipped(reason),
        }
    }
}

// ============================================================================
// Store Trait
// ============================================================================

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Declare a uniqueness constraint on the label's identity property.
    /// Must be a no-op when the constraint already exists.
    async fn ensure_unique_constraint(&self, label: NodeLabel) -> StoreResult<()>;

    /// Create-or-update every row in one statement, keyed on identity.
    async fn merge_nodes(&self, label: NodeLabel, rows: &[NodeRow]) -> StoreResult<()>;

    /// Create-or-refresh every relationship whose endpoints both exist.
    /// Returns one outcome per input row, in input order.
    async fn merge_edges(&self, rel: RelType, rows: &[EdgeRow]) -> StoreResult<Vec<EdgeOutcome>>;
}
