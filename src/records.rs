//! Entity Records
//!
//! Typed shapes of the persisted entity collections, plus the graph nodes
//! derived from them. Unknown fields in the source files are ignored.

use crate::graph_store::{NodeLabel, NodeRow};
use serde::{Deserialize, Deserializer};

pub const DEFAULT_USER_NAME: &str = "Unknown";
pub const DEFAULT_PROPERTY_NAME: &str = "Property";
pub const DEFAULT_CITY: &str = "Unknown";
pub const DEFAULT_CHECK_IN: &str = "2024-01-01";

// ============================================================================
// Source Records
// ============================================================================

/// A customer or manager as persisted by the generator. Both collections
/// share this shape; the role comes from the collection a record was read from.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub name: Option<String>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub location: Option<Location>,
    pub manager_id: Option<String>,
}

/// A `location` that is not a location object reads as absent.
fn object_or_none<'de, D>(deserializer: D) -> Result<Option<Location>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl PropertyRecord {
    /// Top-level `city` first, then `location.city`, then the default.
    pub fn resolved_city(&self) -> &str {
        self.city
            .as_deref()
            .or_else(|| self.location.as_ref().and_then(|l| l.city.as_deref()))
            .unwrap_or(DEFAULT_CITY)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomRecord {
    pub id: String,
    pub property_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRecord {
    pub id: Option<String>,
    pub room_id: Option<String>,
    pub customer_id: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "checkInDate")]
    pub check_in_date: Option<String>,
}

impl ReservationRecord {
    /// `customer_id` when present and non-empty, otherwise `userId`.
    pub fn booking_user(&self) -> Option<&str> {
        non_empty(self.customer_id.as_deref()).or_else(|| non_empty(self.user_id.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ============================================================================
// Graph Nodes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRole {
    Customer,
    Manager,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "CUSTOMER",
            UserRole::Manager => "MANAGER",
        }
    }
}

/// A value that can be merged into the graph as a node of a fixed label.
pub trait GraphNode {
    const LABEL: NodeLabel;

    fn to_row(&self) -> NodeRow;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNode {
    pub id: String,
    pub name: String,
    pub role: UserRole,
}

impl UserNode {
    pub fn tagged(record: &UserRecord, role: UserRole) -> Self {
        Self {
            id: record.id.clone(),
            name: record
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            role,
        }
    }
}

impl GraphNode for UserNode {
    const LABEL: NodeLabel = NodeLabel::User;

    fn to_row(&self) -> NodeRow {
        NodeRow::new(&self.id)
            .with("name", &self.name)
            .with("role", self.role.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNode {
    pub id: String,
    pub name: String,
    pub city: String,
}

impl From<&PropertyRecord> for PropertyNode {
    fn from(record: &PropertyRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_PROPERTY_NAME.to_string()),
            city: record.resolved_city().to_string(),
        }
    }
}

impl GraphNode for PropertyNode {
    const LABEL: NodeLabel = NodeLabel::Property;

    fn to_row(&self) -> NodeRow {
        NodeRow::new(&self.id)
            .with("name", &self.name)
            .with("city", &self.city)
    }
}

/// Merge customers and managers into user nodes, tagging each with its role.
pub fn tag_users(customers: &[UserRecord], managers: &[UserRecord]) -> Vec<UserNode> {
    customers
        .iter()
        .map(|c| UserNode::tagged(c, UserRole::Customer))
        .chain(managers.iter().map(|m| UserNode::tagged(m, UserRole::Manager)))
        .collect()
}
