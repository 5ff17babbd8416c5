//! Entity Store
//!
//! Reads the persisted entity collections (one JSON array per file) into
//! typed records. An absent file is an empty collection, not an error.

use crate::errors::{ImportError, ImportResult};
use crate::records::{PropertyRecord, ReservationRecord, RoomRecord, UserRecord};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Customers,
    Managers,
    Properties,
    Rooms,
    Reservations,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customers => "customers",
            EntityKind::Managers => "managers",
            EntityKind::Properties => "properties",
            EntityKind::Rooms => "rooms",
            EntityKind::Reservations => "reservations",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

pub struct EntityStore {
    dir: PathBuf,
}

impl EntityStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Load one collection. Elements that do not fit `T` are dropped with a
    /// warning; a file that is not a JSON array is fatal.
    pub fn load<T: DeserializeOwned>(&self, kind: EntityKind) -> ImportResult<Vec<T>> {
        let path = self.path_for(kind);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("⚠️  {} not found, treating {} as empty", path.display(), kind.as_str());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ImportError::InvalidInput {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let values: Vec<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|e| ImportError::InvalidInput {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let total = values.len();
        let mut records = Vec::with_capacity(total);
        let mut rejected = 0;
        for (i, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<T>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!("   Rejected {} record #{}: {}", kind.as_str(), i, e);
                    rejected += 1;
                }
            }
        }

        if rejected > 0 {
            warn!(
                "⚠️  Rejected {} of {} {} records that do not match the expected shape",
                rejected,
                total,
                kind.as_str()
            );
        }
        info!("📄 Loaded {} {}", records.len(), kind.as_str());
        Ok(records)
    }
}

/// Every collection the graph import reads.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub customers: Vec<UserRecord>,
    pub managers: Vec<UserRecord>,
    pub properties: Vec<PropertyRecord>,
    pub rooms: Vec<RoomRecord>,
    pub reservations: Vec<ReservationRecord>,
}

impl Dataset {
    pub fn load(store: &EntityStore) -> ImportResult<Self> {
        Ok(Self {
            customers: store.load(EntityKind::Customers)?,
            managers: store.load(EntityKind::Managers)?,
            properties: store.load(EntityKind::Properties)?,
            rooms: store.load(EntityKind::Rooms)?,
            reservations: store.load(EntityKind::Reservations)?,
        })
    }
}
