//! Foreign-Key Resolver
//!
//! Reservations point at rooms, not properties. The room index turns a
//! reservation into the (user, property, date) triple a BOOKED edge needs.

use crate::graph_store::EdgeRow;
use crate::records::{PropertyRecord, ReservationRecord, RoomRecord, DEFAULT_CHECK_IN};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// room_id -> property_id
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: HashMap<String, String>,
}

impl RoomIndex {
    /// Rooms without a property reference cannot resolve anything and are skipped.
    pub fn build(rooms: &[RoomRecord]) -> Self {
        let rooms = rooms
            .iter()
            .filter_map(|r| {
                r.property_id
                    .as_ref()
                    .map(|property_id| (r.id.clone(), property_id.clone()))
            })
            .collect();
        Self { rooms }
    }

    pub fn property_of(&self, room_id: &str) -> Option<&str> {
        self.rooms.get(room_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnresolvedReason {
    MissingRoom,
    UnknownRoom,
    MissingUser,
    InvalidDate,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnresolvedReason::MissingRoom => "no room_id",
            UnresolvedReason::UnknownRoom => "room not in index",
            UnresolvedReason::MissingUser => "no customer_id or userId",
            UnresolvedReason::InvalidDate => "unparseable checkInDate",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRef {
    pub user_id: String,
    pub property_id: String,
    pub date: NaiveDate,
}

impl From<BookingRef> for EdgeRow {
    fn from(b: BookingRef) -> Self {
        EdgeRow {
            source_id: b.user_id,
            target_id: b.property_id,
            date: Some(b.date),
        }
    }
}

/// Only the `YYYY-MM-DD` prefix of the check-in value is kept.
pub fn check_in_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.unwrap_or(DEFAULT_CHECK_IN);
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub fn resolve_booking(
    reservation: &ReservationRecord,
    index: &RoomIndex,
) -> Result<BookingRef, UnresolvedReason> {
    let room_id = reservation
        .room_id
        .as_deref()
        .ok_or(UnresolvedReason::MissingRoom)?;
    let property_id = index
        .property_of(room_id)
        .ok_or(UnresolvedReason::UnknownRoom)?;
    let user_id = reservation
        .booking_user()
        .ok_or(UnresolvedReason::MissingUser)?;
    let date = check_in_date(reservation.check_in_date.as_deref())
        .ok_or(UnresolvedReason::InvalidDate)?;

    Ok(BookingRef {
        user_id: user_id.to_string(),
        property_id: property_id.to_string(),
        date,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub resolved: usize,
    pub unresolved: HashMap<UnresolvedReason, usize>,
}

impl ResolutionReport {
    pub fn unresolved_total(&self) -> usize {
        self.unresolved.values().sum()
    }
}

/// Resolve every reservation, keeping the edges that resolved and a count of
/// those that did not.
pub fn booked_edges(
    reservations: &[ReservationRecord],
    index: &RoomIndex,
) -> (Vec<EdgeRow>, ResolutionReport) {
    let mut report = ResolutionReport::default();
    let mut edges = Vec::with_capacity(reservations.len());

    for reservation in reservations {
        match resolve_booking(reservation, index) {
            Ok(booking) => {
                report.resolved += 1;
                edges.push(booking.into());
            }
            Err(reason) => {
                debug!(
                    "   Unresolved reservation {}: {}",
                    reservation.id.as_deref().unwrap_or("<no id>"),
                    reason
                );
                *report.unresolved.entry(reason).or_insert(0) += 1;
            }
        }
    }

    (edges, report)
}

/// Manager -> property edges straight from each property's `manager_id`.
pub fn manages_edges(properties: &[PropertyRecord]) -> Vec<EdgeRow> {
    properties
        .iter()
        .filter_map(|p| {
            p.manager_id
                .as_deref()
                .filter(|m| !m.is_empty())
                .map(|manager_id| EdgeRow {
                    source_id: manager_id.to_string(),
                    target_id: p.id.clone(),
                    date: None,
                })
        })
        .collect()
}
