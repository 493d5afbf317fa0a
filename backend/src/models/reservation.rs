//! Telescope time reservations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ReservationId, UserId};

/// A reservation request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    pub owner: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// An exclusive window of telescope time held by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub owner: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Reservation {
    pub fn from_new(id: ReservationId, new: NewReservation) -> Self {
        Self {
            id,
            owner: new.owner,
            start_time: new.start_time,
            end_time: new.end_time,
        }
    }

    /// Whether `at` falls inside `[start_time, end_time)`.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }

    /// Whether the half-open windows of `self` and `[start, end)` intersect.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}
