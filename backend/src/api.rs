//! Public API surface for the Rust backend.
//!
//! This file consolidates the identifier newtypes and the DTO types shared by
//! the HTTP layer. All types derive Serialize/Deserialize for JSON serialization.

pub use crate::models::plan::{FrameMode, NewPlan, ObservationPlan, Target};
pub use crate::models::reservation::{NewReservation, Reservation};
pub use crate::models::telescope::{PriorReports, TelescopeState, TelescopeStatus};
pub use crate::models::user::User;
pub use crate::services::zenith::{Observability, ZenithCoordinate};

use serde::{Deserialize, Serialize};

/// Observation plan identifier (database primary key).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlanId(pub i64);

/// Reservation identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub i64);

/// User identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl PlanId {
    pub fn new(value: i64) -> Self {
        PlanId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl ReservationId {
    pub fn new(value: i64) -> Self {
        ReservationId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl UserId {
    pub fn new(value: i64) -> Self {
        UserId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
