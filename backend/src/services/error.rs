//! Domain failures reported to callers.

use chrono::{DateTime, Utc};

use crate::api::{Observability, PlanId, ReservationId};
use crate::db::RepositoryError;
use crate::services::coordinates::CoordinateError;
use crate::services::ephemeris::EphemerisError;
use crate::services::telescope::TelescopeBusy;

pub type ObservationResult<T> = Result<T, ObservationError>;

#[derive(Debug, thiserror::Error)]
pub enum ObservationError {
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),

    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),

    #[error("Either object_name or both ra and dec are required")]
    MissingTarget,

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error(
        "Target not observable at {}: distance from zenith {:.2} deg, altitude {:.2} deg, azimuth {:.2} deg",
        .at.to_rfc3339(),
        .observability.distance.value(),
        .observability.altitude.value(),
        .observability.azimuth.value()
    )]
    NotObservable {
        at: DateTime<Utc>,
        observability: Observability,
    },

    #[error("At least one filter is required")]
    NoFilters,

    #[error("Filter '{0}' is not available on this telescope")]
    InvalidFilter(String),

    #[error("Frame mode '{0}' is not available on this telescope")]
    InvalidFrameMode(String),

    #[error("Exposure must be greater than 0 and at most {max} s, got {value} s")]
    InvalidExposure { value: f64, max: f64 },

    #[error("Invalid reservation window: {0}")]
    InvalidReservationWindow(String),

    #[error("Reservation overlaps reservation {0}")]
    ReservationConflict(ReservationId),

    #[error("No active reservation covers the current time")]
    ReservationRequired,

    #[error("Unknown user '{0}'")]
    UnknownUser(String),

    #[error("Plan {0} was already executed")]
    AlreadyExecuted(PlanId),

    #[error(transparent)]
    Busy(#[from] TelescopeBusy),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Could not write to the orchestration folder: {0}")]
    Folder(#[from] std::io::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
