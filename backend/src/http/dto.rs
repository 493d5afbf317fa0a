//! Data Transfer Objects for the HTTP API.
//!
//! Domain types that already derive Serialize/Deserialize are re-exported
//! as-is; the structs below are request bodies and response envelopes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::api::{Observability, ObservationPlan, Reservation, TelescopeState};
pub use crate::services::coordinates::AngleInput;
pub use crate::services::planning::{CoordinateCheck, PlanCheck, PlanSubmission};
pub use crate::services::reservations::ReservationRequest;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Current telescope status label
    pub telescope: String,
}

/// Static facts about the installation for the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInfoResponse {
    pub telescope: String,
    pub filters: Vec<String>,
    pub frame_modes: Vec<String>,
    pub max_exposure_s: f64,
    pub max_reservation_minutes: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub utc_offset_hours: f64,
    pub current_time: DateTime<Utc>,
}

/// Flat telescope status record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelescopeStatusResponse {
    pub name: String,
    /// Dashboard label (`idle`, `sending`, `executing operations`, ...)
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub ra: f64,
    pub dec: f64,
    pub alt: f64,
    pub az: f64,
    pub operation: Option<String>,
    pub executing_plan_id: Option<i64>,
    pub executing_plan_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<TelescopeState> for TelescopeStatusResponse {
    fn from(state: TelescopeState) -> Self {
        Self {
            status: state.status.label().to_string(),
            detail: state.status.detail(),
            name: state.name,
            ra: state.ra.value(),
            dec: state.dec.value(),
            alt: state.alt.value(),
            az: state.az.value(),
            operation: state.operation,
            executing_plan_id: state.executing_plan_id.map(|id| id.value()),
            executing_plan_name: state.executing_plan_name,
            updated_at: state.updated_at,
        }
    }
}

/// The equatorial point overhead right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZenithResponse {
    pub ra: f64,
    pub dec: f64,
    pub ra_hms: String,
    pub dec_dms: String,
    pub at: DateTime<Utc>,
}

/// Request body for `POST /v1/sky/check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateCheckRequest {
    pub ra: AngleInput,
    pub dec: AngleInput,
    /// Defaults to now
    #[serde(default)]
    pub time: Option<String>,
}

/// Query parameters for plan listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanListQuery {
    /// `YYYY-MM-DD`, UTC
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanListResponse {
    pub plans: Vec<ObservationPlan>,
    pub total: usize,
}

impl From<Vec<ObservationPlan>> for PlanListResponse {
    fn from(plans: Vec<ObservationPlan>) -> Self {
        Self {
            total: plans.len(),
            plans,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPlanResponse {
    pub plan: ObservationPlan,
    pub observability: Observability,
}

/// Request body for `POST /v1/plans/{id}/check`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckPlanRequest {
    /// Check at the current time instead of the plan's start time
    #[serde(default)]
    pub now: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationListResponse {
    pub reservations: Vec<Reservation>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub emails: Vec<String>,
}
