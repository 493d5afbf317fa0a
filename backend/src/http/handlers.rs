//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};

use super::auth::CurrentUser;
use super::dto::{
    AppInfoResponse, CheckPlanRequest, CoordinateCheck, CoordinateCheckRequest, HealthResponse,
    PlanCheck, PlanListQuery, PlanListResponse, PlanSubmission, ReservationListResponse,
    ReservationRequest, SubmitPlanResponse, TelescopeStatusResponse, UserListResponse,
    ZenithResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{PlanId, Reservation, ReservationId};
use crate::db::{self, UserRepository};
use crate::services::coordinates::{format_dec_dms, format_ra_hms};
use crate::services::error::ObservationError;
use crate::services::zenith::zenith_coordinate;
use crate::services::{execution, planning, require_staff, reservations};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        telescope: state.observatory.telescope.status().label().to_string(),
    }))
}

// =============================================================================
// Installation and telescope
// =============================================================================

/// GET /v1/appinfo
pub async fn app_info(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> HandlerResult<AppInfoResponse> {
    let site = &state.observatory.config.telescope;
    Ok(Json(AppInfoResponse {
        telescope: site.name.clone(),
        filters: site.filters.clone(),
        frame_modes: site.frame_modes.clone(),
        max_exposure_s: site.max_exposure_s,
        max_reservation_minutes: site.max_reservation_minutes,
        latitude: site.latitude,
        longitude: site.longitude,
        utc_offset_hours: site.utc_offset_hours,
        current_time: Utc::now(),
    }))
}

/// GET /v1/telescope
pub async fn telescope_status(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> HandlerResult<TelescopeStatusResponse> {
    Ok(Json(state.observatory.telescope.snapshot().into()))
}

// =============================================================================
// Sky
// =============================================================================

/// GET /v1/sky/zenith
pub async fn zenith(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> HandlerResult<ZenithResponse> {
    let at = Utc::now();
    let zenith = zenith_coordinate(at, &state.observatory.config.telescope)
        .map_err(ObservationError::from)?;
    Ok(Json(ZenithResponse {
        ra: zenith.ra.value(),
        dec: zenith.dec.value(),
        ra_hms: format_ra_hms(zenith.ra),
        dec_dms: format_dec_dms(zenith.dec),
        at,
    }))
}

/// POST /v1/sky/check
pub async fn check_coordinates(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(request): Json<CoordinateCheckRequest>,
) -> HandlerResult<CoordinateCheck> {
    let check = planning::check_coordinates(
        &state.observatory.config.telescope,
        &request.ra,
        &request.dec,
        request.time.as_deref(),
    )?;
    Ok(Json(check))
}

// =============================================================================
// Plans
// =============================================================================

/// GET /v1/plans?date=YYYY-MM-DD
pub async fn list_plans(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PlanListQuery>,
) -> HandlerResult<PlanListResponse> {
    let date = query
        .date
        .as_deref()
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| AppError::BadRequest(format!("Invalid date: {}", e)))?;
    let plans = db::list_plans(state.observatory.repository.as_ref(), user.id, date).await?;
    Ok(Json(plans.into()))
}

/// GET /v1/plans/executed
pub async fn list_executed_plans(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> HandlerResult<PlanListResponse> {
    let plans = db::list_executed_plans(state.observatory.repository.as_ref(), user.id).await?;
    Ok(Json(plans.into()))
}

/// POST /v1/plans
pub async fn submit_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<PlanSubmission>,
) -> Result<(StatusCode, Json<SubmitPlanResponse>), AppError> {
    let (plan, observability) = planning::submit_plan(&state.observatory, &user, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitPlanResponse {
            plan,
            observability,
        }),
    ))
}

/// DELETE /v1/plans/{id}
pub async fn delete_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    planning::delete_plan(&state.observatory, &user, PlanId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/plans/{id}/check
pub async fn check_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<CheckPlanRequest>,
) -> HandlerResult<PlanCheck> {
    let now = request.now.then(Utc::now);
    let check = planning::check_plan(&state.observatory, &user, PlanId::new(id), now).await?;
    Ok(Json(check))
}

/// POST /v1/plans/{id}/execute
pub async fn execute_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<TelescopeStatusResponse> {
    let telescope =
        execution::execute_plan(&state.observatory, &user, PlanId::new(id), Utc::now()).await?;
    Ok(Json(telescope.into()))
}

// =============================================================================
// Reservations and users
// =============================================================================

/// GET /v1/reservations
pub async fn list_reservations(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> HandlerResult<ReservationListResponse> {
    let reservations = reservations::list_reservations(&state.observatory).await?;
    Ok(Json(ReservationListResponse {
        total: reservations.len(),
        reservations,
    }))
}

/// POST /v1/reservations
pub async fn create_reservation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation =
        reservations::create_reservation(&state.observatory, &user, request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// DELETE /v1/reservations/{id}
pub async fn delete_reservation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    reservations::delete_reservation(&state.observatory, &user, ReservationId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/users
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> HandlerResult<UserListResponse> {
    require_staff(&user, "Listing users")?;
    let users = state.observatory.repository.list_users().await?;
    Ok(Json(UserListResponse {
        emails: users.into_iter().map(|u| u.email).collect(),
    }))
}
