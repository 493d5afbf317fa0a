//! Plan submission, re-check and deletion.
//!
//! Every plan passes through [`check_observable`] at its start time before it
//! is stored; a refusal carries the diagnostics back to the caller.

use chrono::{DateTime, Utc};
use qtty::Degrees;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::coordinates::{normalize, AngleInput};
use super::ephemeris::Body;
use super::error::{ObservationError, ObservationResult};
use super::telescope::TelescopeBusy;
use super::zenith::{check_observable, check_target, resolve_target};
use super::Observatory;
use crate::api::{FrameMode, NewPlan, Observability, ObservationPlan, PlanId, Target, User};
use crate::config::TelescopeSettings;
use crate::models::parse_local_timestamp;

/// A plan as submitted by a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSubmission {
    #[serde(default)]
    pub name: Option<String>,
    /// Solar-system body to track; takes precedence over `ra`/`dec`.
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub ra: Option<AngleInput>,
    #[serde(default)]
    pub dec: Option<AngleInput>,
    pub filters: Vec<String>,
    pub frame_mode: String,
    pub exposure_s: f64,
    /// ISO 8601; naive timestamps are observatory local time.
    pub start_time: String,
}

/// Validator output for a stored plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanCheck {
    pub plan_id: PlanId,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub observability: Observability,
}

/// Validator output for free coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateCheck {
    pub ra: Degrees,
    pub dec: Degrees,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub observability: Observability,
}

pub(crate) fn parse_time(input: &str, site: &TelescopeSettings) -> ObservationResult<DateTime<Utc>> {
    parse_local_timestamp(input, site.utc_offset_hours).map_err(ObservationError::InvalidTime)
}

fn validate_setup(req: &PlanSubmission, site: &TelescopeSettings) -> ObservationResult<()> {
    if req.filters.is_empty() {
        return Err(ObservationError::NoFilters);
    }
    if let Some(bad) = req.filters.iter().find(|f| !site.accepts_filter(f)) {
        return Err(ObservationError::InvalidFilter(bad.clone()));
    }
    if !site.accepts_frame_mode(&req.frame_mode) {
        return Err(ObservationError::InvalidFrameMode(req.frame_mode.clone()));
    }
    if !(req.exposure_s > 0.0 && req.exposure_s <= site.max_exposure_s) {
        return Err(ObservationError::InvalidExposure {
            value: req.exposure_s,
            max: site.max_exposure_s,
        });
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn submitted_target(req: &PlanSubmission) -> ObservationResult<Target> {
    if let Some(object) = non_blank(&req.object_name) {
        let body = Body::from_name(object)?;
        return Ok(Target::Body {
            name: body.name().to_string(),
        });
    }
    match (&req.ra, &req.dec) {
        (Some(ra), Some(dec)) => {
            let (ra, dec) = normalize(ra, dec)?;
            Ok(Target::Equatorial { ra, dec })
        }
        _ => Err(ObservationError::MissingTarget),
    }
}

/// Validate and store a new plan for `owner`.
///
/// # Returns
/// The stored plan and the validator output at its start time.
pub async fn submit_plan(
    obs: &Observatory,
    owner: &User,
    req: PlanSubmission,
) -> ObservationResult<(ObservationPlan, Observability)> {
    let site = &obs.config.telescope;
    let start_time = parse_time(&req.start_time, site)?;
    validate_setup(&req, site)?;

    let target = submitted_target(&req)?;
    let (ra, dec) = resolve_target(&target, start_time)?;
    let observability = check_observable(ra, dec, start_time, site)?;
    if !observability.allowed {
        return Err(ObservationError::NotObservable {
            at: start_time,
            observability,
        });
    }

    let object_name = match target {
        Target::Body { name } => Some(name),
        Target::Equatorial { .. } => None,
    };
    let plan = obs
        .repository
        .store_plan(NewPlan {
            owner: owner.id,
            name: non_blank(&req.name).map(str::to_string),
            object_name,
            ra,
            dec,
            filters: req.filters,
            frame_mode: FrameMode::new(req.frame_mode),
            exposure: qtty::Seconds::new(req.exposure_s),
            start_time,
        })
        .await?;

    info!(
        plan_id = %plan.id,
        owner = %owner.id,
        start = %plan.start_time.to_rfc3339(),
        "Plan stored ({})",
        plan.display_name()
    );
    Ok((plan, observability))
}

async fn owned_plan(obs: &Observatory, requester: &User, id: PlanId) -> ObservationResult<ObservationPlan> {
    let plan = obs.repository.get_plan(id).await?;
    if plan.owner != requester.id {
        return Err(ObservationError::Forbidden(format!(
            "plan {} belongs to another user",
            id
        )));
    }
    Ok(plan)
}

/// Re-run the validator for a stored plan at its start time, or at `now`.
pub async fn check_plan(
    obs: &Observatory,
    requester: &User,
    id: PlanId,
    now: Option<DateTime<Utc>>,
) -> ObservationResult<PlanCheck> {
    let plan = owned_plan(obs, requester, id).await?;
    let at = now.unwrap_or(plan.start_time);
    let observability = check_target(&plan.target(), at, &obs.config.telescope)?;
    Ok(PlanCheck {
        plan_id: plan.id,
        at,
        observability,
    })
}

/// Validate free coordinates in any accepted notation at `time` (default now).
pub fn check_coordinates(
    site: &TelescopeSettings,
    ra: &AngleInput,
    dec: &AngleInput,
    time: Option<&str>,
) -> ObservationResult<CoordinateCheck> {
    let (ra, dec) = normalize(ra, dec)?;
    let at = match time {
        Some(t) => parse_time(t, site)?,
        None => Utc::now(),
    };
    Ok(CoordinateCheck {
        ra,
        dec,
        at,
        observability: check_observable(ra, dec, at, site)?,
    })
}

/// Delete one of the requester's plans. The plan being executed stays.
pub async fn delete_plan(obs: &Observatory, requester: &User, id: PlanId) -> ObservationResult<()> {
    owned_plan(obs, requester, id).await?;
    if obs.telescope.executing_plan() == Some(id) {
        let status = obs.telescope.status();
        return Err(TelescopeBusy::NotIdle(status.label().to_string()).into());
    }
    obs.repository.delete_plan(id).await?;
    info!(plan_id = %id, "Plan deleted");
    Ok(())
}
