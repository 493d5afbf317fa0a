//! Executing a stored plan.
//!
//! Execution hands the plan to the telescope driver: the target must be
//! observable now, the telescope must be idle, and the instruction file must
//! land in the orchestration folder before the state moves to `sending`.
//! From there the monitor takes over.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::error::{ObservationError, ObservationResult};
use super::instructions::{build_instructions, OrchestrationName, SettleTimes};
use super::reservations::active_reservation;
use super::telescope::Pointing;
use super::zenith::{check_observable, resolve_target};
use super::Observatory;
use crate::api::{ObservationPlan, PlanId, PriorReports, TelescopeState, User};

/// Send plan `plan_id` to the telescope at `now`.
pub async fn execute_plan(
    obs: &Observatory,
    requester: &User,
    plan_id: PlanId,
    now: DateTime<Utc>,
) -> ObservationResult<TelescopeState> {
    let plan = obs.repository.get_plan(plan_id).await?;
    if plan.owner != requester.id {
        return Err(ObservationError::Forbidden(format!(
            "plan {} belongs to another user",
            plan_id
        )));
    }
    if plan.executed {
        return Err(ObservationError::AlreadyExecuted(plan_id));
    }

    let site = &obs.config.telescope;
    if site.require_reservation && !requester.staff {
        let reservations = obs.repository.list_reservations().await?;
        if active_reservation(&reservations, requester.id, now).is_none() {
            return Err(ObservationError::ReservationRequired);
        }
    }

    let (ra, dec) = resolve_target(&plan.target(), now)?;
    let observability = check_observable(ra, dec, now, site)?;
    if !observability.allowed {
        return Err(ObservationError::NotObservable {
            at: now,
            observability,
        });
    }

    dispatch(
        obs,
        &plan,
        Pointing {
            ra,
            dec,
            alt: observability.altitude,
            az: observability.azimuth,
        },
    )
}

/// Claim the telescope, write the instruction file and mark it `sending`.
///
/// Synchronous so the state lock is never held across an await. The lock
/// covers only the write and the state change. A failed write releases it
/// with the state untouched.
fn dispatch(
    obs: &Observatory,
    plan: &ObservationPlan,
    pointing: Pointing,
) -> ObservationResult<TelescopeState> {
    let instructions = build_instructions(plan, &SettleTimes::from(&obs.config.orchestration));
    let name = OrchestrationName::for_plan(plan.id);
    let file = name.instruction_file();
    // Reports left by an earlier attempt must not complete this one.
    let prior_reports = obs.folder.reports(&name).unwrap_or_else(|e| {
        warn!(plan_id = %plan.id, error = %e, "Could not list earlier reports");
        PriorReports::default()
    });

    let guard = obs.telescope.try_begin_execution()?;
    if let Err(e) = obs.folder.write_instruction(&file, &instructions) {
        warn!(plan_id = %plan.id, "Could not write {}: {}", file, e);
        return Err(e.into());
    }

    let state = guard.mark_sending(
        plan.id,
        plan.display_name(),
        pointing,
        instructions,
        prior_reports,
    );
    info!(
        plan_id = %plan.id,
        file = %file,
        alt = pointing.alt.value(),
        az = pointing.az.value(),
        "Instruction file sent to the telescope driver"
    );
    Ok(state)
}
