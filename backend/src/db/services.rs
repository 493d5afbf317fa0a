//! Service layer over the repository traits.
//!
//! Small storage workflows that several callers share: seeding the user
//! directory from configuration, filtered plan listings and recording a
//! completed observation.

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};

use super::repository::{FullRepository, RepositoryResult};
use crate::api::{ObservationPlan, PlanId, User, UserId};
use crate::config::UserEntry;

/// Insert the configured users. Returns each entry's token with the stored
/// user, in configuration order.
pub async fn seed_users(
    repo: &dyn FullRepository,
    entries: &[UserEntry],
) -> RepositoryResult<Vec<(String, User)>> {
    let mut seeded = Vec::with_capacity(entries.len());
    for entry in entries {
        let user = repo.upsert_user(&entry.email, entry.staff).await?;
        debug!("Seeded user id={} staff={}", user.id, user.staff);
        seeded.push((entry.token.clone(), user));
    }
    info!("User directory seeded with {} entries", seeded.len());
    Ok(seeded)
}

/// Plans of `owner`, optionally only those starting on the given UTC date.
pub async fn list_plans(
    repo: &dyn FullRepository,
    owner: UserId,
    date: Option<NaiveDate>,
) -> RepositoryResult<Vec<ObservationPlan>> {
    let plans = repo.list_plans_for_owner(owner).await?;
    Ok(match date {
        Some(day) => plans
            .into_iter()
            .filter(|p| p.start_time.date_naive() == day)
            .collect(),
        None => plans,
    })
}

/// Executed plans of `owner`, most recent completion first.
pub async fn list_executed_plans(
    repo: &dyn FullRepository,
    owner: UserId,
) -> RepositoryResult<Vec<ObservationPlan>> {
    let mut plans: Vec<ObservationPlan> = repo
        .list_plans_for_owner(owner)
        .await?
        .into_iter()
        .filter(|p| p.executed)
        .collect();
    plans.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
    Ok(plans)
}

/// Record the completion reported by the telescope driver.
pub async fn record_completion(
    repo: &dyn FullRepository,
    id: PlanId,
    executed_at: DateTime<Utc>,
    outputs: Option<String>,
) -> RepositoryResult<ObservationPlan> {
    let plan = repo
        .mark_plan_executed(id, executed_at, outputs)
        .await
        .map_err(|e| e.with_operation("record_completion"))?;
    info!(
        "Plan {} executed at {} (outputs: {})",
        plan.id,
        executed_at.to_rfc3339(),
        plan.outputs.as_deref().unwrap_or("none")
    );
    Ok(plan)
}
