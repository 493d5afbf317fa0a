//! In-memory repository.
//!
//! Backs the server when no external database is configured and serves as
//! the store in tests. Ids are assigned from per-table counters starting at 1.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::api::{
    NewPlan, NewReservation, ObservationPlan, PlanId, Reservation, ReservationId, User, UserId,
};
use crate::db::repository::{
    ErrorContext, PlanRepository, RepositoryError, RepositoryResult, ReservationRepository,
    UserRepository,
};

#[derive(Debug, Default)]
struct Tables {
    plans: BTreeMap<i64, ObservationPlan>,
    reservations: BTreeMap<i64, Reservation>,
    users: BTreeMap<i64, User>,
    next_plan_id: i64,
    next_reservation_id: i64,
    next_user_id: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct LocalRepository {
    tables: RwLock<Tables>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan_count(&self) -> usize {
        self.tables.read().plans.len()
    }

    fn plan_not_found(operation: &str, id: PlanId) -> RepositoryError {
        RepositoryError::not_found_with_context(
            format!("Plan {} not found", id),
            ErrorContext::new(operation)
                .with_entity("plan")
                .with_entity_id(id),
        )
    }
}

#[async_trait]
impl PlanRepository for LocalRepository {
    async fn store_plan(&self, plan: NewPlan) -> RepositoryResult<ObservationPlan> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&plan.owner.value()) {
            return Err(RepositoryError::validation_with_context(
                format!("Unknown owner {}", plan.owner),
                ErrorContext::new("store_plan").with_entity("plan"),
            ));
        }
        let id = PlanId::new(next(&mut tables.next_plan_id));
        let stored = ObservationPlan::from_new(id, plan);
        tables.plans.insert(id.value(), stored.clone());
        Ok(stored)
    }

    async fn get_plan(&self, id: PlanId) -> RepositoryResult<ObservationPlan> {
        self.tables
            .read()
            .plans
            .get(&id.value())
            .cloned()
            .ok_or_else(|| Self::plan_not_found("get_plan", id))
    }

    async fn list_plans_for_owner(&self, owner: UserId) -> RepositoryResult<Vec<ObservationPlan>> {
        let mut plans: Vec<ObservationPlan> = self
            .tables
            .read()
            .plans
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        plans.sort_by_key(|p| (p.start_time, p.id));
        Ok(plans)
    }

    async fn delete_plan(&self, id: PlanId) -> RepositoryResult<()> {
        self.tables
            .write()
            .plans
            .remove(&id.value())
            .map(|_| ())
            .ok_or_else(|| Self::plan_not_found("delete_plan", id))
    }

    async fn mark_plan_executed(
        &self,
        id: PlanId,
        executed_at: DateTime<Utc>,
        outputs: Option<String>,
    ) -> RepositoryResult<ObservationPlan> {
        let mut tables = self.tables.write();
        let plan = tables
            .plans
            .get_mut(&id.value())
            .ok_or_else(|| Self::plan_not_found("mark_plan_executed", id))?;
        plan.executed = true;
        plan.executed_at = Some(executed_at);
        plan.outputs = outputs;
        Ok(plan.clone())
    }
}

#[async_trait]
impl ReservationRepository for LocalRepository {
    async fn store_reservation(&self, reservation: NewReservation) -> RepositoryResult<Reservation> {
        let mut tables = self.tables.write();
        let id = ReservationId::new(next(&mut tables.next_reservation_id));
        let stored = Reservation::from_new(id, reservation);
        tables.reservations.insert(id.value(), stored.clone());
        Ok(stored)
    }

    async fn list_reservations(&self) -> RepositoryResult<Vec<Reservation>> {
        let mut all: Vec<Reservation> = self.tables.read().reservations.values().cloned().collect();
        all.sort_by_key(|r| (r.start_time, r.id));
        Ok(all)
    }

    async fn delete_reservation(&self, id: ReservationId) -> RepositoryResult<()> {
        self.tables
            .write()
            .reservations
            .remove(&id.value())
            .map(|_| ())
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("Reservation {} not found", id),
                    ErrorContext::new("delete_reservation")
                        .with_entity("reservation")
                        .with_entity_id(id),
                )
            })
    }
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn upsert_user(&self, email: &str, staff: bool) -> RepositoryResult<User> {
        let email = email.trim();
        if email.is_empty() {
            return Err(RepositoryError::validation_with_context(
                "Email must not be empty",
                ErrorContext::new("upsert_user").with_entity("user"),
            ));
        }
        let mut tables = self.tables.write();
        if let Some(existing) = tables
            .users
            .values_mut()
            .find(|u| u.email.eq_ignore_ascii_case(email))
        {
            existing.staff = staff;
            return Ok(existing.clone());
        }
        let id = UserId::new(next(&mut tables.next_user_id));
        let user = User {
            id,
            email: email.to_string(),
            staff,
        };
        tables.users.insert(id.value(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> RepositoryResult<User> {
        self.tables
            .read()
            .users
            .get(&id.value())
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("User {} not found", id),
                    ErrorContext::new("get_user")
                        .with_entity("user")
                        .with_entity_id(id),
                )
            })
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.trim();
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        Ok(self.tables.read().users.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FrameMode;
    use chrono::TimeZone;

    fn new_plan(owner: UserId, hour: u32) -> NewPlan {
        NewPlan {
            owner,
            name: None,
            object_name: None,
            ra: qtty::Degrees::new(10.0),
            dec: qtty::Degrees::new(-20.0),
            filters: vec!["R".into()],
            frame_mode: FrameMode::new("Light"),
            exposure: qtty::Seconds::new(5.0),
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_store_requires_known_owner() {
        let repo = LocalRepository::new();
        let err = repo.store_plan(new_plan(UserId::new(9), 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_plans_listed_by_start_time() {
        let repo = LocalRepository::new();
        let user = repo.upsert_user("a@example.org", false).await.unwrap();
        let late = repo.store_plan(new_plan(user.id, 5)).await.unwrap();
        let early = repo.store_plan(new_plan(user.id, 1)).await.unwrap();
        assert_eq!(late.id, PlanId::new(1));
        assert_eq!(early.id, PlanId::new(2));

        let ids: Vec<PlanId> = repo
            .list_plans_for_owner(user.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[tokio::test]
    async fn test_mark_executed() {
        let repo = LocalRepository::new();
        let user = repo.upsert_user("a@example.org", false).await.unwrap();
        let plan = repo.store_plan(new_plan(user.id, 1)).await.unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap();

        let done = repo
            .mark_plan_executed(plan.id, at, Some("a.fits".into()))
            .await
            .unwrap();
        assert!(done.executed);
        assert_eq!(done.executed_at, Some(at));
        assert_eq!(repo.get_plan(plan.id).await.unwrap().outputs.as_deref(), Some("a.fits"));

        let missing = repo.mark_plan_executed(PlanId::new(99), at, None).await;
        assert!(missing.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_user_is_case_insensitive() {
        let repo = LocalRepository::new();
        let first = repo.upsert_user("Ana@Example.org", false).await.unwrap();
        let second = repo.upsert_user("ana@example.org", true).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.staff);
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
        assert!(repo.upsert_user("  ", false).await.is_err());
    }
}
