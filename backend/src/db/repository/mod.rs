//! Repository traits.
//!
//! Storage is split by aggregate: plans, reservations and users. Handlers
//! and the monitor hold an `Arc<dyn FullRepository>` and never see the
//! backing store.

pub mod error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use crate::api::{
    NewPlan, NewReservation, ObservationPlan, PlanId, Reservation, ReservationId, User, UserId,
};

/// Repository trait for observation plans.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Persist a validated plan and return it with its assigned id.
    async fn store_plan(&self, plan: NewPlan) -> RepositoryResult<ObservationPlan>;

    async fn get_plan(&self, id: PlanId) -> RepositoryResult<ObservationPlan>;

    /// Plans owned by `owner`, ordered by start time.
    async fn list_plans_for_owner(&self, owner: UserId) -> RepositoryResult<Vec<ObservationPlan>>;

    async fn delete_plan(&self, id: PlanId) -> RepositoryResult<()>;

    /// Record a completed observation.
    ///
    /// # Arguments
    /// * `id` - The executed plan
    /// * `executed_at` - Completion time as observed by the monitor
    /// * `outputs` - Output image names reported by the driver
    async fn mark_plan_executed(
        &self,
        id: PlanId,
        executed_at: DateTime<Utc>,
        outputs: Option<String>,
    ) -> RepositoryResult<ObservationPlan>;
}

/// Repository trait for telescope time reservations.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn store_reservation(&self, reservation: NewReservation) -> RepositoryResult<Reservation>;

    /// All reservations, ordered by start time.
    async fn list_reservations(&self) -> RepositoryResult<Vec<Reservation>>;

    async fn delete_reservation(&self, id: ReservationId) -> RepositoryResult<()>;
}

/// Repository trait for the user directory.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user, or update the staff flag of an existing email.
    async fn upsert_user(&self, email: &str, staff: bool) -> RepositoryResult<User>;

    async fn get_user(&self, id: UserId) -> RepositoryResult<User>;

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn list_users(&self) -> RepositoryResult<Vec<User>>;
}

/// Everything the application needs from storage.
pub trait FullRepository: PlanRepository + ReservationRepository + UserRepository {}

impl<T> FullRepository for T where T: PlanRepository + ReservationRepository + UserRepository {}
