//! Storage for plans, reservations and users.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (HTTP handlers, telescope monitor)   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs)                             │
//! │  - User seeding, filtered listings, completion records  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌──────────────────────────────────────────────┐
//!     │             Local Repository                  │
//!     │               (in-memory)                     │
//!     └──────────────────────────────────────────────┘
//! ```

#[cfg(not(feature = "local-repo"))]
compile_error!("Enable at least one repository backend feature.");

pub mod repositories;
pub mod repository;
pub mod services;

use std::sync::Arc;

pub use repositories::LocalRepository;
pub use repository::{
    ErrorContext, FullRepository, PlanRepository, RepositoryError, RepositoryResult,
    ReservationRepository, UserRepository,
};
pub use services::{list_executed_plans, list_plans, record_completion, seed_users};

/// Create the repository selected by the enabled backend feature.
pub fn create_repository() -> Arc<dyn FullRepository> {
    Arc::new(LocalRepository::new())
}
