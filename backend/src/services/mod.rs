//! Service layer for business logic and orchestration.
//!
//! Pure astronomy (`coordinates`, `ephemeris`, `zenith`), the driver protocol
//! (`instructions`, `orchestration_folder`), the telescope state machine
//! (`telescope`, `monitor`) and the request use cases (`planning`,
//! `execution`, `reservations`) built on top of them.

pub mod coordinates;
pub mod ephemeris;
pub mod error;
pub mod execution;
pub mod instructions;
pub mod monitor;
pub mod orchestration_folder;
pub mod planning;
pub mod reservations;
pub mod telescope;
pub mod zenith;

use std::sync::Arc;

use crate::api::User;
use crate::config::AppConfig;
use crate::db::FullRepository;

pub use error::{ObservationError, ObservationResult};
pub use monitor::{MonitorSettings, TelescopeMonitor};
pub use orchestration_folder::{FsFolder, MemoryFolder, OrchestrationFolder};
pub use telescope::TelescopeHandle;
pub use zenith::check_observable;

/// Everything a use case needs: storage, the telescope, the driver folder and
/// the configuration.
#[derive(Clone)]
pub struct Observatory {
    pub repository: Arc<dyn FullRepository>,
    pub telescope: TelescopeHandle,
    pub folder: Arc<dyn OrchestrationFolder>,
    pub config: Arc<AppConfig>,
}

impl Observatory {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        folder: Arc<dyn OrchestrationFolder>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            telescope: TelescopeHandle::new(config.telescope.name.clone()),
            repository,
            folder,
            config,
        }
    }

    /// The polling monitor bound to this observatory.
    pub fn monitor(&self) -> TelescopeMonitor {
        TelescopeMonitor::new(
            self.telescope.clone(),
            self.folder.clone(),
            self.repository.clone(),
            MonitorSettings::from(&self.config.orchestration),
        )
    }
}

/// Refuse `action` unless `user` is staff.
pub fn require_staff(user: &User, action: &str) -> ObservationResult<()> {
    if user.staff {
        Ok(())
    } else {
        Err(ObservationError::Forbidden(format!("{} requires staff", action)))
    }
}
