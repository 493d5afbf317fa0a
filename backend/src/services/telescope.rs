//! Shared access to the telescope state.
//!
//! The monitor owns the transitions; request handlers only read snapshots or
//! attempt the single `idle -> sending` transition through
//! [`TelescopeHandle::try_begin_execution`], which fails fast when the state
//! is locked or not idle.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::api::{PlanId, PriorReports, TelescopeState, TelescopeStatus};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TelescopeBusy {
    #[error("Telescope state is being updated")]
    Locked,

    #[error("Telescope is busy ({0})")]
    NotIdle(String),
}

#[derive(Debug, Clone)]
pub struct TelescopeHandle {
    state: Arc<Mutex<TelescopeState>>,
}

/// Commanded pointing recorded when an instruction file is sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointing {
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    pub alt: qtty::Degrees,
    pub az: qtty::Degrees,
}

/// Exclusive access to an idle telescope, granted by
/// [`TelescopeHandle::try_begin_execution`]. Dropping it without calling
/// [`ExecutionGuard::mark_sending`] leaves the state unchanged.
pub struct ExecutionGuard<'a> {
    state: MutexGuard<'a, TelescopeState>,
}

impl ExecutionGuard<'_> {
    pub fn mark_sending(
        mut self,
        plan_id: PlanId,
        plan_name: String,
        pointing: Pointing,
        operation: String,
        prior_reports: PriorReports,
    ) -> TelescopeState {
        let state = &mut *self.state;
        state.ra = pointing.ra;
        state.dec = pointing.dec;
        state.alt = pointing.alt;
        state.az = pointing.az;
        state.operation = Some(operation);
        state.executing_plan_id = Some(plan_id);
        state.executing_plan_name = Some(plan_name);
        state.prior_reports = prior_reports;
        state.set_status(TelescopeStatus::Sending);
        state.clone()
    }
}

impl TelescopeHandle {
    /// A handle over a freshly reset state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TelescopeState::idle(name))),
        }
    }

    pub fn snapshot(&self) -> TelescopeState {
        self.state.lock().clone()
    }

    pub fn status(&self) -> TelescopeStatus {
        self.state.lock().status.clone()
    }

    pub fn executing_plan(&self) -> Option<PlanId> {
        self.state.lock().executing_plan_id
    }

    pub fn prior_reports(&self) -> PriorReports {
        self.state.lock().prior_reports.clone()
    }

    /// Non-blocking attempt to claim an idle telescope.
    pub fn try_begin_execution(&self) -> Result<ExecutionGuard<'_>, TelescopeBusy> {
        let state = self.state.try_lock().ok_or(TelescopeBusy::Locked)?;
        if !state.status.is_idle() {
            return Err(TelescopeBusy::NotIdle(state.status.label().to_string()));
        }
        Ok(ExecutionGuard { state })
    }

    /// Run `f` with the state locked. Used by the monitor.
    pub fn update<R>(&self, f: impl FnOnce(&mut TelescopeState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Back to idle with zeroed pointing.
    pub fn reset(&self) {
        self.state.lock().reset();
    }
}
