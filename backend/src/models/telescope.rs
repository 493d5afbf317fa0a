//! Telescope state as inferred from the orchestration folder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::PlanId;

/// Status of the single telescope of this installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TelescopeStatus {
    /// Nothing queued, nothing running.
    Idle,
    /// Instruction file written, waiting for the driver to pick it up.
    Sending,
    /// The driver consumed the instruction file and is running it.
    ExecutingOperations,
    /// A file sat in the folder for too many ticks.
    ErrorNotWatching { file: String },
    /// The running operation exceeded the configured timeout.
    ErrorTimeout { elapsed_s: f64 },
    /// Any other failure.
    Error { reason: String },
}

impl TelescopeStatus {
    /// Legacy status label, as shown by the operator dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            TelescopeStatus::Idle => "idle",
            TelescopeStatus::Sending => "sending",
            TelescopeStatus::ExecutingOperations => "executing operations",
            TelescopeStatus::ErrorNotWatching { .. } => "error - orchestrate not watching",
            TelescopeStatus::ErrorTimeout { .. } => "error - timeout",
            TelescopeStatus::Error { .. } => "error",
        }
    }

    /// Human readable context carried by error states.
    pub fn detail(&self) -> Option<String> {
        match self {
            TelescopeStatus::ErrorNotWatching { file } => {
                Some(format!("{} was never consumed by the telescope driver", file))
            }
            TelescopeStatus::ErrorTimeout { elapsed_s } => {
                Some(format!("operation still running after {:.0} s", elapsed_s))
            }
            TelescopeStatus::Error { reason } => Some(reason.clone()),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TelescopeStatus::ErrorNotWatching { .. }
                | TelescopeStatus::ErrorTimeout { .. }
                | TelescopeStatus::Error { .. }
        )
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TelescopeStatus::Idle)
    }
}

impl std::fmt::Display for TelescopeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Driver reports already on disk for a plan when its instructions were
/// sent. They belong to an earlier attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorReports {
    pub done: Vec<String>,
    pub errors: Vec<String>,
}

impl PriorReports {
    /// Drop the reports that were already present at dispatch.
    pub fn fresh_done(&self, reports: Vec<String>) -> Vec<String> {
        fresh(reports, &self.done)
    }

    pub fn fresh_errors(&self, reports: Vec<String>) -> Vec<String> {
        fresh(reports, &self.errors)
    }
}

fn fresh(mut reports: Vec<String>, prior: &[String]) -> Vec<String> {
    reports.retain(|r| !prior.contains(r));
    reports
}

/// The singleton telescope record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelescopeState {
    pub name: String,
    pub status: TelescopeStatus,
    /// Last commanded pointing.
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    pub alt: qtty::Degrees,
    pub az: qtty::Degrees,
    /// Raw instruction text of the running operation.
    pub operation: Option<String>,
    pub executing_plan_id: Option<PlanId>,
    pub executing_plan_name: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub prior_reports: PriorReports,
}

impl TelescopeState {
    /// A freshly reset record.
    pub fn idle(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TelescopeStatus::Idle,
            ra: qtty::Degrees::new(0.0),
            dec: qtty::Degrees::new(0.0),
            alt: qtty::Degrees::new(0.0),
            az: qtty::Degrees::new(0.0),
            operation: None,
            executing_plan_id: None,
            executing_plan_name: None,
            updated_at: Utc::now(),
            prior_reports: PriorReports::default(),
        }
    }

    /// Back to idle with zeroed pointing and no executing plan.
    pub fn reset(&mut self) {
        let name = std::mem::take(&mut self.name);
        *self = Self::idle(name);
    }

    pub fn set_status(&mut self, status: TelescopeStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
