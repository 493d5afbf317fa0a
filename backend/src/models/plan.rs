//! Observation plan domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{PlanId, UserId};

/// Camera frame mode (`Light`, `Dark`, `Bias`, ...).
///
/// The accepted set is configuration driven, so this is an open newtype
/// rather than a closed enum; [`crate::config::TelescopeSettings`] validates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameMode(pub String);

impl FrameMode {
    pub fn new(mode: impl Into<String>) -> Self {
        FrameMode(mode.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the telescope should point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// Fixed equatorial coordinates, in degrees.
    Equatorial { ra: qtty::Degrees, dec: qtty::Degrees },
    /// A solar-system body resolved through the ephemeris at observation time.
    Body { name: String },
}

/// A plan that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlan {
    pub owner: UserId,
    pub name: Option<String>,
    /// Named body, when the plan targets one; `ra`/`dec` then hold its
    /// position at `start_time`.
    pub object_name: Option<String>,
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    /// Filters in acquisition order.
    pub filters: Vec<String>,
    pub frame_mode: FrameMode,
    pub exposure: qtty::Seconds,
    pub start_time: DateTime<Utc>,
}

/// A persisted observation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationPlan {
    pub id: PlanId,
    pub owner: UserId,
    pub name: Option<String>,
    pub object_name: Option<String>,
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    pub filters: Vec<String>,
    pub frame_mode: FrameMode,
    pub exposure: qtty::Seconds,
    pub start_time: DateTime<Utc>,
    pub executed: bool,
    pub executed_at: Option<DateTime<Utc>>,
    /// Output image names reported by the telescope driver, comma separated.
    pub outputs: Option<String>,
}

impl ObservationPlan {
    /// Build the stored form of a new plan under the given id.
    pub fn from_new(id: PlanId, plan: NewPlan) -> Self {
        Self {
            id,
            owner: plan.owner,
            name: plan.name,
            object_name: plan.object_name,
            ra: plan.ra,
            dec: plan.dec,
            filters: plan.filters,
            frame_mode: plan.frame_mode,
            exposure: plan.exposure,
            start_time: plan.start_time,
            executed: false,
            executed_at: None,
            outputs: None,
        }
    }

    /// Name shown to operators: the plan name, else the object, else the id.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.object_name.clone())
            .unwrap_or_else(|| format!("plan {}", self.id))
    }

    /// The pointing target of this plan.
    pub fn target(&self) -> Target {
        match &self.object_name {
            Some(name) => Target::Body { name: name.clone() },
            None => Target::Equatorial {
                ra: self.ra,
                dec: self.dec,
            },
        }
    }
}
