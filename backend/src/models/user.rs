//! Users as seen by the backend.
//!
//! Accounts live outside this service; the backend only needs an identity,
//! an email to address reservations to, and the staff flag.

use serde::{Deserialize, Serialize};

use crate::api::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub staff: bool,
}
