//! Application state for the HTTP server.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{User, UserId};
use crate::services::Observatory;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage, telescope, folder and configuration
    pub observatory: Observatory,
    /// Bearer token to user lookup, built from the seeded directory
    tokens: Arc<HashMap<String, UserId>>,
}

impl AppState {
    /// Create the application state from the observatory and the seeded
    /// `(token, user)` pairs.
    pub fn new(observatory: Observatory, seeded: Vec<(String, User)>) -> Self {
        let tokens = seeded
            .into_iter()
            .map(|(token, user)| (token, user.id))
            .collect();
        Self {
            observatory,
            tokens: Arc::new(tokens),
        }
    }

    pub fn user_for_token(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).copied()
    }
}
