//! # Argus Backend
//!
//! Observation scheduling backend for a single robotic telescope.
//!
//! Users submit observation plans (coordinates or a solar-system body,
//! filters, exposure, frame mode, start time). Each plan is gated by the
//! zenith validator, stored, and on request rendered as an instruction file
//! for the external telescope driver. A background monitor watches the
//! driver's folder and infers the telescope status from how files come and
//! go.
//!
//! ## Architecture
//!
//! - [`api`]: Identifier newtypes and shared DTO re-exports
//! - [`config`]: `argus.toml` loading and validation
//! - [`models`]: Plans, reservations, users, telescope state, time helpers
//! - [`db`]: Repository pattern and the in-memory store
//! - [`services`]: Validator, instruction serializer, folder monitor and the
//!   request use cases
//! - [`http`]: Axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod config;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
