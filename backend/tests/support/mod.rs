//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use argus_backend::config::AppConfig;
use argus_backend::db::{FullRepository, LocalRepository};
use argus_backend::services::{OrchestrationFolder, Observatory};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to the process
/// environment, since tests run in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

pub const STAFF_TOKEN: &str = "staff-token";
pub const OBSERVER_TOKEN: &str = "observer-token";

/// Configuration text for a site at lat -22.4, lon -45.6 with small tick
/// thresholds, pointing at `folder`.
pub fn config_toml(folder: &Path) -> String {
    format!(
        r#"
[telescope]
name = "argus-test"
latitude = -22.4
longitude = -45.6
utc_offset_hours = -3.0
filters = ["R", "G", "B"]
frame_modes = ["Light", "Dark"]
max_exposure_s = 300.0
max_reservation_minutes = 120

[orchestration]
folder = "{}"
tick_interval_ms = 1000
stuck_ticks = 3
pickup_ticks = 3
handshake_ticks = 2
operation_timeout_s = 600.0
slew_wait_s = 10.0
filter_wait_s = 5.0
frame_wait_s = 2.0

[[users]]
email = "staff@example.org"
token = "{}"
staff = true

[[users]]
email = "observer@example.org"
token = "{}"
"#,
        folder.display().to_string().replace('\\', "/"),
        STAFF_TOKEN,
        OBSERVER_TOKEN
    )
}

pub fn test_config(folder: &Path) -> AppConfig {
    AppConfig::from_toml_str(&config_toml(folder)).expect("test config parses")
}

/// An observatory over `folder` with fresh in-memory storage.
pub fn observatory(config: AppConfig, folder: Arc<dyn OrchestrationFolder>) -> Observatory {
    let repository: Arc<dyn FullRepository> = Arc::new(LocalRepository::new());
    Observatory::new(repository, folder, Arc::new(config))
}
