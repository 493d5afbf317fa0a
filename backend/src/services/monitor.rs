//! Telescope status inference from the orchestration folder.
//!
//! The driver gives no direct feedback. The monitor scans the folder on a
//! fixed tick and infers progress from how files come and go:
//!
//! - the instruction file disappearing means the driver picked it up;
//! - a file lingering for `stuck_ticks` means the driver is not watching;
//! - a report in `done/` means the plan finished, one in `done/Errors/`
//!   means it failed;
//! - `HANDSHAKE` alone for `handshake_ticks` means the driver is alive and
//!   idle, which clears an error state.
//!
//! [`TelescopeMonitor::tick`] runs one scan and never fails; problems become
//! telescope status values.

use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{PlanId, TelescopeStatus};
use crate::config::OrchestrationSettings;
use crate::db::{self, FullRepository};
use crate::services::instructions::{join_outputs, parse_done_outputs, OrchestrationName};
use crate::services::orchestration_folder::{OrchestrationFolder, HANDSHAKE};
use crate::services::telescope::TelescopeHandle;

/// Thresholds driving the inference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub tick_interval: Duration,
    pub stuck_ticks: u32,
    pub pickup_ticks: u32,
    pub handshake_ticks: u32,
    pub operation_timeout: Duration,
}

impl From<&OrchestrationSettings> for MonitorSettings {
    fn from(settings: &OrchestrationSettings) -> Self {
        Self {
            tick_interval: settings.tick_interval(),
            stuck_ticks: settings.stuck_ticks,
            pickup_ticks: settings.pickup_ticks,
            handshake_ticks: settings.handshake_ticks,
            operation_timeout: settings.operation_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FileTrack {
    first_seen: u64,
    ticks_present: u32,
}

pub struct TelescopeMonitor {
    telescope: TelescopeHandle,
    folder: Arc<dyn OrchestrationFolder>,
    repository: Arc<dyn FullRepository>,
    settings: MonitorSettings,
    tracked: HashMap<String, FileTrack>,
    previous: BTreeSet<String>,
    iteration: u64,
    handshake_ticks: u32,
    operation_elapsed: Duration,
}

fn is_busy_or_error(status: &TelescopeStatus) -> bool {
    matches!(status, TelescopeStatus::ExecutingOperations) || status.is_error()
}

impl TelescopeMonitor {
    pub fn new(
        telescope: TelescopeHandle,
        folder: Arc<dyn OrchestrationFolder>,
        repository: Arc<dyn FullRepository>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            telescope,
            folder,
            repository,
            settings,
            tracked: HashMap::new(),
            previous: BTreeSet::new(),
            iteration: 0,
            handshake_ticks: 0,
            operation_elapsed: Duration::ZERO,
        }
    }

    /// Run forever, one scan per tick interval.
    pub async fn run(mut self) {
        info!(
            interval_ms = self.settings.tick_interval.as_millis() as u64,
            stuck_ticks = self.settings.stuck_ticks,
            pickup_ticks = self.settings.pickup_ticks,
            "Telescope monitor started"
        );
        let mut interval = tokio::time::interval(self.settings.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Set `to` when `allowed` holds for the current status, atomically.
    fn transition(&self, to: TelescopeStatus, allowed: impl FnOnce(&TelescopeStatus) -> bool) -> bool {
        self.telescope.update(|state| {
            if !allowed(&state.status) {
                return false;
            }
            if state.status != to {
                info!(from = %state.status, to = %to, "Telescope status changed");
                state.set_status(to);
            }
            true
        })
    }

    fn reset(&mut self, why: &str) {
        info!(reason = why, "Telescope reset to idle");
        self.telescope.reset();
        self.operation_elapsed = Duration::ZERO;
    }

    /// One scan of the orchestration folder. Returns the resulting status.
    pub async fn tick(&mut self) -> TelescopeStatus {
        let current = match self.scan_pending() {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Orchestration folder unreadable");
                self.transition(
                    TelescopeStatus::Error {
                        reason: format!("orchestration folder unreadable: {}", e),
                    },
                    |s| !s.is_error(),
                );
                self.iteration += 1;
                return self.telescope.status();
            }
        };

        self.detect_sent_file_pickup(&current);
        self.detect_disappearances(&current);

        if self.telescope.status().is_idle() {
            self.operation_elapsed = Duration::ZERO;
        }

        self.track_presence(&current);
        self.check_handshake(&current);
        self.previous = current;

        if matches!(self.telescope.status(), TelescopeStatus::ExecutingOperations) {
            self.operation_elapsed += self.settings.tick_interval;
            self.check_reports().await;
        }

        if self.operation_elapsed > self.settings.operation_timeout {
            let elapsed_s = self.operation_elapsed.as_secs_f64();
            warn!(elapsed_s, "Operation timed out");
            self.transition(TelescopeStatus::ErrorTimeout { elapsed_s }, |_| true);
            self.operation_elapsed = Duration::ZERO;
        }

        self.iteration += 1;
        let status = self.telescope.status();
        debug!(iteration = self.iteration, status = %status, "Monitor tick");
        status
    }

    /// Pending files with dotfiles removed from disk and from the listing.
    fn scan_pending(&self) -> std::io::Result<BTreeSet<String>> {
        let mut files = BTreeSet::new();
        for file in self.folder.list_pending()? {
            if file.starts_with('.') {
                if let Err(e) = self.folder.remove_pending(&file) {
                    debug!(file = %file, error = %e, "Could not remove hidden file");
                }
                continue;
            }
            files.insert(file);
        }
        Ok(files)
    }

    fn executing_name(&self) -> Option<(PlanId, OrchestrationName)> {
        self.telescope
            .executing_plan()
            .map(|id| (id, OrchestrationName::for_plan(id)))
    }

    /// `sending -> executing` once our instruction file is gone.
    fn detect_sent_file_pickup(&mut self, current: &BTreeSet<String>) {
        if !matches!(self.telescope.status(), TelescopeStatus::Sending) {
            return;
        }
        let still_pending = match self.executing_name() {
            Some((_, name)) => current.iter().any(|f| name.matches_pending(f)),
            None => false,
        };
        if !still_pending
            && self.transition(TelescopeStatus::ExecutingOperations, |s| {
                matches!(s, TelescopeStatus::Sending)
            })
        {
            self.operation_elapsed = Duration::ZERO;
        }
    }

    /// A file seen last tick and gone now was picked up if it did not
    /// linger longer than `pickup_ticks`.
    fn detect_disappearances(&mut self, current: &BTreeSet<String>) {
        let gone: Vec<String> = self.previous.difference(current).cloned().collect();
        for file in gone {
            let Some(track) = self.tracked.remove(&file) else {
                continue;
            };
            if file == HANDSHAKE {
                continue;
            }
            let present_for = self.iteration.saturating_sub(track.first_seen);
            if present_for <= u64::from(self.settings.pickup_ticks)
                && self.transition(TelescopeStatus::ExecutingOperations, |s| {
                    !is_busy_or_error(s)
                })
            {
                debug!(file = %file, present_for, "File picked up by driver");
                self.operation_elapsed = Duration::ZERO;
            }
        }
    }

    fn track_presence(&mut self, current: &BTreeSet<String>) {
        self.tracked.retain(|f, _| current.contains(f));
        let iteration = self.iteration;
        for file in current {
            let track = self.tracked.entry(file.clone()).or_insert(FileTrack {
                first_seen: iteration,
                ticks_present: 0,
            });
            track.ticks_present += 1;
            let ticks = track.ticks_present;

            if ticks >= self.settings.stuck_ticks && file != HANDSHAKE {
                let stuck = TelescopeStatus::ErrorNotWatching { file: file.clone() };
                if self.transition(stuck, |s| !is_busy_or_error(s)) {
                    warn!(file = %file, ticks, "Driver is not consuming files");
                }
            }
        }
    }

    fn check_handshake(&mut self, current: &BTreeSet<String>) {
        let only_handshake = current.len() == 1 && current.contains(HANDSHAKE);
        if !only_handshake {
            self.handshake_ticks = 0;
            return;
        }
        self.handshake_ticks += 1;
        if self.handshake_ticks >= self.settings.handshake_ticks && self.telescope.status().is_error() {
            self.reset("driver handshake while in error");
        }
    }

    /// Look for the driver's report on the executing plan. Reports that
    /// were already there when the plan was sent are ignored.
    async fn check_reports(&mut self) {
        let Some((id, name)) = self.executing_name() else {
            return;
        };
        let prior = self.telescope.prior_reports();

        match self.folder.list_done(&name).map(|r| prior.fresh_done(r)) {
            Ok(done) if !done.is_empty() => {
                self.complete(id, &done).await;
                return;
            }
            Ok(_) => {}
            Err(e) => warn!(plan_id = %id, error = %e, "Could not list done folder"),
        }

        match self.folder.list_errors(&name).map(|r| prior.fresh_errors(r)) {
            Ok(errors) if !errors.is_empty() => {
                warn!(plan_id = %id, report = %errors[0], "Driver reported a failed operation");
                self.reset("driver error report");
            }
            Ok(_) => {}
            Err(e) => warn!(plan_id = %id, error = %e, "Could not list error folder"),
        }
    }

    async fn complete(&mut self, id: PlanId, reports: &[String]) {
        let mut outputs = Vec::new();
        for report in reports {
            match self.folder.read_done(report) {
                Ok(text) => outputs.extend(parse_done_outputs(&text)),
                Err(e) => warn!(report = %report, error = %e, "Could not read done report"),
            }
        }

        let recorded =
            db::record_completion(self.repository.as_ref(), id, Utc::now(), join_outputs(&outputs))
                .await;
        match recorded {
            Ok(_) => self.reset("operation completed"),
            Err(e) => {
                warn!(plan_id = %id, error = %e, "Could not record completed plan");
                self.operation_elapsed = Duration::ZERO;
                self.transition(
                    TelescopeStatus::Error {
                        reason: format!("plan {} finished but could not be recorded: {}", id, e),
                    },
                    |_| true,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FrameMode, NewPlan};
    use crate::db::{LocalRepository, PlanRepository, UserRepository};
    use crate::services::orchestration_folder::MemoryFolder;
    use crate::services::telescope::Pointing;
    use qtty::Degrees;

    fn settings() -> MonitorSettings {
        MonitorSettings {
            tick_interval: Duration::from_secs(1),
            stuck_ticks: 3,
            pickup_ticks: 3,
            handshake_ticks: 2,
            operation_timeout: Duration::from_secs(5),
        }
    }

    fn rig_with(settings: MonitorSettings) -> Rig {
        let mut rig = rig();
        rig.monitor.settings = settings;
        rig
    }

    struct Rig {
        monitor: TelescopeMonitor,
        telescope: TelescopeHandle,
        driver: MemoryFolder,
        repo: Arc<LocalRepository>,
    }

    fn rig() -> Rig {
        let telescope = TelescopeHandle::new("argus");
        let driver = MemoryFolder::new();
        let repo = Arc::new(LocalRepository::new());
        let monitor = TelescopeMonitor::new(
            telescope.clone(),
            Arc::new(driver.clone()),
            repo.clone(),
            settings(),
        );
        Rig {
            monitor,
            telescope,
            driver,
            repo,
        }
    }

    async fn send_plan(rig: &Rig) -> PlanId {
        let id = store_plan(rig).await;
        resend_plan(rig, id);
        id
    }

    async fn store_plan(rig: &Rig) -> PlanId {
        let user = rig.repo.upsert_user("obs@example.org", false).await.unwrap();
        let plan = rig
            .repo
            .store_plan(NewPlan {
                owner: user.id,
                name: None,
                object_name: None,
                ra: Degrees::new(1.0),
                dec: Degrees::new(2.0),
                filters: vec!["R".into()],
                frame_mode: FrameMode::new("Light"),
                exposure: qtty::Seconds::new(1.0),
                start_time: Utc::now(),
            })
            .await
            .unwrap();
        plan.id
    }

    /// Write the instruction file and mark `sending`, as execution does.
    fn resend_plan(rig: &Rig, id: PlanId) {
        let name = OrchestrationName::for_plan(id);
        let prior = rig.driver.reports(&name).unwrap();
        rig.driver.put_pending(&name.instruction_file(), "...");
        rig.telescope.try_begin_execution().unwrap().mark_sending(
            id,
            "test".into(),
            Pointing {
                ra: Degrees::new(1.0),
                dec: Degrees::new(2.0),
                alt: Degrees::new(60.0),
                az: Degrees::new(10.0),
            },
            "...".into(),
            prior,
        );
    }

    #[tokio::test]
    async fn test_sending_becomes_executing_after_pickup() {
        let mut rig = rig();
        let id = send_plan(&rig).await;
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Sending);

        rig.driver
            .take_pending(&OrchestrationName::for_plan(id).instruction_file());
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::ExecutingOperations);
    }

    #[tokio::test]
    async fn test_done_report_completes_plan() {
        let mut rig = rig();
        let id = send_plan(&rig).await;
        let name = OrchestrationName::for_plan(id);
        rig.monitor.tick().await;
        rig.driver.take_pending(&name.instruction_file());
        rig.monitor.tick().await;

        rig.driver.put_done(
            &format!("{}.txt.ORC", name),
            "TakeImage     , 1         , C:\\img\\a_R.fits\n",
        );
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);

        let plan = rig.repo.get_plan(id).await.unwrap();
        assert!(plan.executed);
        assert!(plan.executed_at.is_some());
        assert_eq!(plan.outputs.as_deref(), Some("a_R.fits"));
        assert!(rig.telescope.snapshot().executing_plan_id.is_none());
    }

    #[tokio::test]
    async fn test_error_report_resets_without_marking_plan() {
        let mut rig = rig();
        let id = send_plan(&rig).await;
        let name = OrchestrationName::for_plan(id);
        rig.driver.take_pending(&name.instruction_file());
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::ExecutingOperations);

        rig.driver.put_error(&format!("{}.txt.ORC", name), "");
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);
        assert!(!rig.repo.get_plan(id).await.unwrap().executed);
    }

    #[tokio::test]
    async fn test_lingering_file_means_driver_not_watching() {
        let mut rig = rig();
        let id = send_plan(&rig).await;
        rig.monitor.tick().await;
        rig.monitor.tick().await;
        let status = rig.monitor.tick().await;
        assert_eq!(
            status,
            TelescopeStatus::ErrorNotWatching {
                file: OrchestrationName::for_plan(id).instruction_file()
            }
        );
    }

    #[tokio::test]
    async fn test_handshake_alone_recovers_from_error() {
        let mut rig = rig();
        rig.telescope.update(|s| {
            s.alt = Degrees::new(45.0);
            s.set_status(TelescopeStatus::ErrorTimeout { elapsed_s: 9.0 });
        });
        rig.driver.put_pending(HANDSHAKE, "");

        assert!(rig.monitor.tick().await.is_error());
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);
        let state = rig.telescope.snapshot();
        assert_eq!(state.alt.value(), 0.0);
        assert!(state.operation.is_none());
    }

    #[tokio::test]
    async fn test_handshake_never_counts_as_stuck() {
        let mut rig = rig();
        rig.driver.put_pending(HANDSHAKE, "");
        for _ in 0..10 {
            assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);
        }
    }

    #[tokio::test]
    async fn test_operation_timeout() {
        let mut rig = rig();
        let id = send_plan(&rig).await;
        rig.driver
            .take_pending(&OrchestrationName::for_plan(id).instruction_file());

        let mut last = TelescopeStatus::Idle;
        for _ in 0..6 {
            last = rig.monitor.tick().await;
        }
        assert!(matches!(last, TelescopeStatus::ErrorTimeout { .. }));
    }

    #[tokio::test]
    async fn test_hidden_files_are_deleted() {
        let mut rig = rig();
        rig.driver.put_pending(".DS_Store", "");
        rig.monitor.tick().await;
        assert!(rig.driver.pending_contents(".DS_Store").is_none());
        assert!(rig.telescope.status().is_idle());
    }

    #[tokio::test]
    async fn test_retry_after_error_report_waits_for_fresh_report() {
        let mut rig = rig();
        let id = send_plan(&rig).await;
        let name = OrchestrationName::for_plan(id);
        let report = format!("{}.txt.ORC", name);
        rig.driver.take_pending(&name.instruction_file());
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::ExecutingOperations);
        rig.driver.put_error(&report, "failed");
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);

        // Second attempt: the old error report is still on disk.
        resend_plan(&rig, id);
        rig.driver.take_pending(&name.instruction_file());
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::ExecutingOperations);
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::ExecutingOperations);
        assert_eq!(rig.telescope.executing_plan(), Some(id));

        rig.driver
            .put_done(&report, "TakeImage     , 1         , C:\\img\\b_R.fits\n");
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);
        let plan = rig.repo.get_plan(id).await.unwrap();
        assert!(plan.executed);
        assert_eq!(plan.outputs.as_deref(), Some("b_R.fits"));
    }

    #[tokio::test]
    async fn test_foreign_file_pickup_marks_idle_telescope_executing() {
        let mut rig = rig();
        rig.driver.put_pending("manual.txt", "SlewToRaDec ...");
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);

        rig.driver.take_pending("manual.txt");
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::ExecutingOperations);
        assert!(rig.telescope.executing_plan().is_none());
    }

    #[tokio::test]
    async fn test_slow_disappearance_is_not_a_pickup() {
        let mut rig = rig_with(MonitorSettings {
            stuck_ticks: 10,
            pickup_ticks: 2,
            ..settings()
        });
        rig.driver.put_pending("manual.txt", "...");
        for _ in 0..4 {
            assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);
        }

        rig.driver.take_pending("manual.txt");
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);
    }

    #[tokio::test]
    async fn test_disappearance_at_pickup_limit_is_a_pickup() {
        let mut rig = rig_with(MonitorSettings {
            stuck_ticks: 10,
            pickup_ticks: 2,
            ..settings()
        });
        rig.driver.put_pending("manual.txt", "...");
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);

        rig.driver.take_pending("manual.txt");
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::ExecutingOperations);
    }

    #[tokio::test]
    async fn test_stuck_threshold_is_independent_of_pickup_threshold() {
        let mut rig = rig_with(MonitorSettings {
            stuck_ticks: 2,
            pickup_ticks: 5,
            ..settings()
        });
        rig.driver.put_pending("manual.txt", "...");
        assert_eq!(rig.monitor.tick().await, TelescopeStatus::Idle);
        assert_eq!(
            rig.monitor.tick().await,
            TelescopeStatus::ErrorNotWatching {
                file: "manual.txt".into()
            }
        );
    }
}
