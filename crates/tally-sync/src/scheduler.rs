//! # Daily Scheduler
//!
//! Runs `reconcile_all` at fixed local times of day (05:00 and 17:00 by
//! default).
//!
//! ```text
//!   now = 10:12 ──► next_fire_after ──► 17:00 today ──► sleep ──► reconcile_all
//!   now = 17:00 ──► next_fire_after ──► 05:00 tomorrow
//! ```
//!
//! A pass that is still running when the next fire time arrives delays that
//! fire; passes never overlap within one scheduler.

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::orchestrator::SyncOrchestrator;

/// Next instant strictly after `now` that matches one of `times`.
///
/// Returns `None` only when `times` is empty.
///
/// ## Example
/// ```rust
/// use chrono::{NaiveDate, NaiveTime};
/// use tally_sync::scheduler::next_fire_after;
///
/// let times = [NaiveTime::from_hms_opt(5, 0, 0).unwrap(), NaiveTime::from_hms_opt(17, 0, 0).unwrap()];
/// let now = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap().and_hms_opt(18, 30, 0).unwrap();
///
/// let next = next_fire_after(now, &times).unwrap();
/// assert_eq!(next, NaiveDate::from_ymd_opt(2024, 1, 11).unwrap().and_hms_opt(5, 0, 0).unwrap());
/// ```
pub fn next_fire_after(now: NaiveDateTime, times: &[NaiveTime]) -> Option<NaiveDateTime> {
    let today = now.date();

    let later_today = times
        .iter()
        .map(|t| today.and_time(*t))
        .filter(|candidate| *candidate > now)
        .min();

    later_today.or_else(|| {
        let earliest = times.iter().min()?;
        today.succ_opt().map(|tomorrow| tomorrow.and_time(*earliest))
    })
}

/// Background task firing reconciliation passes on the daily schedule.
pub struct Scheduler {
    orchestrator: SyncOrchestrator,
    times: Vec<NaiveTime>,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping the scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Stops the scheduler after any pass in progress.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::Internal("Scheduler already stopped".into()))
    }
}

impl Scheduler {
    /// Creates a scheduler and returns a handle.
    pub fn new(orchestrator: SyncOrchestrator, times: Vec<NaiveTime>) -> (Self, SchedulerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let scheduler = Scheduler {
            orchestrator,
            times,
            shutdown_rx,
        };

        (scheduler, SchedulerHandle { shutdown_tx })
    }

    /// Runs the scheduler loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(times = ?self.times, "Statement scheduler starting");

        loop {
            let now = Local::now().naive_local();
            let Some(next) = next_fire_after(now, &self.times) else {
                warn!("No schedule times configured, scheduler exiting");
                break;
            };

            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, wait_secs = wait.as_secs(), "Next scheduled reconciliation");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    match self.orchestrator.reconcile_all().await {
                        Ok(summary) => info!(
                            run_id = %summary.run_id,
                            customers = summary.customers,
                            "Scheduled reconciliation finished"
                        ),
                        Err(e) => error!(error = %e, "Scheduled reconciliation failed"),
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Statement scheduler shutting down");
                    break;
                }
            }
        }

        info!("Statement scheduler stopped");
    }
}
