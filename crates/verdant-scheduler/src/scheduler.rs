use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use verdant_core::config::SchedulerConfig;
use verdant_core::{LastValues, Reading, Record};
use verdant_workers::{Worker, WorkerError};

use crate::registry::JobRegistry;
use crate::schedule::next_occurrence;

/// Where finished records go. Implemented once in the daemon to fan out to
/// the ingestion queue and the text log; `tick_complete` fires exactly once
/// per tick (even with zero due jobs) and triggers the storage flush.
pub trait TickSink: Send + Sync {
    fn record_ready(&self, record: &Record);
    fn tick_complete(&self);
}

/// Drives all jobs: polls once per tick, executes due jobs sequentially in
/// configuration order, and maintains the shared last-values map.
///
/// Jobs are deliberately not run in parallel. Sequential execution gives
/// well-defined read/write ordering into [`LastValues`]: a job later in the
/// file observes values written by earlier jobs in the same tick.
pub struct Scheduler {
    registry: JobRegistry,
    sink: Arc<dyn TickSink>,
    last_values: LastValues,
    tick_secs: u64,
    disable_cron: bool,
}

impl Scheduler {
    pub fn new(registry: JobRegistry, sink: Arc<dyn TickSink>, config: &SchedulerConfig) -> Self {
        Self {
            registry,
            sink,
            last_values: LastValues::new(),
            tick_secs: config.tick_secs.max(1),
            disable_cron: config.disable_cron,
        }
    }

    /// Main loop. Ticks at the configured cadence until `shutdown`
    /// broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(disable_cron = self.disable_cron, "scheduler started");
        let mut interval = tokio::time::interval(Duration::from_secs(self.tick_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick(Utc::now().timestamp()),
                changed = shutdown.changed() => {
                    // A dropped sender means the daemon is gone; treat it
                    // like an explicit shutdown instead of spinning.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One scheduling pass. `now` is epoch seconds, read once so every job
    /// in the pass compares against the same instant.
    fn tick(&mut self, now: i64) {
        // Cheap no-op unless the jobs file mtime advanced. A failed reload
        // keeps the previous valid set running.
        if let Err(e) = self.registry.reload_if_changed() {
            error!(error = %e, "jobs file reload failed; keeping previous job set");
        }

        let disable_cron = self.disable_cron;
        let last_values = &mut self.last_values;
        let sink = &self.sink;

        for job in self.registry.jobs_mut() {
            let upcoming = if disable_cron {
                Some(now + 1)
            } else {
                next_occurrence(&job.schedule, now)
            };
            let Some(upcoming) = upcoming else {
                warn!(job_id = %job.id, "schedule has no upcoming occurrence; job idle");
                job.next_run = None;
                continue;
            };

            // First sight of this job: arm it and wait for the occurrence.
            let scheduled = *job.next_run.get_or_insert(upcoming);
            if scheduled > now {
                continue;
            }

            match run_scoped(job.worker.as_mut(), last_values) {
                Ok(Some(value)) => {
                    // Keyed to the nominal schedule, not the wall clock:
                    // rows stay aligned to cron boundaries under drift.
                    let completed = Utc::now().timestamp_millis() as f64 / 1000.0;
                    let record = Record {
                        timestamp: scheduled,
                        offset: round1(completed - scheduled as f64),
                        sensor: job.id.clone(),
                        value,
                    };
                    last_values.insert(job.id.clone(), record.clone());
                    sink.record_ready(&record);
                }
                Ok(None) => {}
                Err(e) => error!(job_id = %job.id, error = %e, "job execution failed"),
            }
            // Advance even after a failure: one broken sensor must not pin
            // its own schedule or stall anyone else's.
            job.next_run = Some(upcoming);
        }

        sink.tick_complete();
    }
}

/// Acquire, work, release — release runs on success, empty result and
/// worker error alike. A failed acquire has nothing to release.
fn run_scoped(
    worker: &mut dyn Worker,
    last_values: &LastValues,
) -> Result<Option<Reading>, WorkerError> {
    worker.acquire()?;
    let result = worker.do_work(last_values);
    worker.release();
    result
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
