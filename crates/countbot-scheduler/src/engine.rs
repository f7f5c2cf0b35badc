//! Scheduler engine: sleeps until the next cron minute and fires jobs.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use countbot_core::config::ScheduleConfig;
use countbot_core::error::Result;
use std::sync::Arc;

use crate::tasks::{jobs_from_config, Job, JobKind};

/// Receiver of fired jobs.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run_job(&self, kind: JobKind, fired_at: DateTime<Local>) -> Result<()>;
}

pub struct SchedulerEngine {
    jobs: Vec<Job>,
}

impl SchedulerEngine {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Ok(Self::new(jobs_from_config(config)?))
    }

    /// Earliest fire time after `now` and the distinct job kinds due then,
    /// in execution order.
    pub fn next_due(&self, now: DateTime<Local>) -> Option<(DateTime<Local>, Vec<JobKind>)> {
        let upcoming: Vec<(DateTime<Local>, JobKind)> = self
            .jobs
            .iter()
            .filter_map(|job| job.schedule.next_after(now).map(|at| (at, job.kind)))
            .collect();
        let at = upcoming.iter().map(|(at, _)| *at).min()?;
        let mut kinds: Vec<JobKind> = upcoming
            .into_iter()
            .filter(|(t, _)| *t == at)
            .map(|(_, kind)| kind)
            .collect();
        kinds.sort();
        kinds.dedup();
        Some((at, kinds))
    }

    /// Run the due jobs one after another. A failing job is logged and
    /// does not stop the others.
    pub async fn fire(at: DateTime<Local>, kinds: &[JobKind], handler: &dyn JobHandler) {
        for kind in kinds {
            tracing::info!("⏰ Running scheduled {kind} ({})", at.format("%d/%m/%Y %H:%M"));
            if let Err(e) = handler.run_job(*kind, at).await {
                tracing::error!("Scheduled {kind} failed: {e}");
            }
        }
    }

    /// Fire jobs forever. Each batch runs in its own task, so a job that
    /// never finishes cannot hold back later ones.
    pub async fn run(&self, handler: Arc<dyn JobHandler>) {
        self.run_with_clock(handler, Local::now).await;
    }

    async fn run_with_clock<C>(&self, handler: Arc<dyn JobHandler>, clock: C)
    where
        C: Fn() -> DateTime<Local>,
    {
        if self.jobs.is_empty() {
            tracing::warn!("Scheduler has no jobs");
            return;
        }
        for job in &self.jobs {
            tracing::info!("📅 Scheduled {} at '{}'", job.kind, job.schedule);
        }

        // Next fire times chain from the previous one, so minutes that pass
        // while the clock jumps are fired late instead of dropped.
        let mut after = clock();
        loop {
            let Some((at, kinds)) = self.next_due(after) else {
                tracing::warn!("No future fire time for any job, scheduler stopping");
                return;
            };

            // Re-check after waking in case the wall clock moved.
            loop {
                let now = clock();
                if now >= at {
                    if now - at >= chrono::Duration::minutes(1) {
                        tracing::warn!("Firing {} late (now {})", at.format("%d/%m/%Y %H:%M"), now.format("%H:%M"));
                    }
                    break;
                }
                let wait = (at - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
            }

            let handler = handler.clone();
            tokio::spawn(async move { Self::fire(at, &kinds, handler.as_ref()).await });
            after = at;
        }
    }
}
