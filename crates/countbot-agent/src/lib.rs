//! # CountBot Agent
//! The bot itself: turns membership events into counter updates and
//! notifications, builds and delivers reports, answers chat commands and
//! keeps the group registry in sync.
//!
//! Storage and transport come in as trait objects, so the same [`CountBot`]
//! runs against SQLite and the HTTP bridge in production and against
//! in-memory fakes in tests.

pub mod commands;
pub mod events;
pub mod repair;
pub mod report;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use countbot_channels::{DeliveryEngine, MetadataFetcher, RetryPolicy};
use countbot_core::config::CountBotConfig;
use countbot_core::error::Result;
use countbot_core::traits::{CounterStore, GroupRegistry, GroupTransport};
use countbot_core::types::Day;
use countbot_scheduler::{JobHandler, JobKind};
use std::sync::Arc;

pub use commands::Command;
pub use events::EventOutcome;
pub use repair::RepairSummary;
pub use report::{GroupLine, Report};

/// Daily membership counter and report engine.
pub struct CountBot {
    config: CountBotConfig,
    registry: Arc<dyn GroupRegistry>,
    counters: Arc<dyn CounterStore>,
    delivery: DeliveryEngine,
    metadata: MetadataFetcher,
}

impl CountBot {
    pub fn new(
        config: CountBotConfig,
        registry: Arc<dyn GroupRegistry>,
        counters: Arc<dyn CounterStore>,
        transport: Arc<dyn GroupTransport>,
    ) -> Self {
        Self {
            config,
            registry,
            counters,
            delivery: DeliveryEngine::new(transport.clone()),
            metadata: MetadataFetcher::new(transport),
        }
    }

    pub fn config(&self) -> &CountBotConfig {
        &self.config
    }

    pub fn counters(&self) -> &Arc<dyn CounterStore> {
        &self.counters
    }

    pub fn transport(&self) -> &Arc<dyn GroupTransport> {
        self.delivery.transport()
    }

    /// Seed zeroed counters for every registry group on `day`.
    pub fn reset_day(&self, day: Day) -> Result<usize> {
        self.counters.initialize_day(day)
    }

    /// Scheduled and broadcast work: retry until it lands.
    pub fn background_policy(&self) -> RetryPolicy {
        RetryPolicy::broadcast(&self.config.retry)
    }

    /// Bounded metadata policy for commands and repair scans.
    pub fn lookup_policy(&self) -> RetryPolicy {
        RetryPolicy::metadata(&self.config.retry)
    }

    pub fn interactive_policy(&self) -> RetryPolicy {
        RetryPolicy::interactive(&self.config.retry)
    }
}

#[async_trait]
impl JobHandler for CountBot {
    async fn run_job(&self, kind: JobKind, fired_at: DateTime<Local>) -> Result<()> {
        let day = Day::from(fired_at.date_naive());
        match kind {
            JobKind::DayReset => {
                let seeded = self.reset_day(day)?;
                tracing::info!("Day reset for {day}: {seeded} counters seeded");
                if self.config.schedule.repair_time.is_some() {
                    let captured = self.baseline_day(day).await?;
                    tracing::info!("Member snapshots for {day}: {captured} groups");
                }
            }
            JobKind::Repair => {
                let summary = self.repair_day(day).await?;
                tracing::info!("Repair for {day}: {summary}");
            }
            JobKind::Report => {
                let delivered = self.broadcast_report(day).await?;
                tracing::info!("Report for {day} delivered to {delivered} groups");
            }
        }
        Ok(())
    }
}
