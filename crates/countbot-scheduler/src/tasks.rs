//! Scheduled jobs built from configuration.

use countbot_core::config::ScheduleConfig;
use countbot_core::error::Result;

use crate::cron::CronExpr;

/// What a job does when it fires. Jobs due in the same minute run in
/// this order: reset, repair, report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobKind {
    /// Seed zeroed counters for the new day.
    DayReset,
    /// Snapshot diff repair pass.
    Repair,
    /// Build and broadcast the daily summary.
    Report,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::DayReset => write!(f, "day-reset"),
            JobKind::Repair => write!(f, "repair"),
            JobKind::Report => write!(f, "report"),
        }
    }
}

/// One cron-triggered job.
#[derive(Debug, Clone)]
pub struct Job {
    pub kind: JobKind,
    pub schedule: CronExpr,
}

impl Job {
    pub fn new(kind: JobKind, expr: &str) -> Result<Self> {
        Ok(Self { kind, schedule: CronExpr::parse(expr)? })
    }
}

/// Parse every configured expression. Any malformed expression is a
/// start-up error.
pub fn jobs_from_config(config: &ScheduleConfig) -> Result<Vec<Job>> {
    let mut jobs = vec![Job::new(JobKind::DayReset, &config.reset_time)?];
    if let Some(expr) = &config.repair_time {
        jobs.push(Job::new(JobKind::Repair, expr)?);
    }
    for expr in &config.report_times {
        jobs.push(Job::new(JobKind::Report, expr)?);
    }
    Ok(jobs)
}
