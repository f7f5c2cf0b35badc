//! # CountBot Scheduler
//!
//! Wall-clock triggers for the daily reports and the day reset.
//!
//! ## Architecture
//! ```text
//! SchedulerEngine (tokio sleep until next cron minute)
//!   ├── DayReset: "0 0 * * *"   → seed zeroed counters
//!   ├── Repair:   optional      → snapshot gap filling
//!   └── Report:   "0 8 * * *", "0 13 * * *", "0 18 * * *", "59 23 * * *"
//!                  → JobHandler
//! ```

pub mod cron;
pub mod engine;
pub mod tasks;

pub use cron::CronExpr;
pub use engine::{JobHandler, SchedulerEngine};
pub use tasks::{jobs_from_config, Job, JobKind};
