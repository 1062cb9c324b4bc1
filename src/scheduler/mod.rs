//! Recurring report triggers.

pub mod cron;
pub mod engine;

pub use self::cron::{Cadence, ScheduleDescription, ScheduleSpec, Trigger, TriggerKind};
pub use self::engine::{spawn_triggers, Engine};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
}
