use crate::probes::{CheckOutcome, Status};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One complete pass over the registry.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub timestamp: DateTime<Utc>,
    /// In registry order.
    pub outcomes: Vec<CheckOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub healthy: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.healthy + self.warnings + self.errors
    }
}

impl Summary {
    pub fn new(timestamp: DateTime<Utc>, outcomes: Vec<CheckOutcome>) -> Self {
        Self { timestamp, outcomes }
    }

    pub fn healthy(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.with_status(Status::Healthy)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.with_status(Status::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.with_status(Status::Error)
    }

    fn with_status(&self, status: Status) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(move |o| o.status() == status)
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for outcome in &self.outcomes {
            match outcome.status() {
                Status::Healthy => counts.healthy += 1,
                Status::Warning => counts.warnings += 1,
                Status::Error => counts.errors += 1,
            }
        }
        counts
    }

    /// True when at least one target is in warning or error.
    pub fn has_incidents(&self) -> bool {
        self.outcomes.iter().any(|o| o.status() != Status::Healthy)
    }
}
