//! The aggregation pass: probe every target in order and summarize.

mod summary;

pub use self::summary::{Counts, Summary};

use crate::probes::Probe;
use crate::targets::Target;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, Instrument};

/// Default pause between two consecutive probes.
pub const DEFAULT_SPACING: Duration = Duration::from_secs(1);

/// Runs the probe over the whole registry.
///
/// At most one pass is in flight at a time: overlapping callers (a scheduled
/// trigger firing while an on-demand report runs) queue on an internal lock
/// and each still gets its own fresh summary.
pub struct Monitor {
    targets: Arc<[Target]>,
    probe: Arc<dyn Probe>,
    spacing: Duration,
    in_flight: Mutex<()>,
}

impl Monitor {
    pub fn new(targets: Vec<Target>, probe: Arc<dyn Probe>) -> Self {
        Self {
            targets: targets.into(),
            probe,
            spacing: DEFAULT_SPACING,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Probe every target sequentially, in registry order.
    pub async fn run_cycle(&self, trigger: &str) -> Summary {
        let cycle_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("cycle", %cycle_id, %trigger);
        self.run_serialized().instrument(span).await
    }

    async fn run_serialized(&self) -> Summary {
        let _guard = self.in_flight.lock().await;
        info!(targets = self.targets.len(), "Starting check cycle");

        let mut outcomes = Vec::with_capacity(self.targets.len());
        for (i, target) in self.targets.iter().enumerate() {
            if i > 0 && !self.spacing.is_zero() {
                tokio::time::sleep(self.spacing).await;
            }
            let outcome = self.probe.check(target).await;
            outcome.log();
            outcomes.push(outcome);
        }

        let summary = Summary::new(Utc::now(), outcomes);
        let counts = summary.counts();
        info!(
            healthy = counts.healthy,
            warnings = counts.warnings,
            errors = counts.errors,
            "Check cycle complete"
        );
        summary
    }
}
