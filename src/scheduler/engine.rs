use crate::monitor::{Monitor, Summary};
use crate::notify::Notifier;
use crate::report::{self, ReportZone};
use crate::scheduler::{ScheduleSpec, Trigger, TriggerKind};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Runs a check cycle and applies a trigger's send policy to the result.
pub struct Engine {
    monitor: Arc<Monitor>,
    notifier: Notifier,
    zone: ReportZone,
}

impl Engine {
    pub fn new(monitor: Arc<Monitor>, notifier: Notifier, zone: ReportZone) -> Self {
        Self {
            monitor,
            notifier,
            zone,
        }
    }

    /// One cycle: aggregate, render per policy, push if there is anything to say.
    pub async fn run_trigger(&self, kind: TriggerKind) -> Summary {
        let summary = self.monitor.run_cycle(&kind.to_string()).await;

        match report::render(&summary, &self.zone, kind.policy()) {
            Some(message) => {
                self.notifier.push(&message).await;
            }
            None => info!(trigger = %kind, "All targets healthy, nothing to report"),
        }
        summary
    }

    /// Announce the configuration, then run one incident cycle right away.
    pub async fn startup(&self, spec: &ScheduleSpec) {
        let message = report::startup_message(self.monitor.targets(), &spec.describe());
        self.notifier.push(&message).await;
        self.run_trigger(TriggerKind::IncidentCheck).await;
    }
}

/// Start one background loop per configured trigger.
pub fn spawn_triggers(engine: Arc<Engine>, spec: &ScheduleSpec) -> Vec<JoinHandle<()>> {
    spec.triggers()
        .into_iter()
        .map(|trigger| {
            let engine = engine.clone();
            let zone = spec.zone.clone();
            tokio::spawn(run_trigger_loop(engine, trigger, zone))
        })
        .collect()
}

async fn run_trigger_loop(engine: Arc<Engine>, trigger: Trigger, zone: ReportZone) {
    info!(trigger = %trigger.kind, cron = %trigger.cadence.expression(), "Trigger registered");

    // Fire times are computed from the later of "now" and the last fire so an
    // early timer wake-up never repeats the same slot.
    let mut cursor = zone.now();
    loop {
        let now = zone.now();
        if now > cursor {
            cursor = now;
        }

        let Some(next) = trigger.cadence.next_after(&cursor) else {
            warn!(trigger = %trigger.kind, "Cron expression has no upcoming fire time, stopping trigger");
            return;
        };

        let wait = (next.with_timezone(&Utc) - Utc::now())
            .to_std()
            .unwrap_or_default();
        info!(trigger = %trigger.kind, next = %next.to_rfc3339(), "Next run scheduled");
        tokio::time::sleep(wait).await;
        cursor = next;

        let engine = engine.clone();
        let kind = trigger.kind;
        // The cycle runs detached so a slow pass never delays the next slot.
        tokio::spawn(async move {
            let handle = tokio::spawn(async move {
                engine.run_trigger(kind).await;
            });
            if let Err(e) = handle.await {
                error!(trigger = %kind, "Scheduled cycle aborted: {}", e);
            }
        });
    }
}
