use crate::report::ReportZone;
use crate::scheduler::ScheduleDescription;
use crate::targets::Target;
use std::sync::Arc;
use std::time::Instant;

/// Read-only process facts served by the status endpoint.
#[derive(Clone)]
pub struct AppState {
    pub service: String,
    pub started_at: Instant,
    pub targets: Arc<[Target]>,
    pub schedule: ScheduleDescription,
    pub zone: ReportZone,
}

impl AppState {
    pub fn new(
        service: impl Into<String>,
        targets: &[Target],
        schedule: ScheduleDescription,
        zone: ReportZone,
    ) -> Self {
        Self {
            service: service.into(),
            started_at: Instant::now(),
            targets: targets.into(),
            schedule,
            zone,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
