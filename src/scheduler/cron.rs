use chrono::{DateTime, Duration, TimeZone};
use cron::Schedule as CronSchedule;
use serde::Serialize;
use std::str::FromStr;

use super::ScheduleError;
use crate::report::{ReportPolicy, ReportZone};

/// A recurring cadence parsed from a cron expression.
///
/// Operators write the classic 5-field form (`*/5 * * * *`); the `cron` crate
/// wants a leading seconds field, so 5-field input gets `0` prepended. In that
/// form numeric weekdays follow crontab (0 or 7 is Sunday) and are rewritten
/// to day names, since the `cron` crate counts from 1 = Sunday.
#[derive(Debug, Clone)]
pub struct Cadence {
    expr: String,
    schedule: CronSchedule,
}

impl Cadence {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let expr = expr.trim();
        let invalid = |reason: String| ScheduleError::InvalidCron {
            expr: expr.to_string(),
            reason,
        };
        let normalized = normalize(expr).map_err(invalid)?;
        let schedule = CronSchedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            expr: expr.to_string(),
            schedule,
        })
    }

    /// The expression as the operator wrote it.
    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// First fire time strictly after `after`, evaluated in `after`'s zone.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.schedule.after(after).next()
    }

    /// All fire times in `(from, from + hours]`. The window is capped at
    /// [`MAX_PREVIEW_HOURS`].
    pub fn upcoming_within<Tz: TimeZone>(&self, from: &DateTime<Tz>, hours: u64) -> Vec<DateTime<Tz>> {
        let end = from.clone() + Duration::hours(hours.min(MAX_PREVIEW_HOURS) as i64);
        self.schedule.after(from).take_while(|t| *t <= end).collect()
    }
}

/// Longest window a preview covers (one leap year).
pub const MAX_PREVIEW_HOURS: u64 = 366 * 24;

const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

fn normalize(expr: &str) -> Result<String, String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Ok(expr.to_string());
    }
    let weekdays = crontab_weekdays(fields[4])?;
    Ok(format!("0 {} {}", fields[..4].join(" "), weekdays))
}

/// Rewrite a crontab day-of-week field into day names.
///
/// `*`, `*/n` and name-based parts are left alone: stepping from Sunday
/// selects the same days under both numberings.
fn crontab_weekdays(field: &str) -> Result<String, String> {
    let mut parts = Vec::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (part, None),
        };
        if range == "*" || range.chars().any(|c| c.is_ascii_alphabetic()) {
            parts.push(part.to_string());
            continue;
        }

        let bad = || format!("invalid day-of-week `{}`", part);
        let day = |s: &str| s.parse::<usize>().ok().filter(|d| *d <= 7).ok_or_else(bad);
        let (first, last) = match range.split_once('-') {
            Some((first, last)) => (day(first)?, day(last)?),
            None if step.is_some() => (day(range)?, 7),
            None => (day(range)?, day(range)?),
        };
        let step = match step {
            Some(step) => step.parse::<usize>().ok().filter(|s| *s > 0).ok_or_else(bad)?,
            None => 1,
        };
        if first > last {
            return Err(bad());
        }

        for d in (first..=last).step_by(step) {
            let name = WEEKDAY_NAMES[d % 7];
            if !parts.iter().any(|p| p == name) {
                parts.push(name.to_string());
            }
        }
    }
    Ok(parts.join(","))
}

/// The two kinds of recurring job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Daily summary of every target, sent unconditionally.
    FullReport,
    /// Frequent check that only speaks up when something is wrong.
    IncidentCheck,
}

impl TriggerKind {
    pub fn policy(&self) -> ReportPolicy {
        match self {
            TriggerKind::FullReport => ReportPolicy::Always,
            TriggerKind::IncidentCheck => ReportPolicy::OnIncident,
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerKind::FullReport => write!(f, "full-report"),
            TriggerKind::IncidentCheck => write!(f, "incident-check"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub cadence: Cadence,
}

/// Cadences for the deployment. Either trigger may be absent.
#[derive(Debug, Clone)]
pub struct ScheduleSpec {
    pub full_report: Option<Cadence>,
    pub incident_check: Option<Cadence>,
    pub zone: ReportZone,
}

/// Human-facing view of a [`ScheduleSpec`], shared by messages and the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDescription {
    pub full_report: String,
    pub incident_check: String,
    pub timezone: String,
}

impl ScheduleSpec {
    /// Build from raw expressions. Empty or `off` disables a trigger.
    pub fn parse(full_report: &str, incident_check: &str, zone: ReportZone) -> Result<Self, ScheduleError> {
        Ok(Self {
            full_report: parse_optional(full_report)?,
            incident_check: parse_optional(incident_check)?,
            zone,
        })
    }

    pub fn triggers(&self) -> Vec<Trigger> {
        let mut triggers = Vec::new();
        if let Some(cadence) = &self.full_report {
            triggers.push(Trigger {
                kind: TriggerKind::FullReport,
                cadence: cadence.clone(),
            });
        }
        if let Some(cadence) = &self.incident_check {
            triggers.push(Trigger {
                kind: TriggerKind::IncidentCheck,
                cadence: cadence.clone(),
            });
        }
        triggers
    }

    pub fn describe(&self) -> ScheduleDescription {
        let show = |c: &Option<Cadence>| {
            c.as_ref()
                .map(|c| c.expression().to_string())
                .unwrap_or_else(|| "disabled".to_string())
        };
        ScheduleDescription {
            full_report: show(&self.full_report),
            incident_check: show(&self.incident_check),
            timezone: self.zone.to_string(),
        }
    }

    /// Upcoming fire times across all triggers for the next `hours`, sorted.
    pub fn preview(&self, from: &DateTime<chrono::Utc>, hours: u64) -> Vec<(DateTime<chrono::FixedOffset>, TriggerKind)> {
        let local = from.with_timezone(&self.zone.offset);
        let mut preview: Vec<_> = self
            .triggers()
            .into_iter()
            .flat_map(|t| {
                t.cadence
                    .upcoming_within(&local, hours)
                    .into_iter()
                    .map(move |at| (at, t.kind))
            })
            .collect();
        preview.sort_by(|a, b| a.0.cmp(&b.0));
        preview
    }
}

fn parse_optional(expr: &str) -> Result<Option<Cadence>, ScheduleError> {
    let expr = expr.trim();
    if expr.is_empty() || expr.eq_ignore_ascii_case("off") {
        Ok(None)
    } else {
        Cadence::parse(expr).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Utc, Weekday};

    fn msk() -> ReportZone {
        ReportZone::parse("+03:00", "MSK").unwrap()
    }

    #[test]
    fn test_five_field_expressions_are_accepted() {
        let cadence = Cadence::parse("*/5 * * * *").unwrap();
        assert_eq!(cadence.expression(), "*/5 * * * *");
    }

    #[test]
    fn test_six_field_expressions_pass_through() {
        assert!(Cadence::parse("30 0 9 * * *").is_ok());
    }

    #[test]
    fn test_invalid_expression_is_rejected() {
        let err = Cadence::parse("every tuesday").unwrap_err();
        assert!(err.to_string().contains("every tuesday"));
    }

    fn weekday_after(expr: &str, after: DateTime<Utc>) -> Weekday {
        Cadence::parse(expr).unwrap().next_after(&after).unwrap().weekday()
    }

    #[test]
    fn test_crontab_weekday_numbering() {
        // Saturday 2026-10-24, 10:00 UTC
        let saturday = Utc.with_ymd_and_hms(2026, 10, 24, 10, 0, 0).unwrap();
        assert_eq!(weekday_after("0 9 * * 1-5", saturday), Weekday::Mon);
        assert_eq!(weekday_after("0 9 * * 0", saturday), Weekday::Sun);
        assert_eq!(weekday_after("0 9 * * 7", saturday), Weekday::Sun);
        assert_eq!(weekday_after("0 9 * * 1,3", saturday), Weekday::Mon);
        assert_eq!(weekday_after("0 9 * * MON-FRI", saturday), Weekday::Mon);
        assert_eq!(weekday_after("0 9 * * 6", saturday), Weekday::Sat);
    }

    #[test]
    fn test_weekday_range_through_sunday() {
        let cadence = Cadence::parse("0 9 * * 5-7").unwrap();
        // Monday 2026-10-19
        let mut at = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let mut days = Vec::new();
        for _ in 0..3 {
            at = cadence.next_after(&at).unwrap();
            days.push(at.weekday());
        }
        assert_eq!(days, [Weekday::Fri, Weekday::Sat, Weekday::Sun]);
    }

    #[test]
    fn test_weekday_steps() {
        assert_eq!(crontab_weekdays("1-5/2").unwrap(), "MON,WED,FRI");
        assert_eq!(crontab_weekdays("*/2").unwrap(), "*/2");
        assert_eq!(crontab_weekdays("0,7").unwrap(), "SUN");
    }

    #[test]
    fn test_bad_weekday_is_rejected() {
        for expr in ["0 9 * * 8", "0 9 * * 5-1", "0 9 * * 1/0", "0 9 * * 3-"] {
            assert!(Cadence::parse(expr).is_err(), "{} should be rejected", expr);
        }
        let err = Cadence::parse("0 9 * * 8").unwrap_err();
        assert!(err.to_string().contains("0 9 * * 8"));
    }

    #[test]
    fn test_preview_window_is_capped() {
        let cadence = Cadence::parse("0 9 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let runs = cadence.upcoming_within(&from, u64::MAX);
        assert_eq!(runs.len(), 366);
    }

    #[test]
    fn test_daily_fires_in_report_zone() {
        let cadence = Cadence::parse("0 9 * * *").unwrap();
        // 07:00 UTC is 10:00 MSK, so the next 09:00 MSK is tomorrow at 06:00 UTC.
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap().with_timezone(&msk().offset);
        let next = cadence.next_after(&now).unwrap();
        assert_eq!(next.hour(), 9);
        assert_eq!(next.with_timezone(&Utc), Utc.with_ymd_and_hms(2026, 10, 20, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_next_after_is_strict() {
        let cadence = Cadence::parse("0 * * * *").unwrap();
        let on_the_hour = Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap();
        let next = cadence.next_after(&on_the_hour).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_off_disables_trigger() {
        let spec = ScheduleSpec::parse("off", "0 * * * *", msk()).unwrap();
        let triggers = spec.triggers();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].kind, TriggerKind::IncidentCheck);
        assert_eq!(spec.describe().full_report, "disabled");
    }

    #[test]
    fn test_trigger_policies() {
        assert_eq!(TriggerKind::FullReport.policy(), ReportPolicy::Always);
        assert_eq!(TriggerKind::IncidentCheck.policy(), ReportPolicy::OnIncident);
    }

    #[test]
    fn test_preview_merges_and_sorts() {
        let spec = ScheduleSpec::parse("0 9 * * *", "0 * * * *", msk()).unwrap();
        let from = Utc.with_ymd_and_hms(2026, 10, 19, 5, 30, 0).unwrap(); // 08:30 MSK
        let preview = spec.preview(&from, 2);
        let kinds: Vec<_> = preview.iter().map(|(_, k)| *k).collect();
        // 09:00 hourly + daily, 10:00 hourly
        assert_eq!(preview.len(), 3);
        assert!(kinds.contains(&TriggerKind::FullReport));
        assert!(preview.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
