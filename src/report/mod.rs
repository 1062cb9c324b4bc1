//! Rendering of check summaries into Telegram HTML messages.
//!
//! Everything here is a pure function of its inputs: the caller decides
//! whether and where a rendered message is sent.

mod zone;

pub use self::zone::{ReportZone, ZoneError};

use crate::monitor::Summary;
use crate::probes::{CheckOutcome, Verdict};
use crate::scheduler::ScheduleDescription;
use crate::targets::Target;

/// Reply sent to any chat that is not the authorized recipient.
pub const ACCESS_DENIED: &str = "⛔ <b>Access denied</b>\n\nThis bot only answers its configured operator.";

/// Acknowledgement sent before an on-demand report is built.
pub const REPORT_ACK: &str = "⏳ Building report, checking all targets...";

/// Which message a cycle produces once its summary is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPolicy {
    /// Always send the full report, even when everything is healthy.
    Always,
    /// Send the incident-only report, and only when something is wrong.
    OnIncident,
}

/// Render `summary` according to `policy`. `None` means nothing should be sent.
pub fn render(summary: &Summary, zone: &ReportZone, policy: ReportPolicy) -> Option<String> {
    match policy {
        ReportPolicy::Always => Some(full_report(summary, zone)),
        ReportPolicy::OnIncident => incident_report(summary, zone),
    }
}

/// Incident-only report: errors and warnings, or `None` if there are neither.
pub fn incident_report(summary: &Summary, zone: &ReportZone) -> Option<String> {
    if !summary.has_incidents() {
        return None;
    }

    let mut message = String::from("🚨 <b>Problems detected</b>\n\n");
    push_problem_sections(&mut message, summary);
    message.push_str(&format!("🕐 Checked at: {}", zone.format(&summary.timestamp)));
    Some(message)
}

/// Full report with counts and every target, sent regardless of health.
pub fn full_report(summary: &Summary, zone: &ReportZone) -> String {
    let counts = summary.counts();
    let mut message = String::from("📊 <b>Daily report</b>\n\n");
    message.push_str(&format!(
        "✅ Healthy: {} | ⚠️ Warnings: {} | ❌ Errors: {}\n\n",
        counts.healthy, counts.warnings, counts.errors
    ));

    push_problem_sections(&mut message, summary);

    let healthy: Vec<&CheckOutcome> = summary.healthy().collect();
    if !healthy.is_empty() {
        message.push_str("✅ <b>Healthy:</b>\n");
        for outcome in healthy {
            message.push_str(&list_line(outcome));
        }
        message.push('\n');
    }

    message.push_str(&format!("🕐 Checked at: {}\n", zone.format(&summary.timestamp)));
    message.push_str(&format!("🤖 Total targets: {}", counts.total()));
    message
}

fn push_problem_sections(message: &mut String, summary: &Summary) {
    let errors: Vec<&CheckOutcome> = summary.errors().collect();
    if !errors.is_empty() {
        message.push_str("❌ <b>Errors:</b>\n");
        for outcome in errors {
            message.push_str(&list_line(outcome));
        }
        message.push('\n');
    }

    let warnings: Vec<&CheckOutcome> = summary.warnings().collect();
    if !warnings.is_empty() {
        message.push_str("⚠️ <b>Warnings:</b>\n");
        for outcome in warnings {
            message.push_str(&list_line(outcome));
        }
        message.push('\n');
    }
}

fn list_line(outcome: &CheckOutcome) -> String {
    let name = escape_html(&outcome.target_name);
    match &outcome.verdict {
        Verdict::Healthy { .. } => format!("• <b>{}</b>\n", name),
        Verdict::Warning { http_status } => format!("• <b>{}</b>: HTTP {}\n", name, http_status),
        Verdict::Error { message, .. } => format!("• <b>{}</b>: {}\n", name, escape_html(message)),
    }
}

/// Message pushed once when the daemon starts.
pub fn startup_message(targets: &[Target], schedule: &ScheduleDescription) -> String {
    let mut message = String::from("🧪 <b>Monitoring started</b>\n\n");
    message.push_str(&format!("🤖 Targets ({}):\n", targets.len()));
    for target in targets {
        message.push_str(&format!("• {}\n", escape_html(&target.name)));
    }
    message.push('\n');
    push_schedule(&mut message, schedule);
    message
}

/// Static capability summary for the `help` command.
pub fn help_message(schedule: &ScheduleDescription) -> String {
    let mut message = String::from("ℹ️ <b>Bot monitor</b>\n\n");
    message.push_str("Commands:\n");
    message.push_str("• <code>/report</code> - check all targets now and send the full report\n");
    message.push_str("• <code>/help</code> - show this message\n\n");
    push_schedule(&mut message, schedule);
    message
}

fn push_schedule(message: &mut String, schedule: &ScheduleDescription) {
    message.push_str(&format!(
        "⏰ Incident check: <code>{}</code>\n",
        escape_html(&schedule.incident_check)
    ));
    message.push_str(&format!(
        "📊 Full report: <code>{}</code>\n",
        escape_html(&schedule.full_report)
    ));
    message.push_str(&format!("🌍 Time zone: {}", escape_html(&schedule.timezone)));
}

/// Reply sent when an on-demand command fails part way through.
pub fn command_failure(reason: &str) -> String {
    format!("❌ <b>Failed to build report</b>\n\n{}", escape_html(reason))
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Drop markup so a rendered message can be printed to a terminal.
pub fn strip_markup(html: &str) -> String {
    let mut plain = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => plain.push(c),
            _ => {}
        }
    }
    plain
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
