//! Operator commands received over the messaging transport.

mod listener;

pub use self::listener::{echo_chat_ids, listen};

use crate::monitor::Monitor;
use crate::notify::{Messenger, NotifyError};
use crate::report::{self, ReportZone};
use crate::scheduler::ScheduleDescription;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Report,
    Help,
}

impl Command {
    /// Recognize `/report`, `report`, `/report@SomeBot` and the same for help.
    /// Anything else is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let word = word.strip_prefix('/').unwrap_or(word);
        let word = word.split('@').next().unwrap_or(word);
        match word.to_ascii_lowercase().as_str() {
            "report" => Some(Command::Report),
            "help" => Some(Command::Help),
            _ => None,
        }
    }
}

/// Authorizes and executes operator commands.
pub struct CommandHandler {
    monitor: Arc<Monitor>,
    messenger: Arc<dyn Messenger>,
    authorized: Option<String>,
    zone: ReportZone,
    schedule: ScheduleDescription,
}

impl CommandHandler {
    pub fn new(
        monitor: Arc<Monitor>,
        messenger: Arc<dyn Messenger>,
        authorized: Option<String>,
        zone: ReportZone,
        schedule: ScheduleDescription,
    ) -> Self {
        Self {
            monitor,
            messenger,
            authorized: authorized.map(|id| id.trim().to_string()),
            zone,
            schedule,
        }
    }

    fn is_authorized(&self, chat_id: &str) -> bool {
        self.authorized.as_deref() == Some(chat_id.trim())
    }

    /// Handle one incoming text. Returns the command that was recognized, if any.
    ///
    /// Unauthorized senders get the same denial for every command and nothing
    /// else happens. Failures are reported back to the sender, never raised.
    pub async fn handle(&self, chat_id: &str, text: &str) -> Option<Command> {
        let command = Command::parse(text)?;

        if !self.is_authorized(chat_id) {
            warn!(%chat_id, ?command, "Rejected command from unauthorized chat");
            self.reply(chat_id, report::ACCESS_DENIED).await;
            return Some(command);
        }

        info!(%chat_id, ?command, "Executing command");
        let result = match command {
            Command::Report => self.send_report(chat_id).await,
            Command::Help => {
                self.messenger
                    .send_message(chat_id, &report::help_message(&self.schedule))
                    .await
            }
        };

        if let Err(e) = result {
            warn!(%chat_id, ?command, error = %e, "Command failed");
            self.reply(chat_id, &report::command_failure(&e.to_string())).await;
        }
        Some(command)
    }

    async fn send_report(&self, chat_id: &str) -> Result<(), NotifyError> {
        self.reply(chat_id, report::REPORT_ACK).await;
        let summary = self.monitor.run_cycle("command").await;
        let message = report::full_report(&summary, &self.zone);
        self.messenger.send_message(chat_id, &message).await
    }

    async fn reply(&self, chat_id: &str, html: &str) {
        if let Err(e) = self.messenger.send_message(chat_id, html).await {
            warn!(%chat_id, error = %e, "Failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::{CheckOutcome, Probe};
    use crate::targets::Target;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
        fail_after: Option<usize>,
    }

    #[async_trait::async_trait]
    impl Messenger for Recorder {
        async fn send_message(&self, chat_id: &str, html: &str) -> Result<(), NotifyError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push((chat_id.to_string(), html.to_string()));
            match self.fail_after {
                Some(n) if sent.len() == n + 1 => {
                    Err(NotifyError::Api("Bad Request: message is too long".to_string()))
                }
                _ => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct CountingProbe {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Probe for CountingProbe {
        async fn check(&self, target: &Target) -> CheckOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            CheckOutcome::from_http_status(&target.name, 200)
        }
    }

    fn handler(probe: Arc<CountingProbe>, recorder: Arc<Recorder>) -> CommandHandler {
        let monitor = Monitor::new(
            vec![Target::new("A", "http://a"), Target::new("B", "http://b")],
            probe,
        )
        .with_spacing(Duration::ZERO);
        CommandHandler::new(
            Arc::new(monitor),
            recorder,
            Some("42".to_string()),
            ReportZone::default(),
            ScheduleDescription {
                full_report: "0 9 * * *".to_string(),
                incident_check: "0 * * * *".to_string(),
                timezone: "MSK (UTC+03:00)".to_string(),
            },
        )
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/report"), Some(Command::Report));
        assert_eq!(Command::parse("report now please"), Some(Command::Report));
        assert_eq!(Command::parse("/report@WatchBot"), Some(Command::Report));
        assert_eq!(Command::parse("/HELP"), Some(Command::Help));
        assert_eq!(Command::parse("  /help  "), Some(Command::Help));
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("/reports"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[tokio::test]
    async fn test_unauthorized_report_is_denied_without_checks() {
        let probe = Arc::new(CountingProbe::default());
        let recorder = Arc::new(Recorder::default());
        let handler = handler(probe.clone(), recorder.clone());

        assert_eq!(handler.handle("999", "/report").await, Some(Command::Report));

        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], ("999".to_string(), report::ACCESS_DENIED.to_string()));
    }

    #[tokio::test]
    async fn test_unauthorized_help_gets_same_denial() {
        let recorder = Arc::new(Recorder::default());
        let handler = handler(Arc::new(CountingProbe::default()), recorder.clone());

        handler.handle("999", "/help").await;
        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, report::ACCESS_DENIED);
    }

    #[tokio::test]
    async fn test_authorized_report_runs_one_cycle() {
        let probe = Arc::new(CountingProbe::default());
        let recorder = Arc::new(Recorder::default());
        let handler = handler(probe.clone(), recorder.clone());

        handler.handle("42", "/report").await;

        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, report::REPORT_ACK);
        assert!(sent[1].1.contains("Daily report"));
        assert_eq!(sent.iter().filter(|(_, t)| t.contains("Daily report")).count(), 1);
    }

    #[tokio::test]
    async fn test_authorized_help_lists_schedule() {
        let recorder = Arc::new(Recorder::default());
        let handler = handler(Arc::new(CountingProbe::default()), recorder.clone());

        handler.handle("42", "/help").await;
        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("/report"));
        assert!(sent[0].1.contains("0 9 * * *"));
    }

    #[tokio::test]
    async fn test_other_text_is_ignored() {
        let recorder = Arc::new(Recorder::default());
        let handler = handler(Arc::new(CountingProbe::default()), recorder.clone());

        assert_eq!(handler.handle("42", "good morning").await, None);
        assert_eq!(handler.handle("999", "good morning").await, None);
        assert!(recorder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_reported_back() {
        let recorder = Arc::new(Recorder {
            fail_after: Some(1),
            ..Default::default()
        });
        let handler = handler(Arc::new(CountingProbe::default()), recorder.clone());

        handler.handle("42", "/report").await;
        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent[2].1.contains("Failed to build report"));
        assert!(sent[2].1.contains("message is too long"));
    }

    #[tokio::test]
    async fn test_failed_ack_still_runs_cycle_and_reports() {
        let probe = Arc::new(CountingProbe::default());
        let recorder = Arc::new(Recorder {
            fail_after: Some(0),
            ..Default::default()
        });
        let handler = handler(probe.clone(), recorder.clone());

        handler.handle("42", "/report").await;

        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, report::REPORT_ACK);
        assert!(sent[1].1.contains("Daily report"));
        assert!(!sent.iter().any(|(_, t)| t.contains("Failed to build report")));
    }
}
