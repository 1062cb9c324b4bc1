use super::CommandHandler;
use crate::notify::{Messenger, TelegramClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause after a failed poll before trying again.
const POLL_BACKOFF: Duration = Duration::from_secs(5);

/// Long-poll the bot for messages and dispatch commands until the process exits.
///
/// Each command runs on its own task so a slow report never blocks polling,
/// and a panicking handler is logged rather than taking the listener down.
pub async fn listen(client: Arc<TelegramClient>, handler: Arc<CommandHandler>, poll_timeout_secs: u64) {
    info!("Command listener started");
    let mut offset: Option<i64> = None;

    loop {
        let updates = match client.get_updates(offset, poll_timeout_secs).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Polling for commands failed");
                tokio::time::sleep(POLL_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            let Some(text) = message.text else {
                continue;
            };

            let chat_id = message.chat.id.to_string();
            debug!(%chat_id, "Message received");

            let handler = handler.clone();
            tokio::spawn(async move {
                let task = tokio::spawn(async move {
                    handler.handle(&chat_id, &text).await;
                });
                if let Err(e) = task.await {
                    error!("Command handler crashed: {}", e);
                }
            });
        }
    }
}

/// Setup helper: reply to every incoming message with its chat id.
///
/// Used once by the operator to discover the value for `TELEGRAM_CHAT_ID`.
pub async fn echo_chat_ids(client: &TelegramClient, poll_timeout_secs: u64) {
    let mut offset: Option<i64> = None;

    loop {
        let updates = match client.get_updates(offset, poll_timeout_secs).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Polling for messages failed");
                tokio::time::sleep(POLL_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };

            let chat = &message.chat;
            let title = chat
                .title
                .clone()
                .or_else(|| chat.first_name.clone())
                .unwrap_or_else(|| "private chat".to_string());
            let sender = message
                .from
                .as_ref()
                .map(|u| match &u.last_name {
                    Some(last) => format!("{} {}", u.first_name, last),
                    None => u.first_name.clone(),
                })
                .unwrap_or_default();

            println!(
                "chat_id={} type={} title={:?} from={:?} text={:?}",
                chat.id,
                chat.kind,
                title,
                sender,
                message.text.as_deref().unwrap_or("")
            );

            let reply = format!(
                "✅ Your chat ID: <code>{}</code>\n\nSet it as <code>TELEGRAM_CHAT_ID</code> to receive reports.",
                chat.id
            );
            if let Err(e) = client.send_message(&chat.id.to_string(), &reply).await {
                warn!(chat_id = chat.id, error = %e, "Failed to reply with chat id");
            }
        }
    }
}
