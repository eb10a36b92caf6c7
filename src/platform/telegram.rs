use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::{error, info, warn};

use crate::classifier::EventClassifier;
use crate::platform::{InboundEvent, NotificationCommand, NotificationSink};

/// Telegram's hard message limit is 4096 chars; keep some headroom.
const MAX_MESSAGE_LEN: usize = 4000;

/// Split long messages for Telegram's message size limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Delivery side of the adapter, shared between the message handler and the
/// scheduled reporter.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn deliver(&self, command: &NotificationCommand) -> Result<()> {
        for chunk in split_message(&command.body, MAX_MESSAGE_LEN) {
            self.bot
                .send_message(ChatId(command.chat_id), chunk)
                .await?;
        }
        Ok(())
    }
}

/// Run the Telegram platform: poll updates, normalize them into events,
/// classify, and deliver whatever commands come back.
pub async fn run(
    classifier: Arc<EventClassifier>,
    sink: Arc<TelegramSink>,
    bot: Bot,
) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![classifier, sink])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    msg: Message,
    classifier: Arc<EventClassifier>,
    sink: Arc<TelegramSink>,
) -> ResponseResult<()> {
    for event in normalize(&msg) {
        let commands = classifier.classify(&event).await;
        for command in &commands {
            // Delivery failures are logged and dropped; the transport never
            // retries and never fails the update.
            if let Err(e) = sink.deliver(command).await {
                error!(
                    "Failed to deliver notification to {}: {:#}",
                    command.chat_id, e
                );
            }
        }
    }

    Ok(())
}

/// Map one Telegram update to zero or more normalized events.
fn normalize(msg: &Message) -> Vec<InboundEvent> {
    // A join update may carry several users at once.
    if let Some(members) = msg.new_chat_members() {
        return members
            .iter()
            .map(|user| InboundEvent::NewMember {
                chat_id: msg.chat.id.0,
                chat_title: chat_title(msg),
                member_id: user.id.0,
                display_name: user.full_name(),
            })
            .collect();
    }

    let Some(user) = msg.from.as_ref() else {
        return Vec::new();
    };
    let Some(text) = msg.text() else {
        return Vec::new();
    };

    if msg.chat.is_private() {
        vec![InboundEvent::PrivateMessage {
            sender_id: user.id.0,
            sender_name: user.full_name(),
            language: user.language_code.clone(),
            text: text.to_string(),
        }]
    } else if msg.chat.is_group() || msg.chat.is_supergroup() {
        vec![InboundEvent::GroupMessage {
            chat_id: msg.chat.id.0,
            chat_title: chat_title(msg),
            sender_id: user.id.0,
            sender_name: user.full_name(),
            text: text.to_string(),
        }]
    } else {
        Vec::new()
    }
}

fn chat_title(msg: &Message) -> String {
    msg.chat.title().unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_message_short_passthrough() {
        assert_eq!(split_message("hello", 4000), vec!["hello"]);
    }

    #[test]
    fn test_split_message_prefers_line_breaks() {
        let text = format!("{}\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = split_message(&text, 40);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('a'));
        assert!(chunks[1].starts_with('b'));
    }

    #[test]
    fn test_split_message_respects_char_boundaries() {
        let text = "统".repeat(100);
        let chunks = split_message(&text, 10);
        // Every chunk must be valid UTF-8 on its own; joining restores input.
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(!chunk.is_empty());
        }
    }
}
