use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::keywords::KeywordSet;
use crate::platform::{InboundEvent, NotificationCommand};
use crate::stats::StatsAggregator;
use crate::summarizer::{Summarize, SUMMARY_PLACEHOLDER};
use crate::visitors::VisitorRegistry;

/// Welcome reply for first-time private senders, picked by the sender's
/// language hint. Chinese is the default, matching the bot's audience.
fn welcome_reply(language: Option<&str>) -> &'static str {
    match language {
        Some(lang) if lang.starts_with("en") => {
            "Welcome! Leave a message here and I'll forward it to my owner."
        }
        _ => "欢迎使用，请直接留言，我会帮你转发给主人！",
    }
}

/// The classification core: consumes one normalized event and produces the
/// notification commands it warrants. Performs no delivery I/O itself — the
/// transport sends whatever comes back. The summarization call is the only
/// external I/O on this path, and its failure is absorbed locally.
pub struct EventClassifier {
    operator_chat_id: i64,
    keywords: KeywordSet,
    registry: VisitorRegistry,
    summarizer: Arc<dyn Summarize>,
    stats: Arc<StatsAggregator>,
}

impl EventClassifier {
    pub fn new(
        operator_chat_id: i64,
        keywords: KeywordSet,
        registry: VisitorRegistry,
        summarizer: Arc<dyn Summarize>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            operator_chat_id,
            keywords,
            registry,
            summarizer,
            stats,
        }
    }

    /// Classify one event into zero or more notification commands.
    ///
    /// Every failure on this path is contained within the event: a broken
    /// summarizer yields a placeholder, a broken visitor store skips the
    /// welcome. Nothing here can fail a later event.
    pub async fn classify(&self, event: &InboundEvent) -> Vec<NotificationCommand> {
        match event {
            InboundEvent::NewMember {
                chat_id,
                chat_title,
                display_name,
                ..
            } => self.classify_new_member(*chat_id, chat_title, display_name).await,
            InboundEvent::GroupMessage {
                chat_title,
                sender_id,
                sender_name,
                text,
                ..
            } => {
                self.classify_group_message(*sender_id, sender_name, chat_title, text)
                    .await
            }
            InboundEvent::PrivateMessage {
                sender_id,
                sender_name,
                language,
                text,
            } => {
                self.classify_private_message(*sender_id, sender_name, language.as_deref(), text)
                    .await
            }
        }
    }

    async fn classify_new_member(
        &self,
        chat_id: i64,
        chat_title: &str,
        display_name: &str,
    ) -> Vec<NotificationCommand> {
        self.stats.record_new_member().await;

        vec![
            NotificationCommand {
                chat_id,
                body: format!(
                    "Hi {} 👋\nI'm your assistant bot. Please hang tight while we check things out!",
                    display_name
                ),
            },
            NotificationCommand {
                chat_id: self.operator_chat_id,
                body: format!("👋 新成员加入：{}（{}）", display_name, chat_title),
            },
        ]
    }

    async fn classify_group_message(
        &self,
        sender_id: u64,
        sender_name: &str,
        chat_title: &str,
        text: &str,
    ) -> Vec<NotificationCommand> {
        if text.is_empty() || self.is_operator(sender_id) {
            return Vec::new();
        }

        // One match result per event, reused for routing and statistics.
        let matched = self.keywords.match_text(text);
        self.stats.record_message(sender_id).await;

        // Group messages are relayed only when they trip a keyword.
        if matched.is_empty() {
            debug!("Group message from {} matched no keywords", sender_id);
            return Vec::new();
        }
        self.stats.record_keyword_hits(&matched).await;

        info!(
            "Keywords {:?} triggered by {} in {}",
            matched, sender_name, chat_title
        );

        let summary = self
            .summarize_or_placeholder(text, &format!("group {}", chat_title))
            .await;

        vec![NotificationCommand {
            chat_id: self.operator_chat_id,
            body: format!(
                "🚨关键词触发：{}\n👤 {}\n💬 {}\n📢 {}\n📬 AI 分析摘要：\n{}",
                matched.join(", "),
                sender_name,
                chat_title,
                text,
                summary
            ),
        }]
    }

    async fn classify_private_message(
        &self,
        sender_id: u64,
        sender_name: &str,
        language: Option<&str>,
        text: &str,
    ) -> Vec<NotificationCommand> {
        if text.is_empty() || self.is_operator(sender_id) {
            return Vec::new();
        }

        let matched = self.keywords.match_text(text);
        self.stats.record_message(sender_id).await;
        if !matched.is_empty() {
            self.stats.record_keyword_hits(&matched).await;
        }

        let mut commands = Vec::new();

        // First contact gets a welcome reply and a durable registry entry.
        // A broken store degrades to skipping both; the message itself is
        // still relayed below.
        match self.registry.is_known(sender_id).await {
            Ok(true) => {}
            Ok(false) => {
                commands.push(NotificationCommand {
                    chat_id: sender_id as i64,
                    body: welcome_reply(language).to_string(),
                });
                if let Err(e) = self.registry.record(sender_id, Utc::now()).await {
                    warn!("Failed to record visitor {}: {:#}", sender_id, e);
                }
            }
            Err(e) => {
                warn!(
                    "Visitor registry unavailable, skipping welcome for {}: {:#}",
                    sender_id, e
                );
            }
        }

        // Private messages are always relayed to the operator, matched or not.
        debug!("Relaying private message from {}", sender_name);
        let summary = self
            .summarize_or_placeholder(text, &format!("private chat with {}", sender_name))
            .await;

        let body = if matched.is_empty() {
            format!(
                "📩 New message from {}\n📝 {}\n📌 Summary:\n{}",
                sender_name, text, summary
            )
        } else {
            format!(
                "🚨关键词触发：{}\n👤 {}\n📢 {}\n📬 AI 分析摘要：\n{}",
                matched.join(", "),
                sender_name,
                text,
                summary
            )
        };
        commands.push(NotificationCommand {
            chat_id: self.operator_chat_id,
            body,
        });

        commands
    }

    async fn summarize_or_placeholder(&self, text: &str, context: &str) -> String {
        match self.summarizer.summarize(text, context).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summarization failed ({}): {}", context, e);
                SUMMARY_PLACEHOLDER.to_string()
            }
        }
    }

    fn is_operator(&self, sender_id: u64) -> bool {
        sender_id as i64 == self.operator_chat_id
    }
}
