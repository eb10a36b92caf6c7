pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// A normalized chat event received from the transport.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    NewMember {
        chat_id: i64,
        chat_title: String,
        member_id: u64,
        display_name: String,
    },
    GroupMessage {
        chat_id: i64,
        chat_title: String,
        sender_id: u64,
        sender_name: String,
        text: String,
    },
    PrivateMessage {
        sender_id: u64,
        sender_name: String,
        /// IETF language hint from the platform (e.g. "en", "zh-hans"),
        /// used to pick the welcome reply.
        language: Option<String>,
        text: String,
    },
}

/// An instruction to send text to one chat. Fire-and-forget: the transport
/// owns delivery, and a failed send is logged and dropped, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationCommand {
    pub chat_id: i64,
    pub body: String,
}

/// Delivery seam between the core pipeline and the transport.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, command: &NotificationCommand) -> Result<()>;
}
