//! Records persisted in the mailbox database.
//!
//! Accessors always return fresh copies; nothing here holds a reference
//! into the store between calls.

use amail_shared::types::generate_message_id;
use amail_shared::{MessageType, Priority, RecipientStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// An immutable message. The body is never edited after it is sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Random hex id; humans address it by prefix.
    pub id: String,
    /// Sender role.
    pub from_id: String,
    /// May be empty.
    pub subject: String,
    pub body: String,
    pub priority: Priority,
    pub msg_type: MessageType,
    /// Root of the thread this message belongs to. `None` for a message
    /// that nobody has replied to yet or that started its own thread.
    pub thread_id: Option<String>,
    /// The message this one answers directly.
    pub reply_to_id: Option<String>,
    /// The only ordering key.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A new top-level message with a fresh id, stamped now.
    pub fn compose(
        from_id: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_message_id(),
            from_id: from_id.into(),
            subject: subject.into(),
            body: body.into(),
            priority: Priority::default(),
            msg_type: MessageType::default(),
            thread_id: None,
            reply_to_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, msg_type: MessageType) -> Self {
        self.msg_type = msg_type;
        self
    }

    /// Id of the thread root: the stored `thread_id`, or this message's own
    /// id when it has none.
    pub fn thread_root(&self) -> &str {
        self.thread_id.as_deref().unwrap_or(&self.id)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Mutable delivery state of one message for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub message_id: String,
    pub to_id: String,
    pub status: RecipientStatus,
    pub read_at: Option<DateTime<Utc>>,
    /// Set once the watcher has dispatched notifications for this row.
    pub notified_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// InboxMessage
// ---------------------------------------------------------------------------

/// A message joined with its full recipient list and, when read through a
/// recipient's view, that recipient's status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboxMessage {
    #[serde(flatten)]
    pub message: Message,
    /// Every recipient of the message, in send order.
    pub to_ids: Vec<String>,
    /// `None` when the message was loaded without a recipient view
    /// (threads, global lookups).
    pub status: Option<RecipientStatus>,
    pub read_at: Option<DateTime<Utc>>,
}

impl InboxMessage {
    pub fn is_unread(&self) -> bool {
        self.status == Some(RecipientStatus::Unread)
    }
}

impl std::ops::Deref for InboxMessage {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.message
    }
}
