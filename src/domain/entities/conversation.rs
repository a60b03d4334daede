use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, MessageId, MessageRecord, UserId, numeric_id};

numeric_id!(
    /// Unique identifier for a conversation.
    ConversationId
);

/// Conversation shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ConversationKind {
    #[default]
    Direct,
    Group,
}

/// A direct or group conversation with its denormalized latest message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    #[serde(rename = "type", default)]
    kind: ConversationKind,
    #[serde(default)]
    participants: Vec<UserId>,
    #[serde(default)]
    last_message: Option<MessageRecord>,
    #[serde(default)]
    unread_count: u32,
    updated_at: DateTime<Utc>,
}

#[allow(missing_docs)]
impl Conversation {
    #[must_use]
    pub const fn new(
        id: ConversationId,
        kind: ConversationKind,
        participants: Vec<UserId>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            participants,
            last_message: None,
            unread_count: 0,
            updated_at,
        }
    }

    #[must_use]
    pub const fn with_unread_count(mut self, count: u32) -> Self {
        self.unread_count = count;
        self
    }

    #[must_use]
    pub const fn id(&self) -> ConversationId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> ConversationKind {
        self.kind
    }

    #[must_use]
    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    #[must_use]
    pub const fn last_message(&self) -> Option<&MessageRecord> {
        self.last_message.as_ref()
    }

    #[must_use]
    pub const fn unread_count(&self) -> u32 {
        self.unread_count
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records a new latest message and bumps `updated_at`.
    pub fn set_last_message(&mut self, message: MessageRecord) {
        if message.created_at() > self.updated_at {
            self.updated_at = message.created_at();
        }
        self.last_message = Some(message);
    }

    /// Replaces the denormalized copy if it refers to the same message.
    pub fn refresh_last_message(&mut self, message: &MessageRecord) {
        if self
            .last_message
            .as_ref()
            .is_some_and(|m| m.id() == message.id())
        {
            self.last_message = Some(message.clone());
        }
    }

    /// Drops the denormalized copy of a deleted message, falling back to `previous`.
    pub fn forget_last_message(&mut self, id: MessageId, previous: Option<MessageRecord>) {
        if self.last_message.as_ref().is_some_and(|m| m.id() == id) {
            self.last_message = previous;
        }
    }

    pub const fn increment_unread(&mut self) {
        self.unread_count = self.unread_count.saturating_add(1);
    }

    /// Clears the unread count and returns how many were cleared.
    pub const fn clear_unread(&mut self) -> u32 {
        let cleared = self.unread_count;
        self.unread_count = 0;
        cleared
    }
}

impl Entity for Conversation {
    type Id = ConversationId;

    fn key(&self) -> &ConversationId {
        &self.id
    }

    fn counts_unread(&self) -> bool {
        self.unread_count > 0
    }
}
