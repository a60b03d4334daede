use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::{ConversationId, Entity, UserId};

/// Client-generated id for a message that has not been confirmed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalMessageId(Uuid);

impl LocalMessageId {
    /// Generates a fresh local id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for LocalMessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "local-{}", self.0)
    }
}

/// Message identifier.
///
/// Optimistically sent messages carry a `Local` id until the server assigns
/// the durable `Remote` one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Temporary id assigned on send.
    Local(LocalMessageId),
    /// Durable server id.
    Remote(u64),
}

impl MessageId {
    /// Returns the durable id, if assigned.
    #[must_use]
    pub const fn remote(self) -> Option<u64> {
        match self {
            Self::Remote(id) => Some(id),
            Self::Local(_) => None,
        }
    }

    /// Returns true while the message awaits server confirmation.
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(id) => id.fmt(f),
            Self::Remote(id) => write!(f, "{id}"),
        }
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self::Remote(value)
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Remote(id) => serializer.serialize_u64(*id),
            Self::Local(id) => serializer.collect_str(id),
        }
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::domain::serde_utils::flexible_id::deserialize(deserializer).map(Self::Remote)
    }
}

/// File attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Attachment {
    /// Creates an attachment without a known content type.
    #[must_use]
    pub fn new(filename: impl Into<String>, url: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            size,
            content_type: None,
        }
    }

    /// Returns true for image attachments.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_ref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// A single user's reaction. A user can react with each emoji at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Reaction {
    pub user_id: UserId,
    pub emoji: String,
}

/// A chat message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    id: MessageId,
    conversation_id: ConversationId,
    sender_id: UserId,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    edited: bool,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    reactions: Vec<Reaction>,
}

#[allow(missing_docs)]
impl MessageRecord {
    #[must_use]
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            content: content.into(),
            created_at,
            edited: false,
            attachments: Vec::new(),
            reactions: Vec::new(),
        }
    }

    /// Creates an unconfirmed message with a fresh local id.
    #[must_use]
    pub fn pending(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            MessageId::Local(LocalMessageId::generate()),
            conversation_id,
            sender_id,
            content,
            Utc::now(),
        )
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    #[must_use]
    pub const fn sender_id(&self) -> UserId {
        self.sender_id
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn is_edited(&self) -> bool {
        self.edited
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.id.is_local()
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    #[must_use]
    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// Replaces the content and flags the message as edited.
    pub fn edit(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.edited = true;
    }

    /// Adds the reaction if absent, removes it if present.
    ///
    /// Returns `true` when the reaction is present afterwards.
    pub fn toggle_reaction(&mut self, user_id: UserId, emoji: &str) -> bool {
        if let Some(pos) = self
            .reactions
            .iter()
            .position(|r| r.user_id == user_id && r.emoji == emoji)
        {
            self.reactions.remove(pos);
            false
        } else {
            self.reactions.push(Reaction {
                user_id,
                emoji: emoji.to_string(),
            });
            true
        }
    }

    /// Counts reactions with the given emoji.
    #[must_use]
    pub fn reaction_count(&self, emoji: &str) -> usize {
        self.reactions.iter().filter(|r| r.emoji == emoji).count()
    }
}

impl Entity for MessageRecord {
    type Id = MessageId;

    fn key(&self) -> &MessageId {
        &self.id
    }

    // Unread state for messages lives on the conversation.
    fn counts_unread(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_message_has_local_id() {
        let msg = MessageRecord::pending(ConversationId(1), UserId(2), "hello");
        assert!(msg.is_pending());
        assert!(msg.id().remote().is_none());
        assert!(msg.id().to_string().starts_with("local-"));
    }

    #[test]
    fn test_toggle_reaction_is_keyed_by_user_and_emoji() {
        let mut msg = MessageRecord::new(
            MessageId::Remote(1),
            ConversationId(1),
            UserId(2),
            "hello",
            Utc::now(),
        );

        assert!(msg.toggle_reaction(UserId(3), "👍"));
        assert!(msg.toggle_reaction(UserId(4), "👍"));
        assert!(msg.toggle_reaction(UserId(3), "🎉"));
        assert_eq!(msg.reaction_count("👍"), 2);

        assert!(!msg.toggle_reaction(UserId(3), "👍"));
        assert_eq!(msg.reaction_count("👍"), 1);
        assert_eq!(msg.reactions().len(), 2);
    }

    #[test]
    fn test_edit_sets_flag() {
        let mut msg = MessageRecord::pending(ConversationId(1), UserId(2), "helo");
        msg.edit("hello");
        assert!(msg.is_edited());
        assert_eq!(msg.content(), "hello");
    }

    #[test]
    fn test_decode_remote_message() {
        let json = serde_json::json!({
            "id": "900",
            "conversation_id": 4,
            "sender_id": "8",
            "content": "see you at the meetup",
            "created_at": "2024-03-01T10:00:00Z",
            "attachments": [{"filename": "map.png", "url": "/media/map.png", "content_type": "image/png"}]
        });

        let msg: MessageRecord = serde_json::from_value(json).unwrap();
        assert_eq!(msg.id(), MessageId::Remote(900));
        assert_eq!(msg.conversation_id(), ConversationId(4));
        assert!(!msg.is_edited());
        assert!(msg.attachments()[0].is_image());
        assert!(msg.reactions().is_empty());
    }
}
