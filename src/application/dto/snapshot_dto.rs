//! Read-only state snapshots handed to presentation consumers.

use crate::application::state::TypingUser;
use crate::domain::entities::{
    Conversation, ConversationId, MessageRecord, NotificationRecord, Pagination,
};

/// Notification list as seen by a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSnapshot {
    /// Loaded records, newest first.
    pub items: Vec<NotificationRecord>,
    /// Current unread count.
    pub unread_count: u32,
    /// Whether a first-page fetch is in flight.
    pub loading: bool,
    /// Whether a "load more" fetch is in flight.
    pub loading_more: bool,
    /// Last error, rendered for display.
    pub error: Option<String>,
    /// Pagination of the last loaded page.
    pub pagination: Pagination,
}

/// Conversations and the active thread as seen by a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MessagingSnapshot {
    pub conversations: Vec<Conversation>,
    pub active_conversation: Option<ConversationId>,
    /// Messages of the active conversation, newest first.
    pub messages: Vec<MessageRecord>,
    /// Users typing in the active conversation.
    pub typing: Vec<TypingUser>,
    pub unread_count: u32,
    pub loading_conversations: bool,
    pub loading_messages: bool,
    pub loading_more: bool,
    pub error: Option<String>,
    pub pagination: Pagination,
}

impl MessagingSnapshot {
    /// Returns the active conversation's record, if loaded.
    #[must_use]
    pub fn active(&self) -> Option<&Conversation> {
        let id = self.active_conversation?;
        self.conversations.iter().find(|c| c.id() == id)
    }
}
