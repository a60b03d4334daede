//! Request/response port for conversations and messages.

use async_trait::async_trait;

use crate::domain::entities::{Attachment, Conversation, ConversationId, MessageRecord, Page};
use crate::domain::errors::SyncResult;

/// Paging for a conversation's message history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MessageQuery {
    pub conversation_id: ConversationId,
    pub page: u32,
    pub page_size: Option<u32>,
}

#[allow(missing_docs)]
impl MessageQuery {
    #[must_use]
    pub const fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            page: 1,
            page_size: None,
        }
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Returns the query for the following page.
    #[must_use]
    pub const fn next_page(self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self
        }
    }
}

/// Request to post a message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct SendMessageRequest {
    pub conversation_id: ConversationId,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

#[allow(missing_docs)]
impl SendMessageRequest {
    #[must_use]
    pub fn new(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            conversation_id,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Request to replace a delivered message's content.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct EditMessageRequest {
    pub message_id: u64,
    pub content: String,
}

impl EditMessageRequest {
    /// Creates an edit request.
    #[must_use]
    pub fn new(message_id: u64, content: impl Into<String>) -> Self {
        Self {
            message_id,
            content: content.into(),
        }
    }
}

/// Port for fetching and mutating conversations and messages on the server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Fetches the user's conversations, most recent first.
    async fn fetch_conversations(&self) -> SyncResult<Vec<Conversation>>;

    /// Fetches one page of a conversation's messages.
    async fn fetch_messages(&self, query: &MessageQuery) -> SyncResult<Page<MessageRecord>>;

    /// Fetches the authoritative unread message count.
    async fn fetch_unread_count(&self) -> SyncResult<u32>;

    /// Posts a message and returns the stored record with its durable id.
    async fn send_message(&self, request: SendMessageRequest) -> SyncResult<MessageRecord>;

    /// Edits a message and returns the stored record.
    async fn edit_message(&self, request: EditMessageRequest) -> SyncResult<MessageRecord>;

    /// Deletes a message.
    async fn delete_message(&self, message_id: u64) -> SyncResult<()>;

    /// Toggles the current user's reaction and returns the stored record.
    async fn react(&self, message_id: u64, emoji: &str) -> SyncResult<MessageRecord>;

    /// Marks every message in a conversation read.
    async fn mark_conversation_read(&self, conversation_id: ConversationId) -> SyncResult<()>;
}
