//! Conversation and message actions.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::dto::MessagingSnapshot;
use crate::application::settings::SyncSettings;
use crate::application::state::{MessagingChange, MessagingState, SharedState, TypingUser};
use crate::application::subscription::PushHandler;
use crate::domain::entities::{
    Attachment, Conversation, ConversationId, MessageId, MessageRecord, Pagination, UserId,
};
use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::ports::{
    EditMessageRequest, MessageQuery, MessagingPort, SendMessageRequest, SyncDomain,
};

/// Owns the messaging state and every action that changes it.
#[derive(Clone)]
pub struct MessagingService {
    port: Arc<dyn MessagingPort>,
    state: Arc<SharedState<MessagingState>>,
    settings: SyncSettings,
}

impl MessagingService {
    #[must_use]
    pub fn new(port: Arc<dyn MessagingPort>, settings: SyncSettings) -> Self {
        let state = MessagingState::new(settings.user_id, settings.typing_timeout);
        Self {
            port,
            state: Arc::new(SharedState::new(state)),
            settings,
        }
    }

    /// Loads conversations and the authoritative unread count.
    ///
    /// # Errors
    /// Returns the first failure; the other request still runs.
    pub async fn initialize(&self) -> SyncResult<()> {
        let list = self.load_conversations().await;
        let count = self.refresh_unread_count().await;
        list?;
        count?;
        Ok(())
    }

    /// # Errors
    /// Returns `SyncError::Fetch`; previously loaded conversations are kept.
    pub async fn load_conversations(&self) -> SyncResult<Vec<Conversation>> {
        self.state
            .update(|s| s.apply(MessagingChange::ConversationsFetchStarted));

        match self.port.fetch_conversations().await {
            Ok(conversations) => {
                debug!(count = conversations.len(), "Conversations loaded");
                let loaded = conversations.clone();
                self.state
                    .update(|s| s.apply(MessagingChange::ConversationsLoaded(conversations)));
                Ok(loaded)
            }
            Err(e) => Err(self.fetch_failed(e, "conversations")),
        }
    }

    /// # Errors
    /// Returns `SyncError::Fetch`.
    pub async fn refresh_unread_count(&self) -> SyncResult<u32> {
        match self.port.fetch_unread_count().await {
            Ok(count) => {
                debug!(count, "Message unread count synced");
                self.state
                    .update(|s| s.apply(MessagingChange::CountSynced(count)));
                Ok(count)
            }
            Err(e) => {
                let error = e.into_fetch("message unread count");
                warn!(error = %error, "Unread count fetch failed");
                self.state
                    .update(|s| s.apply(MessagingChange::ErrorRaised(error.clone())));
                Err(error)
            }
        }
    }

    /// Makes `conversation_id` the active thread and loads its newest page.
    ///
    /// # Errors
    /// Returns `SyncError::Fetch`.
    pub async fn select_conversation(&self, conversation_id: ConversationId) -> SyncResult<Pagination> {
        info!(%conversation_id, "Selecting conversation");
        self.state
            .update(|s| s.apply(MessagingChange::ConversationSelected(conversation_id)));
        self.fetch_messages(MessageQuery::new(conversation_id), false)
            .await
    }

    /// Appends the next older page of the active thread.
    ///
    /// # Errors
    /// Returns `SyncError::Validation` without an active conversation, or
    /// `SyncError::Fetch`.
    pub async fn load_more_messages(&self) -> SyncResult<Pagination> {
        let (active, busy, pagination) = self.state.read(|s| {
            (
                s.active_conversation(),
                s.is_loading_more(),
                s.pagination(),
            )
        });
        let conversation_id =
            active.ok_or_else(|| SyncError::validation("no conversation selected"))?;
        if busy || !pagination.has_next {
            debug!(busy, has_next = pagination.has_next, "Skipping load more");
            return Ok(pagination);
        }

        let query = MessageQuery {
            page: pagination.current_page.saturating_add(1),
            ..MessageQuery::new(conversation_id)
        };
        self.fetch_messages(query, true).await
    }

    async fn fetch_messages(&self, query: MessageQuery, append: bool) -> SyncResult<Pagination> {
        let query = query.with_page_size(self.settings.page_size);
        self.state
            .update(|s| s.apply(MessagingChange::MessagesFetchStarted { append }));

        match self.port.fetch_messages(&query).await {
            Ok(page) => {
                let pagination = page.pagination;
                self.state.update(|s| {
                    s.apply(MessagingChange::MessagesLoaded {
                        conversation_id: query.conversation_id,
                        page,
                        append,
                    });
                });
                Ok(pagination)
            }
            Err(e) => Err(self.fetch_failed(e, "messages")),
        }
    }

    /// Sends a message, showing it immediately under a local id.
    ///
    /// # Errors
    /// Returns `SyncError::Validation` for an empty message without
    /// attachments, or `SyncError::Mutation` after rolling back.
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> SyncResult<MessageRecord> {
        let content = content.into();
        if content.trim().is_empty() && attachments.is_empty() {
            return Err(self.rejected("message content cannot be empty"));
        }

        let pending = MessageRecord::pending(conversation_id, self.settings.user_id, content.clone())
            .with_attachments(attachments.clone());
        let local_id = pending.id();
        self.state
            .update(|s| s.apply(MessagingChange::MessageSent(pending)));

        let request = SendMessageRequest::new(conversation_id, content).with_attachments(attachments);
        match self.port.send_message(request).await {
            Ok(message) => {
                debug!(%local_id, id = %message.id(), "Message confirmed");
                self.state.update(|s| {
                    s.apply(MessagingChange::MessageConfirmed {
                        local_id,
                        message: message.clone(),
                    });
                });
                Ok(message)
            }
            Err(e) => Err(self.rollback(e, "send_message").await),
        }
    }

    /// # Errors
    /// Returns `SyncError::Validation` for undelivered messages or empty
    /// content, or `SyncError::Mutation` after rolling back.
    pub async fn edit_message(
        &self,
        id: MessageId,
        content: impl Into<String>,
    ) -> SyncResult<MessageRecord> {
        let content = content.into();
        let remote = self.delivered(id)?;
        if content.trim().is_empty() {
            return Err(self.rejected("message content cannot be empty"));
        }

        self.state.update(|s| {
            s.apply(MessagingChange::MessageEdited {
                id,
                content: content.clone(),
            });
        });

        let result = self
            .port
            .edit_message(EditMessageRequest::new(remote, content))
            .await;
        self.confirm_message(result, "edit_message").await
    }

    /// # Errors
    /// Returns `SyncError::Validation` for undelivered messages, or
    /// `SyncError::Mutation` after rolling back.
    pub async fn delete_message(&self, id: MessageId) -> SyncResult<()> {
        let remote = self.delivered(id)?;
        self.state
            .update(|s| s.apply(MessagingChange::MessageRemoved { id }));

        match self.port.delete_message(remote).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.rollback(e, "delete_message").await),
        }
    }

    /// Adds the user's reaction, or removes it if already present.
    ///
    /// # Errors
    /// Returns `SyncError::Validation` for undelivered messages, or
    /// `SyncError::Mutation` after rolling back.
    pub async fn toggle_reaction(&self, id: MessageId, emoji: &str) -> SyncResult<MessageRecord> {
        let remote = self.delivered(id)?;
        self.state.update(|s| {
            s.apply(MessagingChange::ReactionToggled {
                id,
                emoji: emoji.to_string(),
            });
        });

        let result = self.port.react(remote, emoji).await;
        self.confirm_message(result, "react").await
    }

    /// Clears a conversation's unread count and drops the global counter by
    /// the same amount.
    ///
    /// # Errors
    /// Returns `SyncError::Mutation` after rolling back.
    pub async fn mark_conversation_read(&self, conversation_id: ConversationId) -> SyncResult<()> {
        self.state
            .update(|s| s.apply(MessagingChange::ConversationRead(conversation_id)));

        match self.port.mark_conversation_read(conversation_id).await {
            Ok(()) => {
                self.resync_if_drifting().await;
                Ok(())
            }
            Err(e) => Err(self.rollback(e, "mark_conversation_read").await),
        }
    }

    async fn confirm_message(
        &self,
        result: SyncResult<MessageRecord>,
        operation: &str,
    ) -> SyncResult<MessageRecord> {
        match result {
            Ok(message) => {
                self.state
                    .update(|s| s.apply(MessagingChange::MessageUpdated(message.clone())));
                Ok(message)
            }
            Err(e) => Err(self.rollback(e, operation).await),
        }
    }

    /// Refetches conversations, the active thread's newest page and the
    /// unread count, then records `error`.
    async fn rollback(&self, error: SyncError, operation: &str) -> SyncError {
        let error = error.into_mutation(operation);
        warn!(operation, error = %error, "Mutation failed, refetching messages");

        if let Err(e) = self.load_conversations().await {
            warn!(error = %e, "Rollback conversation refetch failed");
        }
        if let Some(conversation_id) = self.state.read(MessagingState::active_conversation)
            && let Err(e) = self
                .fetch_messages(MessageQuery::new(conversation_id), false)
                .await
        {
            warn!(error = %e, "Rollback message refetch failed");
        }
        if let Err(e) = self.refresh_unread_count().await {
            warn!(error = %e, "Rollback count resync failed");
        }

        self.state
            .update(|s| s.apply(MessagingChange::ErrorRaised(error.clone())));
        error
    }

    fn fetch_failed(&self, error: SyncError, what: &str) -> SyncError {
        let error = error.into_fetch(what);
        warn!(error = %error, what, "Messaging fetch failed");
        self.state
            .update(|s| s.apply(MessagingChange::FetchFailed(error.clone())));
        error
    }

    fn rejected(&self, message: &str) -> SyncError {
        let error = SyncError::validation(message);
        self.state
            .update(|s| s.apply(MessagingChange::ErrorRaised(error.clone())));
        error
    }

    fn delivered(&self, id: MessageId) -> SyncResult<u64> {
        id.remote()
            .ok_or_else(|| self.rejected("message has not been delivered yet"))
    }

    async fn resync_if_drifting(&self) {
        let threshold = self.settings.drift_resync_threshold;
        if self.state.read(|s| s.counter().needs_resync(threshold)) {
            debug!(threshold, "Message counter drifted, resyncing");
            let _ = self.refresh_unread_count().await;
        }
    }

    /// Users typing in a conversation; expired indicators are left out.
    #[must_use]
    pub fn typing_users(&self, conversation_id: ConversationId) -> Vec<TypingUser> {
        self.state
            .read(|s| s.typing().typing_users(conversation_id))
    }

    #[must_use]
    pub fn format_typing_indicator(&self, conversation_id: ConversationId) -> Option<String> {
        self.state
            .read(|s| s.typing().format_typing_indicator(conversation_id))
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.apply(MessagingChange::ClearError));
    }

    #[must_use]
    pub fn snapshot(&self) -> MessagingSnapshot {
        self.state.read(MessagingState::snapshot)
    }

    #[must_use]
    pub fn unread_count(&self) -> u32 {
        self.state.read(MessagingState::unread_count)
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.settings.user_id
    }

    /// Receiver that changes on every state update.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.state.changes()
    }
}

#[async_trait]
impl PushHandler for MessagingService {
    fn domain(&self) -> SyncDomain {
        SyncDomain::Messages
    }

    async fn on_new_message(&self, message: MessageRecord) {
        let conversation_id = message.conversation_id();
        let known = self
            .state
            .read(|s| s.conversation(conversation_id).is_some());

        debug!(%conversation_id, id = %message.id(), "Pushed message");
        self.state
            .update(|s| s.apply(MessagingChange::MessageReceived(message)));

        if known {
            self.resync_if_drifting().await;
        } else {
            info!(%conversation_id, "Message for unknown conversation, reloading list");
            let _ = self.load_conversations().await;
            let _ = self.refresh_unread_count().await;
        }
    }

    async fn on_unread_count_update(&self, count: u32) {
        self.state
            .update(|s| s.apply(MessagingChange::CountSynced(count)));
    }

    async fn on_typing_indicator(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        username: Option<String>,
    ) {
        self.state.update(|s| {
            s.apply(MessagingChange::TypingStarted {
                conversation_id,
                user_id,
                username,
            });
        });
    }

    async fn on_message_update(&self, message: MessageRecord) {
        self.state
            .update(|s| s.apply(MessagingChange::MessageUpdated(message)));
    }

    async fn resync(&self) -> SyncResult<()> {
        self.refresh_unread_count().await.map(|_| ())
    }
}
