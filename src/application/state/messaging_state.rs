//! Conversation and message state container.

use std::time::Duration;

use tracing::{debug, trace};

use super::typing::TypingIndicatorManager;
use crate::application::dto::MessagingSnapshot;
use crate::application::store::{EntityStore, UnreadCounter};
use crate::domain::entities::{
    Conversation, ConversationId, MessageId, MessageRecord, Page, Pagination, UserId,
};
use crate::domain::errors::SyncError;

/// Every transition the messaging state accepts.
#[derive(Debug, Clone)]
pub enum MessagingChange {
    ConversationsFetchStarted,
    ConversationsLoaded(Vec<Conversation>),
    /// Switches the active thread and discards the previous thread's messages.
    ConversationSelected(ConversationId),
    MessagesFetchStarted {
        append: bool,
    },
    MessagesLoaded {
        conversation_id: ConversationId,
        page: Page<MessageRecord>,
        append: bool,
    },
    FetchFailed(SyncError),
    CountSynced(u32),
    /// Optimistic insert of a message not yet accepted by the server.
    MessageSent(MessageRecord),
    /// The server accepted a sent message under a durable id.
    MessageConfirmed {
        local_id: MessageId,
        message: MessageRecord,
    },
    /// A message arrived over the push channel.
    MessageReceived(MessageRecord),
    /// Canonical version of an existing message.
    MessageUpdated(MessageRecord),
    MessageEdited {
        id: MessageId,
        content: String,
    },
    MessageRemoved {
        id: MessageId,
    },
    ReactionToggled {
        id: MessageId,
        emoji: String,
    },
    ConversationRead(ConversationId),
    TypingStarted {
        conversation_id: ConversationId,
        user_id: UserId,
        username: Option<String>,
    },
    /// Records an error without touching loading flags.
    ErrorRaised(SyncError),
    ClearError,
}

/// Conversations, the active thread, and the global unread message counter.
#[derive(Debug)]
pub struct MessagingState {
    me: UserId,
    conversations: EntityStore<Conversation>,
    messages: EntityStore<MessageRecord>,
    active: Option<ConversationId>,
    pagination: Pagination,
    counter: UnreadCounter,
    typing: TypingIndicatorManager,
    loading_conversations: bool,
    loading_messages: bool,
    loading_more: bool,
    error: Option<SyncError>,
}

impl MessagingState {
    /// Creates an empty state for the signed-in user `me`.
    #[must_use]
    pub fn new(me: UserId, typing_timeout: Duration) -> Self {
        Self {
            me,
            conversations: EntityStore::new(),
            messages: EntityStore::new(),
            active: None,
            pagination: Pagination::default(),
            counter: UnreadCounter::new(),
            typing: TypingIndicatorManager::with_timeout(typing_timeout),
            loading_conversations: false,
            loading_messages: false,
            loading_more: false,
            error: None,
        }
    }

    pub fn apply(&mut self, change: MessagingChange) {
        trace!(change = change_name(&change), "Applying messaging change");

        match change {
            MessagingChange::ConversationsFetchStarted => self.loading_conversations = true,
            MessagingChange::ConversationsLoaded(conversations) => {
                self.conversations.replace(conversations);
                self.loading_conversations = false;
                self.error = None;
            }
            MessagingChange::ConversationSelected(id) => {
                if let Some(previous) = self.active.filter(|&active| active != id) {
                    self.typing.clear_conversation(previous);
                }
                if self.active != Some(id) {
                    self.messages.clear();
                    self.pagination = Pagination::default();
                }
                self.active = Some(id);
            }
            MessagingChange::MessagesFetchStarted { append } => {
                if append {
                    self.loading_more = true;
                } else {
                    self.loading_messages = true;
                }
            }
            MessagingChange::MessagesLoaded {
                conversation_id,
                page,
                append,
            } => self.load_messages(conversation_id, page, append),
            MessagingChange::FetchFailed(error) => {
                self.loading_conversations = false;
                self.loading_messages = false;
                self.loading_more = false;
                self.error = Some(error);
            }
            MessagingChange::CountSynced(count) => self.counter.resync(count),
            MessagingChange::MessageSent(message) => {
                if self.is_active(message.conversation_id()) {
                    self.messages.upsert_one(message.clone());
                }
                self.bump_conversation(message);
            }
            MessagingChange::MessageConfirmed { local_id, message } => {
                let conversation_id = message.conversation_id();
                if self.messages.contains(&local_id) || self.is_active(conversation_id) {
                    self.messages.replace_id(&local_id, message.clone());
                }
                self.conversations.patch_one(&conversation_id, |c| {
                    if c.last_message().is_some_and(|m| m.id() == local_id) {
                        c.set_last_message(message.clone());
                    }
                });
            }
            MessagingChange::MessageReceived(message) => self.receive(message),
            MessagingChange::MessageUpdated(message) => {
                let id = message.id();
                self.messages.patch_one(&id, |m| *m = message.clone());
                self.conversations
                    .patch_one(&message.conversation_id(), |c| c.refresh_last_message(&message));
            }
            MessagingChange::MessageEdited { id, content } => {
                self.messages.patch_one(&id, |m| m.edit(content.clone()));
                self.refresh_preview(id);
            }
            MessagingChange::MessageRemoved { id } => {
                let conversation_id = self.messages.get(&id).map(MessageRecord::conversation_id);
                self.messages.remove_one(&id);
                if let Some(conversation_id) = conversation_id {
                    let previous = self.messages.iter().next().cloned();
                    self.conversations
                        .patch_one(&conversation_id, |c| c.forget_last_message(id, previous.clone()));
                }
            }
            MessagingChange::ReactionToggled { id, emoji } => {
                let me = self.me;
                self.messages.patch_one(&id, |m| {
                    m.toggle_reaction(me, &emoji);
                });
                self.refresh_preview(id);
            }
            MessagingChange::ConversationRead(id) => {
                let mut cleared = 0;
                self.conversations.patch_one(&id, |c| cleared += c.clear_unread());
                self.counter.decrement_by(cleared);
            }
            MessagingChange::TypingStarted {
                conversation_id,
                user_id,
                username,
            } => {
                if user_id != self.me {
                    self.typing.add_typing(conversation_id, user_id, username);
                }
            }
            MessagingChange::ErrorRaised(error) => self.error = Some(error),
            MessagingChange::ClearError => self.error = None,
        }
    }

    fn load_messages(
        &mut self,
        conversation_id: ConversationId,
        page: Page<MessageRecord>,
        append: bool,
    ) {
        if append {
            self.loading_more = false;
        } else {
            self.loading_messages = false;
        }

        if !self.is_active(conversation_id) {
            debug!(%conversation_id, "Dropping messages for inactive conversation");
            return;
        }

        if append {
            self.messages.append(page.items);
        } else {
            self.messages.replace(page.items);
        }
        self.pagination = page.pagination;
        self.error = None;
    }

    fn receive(&mut self, message: MessageRecord) {
        let conversation_id = message.conversation_id();
        let from_me = message.sender_id() == self.me;

        let duplicate = self
            .conversations
            .get(&conversation_id)
            .and_then(Conversation::last_message)
            .is_some_and(|m| m.id() == message.id())
            || self.messages.contains(&message.id());

        if self.is_active(conversation_id) {
            match self.pending_echo(&message) {
                Some(local_id) if from_me => self.messages.replace_id(&local_id, message.clone()),
                _ => {
                    self.messages.upsert_one(message.clone());
                }
            }
        }

        self.typing.remove_typing(conversation_id, message.sender_id());

        if duplicate {
            self.conversations
                .patch_one(&conversation_id, |c| c.refresh_last_message(&message));
            return;
        }

        let counts = !from_me;
        self.conversations.patch_one(&conversation_id, |c| {
            if counts {
                c.increment_unread();
            }
        });
        if counts {
            self.counter.increment();
        }
        self.bump_conversation(message);
    }

    /// Finds the local copy of a message this user sent that the server is
    /// now echoing back.
    fn pending_echo(&self, message: &MessageRecord) -> Option<MessageId> {
        self.messages
            .iter()
            .find(|m| {
                m.is_pending()
                    && m.conversation_id() == message.conversation_id()
                    && m.content() == message.content()
            })
            .map(MessageRecord::id)
    }

    fn bump_conversation(&mut self, message: MessageRecord) {
        let conversation_id = message.conversation_id();
        self.conversations
            .patch_one(&conversation_id, |c| c.set_last_message(message.clone()));
        self.conversations.move_to_front(&conversation_id);
    }

    fn refresh_preview(&mut self, id: MessageId) {
        if let Some(message) = self.messages.get(&id).cloned() {
            self.conversations
                .patch_one(&message.conversation_id(), |c| c.refresh_last_message(&message));
        }
    }

    fn is_active(&self, conversation_id: ConversationId) -> bool {
        self.active == Some(conversation_id)
    }

    #[must_use]
    pub const fn me(&self) -> UserId {
        self.me
    }

    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        self.conversations.as_slice()
    }

    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.get(&id)
    }

    #[must_use]
    pub fn messages(&self) -> &[MessageRecord] {
        self.messages.as_slice()
    }

    #[must_use]
    pub fn message(&self, id: MessageId) -> Option<&MessageRecord> {
        self.messages.get(&id)
    }

    #[must_use]
    pub const fn active_conversation(&self) -> Option<ConversationId> {
        self.active
    }

    #[must_use]
    pub const fn pagination(&self) -> Pagination {
        self.pagination
    }

    #[must_use]
    pub const fn counter(&self) -> &UnreadCounter {
        &self.counter
    }

    #[must_use]
    pub const fn unread_count(&self) -> u32 {
        self.counter.value()
    }

    #[must_use]
    pub const fn typing(&self) -> &TypingIndicatorManager {
        &self.typing
    }

    #[must_use]
    pub const fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    #[must_use]
    pub const fn error(&self) -> Option<&SyncError> {
        self.error.as_ref()
    }

    /// Returns a read-only copy for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> MessagingSnapshot {
        MessagingSnapshot {
            conversations: self.conversations.as_slice().to_vec(),
            active_conversation: self.active,
            messages: self.messages.as_slice().to_vec(),
            typing: self
                .active
                .map(|id| self.typing.typing_users(id))
                .unwrap_or_default(),
            unread_count: self.counter.value(),
            loading_conversations: self.loading_conversations,
            loading_messages: self.loading_messages,
            loading_more: self.loading_more,
            error: self.error.as_ref().map(ToString::to_string),
            pagination: self.pagination,
        }
    }
}

const fn change_name(change: &MessagingChange) -> &'static str {
    match change {
        MessagingChange::ConversationsFetchStarted => "conversations_fetch_started",
        MessagingChange::ConversationsLoaded(_) => "conversations_loaded",
        MessagingChange::ConversationSelected(_) => "conversation_selected",
        MessagingChange::MessagesFetchStarted { .. } => "messages_fetch_started",
        MessagingChange::MessagesLoaded { .. } => "messages_loaded",
        MessagingChange::FetchFailed(_) => "fetch_failed",
        MessagingChange::CountSynced(_) => "count_synced",
        MessagingChange::MessageSent(_) => "message_sent",
        MessagingChange::MessageConfirmed { .. } => "message_confirmed",
        MessagingChange::MessageReceived(_) => "message_received",
        MessagingChange::MessageUpdated(_) => "message_updated",
        MessagingChange::MessageEdited { .. } => "message_edited",
        MessagingChange::MessageRemoved { .. } => "message_removed",
        MessagingChange::ReactionToggled { .. } => "reaction_toggled",
        MessagingChange::ConversationRead(_) => "conversation_read",
        MessagingChange::TypingStarted { .. } => "typing_started",
        MessagingChange::ErrorRaised(_) => "error_raised",
        MessagingChange::ClearError => "clear_error",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::entities::ConversationKind;

    const ME: UserId = UserId(1);
    const ALICE: UserId = UserId(2);
    const CONV_A: ConversationId = ConversationId(10);
    const CONV_B: ConversationId = ConversationId(20);

    fn conversation(id: ConversationId, unread: u32) -> Conversation {
        Conversation::new(id, ConversationKind::Direct, vec![ME, ALICE], Utc::now())
            .with_unread_count(unread)
    }

    fn message(id: u64, conversation_id: ConversationId, sender: UserId, content: &str) -> MessageRecord {
        MessageRecord::new(MessageId::Remote(id), conversation_id, sender, content, Utc::now())
    }

    fn state() -> MessagingState {
        let mut state = MessagingState::new(ME, Duration::from_secs(5));
        state.apply(MessagingChange::ConversationsLoaded(vec![
            conversation(CONV_A, 0),
            conversation(CONV_B, 2),
        ]));
        state.apply(MessagingChange::CountSynced(2));
        state
    }

    #[test]
    fn test_received_in_background_conversation_counts_and_reorders() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));

        state.apply(MessagingChange::MessageReceived(message(5, CONV_B, ALICE, "hi")));

        assert_eq!(state.unread_count(), 3);
        assert_eq!(state.conversations()[0].id(), CONV_B);
        assert_eq!(state.conversation(CONV_B).unwrap().unread_count(), 3);
        assert!(state.messages().is_empty());

        state.apply(MessagingChange::MessageReceived(message(5, CONV_B, ALICE, "hi")));
        assert_eq!(state.unread_count(), 3);
    }

    #[test]
    fn test_received_in_active_conversation_goes_to_head() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));
        state.apply(MessagingChange::MessagesLoaded {
            conversation_id: CONV_A,
            page: Page::single(vec![message(2, CONV_A, ALICE, "b"), message(1, CONV_A, ME, "a")]),
            append: false,
        });

        state.apply(MessagingChange::MessageReceived(message(3, CONV_A, ALICE, "c")));

        let ids: Vec<_> = state.messages().iter().map(|m| m.id()).collect();
        assert_eq!(
            ids,
            vec![MessageId::Remote(3), MessageId::Remote(2), MessageId::Remote(1)]
        );
        assert_eq!(state.conversations()[0].id(), CONV_A);
    }

    #[test]
    fn test_own_message_is_not_unread() {
        let mut state = state();
        state.apply(MessagingChange::MessageReceived(message(9, CONV_A, ME, "mine")));
        assert_eq!(state.unread_count(), 2);
        assert_eq!(state.conversation(CONV_A).unwrap().unread_count(), 0);
    }

    #[test]
    fn test_pending_message_confirmed_under_durable_id() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));

        let pending = MessageRecord::pending(CONV_A, ME, "hello");
        let local_id = pending.id();
        state.apply(MessagingChange::MessageSent(pending));
        assert!(state.messages()[0].is_pending());

        state.apply(MessagingChange::MessageConfirmed {
            local_id,
            message: message(77, CONV_A, ME, "hello"),
        });

        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].id(), MessageId::Remote(77));
        assert_eq!(
            state.conversation(CONV_A).unwrap().last_message().unwrap().id(),
            MessageId::Remote(77)
        );
    }

    #[test]
    fn test_push_echo_replaces_pending_then_confirm_is_idempotent() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));

        let pending = MessageRecord::pending(CONV_A, ME, "hello");
        let local_id = pending.id();
        state.apply(MessagingChange::MessageSent(pending));

        state.apply(MessagingChange::MessageReceived(message(77, CONV_A, ME, "hello")));
        assert_eq!(state.messages().len(), 1);
        assert!(!state.messages()[0].is_pending());

        state.apply(MessagingChange::MessageConfirmed {
            local_id,
            message: message(77, CONV_A, ME, "hello"),
        });
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_load_more_appends_older_messages() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));
        state.apply(MessagingChange::MessagesLoaded {
            conversation_id: CONV_A,
            page: Page::single(vec![message(4, CONV_A, ALICE, "d"), message(3, CONV_A, ALICE, "c")]),
            append: false,
        });
        state.apply(MessagingChange::MessagesLoaded {
            conversation_id: CONV_A,
            page: Page::single(vec![message(2, CONV_A, ALICE, "b"), message(1, CONV_A, ALICE, "a")]),
            append: true,
        });

        let ids: Vec<_> = state.messages().iter().filter_map(|m| m.id().remote()).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_messages_for_inactive_conversation_are_dropped() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));
        state.apply(MessagingChange::MessagesLoaded {
            conversation_id: CONV_B,
            page: Page::single(vec![message(1, CONV_B, ALICE, "a")]),
            append: false,
        });
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_conversation_read_decrements_by_cleared_amount() {
        let mut state = state();
        state.apply(MessagingChange::ConversationRead(CONV_B));
        assert_eq!(state.unread_count(), 0);
        assert_eq!(state.conversation(CONV_B).unwrap().unread_count(), 0);

        state.apply(MessagingChange::ConversationRead(CONV_B));
        assert_eq!(state.unread_count(), 0);
    }

    #[test]
    fn test_reaction_and_edit_refresh_preview() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));
        state.apply(MessagingChange::MessageReceived(message(5, CONV_A, ALICE, "hi")));

        state.apply(MessagingChange::ReactionToggled {
            id: MessageId::Remote(5),
            emoji: "👍".into(),
        });
        state.apply(MessagingChange::MessageEdited {
            id: MessageId::Remote(5),
            content: "hello".into(),
        });

        let preview = state.conversation(CONV_A).unwrap().last_message().unwrap();
        assert_eq!(preview.content(), "hello");
        assert!(preview.is_edited());
        assert_eq!(preview.reaction_count("👍"), 1);
    }

    #[test]
    fn test_removed_message_falls_back_to_previous_preview() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));
        state.apply(MessagingChange::MessageReceived(message(1, CONV_A, ALICE, "first")));
        state.apply(MessagingChange::MessageReceived(message(2, CONV_A, ALICE, "second")));

        state.apply(MessagingChange::MessageRemoved {
            id: MessageId::Remote(2),
        });

        assert_eq!(state.messages().len(), 1);
        let preview = state.conversation(CONV_A).unwrap().last_message().unwrap();
        assert_eq!(preview.content(), "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_cleared_by_message_and_ignored_for_self() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));
        state.apply(MessagingChange::TypingStarted {
            conversation_id: CONV_A,
            user_id: ME,
            username: None,
        });
        state.apply(MessagingChange::TypingStarted {
            conversation_id: CONV_A,
            user_id: ALICE,
            username: Some("alice".into()),
        });
        assert_eq!(state.snapshot().typing.len(), 1);

        state.apply(MessagingChange::MessageReceived(message(3, CONV_A, ALICE, "x")));
        assert!(state.snapshot().typing.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_conversation_drops_previous_typing() {
        let mut state = state();
        state.apply(MessagingChange::ConversationSelected(CONV_A));
        state.apply(MessagingChange::TypingStarted {
            conversation_id: CONV_A,
            user_id: ALICE,
            username: Some("alice".into()),
        });
        state.apply(MessagingChange::ConversationSelected(CONV_A));
        assert_eq!(state.snapshot().typing.len(), 1);

        state.apply(MessagingChange::ConversationSelected(CONV_B));
        state.apply(MessagingChange::ConversationSelected(CONV_A));
        assert!(state.snapshot().typing.is_empty());
    }
}
