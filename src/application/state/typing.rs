use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::entities::{ConversationId, UserId};

/// How long a typing indicator stays visible after receipt.
pub const TYPING_INDICATOR_TIMEOUT: Duration = Duration::from_secs(5);

/// A user currently typing in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingUser {
    pub user_id: UserId,
    pub username: Option<String>,
    pub received_at: Instant,
}

impl TypingUser {
    #[must_use]
    pub fn new(user_id: UserId, username: Option<String>) -> Self {
        Self {
            user_id,
            username,
            received_at: Instant::now(),
        }
    }

    /// Name to show, falling back to the user id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| format!("User {}", self.user_id))
    }

    fn refresh(&mut self, username: Option<String>) {
        self.received_at = Instant::now();
        if username.is_some() {
            self.username = username;
        }
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.received_at.elapsed() >= timeout
    }
}

/// Tracks typing indicators per conversation and expires them on the client clock.
#[derive(Debug)]
pub struct TypingIndicatorManager {
    typing_users: HashMap<ConversationId, Vec<TypingUser>>,
    timeout: Duration,
}

impl TypingIndicatorManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(TYPING_INDICATOR_TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            typing_users: HashMap::new(),
            timeout,
        }
    }

    /// Records that a user is typing; a repeat indicator restarts the window.
    pub fn add_typing(
        &mut self,
        conversation_id: ConversationId,
        user_id: UserId,
        username: Option<String>,
    ) {
        self.cleanup_expired();
        let users = self.typing_users.entry(conversation_id).or_default();

        if let Some(existing) = users.iter_mut().find(|u| u.user_id == user_id) {
            existing.refresh(username);
        } else {
            users.push(TypingUser::new(user_id, username));
        }
    }

    pub fn remove_typing(&mut self, conversation_id: ConversationId, user_id: UserId) {
        if let Some(users) = self.typing_users.get_mut(&conversation_id) {
            users.retain(|u| u.user_id != user_id);
            if users.is_empty() {
                self.typing_users.remove(&conversation_id);
            }
        }
    }

    pub fn clear_conversation(&mut self, conversation_id: ConversationId) {
        self.typing_users.remove(&conversation_id);
    }

    pub fn cleanup_expired(&mut self) {
        let timeout = self.timeout;
        for users in self.typing_users.values_mut() {
            users.retain(|u| !u.is_expired(timeout));
        }
        self.typing_users.retain(|_, users| !users.is_empty());
    }

    /// Returns who is still typing; expired indicators are never returned.
    #[must_use]
    pub fn typing_users(&self, conversation_id: ConversationId) -> Vec<TypingUser> {
        self.typing_users
            .get(&conversation_id)
            .map(|users| {
                users
                    .iter()
                    .filter(|u| !u.is_expired(self.timeout))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn format_typing_indicator(&self, conversation_id: ConversationId) -> Option<String> {
        let names: Vec<String> = self
            .typing_users(conversation_id)
            .iter()
            .map(TypingUser::display_name)
            .collect();

        match names.as_slice() {
            [] => None,
            [one] => Some(format!("{one} is typing...")),
            [a, b] => Some(format!("{a} and {b} are typing...")),
            [a, b, c] => Some(format!("{a}, {b} and {c} are typing...")),
            _ => Some("Several people are typing...".to_string()),
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TypingIndicatorManager {
    fn default() -> Self {
        Self::new()
    }
}
