use async_trait::async_trait;

use crate::domain::entities::{ConversationId, MessageRecord, NotificationRecord, UserId};
use crate::domain::errors::SyncResult;
use crate::domain::ports::{PushEvent, SyncDomain};

/// Receiver of pushed events for one domain.
///
/// Each event type has exactly one handler method. Types that do not belong
/// to the handler's domain fall through to the default no-op.
#[async_trait]
pub trait PushHandler: Send + Sync {
    /// Domain whose channel feeds this handler.
    fn domain(&self) -> SyncDomain;

    async fn on_new_notification(&self, _record: NotificationRecord) {}

    async fn on_unread_count_update(&self, _count: u32) {}

    async fn on_new_message(&self, _message: MessageRecord) {}

    async fn on_typing_indicator(
        &self,
        _conversation_id: ConversationId,
        _user_id: UserId,
        _username: Option<String>,
    ) {
    }

    async fn on_message_update(&self, _message: MessageRecord) {}

    /// Replaces derived counters with the server's values after a (re)connect.
    async fn resync(&self) -> SyncResult<()>;
}

/// Routes one event to its handler method.
pub async fn dispatch(handler: &dyn PushHandler, event: PushEvent) {
    match event {
        PushEvent::NewNotification(record) => handler.on_new_notification(record).await,
        PushEvent::UnreadCountUpdate { count } => handler.on_unread_count_update(count).await,
        PushEvent::NewMessage(message) => handler.on_new_message(message).await,
        PushEvent::TypingIndicator {
            conversation_id,
            user_id,
            username,
        } => {
            handler
                .on_typing_indicator(conversation_id, user_id, username)
                .await;
        }
        PushEvent::MessageUpdate(message) => handler.on_message_update(message).await,
    }
}
