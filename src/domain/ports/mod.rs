mod messaging_port;
mod notifications_port;
mod push_channel_port;

pub use messaging_port::{EditMessageRequest, MessageQuery, MessagingPort, SendMessageRequest};
pub use notifications_port::{BulkOperation, NotificationQuery, NotificationsPort};
pub use push_channel_port::{ChannelEvent, PushChannelPort, PushEvent, Subscription, SyncDomain};

#[cfg(test)]
pub mod mocks {
    pub use super::messaging_port::MockMessagingPort;
    pub use super::messaging_port::mock::InMemoryMessaging;
    pub use super::notifications_port::MockNotificationsPort;
    pub use super::notifications_port::mock::InMemoryNotifications;
    pub use super::push_channel_port::mock::FakePushChannel;
}
