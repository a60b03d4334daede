//! Explicitly constructed application context.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::services::{MessagingService, NotificationService};
use crate::application::settings::SyncSettings;
use crate::application::subscription::SubscriptionManager;
use crate::domain::errors::SyncResult;
use crate::domain::ports::{MessagingPort, NotificationsPort, PushChannelPort};

/// Everything a session needs: both services and their push channels.
///
/// Built once and passed down; [`start`](Self::start) and
/// [`shutdown`](Self::shutdown) bracket its lifetime.
#[derive(Clone)]
pub struct SyncContext {
    notifications: NotificationService,
    messaging: MessagingService,
    notification_channel: SubscriptionManager,
    message_channel: SubscriptionManager,
}

impl SyncContext {
    #[must_use]
    pub fn new(
        notifications_port: Arc<dyn NotificationsPort>,
        messaging_port: Arc<dyn MessagingPort>,
        push: Arc<dyn PushChannelPort>,
        settings: SyncSettings,
    ) -> Self {
        let notifications = NotificationService::new(notifications_port, settings.clone());
        let messaging = MessagingService::new(messaging_port, settings);

        let notification_channel =
            SubscriptionManager::new(push.clone(), Arc::new(notifications.clone()));
        let message_channel = SubscriptionManager::new(push, Arc::new(messaging.clone()));

        Self {
            notifications,
            messaging,
            notification_channel,
            message_channel,
        }
    }

    /// Loads initial data for both domains and opens both push channels.
    ///
    /// Initial fetch failures are logged and left on the state; only a
    /// channel that cannot be opened fails the start.
    ///
    /// # Errors
    /// Returns `SyncError::Channel`.
    pub async fn start(&self) -> SyncResult<()> {
        let (notifications, messaging) =
            tokio::join!(self.notifications.initialize(), self.messaging.initialize());
        if let Err(e) = notifications {
            warn!(error = %e, "Initial notification load failed");
        }
        if let Err(e) = messaging {
            warn!(error = %e, "Initial messaging load failed");
        }

        self.notification_channel.start()?;
        if let Err(e) = self.message_channel.start() {
            self.notification_channel.stop();
            return Err(e);
        }
        info!("Sync context started");
        Ok(())
    }

    /// Closes both push channels. Idempotent.
    pub fn shutdown(&self) {
        self.notification_channel.stop();
        self.message_channel.stop();
        info!("Sync context shut down");
    }

    #[must_use]
    pub const fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    #[must_use]
    pub const fn messaging(&self) -> &MessagingService {
        &self.messaging
    }

    #[must_use]
    pub const fn notification_channel(&self) -> &SubscriptionManager {
        &self.notification_channel
    }

    #[must_use]
    pub const fn message_channel(&self) -> &SubscriptionManager {
        &self.message_channel
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::domain::connection::ChannelState;
    use crate::domain::entities::{NotificationId, NotificationRecord, UserId};
    use crate::domain::ports::mocks::{FakePushChannel, InMemoryMessaging, InMemoryNotifications};
    use crate::domain::ports::{ChannelEvent, PushEvent, SyncDomain};

    fn context(push: Arc<FakePushChannel>) -> SyncContext {
        let notifications = Arc::new(InMemoryNotifications::new(vec![NotificationRecord::new(
            NotificationId(1),
            "welcome",
            "hi",
            Utc::now(),
        )]));
        let messaging = Arc::new(InMemoryMessaging::new(UserId(1), Vec::new()));
        SyncContext::new(notifications, messaging, push, SyncSettings::new(UserId(1)))
    }

    #[tokio::test]
    async fn test_start_loads_and_opens_both_channels() {
        let push = Arc::new(FakePushChannel::new());
        let ctx = context(push.clone());

        assert_ok!(ctx.start().await);

        assert_eq!(ctx.notifications().unread_count(), 1);
        assert_eq!(push.open_count(SyncDomain::Notifications), 1);
        assert_eq!(push.open_count(SyncDomain::Messages), 1);

        let mut changes = ctx.notifications().changes();
        push.emit(
            SyncDomain::Notifications,
            ChannelEvent::Push(PushEvent::UnreadCountUpdate { count: 4 }),
        );
        changes.changed().await.unwrap();
        assert_eq!(ctx.notifications().unread_count(), 4);

        ctx.shutdown();
        ctx.shutdown();
        assert_eq!(ctx.notification_channel().state(), ChannelState::Stopped);
        assert_eq!(ctx.message_channel().state(), ChannelState::Stopped);
        assert!(push.is_closed(SyncDomain::Messages));
    }

    #[tokio::test]
    async fn test_refused_channel_fails_start() {
        let ctx = context(Arc::new(FakePushChannel::refusing()));
        assert_err!(ctx.start().await);
    }

    #[tokio::test]
    async fn test_refused_message_channel_closes_notification_channel() {
        let push = Arc::new(FakePushChannel::refusing_only(&[SyncDomain::Messages]));
        let ctx = context(push.clone());

        assert_err!(ctx.start().await);

        assert_eq!(push.open_count(SyncDomain::Notifications), 1);
        assert!(push.is_closed(SyncDomain::Notifications));
        assert_eq!(ctx.notification_channel().state(), ChannelState::Stopped);
        assert_eq!(ctx.message_channel().state(), ChannelState::Disconnected);
    }
}
