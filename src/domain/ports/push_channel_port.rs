//! Push channel port and the events it delivers.

use tokio::sync::{mpsc, watch};

use crate::domain::entities::{ConversationId, MessageRecord, NotificationRecord, UserId};
use crate::domain::errors::SyncResult;

/// Collection a push channel serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncDomain {
    /// User notifications.
    Notifications,
    /// Conversations and messages.
    Messages,
}

impl SyncDomain {
    /// Returns the wire name of this domain.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notifications => "notifications",
            Self::Messages => "messages",
        }
    }
}

impl std::fmt::Display for SyncDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-initiated event, one variant per `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PushEvent {
    NewNotification(NotificationRecord),
    UnreadCountUpdate {
        count: u32,
    },
    NewMessage(MessageRecord),
    TypingIndicator {
        conversation_id: ConversationId,
        user_id: UserId,
        username: Option<String>,
    },
    MessageUpdate(MessageRecord),
}

impl PushEvent {
    /// Returns the wire `type` discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NewNotification(_) => "new_notification",
            Self::UnreadCountUpdate { .. } => "unread_count_update",
            Self::NewMessage(_) => "new_message",
            Self::TypingIndicator { .. } => "typing_indicator",
            Self::MessageUpdate(_) => "message_update",
        }
    }
}

/// Everything a push channel reports: lifecycle changes and pushed events.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ChannelEvent {
    Connected,
    Reconnecting { attempt: u32 },
    Disconnected { reason: String },
    Push(PushEvent),
    Error { message: String, recoverable: bool },
}

/// Handle to an open push channel.
///
/// Dropping or closing the subscription tells the producer to shut the
/// connection down. Closing is idempotent.
#[derive(Debug)]
pub struct Subscription {
    events: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    shutdown: watch::Sender<bool>,
}

impl Subscription {
    /// Creates a subscription and the shutdown signal the producer listens on.
    #[must_use]
    pub fn new(events: mpsc::UnboundedReceiver<ChannelEvent>) -> (Self, watch::Receiver<bool>) {
        let (shutdown, shutdown_rx) = watch::channel(false);
        (
            Self {
                events: Some(events),
                shutdown,
            },
            shutdown_rx,
        )
    }

    /// Takes the event receiver; returns `None` if already taken.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ChannelEvent>> {
        self.events.take()
    }

    /// Signals the producer to close the channel.
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    /// Returns whether `close` was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Port for opening push channels.
pub trait PushChannelPort: Send + Sync {
    /// Opens the push channel for a domain. The connection runs in the
    /// background and reports through the subscription's event stream.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Channel` if the channel cannot be started.
    fn open_channel(&self, domain: SyncDomain) -> SyncResult<Subscription>;
}

#[cfg(test)]
#[allow(dead_code, missing_docs)]
pub mod mock {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;
    use crate::domain::errors::SyncError;

    struct OpenChannel {
        sender: mpsc::UnboundedSender<ChannelEvent>,
        shutdown: watch::Receiver<bool>,
    }

    /// Push channel driven by the test through [`FakePushChannel::emit`].
    #[derive(Default)]
    pub struct FakePushChannel {
        channels: Mutex<HashMap<SyncDomain, OpenChannel>>,
        opened: Mutex<Vec<SyncDomain>>,
        refused: Vec<SyncDomain>,
    }

    impl FakePushChannel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn refusing() -> Self {
            Self::refusing_only(&[SyncDomain::Notifications, SyncDomain::Messages])
        }

        pub fn refusing_only(domains: &[SyncDomain]) -> Self {
            Self {
                refused: domains.to_vec(),
                ..Self::default()
            }
        }

        /// Delivers an event on an open channel. Returns false if none is open.
        pub fn emit(&self, domain: SyncDomain, event: ChannelEvent) -> bool {
            self.channels
                .lock()
                .get(&domain)
                .is_some_and(|c| c.sender.send(event).is_ok())
        }

        pub fn is_closed(&self, domain: SyncDomain) -> bool {
            self.channels
                .lock()
                .get(&domain)
                .is_none_or(|c| *c.shutdown.borrow())
        }

        pub fn open_count(&self, domain: SyncDomain) -> usize {
            self.opened.lock().iter().filter(|d| **d == domain).count()
        }
    }

    impl PushChannelPort for FakePushChannel {
        fn open_channel(&self, domain: SyncDomain) -> SyncResult<Subscription> {
            if self.refused.contains(&domain) {
                return Err(SyncError::channel("mock refused"));
            }
            let (sender, receiver) = mpsc::unbounded_channel();
            let (subscription, shutdown) = Subscription::new(receiver);
            self.channels
                .lock()
                .insert(domain, OpenChannel { sender, shutdown });
            self.opened.lock().push(domain);
            Ok(subscription)
        }
    }
}
