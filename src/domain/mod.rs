//! Domain layer with core records, errors and port definitions.

/// Push channel lifecycle states.
pub mod connection;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Serde utilities.
pub mod serde_utils;

pub use connection::ChannelState;
pub use entities::{
    Conversation, ConversationId, MessageId, MessageRecord, NotificationId, NotificationRecord,
    UserId,
};
pub use errors::{SyncError, SyncResult};
pub use ports::{MessagingPort, NotificationsPort, PushChannelPort, PushEvent, SyncDomain};
