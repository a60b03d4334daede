//! Domain entity definitions.

mod conversation;
mod message;
mod notification;
mod pagination;
mod token;

pub use conversation::{Conversation, ConversationId, ConversationKind};
pub use message::{Attachment, LocalMessageId, MessageId, MessageRecord, Reaction};
pub use notification::{
    NotificationAction, NotificationId, NotificationKind, NotificationRecord, Priority,
    RelatedObject,
};
pub use pagination::{Page, Pagination};
pub use token::ApiToken;

/// Declares a numeric server-side id newtype that decodes from JSON numbers or strings.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(#[serde(with = "crate::domain::serde_utils::flexible_id")] pub u64);

        impl $name {
            /// Returns the underlying u64 value.
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

pub(crate) use numeric_id;

numeric_id!(
    /// Unique identifier for a user account.
    UserId
);

/// A record held by an entity store.
///
/// Records expose a stable identity and whether they currently count
/// toward the unread counter.
pub trait Entity: Clone {
    /// Identifier type.
    type Id: Clone + PartialEq + std::fmt::Debug;

    /// Returns the record id.
    fn key(&self) -> &Self::Id;

    /// Returns whether this record counts as unread.
    fn counts_unread(&self) -> bool;
}
