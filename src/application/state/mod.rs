//! Reducer-driven state containers.

mod messaging_state;
mod notification_state;
mod shared;
mod typing;

pub use messaging_state::{MessagingChange, MessagingState};
pub use notification_state::{NotificationChange, NotificationState};
pub use shared::SharedState;
pub use typing::{TYPING_INDICATOR_TIMEOUT, TypingIndicatorManager, TypingUser};
