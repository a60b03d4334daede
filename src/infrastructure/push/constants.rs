use std::time::Duration;

pub const RECONNECT_DELAY_BASE: Duration = Duration::from_secs(1);
pub const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(60);
pub const RECONNECT_JITTER_MAX: Duration = Duration::from_millis(500);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Close codes the server uses to reject a token; reconnecting cannot help.
pub const CLOSE_CODE_UNAUTHORIZED: u16 = 4001;
pub const CLOSE_CODE_FORBIDDEN: u16 = 4003;

/// Wire `type` discriminators.
pub mod event_type {
    pub const NEW_NOTIFICATION: &str = "new_notification";
    pub const UNREAD_COUNT_UPDATE: &str = "unread_count_update";
    pub const NEW_MESSAGE: &str = "new_message";
    pub const TYPING_INDICATOR: &str = "typing_indicator";
    pub const MESSAGE_UPDATE: &str = "message_update";
}
