//! Tunables shared by the sync services.

use std::time::Duration;

use crate::application::state::TYPING_INDICATOR_TIMEOUT;
use crate::domain::entities::UserId;

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default number of local counter updates tolerated before a background resync.
pub const DEFAULT_DRIFT_RESYNC_THRESHOLD: u32 = 25;

/// Runtime settings for the notification and messaging services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// The signed-in user; messages from this id never count as unread.
    pub user_id: UserId,
    pub page_size: u32,
    /// Zero disables drift-triggered resyncs.
    pub drift_resync_threshold: u32,
    pub typing_timeout: Duration,
}

impl SyncSettings {
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            page_size: DEFAULT_PAGE_SIZE,
            drift_resync_threshold: DEFAULT_DRIFT_RESYNC_THRESHOLD,
            typing_timeout: TYPING_INDICATOR_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn with_drift_resync_threshold(mut self, threshold: u32) -> Self {
        self.drift_resync_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_typing_timeout(mut self, timeout: Duration) -> Self {
        self.typing_timeout = timeout;
        self
    }
}
