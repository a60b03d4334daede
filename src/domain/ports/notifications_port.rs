//! Request/response port for the notification collection.

use async_trait::async_trait;

use crate::domain::entities::{
    NotificationId, NotificationKind, NotificationRecord, Page, Priority,
};
use crate::domain::errors::SyncResult;

/// Filters and paging for a notification list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct NotificationQuery {
    pub page: u32,
    pub page_size: Option<u32>,
    pub unread_only: bool,
    pub kind: Option<NotificationKind>,
    pub priority: Option<Priority>,
}

impl Default for NotificationQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: None,
            unread_only: false,
            kind: None,
            priority: None,
        }
    }
}

#[allow(missing_docs)]
impl NotificationQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub const fn unread_only(mut self) -> Self {
        self.unread_only = true;
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Returns the same filters targeting the following page.
    #[must_use]
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// Returns the same filters targeting the first page.
    #[must_use]
    pub fn first_page(&self) -> Self {
        Self {
            page: 1,
            ..self.clone()
        }
    }
}

/// Operation applied to several notifications in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BulkOperation {
    MarkRead,
    MarkUnread,
    Delete,
}

impl BulkOperation {
    /// Returns the wire name of this operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarkRead => "mark_read",
            Self::MarkUnread => "mark_unread",
            Self::Delete => "delete",
        }
    }
}

/// Port for fetching and mutating notifications on the server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationsPort: Send + Sync {
    /// Fetches one page of notifications.
    async fn fetch_notifications(
        &self,
        query: &NotificationQuery,
    ) -> SyncResult<Page<NotificationRecord>>;

    /// Fetches the authoritative unread count.
    async fn fetch_unread_count(&self) -> SyncResult<u32>;

    /// Marks a notification read and returns the canonical record.
    async fn mark_read(&self, id: NotificationId) -> SyncResult<NotificationRecord>;

    /// Marks a notification unread and returns the canonical record.
    async fn mark_unread(&self, id: NotificationId) -> SyncResult<NotificationRecord>;

    /// Marks every notification read; returns how many changed.
    async fn mark_all_read(&self) -> SyncResult<u32>;

    /// Deletes a notification.
    async fn delete(&self, id: NotificationId) -> SyncResult<()>;

    /// Applies an operation to several notifications; returns how many changed.
    async fn bulk(&self, operation: BulkOperation, ids: &[NotificationId]) -> SyncResult<u32>;
}
