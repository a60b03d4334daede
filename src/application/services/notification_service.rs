//! Notification actions with optimistic updates and rollback by refetch.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::dto::NotificationSnapshot;
use crate::application::settings::SyncSettings;
use crate::application::state::{NotificationChange, NotificationState, SharedState};
use crate::application::subscription::PushHandler;
use crate::domain::entities::{NotificationId, NotificationRecord, Pagination};
use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::ports::{BulkOperation, NotificationQuery, NotificationsPort, SyncDomain};

/// Owns the notification state and every action that changes it.
#[derive(Clone)]
pub struct NotificationService {
    port: Arc<dyn NotificationsPort>,
    state: Arc<SharedState<NotificationState>>,
    settings: SyncSettings,
}

impl NotificationService {
    #[must_use]
    pub fn new(port: Arc<dyn NotificationsPort>, settings: SyncSettings) -> Self {
        Self {
            port,
            state: Arc::new(SharedState::new(NotificationState::new())),
            settings,
        }
    }

    /// Loads the first page and the authoritative unread count.
    ///
    /// # Errors
    /// Returns the first failure; the other request still runs.
    pub async fn initialize(&self) -> SyncResult<()> {
        let list = self.fetch_notifications(NotificationQuery::new()).await;
        let count = self.refresh_unread_count().await;
        list?;
        count?;
        Ok(())
    }

    /// Replaces the loaded list with the page matching `query`.
    ///
    /// # Errors
    /// Returns `SyncError::Fetch`; previously loaded records are kept.
    pub async fn fetch_notifications(&self, query: NotificationQuery) -> SyncResult<Pagination> {
        let query = self.with_default_page_size(query);
        self.fetch_page(query, false).await
    }

    /// Appends the next page of the last query. No-op when there is no
    /// further page or a load is already in flight.
    ///
    /// # Errors
    /// Returns `SyncError::Fetch`.
    pub async fn load_more(&self) -> SyncResult<Pagination> {
        let (busy, pagination, query) = self.state.read(|s| {
            (
                s.is_loading_more(),
                s.pagination(),
                s.query().clone(),
            )
        });
        if busy || !pagination.has_next {
            debug!(busy, has_next = pagination.has_next, "Skipping load more");
            return Ok(pagination);
        }

        let next = NotificationQuery {
            page: pagination.current_page.saturating_add(1),
            ..query
        };
        self.fetch_page(next, true).await
    }

    async fn fetch_page(&self, query: NotificationQuery, append: bool) -> SyncResult<Pagination> {
        debug!(page = query.page, append, "Fetching notifications");
        self.state.update(|s| {
            s.apply(NotificationChange::FetchStarted {
                query: query.clone(),
                append,
            });
        });

        match self.port.fetch_notifications(&query).await {
            Ok(page) => {
                let pagination = page.pagination;
                self.state
                    .update(|s| s.apply(NotificationChange::FetchSucceeded { page, append }));
                Ok(pagination)
            }
            Err(e) => {
                let error = e.into_fetch("notifications");
                warn!(error = %error, "Notification fetch failed");
                self.state
                    .update(|s| s.apply(NotificationChange::FetchFailed(error.clone())));
                Err(error)
            }
        }
    }

    /// Overwrites the unread counter with the server's value.
    ///
    /// # Errors
    /// Returns `SyncError::Fetch`.
    pub async fn refresh_unread_count(&self) -> SyncResult<u32> {
        match self.port.fetch_unread_count().await {
            Ok(count) => {
                debug!(count, "Notification unread count synced");
                self.state
                    .update(|s| s.apply(NotificationChange::CountSynced(count)));
                Ok(count)
            }
            Err(e) => {
                let error = e.into_fetch("notification unread count");
                warn!(error = %error, "Unread count fetch failed");
                self.state
                    .update(|s| s.apply(NotificationChange::ErrorRaised(error.clone())));
                Err(error)
            }
        }
    }

    /// # Errors
    /// Returns `SyncError::Mutation` after rolling back.
    pub async fn mark_as_read(&self, id: NotificationId) -> SyncResult<NotificationRecord> {
        self.state
            .update(|s| s.apply(NotificationChange::MarkedRead { id, at: Utc::now() }));

        let result = self.port.mark_read(id).await;
        self.confirm_record(result, "mark_read").await
    }

    /// # Errors
    /// Returns `SyncError::Mutation` after rolling back.
    pub async fn mark_as_unread(&self, id: NotificationId) -> SyncResult<NotificationRecord> {
        self.state
            .update(|s| s.apply(NotificationChange::MarkedUnread { id }));

        let result = self.port.mark_unread(id).await;
        self.confirm_record(result, "mark_unread").await
    }

    /// Marks everything read; returns how many the server changed.
    ///
    /// # Errors
    /// Returns `SyncError::Mutation` after rolling back.
    pub async fn mark_all_as_read(&self) -> SyncResult<u32> {
        self.state
            .update(|s| s.apply(NotificationChange::AllMarkedRead { at: Utc::now() }));

        match self.port.mark_all_read().await {
            Ok(changed) => {
                info!(changed, "Marked all notifications read");
                self.resync_if_drifting().await;
                Ok(changed)
            }
            Err(e) => Err(self.rollback(e, "mark_all_read").await),
        }
    }

    /// # Errors
    /// Returns `SyncError::Mutation` after rolling back.
    pub async fn delete(&self, id: NotificationId) -> SyncResult<()> {
        self.state
            .update(|s| s.apply(NotificationChange::Removed { id }));

        match self.port.delete(id).await {
            Ok(()) => {
                self.resync_if_drifting().await;
                Ok(())
            }
            Err(e) => Err(self.rollback(e, "delete").await),
        }
    }

    /// # Errors
    /// Returns `SyncError::Mutation` after rolling back.
    pub async fn bulk_mark_read(&self, ids: Vec<NotificationId>) -> SyncResult<u32> {
        let at = Utc::now();
        self.bulk(BulkOperation::MarkRead, ids, |ids| {
            NotificationChange::BulkMarkedRead { ids, at }
        })
        .await
    }

    /// # Errors
    /// Returns `SyncError::Mutation` after rolling back.
    pub async fn bulk_mark_unread(&self, ids: Vec<NotificationId>) -> SyncResult<u32> {
        self.bulk(BulkOperation::MarkUnread, ids, |ids| {
            NotificationChange::BulkMarkedUnread { ids }
        })
        .await
    }

    /// Deletes several notifications; the counter drops by the number of
    /// unread ones among them.
    ///
    /// # Errors
    /// Returns `SyncError::Mutation` after rolling back.
    pub async fn bulk_delete(&self, ids: Vec<NotificationId>) -> SyncResult<u32> {
        self.bulk(BulkOperation::Delete, ids, |ids| {
            NotificationChange::BulkRemoved { ids }
        })
        .await
    }

    async fn bulk(
        &self,
        operation: BulkOperation,
        ids: Vec<NotificationId>,
        change: impl FnOnce(Vec<NotificationId>) -> NotificationChange,
    ) -> SyncResult<u32> {
        if ids.is_empty() {
            return Ok(0);
        }

        let request = ids.clone();
        self.state.update(|s| s.apply(change(ids)));

        match self.port.bulk(operation, &request).await {
            Ok(changed) => {
                debug!(operation = operation.as_str(), changed, "Bulk action applied");
                self.resync_if_drifting().await;
                Ok(changed)
            }
            Err(e) => Err(self.rollback(e, operation.as_str()).await),
        }
    }

    async fn confirm_record(
        &self,
        result: SyncResult<NotificationRecord>,
        operation: &str,
    ) -> SyncResult<NotificationRecord> {
        match result {
            Ok(record) => {
                self.state
                    .update(|s| s.apply(NotificationChange::Confirmed(record.clone())));
                self.resync_if_drifting().await;
                Ok(record)
            }
            Err(e) => Err(self.rollback(e, operation).await),
        }
    }

    /// Restores server truth after a rejected mutation: refetches the first
    /// page of the current query and the unread count, then records `error`.
    async fn rollback(&self, error: SyncError, operation: &str) -> SyncError {
        let error = error.into_mutation(operation);
        warn!(operation, error = %error, "Mutation failed, refetching notifications");

        let query = self.state.read(|s| s.query().first_page());
        if let Err(e) = self.fetch_page(query, false).await {
            warn!(error = %e, "Rollback refetch failed");
        }
        if let Err(e) = self.refresh_unread_count().await {
            warn!(error = %e, "Rollback count resync failed");
        }

        self.state
            .update(|s| s.apply(NotificationChange::ErrorRaised(error.clone())));
        error
    }

    async fn resync_if_drifting(&self) {
        let threshold = self.settings.drift_resync_threshold;
        if self.state.read(|s| s.counter().needs_resync(threshold)) {
            debug!(threshold, "Notification counter drifted, resyncing");
            let _ = self.refresh_unread_count().await;
        }
    }

    fn with_default_page_size(&self, query: NotificationQuery) -> NotificationQuery {
        match query.page_size {
            Some(_) => query,
            None => query.with_page_size(self.settings.page_size),
        }
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.apply(NotificationChange::ClearError));
    }

    #[must_use]
    pub fn snapshot(&self) -> NotificationSnapshot {
        self.state.read(NotificationState::snapshot)
    }

    #[must_use]
    pub fn unread_count(&self) -> u32 {
        self.state.read(NotificationState::unread_count)
    }

    /// Receiver that changes on every state update.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.state.changes()
    }
}

#[async_trait]
impl PushHandler for NotificationService {
    fn domain(&self) -> SyncDomain {
        SyncDomain::Notifications
    }

    async fn on_new_notification(&self, record: NotificationRecord) {
        debug!(id = %record.id(), "Pushed notification");
        self.state
            .update(|s| s.apply(NotificationChange::Received(record)));
        self.resync_if_drifting().await;
    }

    async fn on_unread_count_update(&self, count: u32) {
        self.state
            .update(|s| s.apply(NotificationChange::CountSynced(count)));
    }

    async fn resync(&self) -> SyncResult<()> {
        self.refresh_unread_count().await.map(|_| ())
    }
}
