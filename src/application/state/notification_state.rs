//! Notification state container and its transition function.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::application::dto::NotificationSnapshot;
use crate::application::store::{EntityStore, UnreadCounter};
use crate::domain::entities::{NotificationId, NotificationRecord, Page, Pagination};
use crate::domain::errors::SyncError;
use crate::domain::ports::NotificationQuery;

/// Every transition the notification state accepts.
#[derive(Debug, Clone)]
pub enum NotificationChange {
    /// A list fetch was issued; `append` marks a "load more".
    FetchStarted { query: NotificationQuery, append: bool },
    /// A list fetch completed.
    FetchSucceeded {
        page: Page<NotificationRecord>,
        append: bool,
    },
    /// A list or count fetch failed; loaded data is kept.
    FetchFailed(SyncError),
    /// The server reported the authoritative unread count.
    CountSynced(u32),
    MarkedRead {
        id: NotificationId,
        at: DateTime<Utc>,
    },
    MarkedUnread {
        id: NotificationId,
    },
    AllMarkedRead {
        at: DateTime<Utc>,
    },
    BulkMarkedRead {
        ids: Vec<NotificationId>,
        at: DateTime<Utc>,
    },
    BulkMarkedUnread {
        ids: Vec<NotificationId>,
    },
    Removed {
        id: NotificationId,
    },
    BulkRemoved {
        ids: Vec<NotificationId>,
    },
    /// A record arrived over the push channel.
    Received(NotificationRecord),
    /// The server returned the canonical version of a record.
    Confirmed(NotificationRecord),
    /// Records an error without touching loading flags.
    ErrorRaised(SyncError),
    ClearError,
}

/// Notification list, unread counter, and request flags.
#[derive(Debug, Default)]
pub struct NotificationState {
    store: EntityStore<NotificationRecord>,
    counter: UnreadCounter,
    pagination: Pagination,
    query: NotificationQuery,
    loading: bool,
    loading_more: bool,
    error: Option<SyncError>,
}

impl NotificationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one change. This is the only way the state changes.
    pub fn apply(&mut self, change: NotificationChange) {
        trace!(change = change_name(&change), "Applying notification change");

        match change {
            NotificationChange::FetchStarted { query, append } => {
                self.query = query;
                if append {
                    self.loading_more = true;
                } else {
                    self.loading = true;
                }
            }
            NotificationChange::FetchSucceeded { page, append } => {
                if append {
                    self.store.append(page.items);
                    self.loading_more = false;
                } else {
                    self.store.replace(page.items);
                    self.loading = false;
                }
                self.pagination = page.pagination;
                self.error = None;
            }
            NotificationChange::FetchFailed(error) => {
                self.loading = false;
                self.loading_more = false;
                self.error = Some(error);
            }
            NotificationChange::CountSynced(count) => self.counter.resync(count),
            NotificationChange::MarkedRead { id, at } => self.mark_read(&id, at),
            NotificationChange::MarkedUnread { id } => self.mark_unread(&id),
            NotificationChange::AllMarkedRead { at } => {
                for record in self.store.iter_mut() {
                    record.mark_read(at);
                }
                self.counter.decrement_by(self.counter.value());
            }
            NotificationChange::BulkMarkedRead { ids, at } => {
                for id in &ids {
                    self.mark_read(id, at);
                }
            }
            NotificationChange::BulkMarkedUnread { ids } => {
                for id in &ids {
                    self.mark_unread(id);
                }
            }
            NotificationChange::Removed { id } => {
                if self.store.remove_one(&id) == Some(true) {
                    self.counter.decrement_by(1);
                }
                self.shrink_total(1);
            }
            NotificationChange::BulkRemoved { ids } => {
                let unread = self.store.remove_many(&ids);
                self.counter
                    .decrement_by(u32::try_from(unread).unwrap_or(u32::MAX));
                self.shrink_total(ids.len());
            }
            NotificationChange::Received(record) => {
                let unread = !record.is_read();
                match self.store.upsert_one(record) {
                    None => {
                        if unread {
                            self.counter.increment();
                        }
                        self.pagination.count = self.pagination.count.saturating_add(1);
                    }
                    Some(previous) => self.adjust_for_change(!previous.is_read(), unread),
                }
            }
            NotificationChange::Confirmed(record) => {
                let id = record.id();
                let now_unread = !record.is_read();
                if let Some(was_unread) = self.store.get(&id).map(|r| !r.is_read()) {
                    self.store.patch_one(&id, |r| *r = record.clone());
                    self.adjust_for_change(was_unread, now_unread);
                }
            }
            NotificationChange::ErrorRaised(error) => self.error = Some(error),
            NotificationChange::ClearError => self.error = None,
        }
    }

    fn mark_read(&mut self, id: &NotificationId, at: DateTime<Utc>) {
        let was_unread = self.store.get(id).is_some_and(|r| !r.is_read());
        if was_unread {
            self.store.patch_one(id, |r| {
                r.mark_read(at);
            });
            self.counter.decrement_by(1);
        }
    }

    fn mark_unread(&mut self, id: &NotificationId) {
        let was_read = self.store.get(id).is_some_and(NotificationRecord::is_read);
        if was_read {
            self.store.patch_one(id, |r| {
                r.mark_unread();
            });
            self.counter.increment();
        }
    }

    fn adjust_for_change(&mut self, was_unread: bool, now_unread: bool) {
        match (was_unread, now_unread) {
            (true, false) => self.counter.decrement_by(1),
            (false, true) => self.counter.increment(),
            _ => {}
        }
    }

    fn shrink_total(&mut self, by: usize) {
        let by = u32::try_from(by).unwrap_or(u32::MAX);
        self.pagination.count = self.pagination.count.saturating_sub(by);
    }

    #[must_use]
    pub fn records(&self) -> &[NotificationRecord] {
        self.store.as_slice()
    }

    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<&NotificationRecord> {
        self.store.get(&id)
    }

    #[must_use]
    pub const fn counter(&self) -> &UnreadCounter {
        &self.counter
    }

    #[must_use]
    pub const fn unread_count(&self) -> u32 {
        self.counter.value()
    }

    #[must_use]
    pub const fn pagination(&self) -> Pagination {
        self.pagination
    }

    #[must_use]
    pub const fn query(&self) -> &NotificationQuery {
        &self.query
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    #[must_use]
    pub const fn error(&self) -> Option<&SyncError> {
        self.error.as_ref()
    }

    /// Returns a read-only copy for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> NotificationSnapshot {
        NotificationSnapshot {
            items: self.store.as_slice().to_vec(),
            unread_count: self.counter.value(),
            loading: self.loading,
            loading_more: self.loading_more,
            error: self.error.as_ref().map(ToString::to_string),
            pagination: self.pagination,
        }
    }
}

const fn change_name(change: &NotificationChange) -> &'static str {
    match change {
        NotificationChange::FetchStarted { .. } => "fetch_started",
        NotificationChange::FetchSucceeded { .. } => "fetch_succeeded",
        NotificationChange::FetchFailed(_) => "fetch_failed",
        NotificationChange::CountSynced(_) => "count_synced",
        NotificationChange::MarkedRead { .. } => "marked_read",
        NotificationChange::MarkedUnread { .. } => "marked_unread",
        NotificationChange::AllMarkedRead { .. } => "all_marked_read",
        NotificationChange::BulkMarkedRead { .. } => "bulk_marked_read",
        NotificationChange::BulkMarkedUnread { .. } => "bulk_marked_unread",
        NotificationChange::Removed { .. } => "removed",
        NotificationChange::BulkRemoved { .. } => "bulk_removed",
        NotificationChange::Received(_) => "received",
        NotificationChange::Confirmed(_) => "confirmed",
        NotificationChange::ErrorRaised(_) => "error_raised",
        NotificationChange::ClearError => "clear_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::store::CounterState;

    fn unread(id: u64) -> NotificationRecord {
        NotificationRecord::new(NotificationId(id), format!("n{id}"), "", Utc::now())
    }

    fn read(id: u64) -> NotificationRecord {
        unread(id).read(Utc::now())
    }

    fn loaded(records: Vec<NotificationRecord>) -> NotificationState {
        let mut state = NotificationState::new();
        let count = u32::try_from(records.iter().filter(|r| !r.is_read()).count()).unwrap();
        state.apply(NotificationChange::FetchSucceeded {
            page: Page::single(records),
            append: false,
        });
        state.apply(NotificationChange::CountSynced(count));
        state
    }

    fn scanned_unread(state: &NotificationState) -> u32 {
        u32::try_from(state.records().iter().filter(|r| !r.is_read()).count()).unwrap()
    }

    #[test]
    fn test_mark_read_unread_sequence_matches_scan() {
        let mut state = loaded(vec![unread(1), unread(2), read(3)]);
        let now = Utc::now();

        let steps = [
            NotificationChange::MarkedRead { id: NotificationId(1), at: now },
            NotificationChange::MarkedRead { id: NotificationId(1), at: now },
            NotificationChange::MarkedUnread { id: NotificationId(3) },
            NotificationChange::MarkedUnread { id: NotificationId(2) },
            NotificationChange::MarkedRead { id: NotificationId(2), at: now },
            NotificationChange::MarkedUnread { id: NotificationId(1) },
            NotificationChange::MarkedRead { id: NotificationId(42), at: now },
        ];

        for step in steps {
            state.apply(step);
            assert_eq!(state.unread_count(), scanned_unread(&state));
        }
    }

    #[test]
    fn test_delete_unread_decrements_once_read_leaves_counter() {
        let mut state = loaded(vec![unread(1), read(2)]);
        assert_eq!(state.unread_count(), 1);

        state.apply(NotificationChange::Removed { id: NotificationId(2) });
        assert_eq!(state.unread_count(), 1);

        state.apply(NotificationChange::Removed { id: NotificationId(1) });
        assert_eq!(state.unread_count(), 0);
        assert!(state.records().is_empty());
    }

    #[test]
    fn test_bulk_delete_decrements_by_unread_only() {
        let mut state = loaded(vec![unread(1), read(2), unread(3), unread(4)]);
        assert_eq!(state.unread_count(), 3);

        state.apply(NotificationChange::BulkRemoved {
            ids: vec![NotificationId(1), NotificationId(2), NotificationId(3)],
        });

        assert_eq!(state.unread_count(), 1);
        assert_eq!(state.records().len(), 1);
        assert_eq!(state.records()[0].id(), NotificationId(4));
    }

    #[test]
    fn test_received_new_goes_to_head_and_counts() {
        let mut state = loaded(vec![read(1)]);
        state.apply(NotificationChange::Received(unread(2)));

        assert_eq!(state.records()[0].id(), NotificationId(2));
        assert_eq!(state.unread_count(), 1);
        assert_eq!(state.pagination().count, 2);

        state.apply(NotificationChange::Received(read(2)));
        assert_eq!(state.records().len(), 2);
        assert_eq!(state.unread_count(), 0);
    }

    #[test]
    fn test_all_marked_read_zeroes_counter() {
        let mut state = loaded(vec![unread(1), unread(2)]);
        state.apply(NotificationChange::AllMarkedRead { at: Utc::now() });
        assert_eq!(state.unread_count(), 0);
        assert!(state.records().iter().all(NotificationRecord::is_read));
        assert_eq!(state.counter().state(), CounterState::Drifting { pending: 1 });

        state.apply(NotificationChange::CountSynced(0));
        assert_eq!(state.counter().state(), CounterState::Synced);
    }

    #[test]
    fn test_fetch_failure_keeps_previous_data() {
        let mut state = loaded(vec![unread(1)]);
        state.apply(NotificationChange::FetchStarted {
            query: NotificationQuery::new(),
            append: false,
        });
        assert!(state.is_loading());

        state.apply(NotificationChange::FetchFailed(SyncError::fetch("notifications", "down")));
        assert!(!state.is_loading());
        assert_eq!(state.records().len(), 1);
        assert!(state.error().is_some_and(SyncError::is_fetch_failure));
    }

    #[test]
    fn test_confirmed_reconciles_counter() {
        let mut state = loaded(vec![unread(1)]);
        state.apply(NotificationChange::Confirmed(read(1)));
        assert_eq!(state.unread_count(), 0);

        state.apply(NotificationChange::Confirmed(read(9)));
        assert_eq!(state.records().len(), 1);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let state = loaded(vec![unread(1), read(2)]);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.unread_count, 1);
        assert!(snapshot.error.is_none());
    }
}
