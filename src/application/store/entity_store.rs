//! Ordered in-memory record collection.

use crate::domain::entities::Entity;

/// Ordered collection of records keyed by id.
///
/// Head of the list is the newest record. All operations are local and
/// cannot fail; a remote failure is repaired by the caller with [`replace`].
///
/// [`replace`]: EntityStore::replace
#[derive(Debug, Clone)]
pub struct EntityStore<T: Entity> {
    items: Vec<T>,
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Overwrites the full set, discarding everything previously held.
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Appends a further page at the tail, keeping arrival order.
    ///
    /// Ids already present are not deduplicated.
    pub fn append(&mut self, items: Vec<T>) {
        self.items.extend(items);
    }

    /// Inserts at the head if the id is new, otherwise replaces in place.
    ///
    /// Returns the previous record when one was replaced.
    pub fn upsert_one(&mut self, record: T) -> Option<T> {
        if let Some(pos) = self.position(record.key()) {
            Some(std::mem::replace(&mut self.items[pos], record))
        } else {
            self.items.insert(0, record);
            None
        }
    }

    /// Removes every record with `id`.
    ///
    /// Returns `None` if nothing matched, otherwise whether the removed
    /// record was unread.
    pub fn remove_one(&mut self, id: &T::Id) -> Option<bool> {
        let mut found = false;
        let mut was_unread = false;
        self.items.retain(|item| {
            if item.key() == id {
                found = true;
                was_unread |= item.counts_unread();
                false
            } else {
                true
            }
        });
        found.then_some(was_unread)
    }

    /// Removes all records whose id is in `ids`; returns how many of the
    /// removed ids were unread.
    pub fn remove_many(&mut self, ids: &[T::Id]) -> usize {
        ids.iter()
            .filter_map(|id| self.remove_one(id))
            .filter(|was_unread| *was_unread)
            .count()
    }

    /// Applies `patch` to every record with `id`. Returns false if absent.
    pub fn patch_one(&mut self, id: &T::Id, mut patch: impl FnMut(&mut T)) -> bool {
        let mut found = false;
        for item in self.items.iter_mut().filter(|item| item.key() == id) {
            patch(item);
            found = true;
        }
        found
    }

    /// Replaces the record stored under `old_id` with `record` (which may
    /// carry a different id). Inserts at the head if `old_id` is absent.
    pub fn replace_id(&mut self, old_id: &T::Id, record: T) {
        if let Some(pos) = self.position(old_id) {
            self.items[pos] = record;
        } else {
            self.upsert_one(record);
        }
    }

    /// Moves the record with `id` to the head. Returns false if absent.
    pub fn move_to_front(&mut self, id: &T::Id) -> bool {
        match self.position(id) {
            Some(0) => true,
            Some(pos) => {
                let item = self.items.remove(pos);
                self.items.insert(0, item);
                true
            }
            None => false,
        }
    }

    /// Returns the first record with `id`.
    #[must_use]
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.key() == id)
    }

    /// Returns whether a record with `id` is held.
    #[must_use]
    pub fn contains(&self, id: &T::Id) -> bool {
        self.position(id).is_some()
    }

    /// Returns the records in order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates the records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Mutably iterates the records in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Counts unread records by scanning the whole list.
    #[must_use]
    pub fn unread_len(&self) -> usize {
        self.items.iter().filter(|item| item.counts_unread()).count()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn position(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.key() == id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::entities::{NotificationId, NotificationRecord};

    fn record(id: u64) -> NotificationRecord {
        NotificationRecord::new(NotificationId(id), format!("n{id}"), "", Utc::now())
    }

    fn read_record(id: u64) -> NotificationRecord {
        record(id).read(Utc::now())
    }

    fn ids(store: &EntityStore<NotificationRecord>) -> Vec<u64> {
        store.iter().map(|r| r.id().as_u64()).collect()
    }

    #[test]
    fn test_replace_clears_previous() {
        let mut store = EntityStore::new();
        store.replace(vec![record(1), record(2)]);
        store.replace(vec![record(3)]);
        assert_eq!(ids(&store), vec![3]);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = EntityStore::new();
        store.replace(vec![record(10), record(9), record(8)]);
        store.append(vec![record(7), record(6)]);
        store.append(vec![record(5)]);
        assert_eq!(ids(&store), vec![10, 9, 8, 7, 6, 5]);
    }

    #[test]
    fn test_append_keeps_duplicates() {
        let mut store = EntityStore::new();
        store.replace(vec![record(2), record(1)]);
        store.append(vec![record(1), record(0)]);
        assert_eq!(ids(&store), vec![2, 1, 1, 0]);
    }

    #[test]
    fn test_upsert_inserts_new_at_head_and_replaces_in_place() {
        let mut store = EntityStore::new();
        store.replace(vec![record(2), record(1)]);

        assert!(store.upsert_one(record(3)).is_none());
        assert_eq!(ids(&store), vec![3, 2, 1]);

        let previous = store.upsert_one(read_record(1));
        assert!(previous.is_some_and(|p| !p.is_read()));
        assert_eq!(ids(&store), vec![3, 2, 1]);
        assert!(store.get(&NotificationId(1)).unwrap().is_read());
    }

    #[test]
    fn test_remove_reports_unread() {
        let mut store = EntityStore::new();
        store.replace(vec![record(1), read_record(2)]);

        assert_eq!(store.remove_one(&NotificationId(1)), Some(true));
        assert_eq!(store.remove_one(&NotificationId(2)), Some(false));
        assert_eq!(store.remove_one(&NotificationId(3)), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_many_counts_unread() {
        let mut store = EntityStore::new();
        store.replace(vec![record(1), read_record(2), record(3), record(4)]);

        let unread = store.remove_many(&[NotificationId(1), NotificationId(2), NotificationId(3)]);
        assert_eq!(unread, 2);
        assert_eq!(ids(&store), vec![4]);
    }

    #[test]
    fn test_patch_missing_is_noop() {
        let mut store = EntityStore::new();
        store.replace(vec![record(1)]);
        assert!(!store.patch_one(&NotificationId(9), |r| {
            r.mark_read(Utc::now());
        }));
        assert_eq!(store.unread_len(), 1);

        assert!(store.patch_one(&NotificationId(1), |r| {
            r.mark_read(Utc::now());
        }));
        assert_eq!(store.unread_len(), 0);
    }

    #[test]
    fn test_replace_id_and_move_to_front() {
        let mut store = EntityStore::new();
        store.replace(vec![record(1), record(2), record(3)]);

        store.replace_id(&NotificationId(2), record(20));
        assert_eq!(ids(&store), vec![1, 20, 3]);

        store.replace_id(&NotificationId(99), record(4));
        assert_eq!(ids(&store), vec![4, 1, 20, 3]);

        assert!(store.move_to_front(&NotificationId(3)));
        assert_eq!(ids(&store), vec![3, 4, 1, 20]);
        assert!(!store.move_to_front(&NotificationId(42)));
    }
}
