use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, UserId, numeric_id};

numeric_id!(
    /// Unique identifier for a notification.
    NotificationId
);

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Event,
    Message,
    System,
}

impl NotificationKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Event => "event",
            Self::Message => "message",
            Self::System => "system",
        }
    }
}

/// Notification priority, ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Returns the wire name of this priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Object a notification points at (an event, a club, a conversation...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedObject {
    /// Object type name, e.g. `"event"` or `"club"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Object id.
    #[serde(with = "crate::domain::serde_utils::flexible_id")]
    pub id: u64,
}

/// Action a user can take from a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Button label.
    pub label: String,
    /// Target the presentation layer navigates to.
    pub url: String,
}

/// A notification delivered to the current user.
///
/// `is_read` and `read_at` always agree: a record is read exactly when it
/// carries a read timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NotificationPayload")]
pub struct NotificationRecord {
    id: NotificationId,
    title: String,
    message: String,
    #[serde(rename = "type")]
    kind: NotificationKind,
    priority: Priority,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    sender: Option<UserId>,
    related_object: Option<RelatedObject>,
    actions: Vec<NotificationAction>,
}

#[allow(missing_docs)]
impl NotificationRecord {
    /// Creates an unread notification.
    #[must_use]
    pub fn new(
        id: NotificationId,
        title: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            message: message.into(),
            kind: NotificationKind::default(),
            priority: Priority::default(),
            is_read: false,
            read_at: None,
            created_at,
            sender: None,
            related_object: None,
            actions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_sender(mut self, sender: UserId) -> Self {
        self.sender = Some(sender);
        self
    }

    #[must_use]
    pub fn with_related_object(mut self, related: RelatedObject) -> Self {
        self.related_object = Some(related);
        self
    }

    #[must_use]
    pub fn with_actions(mut self, actions: Vec<NotificationAction>) -> Self {
        self.actions = actions;
        self
    }

    /// Returns the record already marked read at `at`.
    #[must_use]
    pub fn read(mut self, at: DateTime<Utc>) -> Self {
        self.mark_read(at);
        self
    }

    #[must_use]
    pub const fn id(&self) -> NotificationId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        self.kind
    }

    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.is_read
    }

    #[must_use]
    pub const fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn sender(&self) -> Option<UserId> {
        self.sender
    }

    #[must_use]
    pub const fn related_object(&self) -> Option<&RelatedObject> {
        self.related_object.as_ref()
    }

    #[must_use]
    pub fn actions(&self) -> &[NotificationAction] {
        &self.actions
    }

    /// Marks the record read. Returns `true` if it was unread before.
    ///
    /// An already-read record keeps its original timestamp.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(at);
        true
    }

    /// Marks the record unread. Returns `true` if it was read before.
    pub fn mark_unread(&mut self) -> bool {
        if !self.is_read {
            return false;
        }
        self.is_read = false;
        self.read_at = None;
        true
    }
}

impl Entity for NotificationRecord {
    type Id = NotificationId;

    fn key(&self) -> &NotificationId {
        &self.id
    }

    fn counts_unread(&self) -> bool {
        !self.is_read
    }
}

/// Wire shape; normalized into a record whose read flag matches `read_at`.
#[derive(Deserialize)]
struct NotificationPayload {
    id: NotificationId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: NotificationKind,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    is_read: bool,
    #[serde(default)]
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    sender: Option<UserId>,
    #[serde(default)]
    related_object: Option<RelatedObject>,
    #[serde(default)]
    actions: Vec<NotificationAction>,
}

impl From<NotificationPayload> for NotificationRecord {
    fn from(payload: NotificationPayload) -> Self {
        // A read flag without a timestamp gets the creation time; a timestamp wins over a stale flag.
        let read_at = match (payload.is_read, payload.read_at) {
            (_, Some(at)) => Some(at),
            (true, None) => Some(payload.created_at),
            (false, None) => None,
        };

        Self {
            id: payload.id,
            title: payload.title,
            message: payload.message,
            kind: payload.kind,
            priority: payload.priority,
            is_read: read_at.is_some(),
            read_at,
            created_at: payload.created_at,
            sender: payload.sender,
            related_object: payload.related_object,
            actions: payload.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_mark_read_and_unread_keep_invariant() {
        let mut record = NotificationRecord::new(NotificationId(1), "Hi", "Body", ts());
        assert!(!record.is_read());
        assert!(record.read_at().is_none());

        assert!(record.mark_read(ts()));
        assert!(record.is_read());
        assert_eq!(record.read_at(), Some(ts()));

        assert!(!record.mark_read(ts()));

        assert!(record.mark_unread());
        assert!(!record.is_read());
        assert!(record.read_at().is_none());
        assert!(!record.mark_unread());
    }

    #[test]
    fn test_decode_from_wire() {
        let json = serde_json::json!({
            "id": "12",
            "title": "Meeting moved",
            "message": "Chess club now meets in room 4",
            "type": "event",
            "priority": "high",
            "is_read": false,
            "read_at": null,
            "created_at": "2024-03-01T10:00:00Z",
            "sender": 5,
            "related_object": {"type": "event", "id": "77"},
            "actions": [{"label": "Open", "url": "/events/77"}]
        });

        let record: NotificationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.id(), NotificationId(12));
        assert_eq!(record.kind(), NotificationKind::Event);
        assert_eq!(record.priority(), Priority::High);
        assert_eq!(record.sender(), Some(UserId(5)));
        assert_eq!(record.related_object().unwrap().id, 77);
        assert_eq!(record.actions().len(), 1);
        assert!(!record.is_read());
    }

    #[test]
    fn test_decode_normalizes_inconsistent_read_state() {
        let flagged = serde_json::json!({
            "id": 1, "is_read": true, "read_at": null,
            "created_at": "2024-03-01T10:00:00Z"
        });
        let stamped = serde_json::json!({
            "id": 2, "is_read": false, "read_at": "2024-03-02T10:00:00Z",
            "created_at": "2024-03-01T10:00:00Z"
        });

        let flagged: NotificationRecord = serde_json::from_value(flagged).unwrap();
        let stamped: NotificationRecord = serde_json::from_value(stamped).unwrap();

        assert!(flagged.is_read());
        assert_eq!(flagged.read_at(), Some(ts()));
        assert!(stamped.is_read());
        assert!(stamped.read_at().is_some());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::Low < Priority::Normal);
    }
}
