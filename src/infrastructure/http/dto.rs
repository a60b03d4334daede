use serde::{Deserialize, Serialize};

use crate::domain::entities::{Attachment, NotificationId, Page, Pagination};

/// Paginated list envelope returned by list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl<T> ListResponse<T> {
    /// Converts into a page, using `page` as the current page number.
    pub fn into_page(self, page: u32) -> Page<T> {
        let count = self
            .count
            .unwrap_or_else(|| u32::try_from(self.results.len()).unwrap_or(u32::MAX));
        Page::new(
            self.results,
            Pagination {
                count,
                current_page: page,
                has_next: self.next.is_some(),
                has_previous: self.previous.is_some(),
            },
        )
    }
}

/// Conversations come back either bare or wrapped in the list envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MaybePaged<T> {
    Paged(ListResponse<T>),
    Bare(Vec<T>),
}

impl<T> MaybePaged<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Paged(list) => list.results,
            Self::Bare(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UnreadCountResponse {
    pub unread_count: u32,
}

/// Count of records touched by a batch endpoint. Servers name it differently.
#[derive(Debug, Default, Deserialize)]
pub struct AffectedResponse {
    #[serde(default, alias = "updated", alias = "deleted", alias = "count")]
    pub affected: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct BulkActionRequest<'a> {
    pub action: &'a str,
    pub notification_ids: &'a [NotificationId],
}

#[derive(Debug, Serialize)]
pub struct SendMessageBody<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub attachments: &'a [Attachment],
}

#[derive(Debug, Serialize)]
pub struct EditMessageBody<'a> {
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ReactBody<'a> {
    pub emoji: &'a str,
}

/// Error body; servers use either `detail` or `message`.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(alias = "message")]
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Conversation, NotificationRecord};

    #[test]
    fn test_list_envelope_into_page() {
        let json = r#"{
            "results": [
                {"id": "3", "title": "Event", "message": "Tonight", "type": "event",
                 "priority": "high", "is_read": false, "read_at": null,
                 "created_at": "2024-03-01T10:00:00Z"}
            ],
            "count": 11,
            "next": "https://club.example.org/api/notifications/?page=3",
            "previous": "https://club.example.org/api/notifications/?page=1"
        }"#;

        let list: ListResponse<NotificationRecord> = serde_json::from_str(json).unwrap();
        let page = list.into_page(2);

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id(), NotificationId(3));
        assert_eq!(page.pagination.count, 11);
        assert_eq!(page.pagination.current_page, 2);
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_previous);
    }

    #[test]
    fn test_conversations_bare_or_paged() {
        let bare = r#"[{"id": 1, "type": "group", "updated_at": "2024-03-01T10:00:00Z"}]"#;
        let paged = r#"{"results": [{"id": 1, "updated_at": "2024-03-01T10:00:00Z"}], "next": null}"#;

        let a: MaybePaged<Conversation> = serde_json::from_str(bare).unwrap();
        let b: MaybePaged<Conversation> = serde_json::from_str(paged).unwrap();

        assert_eq!(a.into_items().len(), 1);
        assert_eq!(b.into_items().len(), 1);
    }

    #[test]
    fn test_bulk_request_shape() {
        let ids = [NotificationId(1), NotificationId(2)];
        let body = BulkActionRequest {
            action: "mark_read",
            notification_ids: &ids,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"action":"mark_read","notification_ids":[1,2]}"#
        );
    }

    #[test]
    fn test_affected_aliases() {
        let a: AffectedResponse = serde_json::from_str(r#"{"updated": 4}"#).unwrap();
        let b: AffectedResponse = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert_eq!(a.affected, Some(4));
        assert_eq!(b.affected, None);
    }
}
