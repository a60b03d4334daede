//! Club REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::dto::{
    AffectedResponse, BulkActionRequest, EditMessageBody, ErrorResponse, ListResponse, MaybePaged,
    ReactBody, SendMessageBody, UnreadCountResponse,
};
use crate::domain::entities::{
    ApiToken, Conversation, ConversationId, MessageRecord, NotificationId, NotificationRecord,
    Page,
};
use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::ports::{
    BulkOperation, EditMessageRequest, MessageQuery, MessagingPort, NotificationQuery,
    NotificationsPort, SendMessageRequest,
};

const USER_AGENT: &str = concat!("clubsync/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_FALLBACK_MS: u64 = 5000;

/// REST client serving both the notification and messaging ports.
pub struct RestClient {
    client: Client,
    base_url: String,
    token: ApiToken,
}

impl RestClient {
    /// Creates a client rooted at `base_url`.
    ///
    /// # Errors
    /// Returns `SyncError::Network` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        token: ApiToken,
        timeout: Duration,
    ) -> SyncResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(self.token.as_str())
    }

    async fn send(&self, request: RequestBuilder) -> SyncResult<Response> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Request to club API failed");
            if e.is_timeout() {
                SyncError::network("request timed out")
            } else if e.is_connect() {
                SyncError::network("failed to connect to club API")
            } else {
                SyncError::network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Self::handle_error_response(status, response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> SyncResult<T> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(|e| {
            warn!(error = %e, "Failed to parse club API response");
            SyncError::decode(e.to_string())
        })
    }

    /// Sends a request whose body may be empty or irrelevant.
    async fn send_ignoring_body(&self, request: RequestBuilder) -> SyncResult<()> {
        self.send(request).await.map(drop)
    }

    /// Sends a batch request and reads how many records it touched, if the
    /// server says.
    async fn send_affected(&self, request: RequestBuilder, fallback: u32) -> SyncResult<u32> {
        let response = self.send(request).await?;
        let body = response.bytes().await.map_err(|e| SyncError::network(e.to_string()))?;
        let affected = serde_json::from_slice::<AffectedResponse>(&body)
            .unwrap_or_default()
            .affected;
        Ok(affected.unwrap_or(fallback))
    }

    async fn handle_error_response(status: StatusCode, response: Response) -> SyncError {
        let retry_after_ms = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));

        let error_message = match response.json::<ErrorResponse>().await {
            Ok(error) => error.detail,
            Err(_) => format!("HTTP {status}"),
        };

        classify_status(status, retry_after_ms, error_message)
    }
}

/// Maps a non-success status to the error the services act on.
fn classify_status(status: StatusCode, retry_after_ms: Option<u64>, message: String) -> SyncError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Unauthorized,
        StatusCode::NOT_FOUND => SyncError::NotFound { id: message },
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited {
            retry_after_ms: retry_after_ms.unwrap_or(RATE_LIMIT_FALLBACK_MS),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => SyncError::validation(message),
        s if s.is_server_error() => SyncError::network(format!("server error {s}: {message}")),
        s => SyncError::network(format!("unexpected response: {s} - {message}")),
    }
}

fn notification_params(query: &NotificationQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("page", query.page.max(1).to_string())];
    if let Some(size) = query.page_size {
        params.push(("page_size", size.to_string()));
    }
    if query.unread_only {
        params.push(("is_read", "false".to_string()));
    }
    if let Some(kind) = query.kind {
        params.push(("type", kind.as_str().to_string()));
    }
    if let Some(priority) = query.priority {
        params.push(("priority", priority.as_str().to_string()));
    }
    params
}

fn message_params(query: &MessageQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("page", query.page.max(1).to_string())];
    if let Some(size) = query.page_size {
        params.push(("page_size", size.to_string()));
    }
    params
}

#[async_trait]
impl NotificationsPort for RestClient {
    async fn fetch_notifications(
        &self,
        query: &NotificationQuery,
    ) -> SyncResult<Page<NotificationRecord>> {
        debug!(page = query.page, "Fetching notifications");
        let list: ListResponse<NotificationRecord> = self
            .send_json(
                self.request(Method::GET, "notifications/")
                    .query(&notification_params(query)),
            )
            .await?;
        Ok(list.into_page(query.page.max(1)))
    }

    async fn fetch_unread_count(&self) -> SyncResult<u32> {
        let body: UnreadCountResponse = self
            .send_json(self.request(Method::GET, "notifications/unread_count/"))
            .await?;
        Ok(body.unread_count)
    }

    async fn mark_read(&self, id: NotificationId) -> SyncResult<NotificationRecord> {
        self.send_json(self.request(Method::POST, &format!("notifications/{id}/mark_read/")))
            .await
    }

    async fn mark_unread(&self, id: NotificationId) -> SyncResult<NotificationRecord> {
        self.send_json(self.request(Method::POST, &format!("notifications/{id}/mark_unread/")))
            .await
    }

    async fn mark_all_read(&self) -> SyncResult<u32> {
        self.send_affected(self.request(Method::POST, "notifications/mark_all_read/"), 0)
            .await
    }

    async fn delete(&self, id: NotificationId) -> SyncResult<()> {
        self.send_ignoring_body(self.request(Method::DELETE, &format!("notifications/{id}/")))
            .await
    }

    async fn bulk(&self, operation: BulkOperation, ids: &[NotificationId]) -> SyncResult<u32> {
        debug!(action = operation.as_str(), count = ids.len(), "Bulk notification action");
        let body = BulkActionRequest {
            action: operation.as_str(),
            notification_ids: ids,
        };
        let fallback = u32::try_from(ids.len()).unwrap_or(u32::MAX);
        self.send_affected(
            self.request(Method::POST, "notifications/bulk_action/").json(&body),
            fallback,
        )
        .await
    }
}

#[async_trait]
impl MessagingPort for RestClient {
    async fn fetch_conversations(&self) -> SyncResult<Vec<Conversation>> {
        let body: MaybePaged<Conversation> = self
            .send_json(self.request(Method::GET, "conversations/"))
            .await?;
        Ok(body.into_items())
    }

    async fn fetch_messages(&self, query: &MessageQuery) -> SyncResult<Page<MessageRecord>> {
        debug!(
            conversation_id = %query.conversation_id,
            page = query.page,
            "Fetching messages"
        );
        let path = format!("conversations/{}/messages/", query.conversation_id);
        let list: ListResponse<MessageRecord> = self
            .send_json(self.request(Method::GET, &path).query(&message_params(query)))
            .await?;
        Ok(list.into_page(query.page.max(1)))
    }

    async fn fetch_unread_count(&self) -> SyncResult<u32> {
        let body: UnreadCountResponse = self
            .send_json(self.request(Method::GET, "messages/unread_count/"))
            .await?;
        Ok(body.unread_count)
    }

    async fn send_message(&self, request: SendMessageRequest) -> SyncResult<MessageRecord> {
        let path = format!("conversations/{}/messages/", request.conversation_id);
        let body = SendMessageBody {
            content: &request.content,
            attachments: &request.attachments,
        };
        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn edit_message(&self, request: EditMessageRequest) -> SyncResult<MessageRecord> {
        let path = format!("messages/{}/", request.message_id);
        let body = EditMessageBody {
            content: &request.content,
        };
        self.send_json(self.request(Method::PATCH, &path).json(&body))
            .await
    }

    async fn delete_message(&self, message_id: u64) -> SyncResult<()> {
        self.send_ignoring_body(self.request(Method::DELETE, &format!("messages/{message_id}/")))
            .await
    }

    async fn react(&self, message_id: u64, emoji: &str) -> SyncResult<MessageRecord> {
        let path = format!("messages/{message_id}/react/");
        self.send_json(self.request(Method::POST, &path).json(&ReactBody { emoji }))
            .await
    }

    async fn mark_conversation_read(&self, conversation_id: ConversationId) -> SyncResult<()> {
        let path = format!("conversations/{conversation_id}/mark_read/");
        self.send_ignoring_body(self.request(Method::POST, &path))
            .await
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::entities::{NotificationKind, Priority};

    fn client(base: &str) -> RestClient {
        RestClient::new(
            base,
            ApiToken::new_unchecked("c2VjcmV0LXRva2VuLXZhbHVl"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_client_creation_trims_base() {
        let client = client("https://club.example.org/api/");
        assert_eq!(client.base_url(), "https://club.example.org/api");
        assert_eq!(
            client.url("/notifications/3/mark_read/"),
            "https://club.example.org/api/notifications/3/mark_read/"
        );
    }

    #[test]
    fn test_notification_params_include_filters() {
        let query = NotificationQuery::new()
            .with_page_size(25)
            .unread_only()
            .with_kind(NotificationKind::Event)
            .with_priority(Priority::High);

        let params = notification_params(&query);

        assert_eq!(
            params,
            vec![
                ("page", "1".to_string()),
                ("page_size", "25".to_string()),
                ("is_read", "false".to_string()),
                ("type", "event".to_string()),
                ("priority", "high".to_string()),
            ]
        );
    }

    #[test]
    fn test_message_params_default_page() {
        let query = MessageQuery::new(ConversationId(4)).next_page();
        assert_eq!(message_params(&query), vec![("page", "2".to_string())]);
    }

    #[test_case(StatusCode::UNAUTHORIZED ; "unauthorized")]
    #[test_case(StatusCode::FORBIDDEN ; "forbidden")]
    fn test_auth_statuses(status: StatusCode) {
        assert_eq!(
            classify_status(status, None, String::new()),
            SyncError::Unauthorized
        );
    }

    #[test]
    fn test_rate_limit_uses_retry_after() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some(2000), String::new()),
            SyncError::RateLimited { retry_after_ms: 2000 }
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, None, String::new()),
            SyncError::RateLimited {
                retry_after_ms: RATE_LIMIT_FALLBACK_MS
            }
        );
    }

    #[test]
    fn test_server_errors_map_to_network() {
        let err = classify_status(StatusCode::BAD_GATEWAY, None, "upstream".into());
        assert!(matches!(err, SyncError::Network { .. }));

        let err = classify_status(StatusCode::BAD_REQUEST, None, "content empty".into());
        assert_eq!(err, SyncError::validation("content empty"));
    }
}
