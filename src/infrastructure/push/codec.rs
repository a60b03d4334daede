//! Push frame decoding.

use serde::Deserialize;
use tracing::trace;

use super::constants::event_type;
use super::error::{PushError, PushResult};
use crate::domain::entities::{ConversationId, MessageRecord, NotificationRecord, UserId};
use crate::domain::ports::PushEvent;

/// Raw `{ "type": ..., "data": ... }` envelope.
#[derive(Debug, Deserialize)]
pub struct PushFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct UnreadCountPayload {
    #[serde(alias = "count")]
    unread_count: u32,
}

#[derive(Debug, Deserialize)]
struct TypingPayload {
    #[serde(alias = "conversation")]
    conversation_id: ConversationId,
    #[serde(alias = "user")]
    user_id: UserId,
    #[serde(default)]
    username: Option<String>,
}

pub struct EventParser;

impl EventParser {
    pub fn parse_frame(text: &str) -> PushResult<PushFrame> {
        serde_json::from_str(text).map_err(|e| PushError::decode(e.to_string()))
    }

    /// Parses a text frame. Returns `Ok(None)` for event types this client
    /// does not handle.
    pub fn parse_event(text: &str) -> PushResult<Option<PushEvent>> {
        let frame = Self::parse_frame(text)?;
        Self::parse_payload(&frame.kind, frame.data)
    }

    pub fn parse_payload(
        kind: &str,
        data: Option<serde_json::Value>,
    ) -> PushResult<Option<PushEvent>> {
        let event = match kind {
            event_type::NEW_NOTIFICATION => {
                PushEvent::NewNotification(Self::decode::<NotificationRecord>(kind, data)?)
            }
            event_type::UNREAD_COUNT_UPDATE => {
                let payload: UnreadCountPayload = Self::decode(kind, data)?;
                PushEvent::UnreadCountUpdate {
                    count: payload.unread_count,
                }
            }
            event_type::NEW_MESSAGE => {
                PushEvent::NewMessage(Self::decode::<MessageRecord>(kind, data)?)
            }
            event_type::TYPING_INDICATOR => {
                let payload: TypingPayload = Self::decode(kind, data)?;
                PushEvent::TypingIndicator {
                    conversation_id: payload.conversation_id,
                    user_id: payload.user_id,
                    username: payload.username,
                }
            }
            event_type::MESSAGE_UPDATE => {
                PushEvent::MessageUpdate(Self::decode::<MessageRecord>(kind, data)?)
            }
            other => {
                trace!(event = other, "Dropping unknown push event");
                return Ok(None);
            }
        };
        Ok(Some(event))
    }

    fn decode<T: serde::de::DeserializeOwned>(
        kind: &str,
        data: Option<serde_json::Value>,
    ) -> PushResult<T> {
        let data = data.ok_or_else(|| PushError::decode(format!("{kind} missing data")))?;
        serde_json::from_value(data)
            .map_err(|e| PushError::decode(format!("failed to parse {kind}: {e}")))
    }
}
