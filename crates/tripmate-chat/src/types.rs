//! Chat types: transcript entries and backend request/response bodies.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tripmate_core::SessionId;

// =============================================================================
// Transcript
// =============================================================================

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting.
    User,
    /// The assistant.
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl Message {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Observable state of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscriptState {
    /// Messages in conversation order.
    pub messages: Vec<Message>,
    /// Whether a send is in flight.
    pub loading: bool,
    /// Error of the last failed send.
    pub error: Option<String>,
}

/// Result of a completed send.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// Assistant text accumulated over the whole response.
    pub text: String,
    /// Server payload: the whole object for single-shot responses, the last
    /// decoded record for streaming ones (`Null` if none arrived).
    pub payload: serde_json::Value,
    /// Session reported by the server, if any record carried a valid one.
    pub session_id: Option<SessionId>,
}

// =============================================================================
// Sessions and stored messages
// =============================================================================

/// A chat session stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Session identifier.
    pub session_id: SessionId,
    /// When the session was created (UTC).
    pub created_at: NaiveDateTime,
    /// Title.
    pub title: String,
    /// Preferred assistant mood.
    #[serde(default)]
    pub mood: Option<String>,
    /// Preferred assistant style.
    #[serde(default)]
    pub style: Option<String>,
}

/// A message stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Message identifier.
    pub id: uuid::Uuid,
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
    /// When the message was stored (UTC).
    pub created_at: NaiveDateTime,
}

impl From<StoredMessage> for Message {
    fn from(stored: StoredMessage) -> Self {
        Self {
            role: stored.role,
            content: stored.content,
        }
    }
}

/// Request body for creating a session.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    /// Title.
    pub title: String,
    /// Preferred assistant mood.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Preferred assistant style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Request body for updating a session. Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSessionRequest {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New mood.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// New style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Request body for storing a message.
#[derive(Debug, Clone, Serialize)]
pub struct AddMessageRequest {
    /// Owning session.
    pub session_id: SessionId,
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
}

/// Response to storing a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddMessageResponse {
    /// Identifier of the stored message.
    pub message_id: uuid::Uuid,
    /// When it was stored (UTC).
    pub created_at: NaiveDateTime,
}

/// Error response from the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn session_parses_backend_timestamps() {
        let session: ChatSession = serde_json::from_value(serde_json::json!({
            "session_id": "550e8400-e29b-41d4-a716-446655440000",
            "created_at": "2025-06-01T09:30:00.123456",
            "title": "Italy",
            "mood": null,
            "style": "concise"
        }))
        .unwrap();
        assert_eq!(session.title, "Italy");
        assert_eq!(session.style.as_deref(), Some("concise"));
        assert!(session.mood.is_none());
    }

    #[test]
    fn update_request_omits_absent_fields() {
        let body = UpdateSessionRequest {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({"title": "Renamed"})
        );
    }

    #[test]
    fn stored_message_converts_to_transcript_entry() {
        let stored: StoredMessage = serde_json::from_value(serde_json::json!({
            "id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
            "role": "user",
            "content": "Where to camp?",
            "created_at": "2025-06-01T09:30:00"
        }))
        .unwrap();
        assert_eq!(Message::from(stored), Message::user("Where to camp?"));
    }
}
