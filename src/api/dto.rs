//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::chat::{ChatView, Message, MessageDraft, Notice};
use crate::store::StoreStats;

// ============================================
// CHAT DTOs
// ============================================

/// One guestbook message as sent to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: String,
    pub comment: String,
    pub user: Option<String>,
    pub avatar: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    /// Server timestamp (ms since epoch); absent while unresolved
    pub timestamp: Option<i64>,
    /// Same instant in RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<String>,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            comment: message.comment.clone(),
            user: message.user.clone(),
            avatar: message.avatar.clone(),
            username: message.username.clone(),
            email: message.email.clone(),
            timestamp: message.timestamp.map(|t| t.as_millis()),
            posted_at: message.timestamp.map(|t| t.to_string()),
        }
    }
}

/// The form state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftDto {
    /// Message being edited, absent for a new message
    pub id: Option<String>,
    pub comment: String,
}

impl From<&MessageDraft> for DraftDto {
    fn from(draft: &MessageDraft) -> Self {
        Self {
            id: draft.id.as_ref().map(|id| id.to_string()),
            comment: draft.comment.clone(),
        }
    }
}

/// GET /api/v1/chat response
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatPageResponse {
    pub draft: DraftDto,
    pub messages: Vec<MessageDto>,
    /// `username: comment` as displayed, newest first
    pub lines: Vec<String>,
}

impl From<&ChatView> for ChatPageResponse {
    fn from(view: &ChatView) -> Self {
        Self {
            draft: DraftDto::from(&view.draft),
            messages: view.messages.iter().map(MessageDto::from).collect(),
            lines: view.lines(),
        }
    }
}

/// GET /api/v1/chat/messages response
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub messages: Vec<MessageDto>,
    pub count: usize,
}

/// POST /api/v1/chat/messages request
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub comment: String,
    /// Id of the message to edit; omit to post a new one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// POST /api/v1/chat/messages response
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// "created" or "updated"
    pub status: String,
    pub id: String,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Store status: "ok" or "error"
    pub store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_stats: Option<StoreStats>,
    pub websocket_connections: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
