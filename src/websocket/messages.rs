//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! browsers showing the guestbook and the server.

use serde::{Deserialize, Serialize};

use crate::api::dto::MessageDto;
use crate::chat::Message;

/// Topic carrying feed snapshots
pub const FEED_TOPIC: &str = "feed";
/// Topic carrying server announcements
pub const SYSTEM_TOPIC: &str = "system";

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics for real-time updates
    Subscribe {
        /// Topics to subscribe to (`feed`, `system`)
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe { topics: Vec<String> },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full current feed, newest first
    Feed { messages: Vec<MessageDto> },
    /// Subscription confirmed
    Subscribed { topics: Vec<String> },
    /// Unsubscription confirmed
    Unsubscribed { topics: Vec<String> },
    /// Server announcement
    System { message: String },
    /// Pong response to ping
    Pong,
    /// Error message
    Error { message: String },
    /// Connection established
    Connected { connection_id: String },
}

impl ServerMessage {
    pub fn feed(messages: &[Message]) -> Self {
        ServerMessage::Feed {
            messages: messages.iter().map(MessageDto::from).collect(),
        }
    }
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl WsEvent {
    /// Feed snapshot event
    pub fn feed(messages: &[Message]) -> Self {
        Self {
            topic: FEED_TOPIC.to_string(),
            message: ServerMessage::feed(messages),
        }
    }

    /// System announcement event
    pub fn system(message: &str) -> Self {
        Self {
            topic: SYSTEM_TOPIC.to_string(),
            message: ServerMessage::System {
                message: message.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentId, Timestamp};

    fn message(comment: &str) -> Message {
        Message {
            id: DocumentId::parse("m1").unwrap(),
            comment: comment.to_string(),
            user: Some("u1".to_string()),
            avatar: None,
            username: Some("Ada".to_string()),
            email: None,
            timestamp: Some(Timestamp::from_micros(1_699_000_000_000_000)),
        }
    }

    #[test]
    fn test_client_message_deserialize_subscribe() {
        let json = r#"{"type": "subscribe", "topics": ["feed", "system"]}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe { topics } => {
                assert_eq!(topics, vec!["feed", "system"]);
            }
            _ => panic!("Expected Subscribe"),
        }
    }

    #[test]
    fn test_client_message_deserialize_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_server_message_serialize_feed() {
        let msg = ServerMessage::feed(&[message("hello")]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"feed\""));
        assert!(json.contains("\"comment\":\"hello\""));
        assert!(json.contains("\"username\":\"Ada\""));
        assert!(json.contains("\"timestamp\":1699000000000"));
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }

    #[test]
    fn test_ws_event_topics() {
        assert_eq!(WsEvent::feed(&[]).topic, FEED_TOPIC);
        let event = WsEvent::system("restarting");
        assert_eq!(event.topic, SYSTEM_TOPIC);
        assert!(matches!(event.message, ServerMessage::System { .. }));
    }
}
