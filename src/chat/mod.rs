//! Guestbook Chat Page
//!
//! The chat page shows the most recent messages, live, and lets a signed-in
//! visitor post a new one or edit one through an `?id=..&comment=..` link.
//!
//! ## Components
//!
//! - **ChatPage**: form draft, submit handler and auth gate
//! - **LiveFeed**: snapshot subscription holding the visible list
//! - **Message**: the stored entity and its write payloads
//! - **Notifier**: where submit outcomes are reported
//!
//! All collaborators are handed in through a [`PageContext`] built once by
//! the host and shared read-only afterwards.

mod feed;
mod message;
mod notify;
mod page;
mod validation;

pub use feed::{feed_query, LiveFeed};
pub use message::{create_payload, field, update_payload, Message, MessageDraft};
pub use notify::{Notice, NoticeBoard, NoticeLevel, Notifier, TracingNotifier};
pub use page::{ChatPage, ChatView, GateOutcome, SubmitError, SubmitOutcome};
pub use validation::{comment_len, validate_comment, ValidationError, MAX_COMMENT_LEN};

use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::routing::{Navigator, LOGIN_ROUTE};
use crate::store::DocumentStore;

/// Tunables of the chat page
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Collection holding messages
    pub collection: String,
    /// How many recent messages the feed shows
    pub feed_limit: usize,
    /// Longest accepted comment
    pub max_comment_len: usize,
    /// Where signed-out visitors are sent
    pub login_route: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            collection: "chats".to_string(),
            feed_limit: 10,
            max_comment_len: MAX_COMMENT_LEN,
            login_route: LOGIN_ROUTE.to_string(),
        }
    }
}

/// Collaborators of a page
#[derive(Clone)]
pub struct PageContext {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: ChatSettings,
}
