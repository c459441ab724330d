//! WebSocket Live Feed
//!
//! Pushes the guestbook feed to browsers as it changes.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and subscriptions
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Relay**: Forwards the shared feed's lists to the hub
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/ws` and can subscribe to topics:
//! - `feed` - The ten most recent messages, resent whole on every change
//! - `system` - Server announcements
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8090/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topics: ['feed']}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'feed') render(msg.messages);
//! };
//! ```

mod handler;
mod hub;
mod messages;
mod relay;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, WsEvent, FEED_TOPIC, SYSTEM_TOPIC};
pub use relay::spawn_feed_relay;
