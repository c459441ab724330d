//! Feed relay
//!
//! Forwards every list the shared live feed settles on to the `feed`
//! topic. Ends once the feed is dropped.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::hub::ConnectionHub;
use super::messages::WsEvent;
use crate::chat::Message;

pub fn spawn_feed_relay(
    mut feed: watch::Receiver<Vec<Message>>,
    hub: Arc<ConnectionHub>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while feed.changed().await.is_ok() {
            let event = {
                let list = feed.borrow_and_update();
                WsEvent::feed(&list)
            };
            let reached = hub.broadcast(&event).await;
            tracing::debug!(subscribers = reached, "Relayed feed snapshot");
        }
        tracing::debug!("Feed relay stopped");
    })
}
