//! Change notifications for connected observers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel. Slow observers miss older messages.
const BROADCAST_CAPACITY: usize = 64;

/// Message broadcast to observers.
///
/// Serializes as `{"type": "resource_update", "name": "<locator>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeNotification {
    /// A cached resource changed on the origin.
    ResourceUpdate { name: String },
}

impl ChangeNotification {
    /// Notification for a changed locator.
    pub fn resource_update(name: impl Into<String>) -> Self {
        Self::ResourceUpdate { name: name.into() }
    }

    /// The locator the notification refers to.
    pub fn name(&self) -> &str {
        match self {
            Self::ResourceUpdate { name } => name,
        }
    }
}

/// Fire-and-forget fan-out of `ChangeNotification`s to every connected client.
#[derive(Debug, Clone)]
pub struct ChangeBroadcaster {
    tx: broadcast::Sender<ChangeNotification>,
}

impl ChangeBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    /// Connect a client.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.tx.subscribe()
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send to all connected clients. Returns how many were reached.
    pub fn broadcast(&self, notification: ChangeNotification) -> usize {
        let name = notification.name().to_string();
        let reached = self.tx.send(notification).unwrap_or(0);
        tracing::info!(resource = %name, clients = reached, "broadcast resource update");
        reached
    }
}

impl Default for ChangeBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_shape() {
        let json = serde_json::to_value(ChangeNotification::resource_update(
            "http://localhost/header.php?fragment=true",
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "resource_update",
                "name": "http://localhost/header.php?fragment=true"
            })
        );
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_clients() {
        let broadcaster = ChangeBroadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        let reached = broadcaster.broadcast(ChangeNotification::resource_update("x"));
        assert_eq!(reached, 2);
        assert_eq!(a.recv().await.unwrap().name(), "x");
        assert_eq!(b.recv().await.unwrap().name(), "x");
    }

    #[test]
    fn test_broadcast_without_clients_is_not_an_error() {
        let broadcaster = ChangeBroadcaster::new();
        assert_eq!(broadcaster.client_count(), 0);
        assert_eq!(broadcaster.broadcast(ChangeNotification::resource_update("x")), 0);
    }
}
