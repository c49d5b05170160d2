// service/socket.rs
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const ROOM_CAPACITY: usize = 64;

/// A room-scoped event pushed over the WebSocket channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketEvent {
    pub room: String,
    pub event: String,
    pub data: serde_json::Value,
}

pub fn conversation_room(conversation_id: Uuid) -> String {
    format!("conversation:{}", conversation_id)
}

pub fn project_room(project_id: Uuid) -> String {
    format!("project:{}", project_id)
}

pub fn user_room(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

/// In-process room registry. Each room is a broadcast channel; sockets
/// subscribe on demand and rooms are dropped when the last subscriber goes
/// away. Delivery is best-effort: publishing to a room with no subscribers
/// is a no-op.
#[derive(Debug, Clone, Default)]
pub struct SocketHub {
    rooms: Arc<RwLock<HashMap<String, broadcast::Sender<SocketEvent>>>>,
}

impl SocketHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, room: &str) -> broadcast::Receiver<SocketEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    pub async fn publish(&self, room: &str, event: &str, data: serde_json::Value) {
        let rooms = self.rooms.read().await;
        if let Some(sender) = rooms.get(room) {
            let _ = sender.send(SocketEvent {
                room: room.to_string(),
                event: event.to_string(),
                data,
            });
        }
    }

    /// Drops rooms whose subscribers have all disconnected.
    pub async fn prune(&self) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, sender| sender.receiver_count() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let hub = SocketHub::new();
        let room = conversation_room(Uuid::new_v4());

        let mut rx = hub.subscribe(&room).await;
        hub.publish(&room, "new-message", serde_json::json!({"content": "hi"}))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, "new-message");
        assert_eq!(event.room, room);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = SocketHub::new();
        hub.publish("project:none", "contract-updated", serde_json::json!({}))
            .await;
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let hub = SocketHub::new();
        let room_a = project_room(Uuid::new_v4());
        let room_b = project_room(Uuid::new_v4());

        let mut rx_a = hub.subscribe(&room_a).await;
        let _rx_b = hub.subscribe(&room_b).await;

        hub.publish(&room_b, "escrow-funded", serde_json::json!({})).await;

        assert!(rx_a.try_recv().is_err());
    }
}
