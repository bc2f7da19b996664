// src/chat_hub.rs
//! Room membership registry for the live chat relay. This is the only
//! process-lifetime shared state in the service: joins and leaves mutate the
//! map, broadcast reads it. Delivery is forward-only; history always comes
//! from the database, never from here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

pub type SharedChatHub = Arc<ChatHub>;
pub type ConnId = String;

/// A chat message as relayed over the socket. Field names follow the
/// mobile client's camelCase wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    pub room_id: String,
    pub sender: i32,
    pub receiver: i32,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub struct ChatHub {
    /// room_id -> (conn_id -> outbound sender)
    rooms: RwLock<HashMap<String, HashMap<ConnId, mpsc::UnboundedSender<RoomMessage>>>>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub async fn join_room(
        &self,
        room_id: &str,
        conn_id: &str,
        sender: mpsc::UnboundedSender<RoomMessage>,
    ) {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(conn_id.to_string(), sender);
        tracing::info!("Connection {} joined room {}", conn_id, room_id);
    }

    pub async fn leave_room(&self, room_id: &str, conn_id: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(room_id) {
            members.remove(conn_id);
            if members.is_empty() {
                rooms.remove(room_id);
            }
        }
        tracing::info!("Connection {} left room {}", conn_id, room_id);
    }

    /// Drop a connection from every room it joined. Called on disconnect.
    pub async fn remove_connection(&self, conn_id: &str) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(conn_id);
            !members.is_empty()
        });
        tracing::info!("Connection {} removed from all rooms", conn_id);
    }

    /// Relay a message to every current member of the room except the
    /// originating connection. Members whose channel is gone are skipped;
    /// their cleanup happens when the socket task ends.
    pub async fn broadcast_from(&self, origin_conn: &str, message: &RoomMessage) {
        let rooms = self.rooms.read().await;
        let Some(members) = rooms.get(&message.room_id) else {
            tracing::debug!("No members in room {}, nothing to relay", message.room_id);
            return;
        };
        for (conn_id, sender) in members {
            if conn_id == origin_conn {
                continue;
            }
            if sender.send(message.clone()).is_err() {
                tracing::warn!(
                    "Failed to relay to connection {} in room {}",
                    conn_id,
                    message.room_id
                );
            }
        }
    }

    pub async fn room_size(&self, room_id: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(room_id: &str, text: &str) -> RoomMessage {
        RoomMessage {
            room_id: room_id.to_string(),
            sender: 1,
            receiver: 2,
            message: text.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_other_members_only() {
        let hub = ChatHub::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        hub.join_room("u1_t2", "conn-a", tx_a).await;
        hub.join_room("u1_t2", "conn-b", tx_b).await;

        hub.broadcast_from("conn-a", &message("u1_t2", "hello")).await;

        let relayed = rx_b.try_recv().expect("other member should receive");
        assert_eq!(relayed.message, "hello");
        assert!(rx_a.try_recv().is_err(), "origin must not echo back");
    }

    #[tokio::test]
    async fn test_leave_stops_forward_delivery() {
        let hub = ChatHub::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        hub.join_room("u1_t2", "conn-a", tx_a).await;
        hub.join_room("u1_t2", "conn-b", tx_b).await;

        hub.leave_room("u1_t2", "conn-b").await;
        hub.broadcast_from("conn-a", &message("u1_t2", "after leave")).await;

        assert!(rx_b.try_recv().is_err());
        assert_eq!(hub.room_size("u1_t2").await, 1);
    }

    #[tokio::test]
    async fn test_remove_connection_clears_all_rooms() {
        let hub = ChatHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        hub.join_room("u1_t2", "conn-a", tx.clone()).await;
        hub.join_room("u1_t3", "conn-a", tx).await;

        hub.remove_connection("conn-a").await;

        assert_eq!(hub.room_size("u1_t2").await, 0);
        assert_eq!(hub.room_size("u1_t3").await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_room_is_noop() {
        let hub = ChatHub::new();
        hub.broadcast_from("conn-x", &message("u9_t9", "nobody home")).await;
        assert_eq!(hub.room_size("u9_t9").await, 0);
    }
}
