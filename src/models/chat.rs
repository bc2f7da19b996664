// src/models/chat.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: i32,
    pub room_id: String,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub message: String,
    pub sent_at: chrono::DateTime<chrono::Utc>,
}

/// The sender is the authenticated caller and the room id is derived from
/// the participant pair, so the request carries only the therapist and the
/// text.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver: i32,
    pub message: String,
}

/// One distinct user who has messaged a therapist.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct TherapistContact {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_supplied_sender_is_ignored() {
        // A "sender" field in the body is dropped on deserialization; the
        // sender is always taken from the caller's token.
        let request: SendMessageRequest =
            serde_json::from_str(r#"{"sender": 999, "receiver": 42, "message": "hi"}"#).unwrap();
        assert_eq!(request.receiver, 42);
        assert_eq!(request.message, "hi");
    }
}
