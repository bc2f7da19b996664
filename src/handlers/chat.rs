// src/handlers/chat.rs
use crate::chat_hub::RoomMessage;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::{Claims, ErrorResponse};
use crate::models::chat::{ChatMessage, SendMessageRequest, TherapistContact};
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Path,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub fn chat_routes() -> Router {
    let public_routes = Router::new().route("/ws", get(websocket_handler));

    let protected_routes = Router::new()
        .route("/api/chat", post(send_message))
        .route("/api/chat/:room_id", get(get_chat_history))
        .route("/api/chat/therapist/:therapist_id", get(get_therapist_contacts))
        .layer(axum::middleware::from_fn(auth_middleware));

    public_routes.merge(protected_routes)
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn server_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            success: false,
            message: message.to_string(),
        }),
    )
}

/// Persist a chat message. This is independent of the live relay: a client
/// that wants both delivery and durability sends the message over the socket
/// and posts it here.
async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    // The sender is always the authenticated caller, never a body field
    let sender = claims.user_id().ok_or((
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            success: false,
            message: "Invalid token subject".to_string(),
        }),
    ))?;

    if payload.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                success: false,
                message: "Message text is required".to_string(),
            }),
        ));
    }

    let room_id = crate::utils::room_id_for(sender, payload.receiver);

    let message = sqlx::query_as::<_, ChatMessage>(
        "INSERT INTO chat_messages (room_id, sender_id, receiver_id, message)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(&room_id)
    .bind(sender)
    .bind(payload.receiver)
    .bind(&payload.message)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error saving chat message: {}", e);
        server_error("Failed to save message")
    })?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Full chronological history for a room, regardless of who is currently
/// connected to the live relay.
async fn get_chat_history(
    Extension(state): Extension<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let messages = sqlx::query_as::<_, ChatMessage>(
        "SELECT * FROM chat_messages WHERE room_id = $1 ORDER BY sent_at ASC",
    )
    .bind(&room_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading chat history for room {}: {}", room_id, e);
        server_error("Failed to load chat history")
    })?;

    Ok(Json(messages))
}

/// Distinct users who have messaged this therapist, deduplicated in SQL.
async fn get_therapist_contacts(
    Extension(state): Extension<Arc<AppState>>,
    Path(therapist_id): Path<i32>,
) -> Result<Json<Vec<TherapistContact>>, ApiError> {
    let contacts = sqlx::query_as::<_, TherapistContact>(
        "SELECT DISTINCT u.id AS user_id, u.username, u.email, u.profile_image
         FROM chat_messages c
         JOIN users u ON u.id = c.sender_id
         WHERE c.receiver_id = $1",
    )
    .bind(therapist_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading therapist contacts: {}", e);
        server_error("Failed to load contacts")
    })?;

    Ok(Json(contacts))
}

/// Client -> server events on the live chat socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: String },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        room_id: String,
        sender: i32,
        receiver: i32,
        message: String,
    },
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket(socket, state))
}

async fn websocket(stream: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = stream.split();
    let conn_id = Uuid::new_v4().to_string();
    tracing::info!("Chat socket connected: {}", conn_id);

    // Outbound channel this connection receives relayed room messages on
    let (tx, mut rx) = mpsc::unbounded_channel::<RoomMessage>();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let event: ClientEvent = match serde_json::from_str(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                tracing::warn!("Unparsable chat event from {}: {}", conn_id, e);
                                continue;
                            }
                        };

                        match event {
                            ClientEvent::JoinRoom { room_id } => {
                                state.chat_hub.join_room(&room_id, &conn_id, tx.clone()).await;
                            }
                            ClientEvent::LeaveRoom { room_id } => {
                                state.chat_hub.leave_room(&room_id, &conn_id).await;
                            }
                            ClientEvent::ChatMessage { room_id, sender: from, receiver: to, message } => {
                                let room_message = RoomMessage {
                                    room_id,
                                    sender: from,
                                    receiver: to,
                                    message,
                                    timestamp: chrono::Utc::now(),
                                };
                                // Forward delivery only; persistence is the
                                // client's separate HTTP call.
                                state.chat_hub.broadcast_from(&conn_id, &room_message).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // ignore pings/binary
                    Some(Err(e)) => {
                        tracing::warn!("Chat socket error on {}: {}", conn_id, e);
                        break;
                    }
                }
            }

            Some(room_message) = rx.recv() => {
                let payload = serde_json::json!({
                    "type": "chatMessage",
                    "roomId": room_message.room_id,
                    "sender": room_message.sender,
                    "receiver": room_message.receiver,
                    "message": room_message.message,
                    "timestamp": room_message.timestamp.to_rfc3339(),
                });

                if let Ok(json_str) = serde_json::to_string(&payload) {
                    if sender.send(Message::Text(json_str)).await.is_err() {
                        tracing::warn!("Failed to deliver relayed message to {}", conn_id);
                        break;
                    }
                }
            }
        }
    }

    state.chat_hub.remove_connection(&conn_id).await;
    tracing::info!("Chat socket disconnected: {}", conn_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_wire_format() {
        let join: ClientEvent =
            serde_json::from_str(r#"{"type": "joinRoom", "roomId": "u7_t42"}"#).unwrap();
        assert!(matches!(join, ClientEvent::JoinRoom { room_id } if room_id == "u7_t42"));

        let msg: ClientEvent = serde_json::from_str(
            r#"{"type": "chatMessage", "roomId": "u7_t42", "sender": 7, "receiver": 42, "message": "hi"}"#,
        )
        .unwrap();
        match msg {
            ClientEvent::ChatMessage { room_id, sender, receiver, message } => {
                assert_eq!(room_id, "u7_t42");
                assert_eq!(sender, 7);
                assert_eq!(receiver, 42);
                assert_eq!(message, "hi");
            }
            _ => panic!("expected chatMessage"),
        }
    }

    #[test]
    fn test_unknown_event_type_fails_to_parse() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type": "typing"}"#).is_err());
    }
}
