// src/models/ai.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A bounded AI conversation. Distinct from the HTTP auth session: one user
/// can hold many of these over time. `terminated` is one-way.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct TherapySession {
    pub id: Uuid,
    pub user_id: i32,
    pub mood: Option<i32>,
    pub terminated: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl TherapySession {
    /// Prompts are only accepted while the session is open.
    pub fn is_open(&self) -> bool {
        !self.terminated
    }
}

pub const MOOD_MIN: i32 = 1;
pub const MOOD_MAX: i32 = 10;

/// Mood self-rating accepted when starting a session.
pub fn valid_mood(mood: i32) -> bool {
    (MOOD_MIN..=MOOD_MAX).contains(&mood)
}

/// One user prompt plus one assistant reply. Append-only; the set of
/// exchanges for a session, ordered by creation time, is the conversation
/// history replayed to the model on every later turn.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AiExchange {
    pub id: i32,
    pub session_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub mood: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub text: String,
    pub session_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_bounds() {
        assert!(!valid_mood(0));
        assert!(valid_mood(1));
        assert!(valid_mood(10));
        assert!(!valid_mood(11));
    }

    fn session(terminated: bool) -> TherapySession {
        TherapySession {
            id: Uuid::nil(),
            user_id: 1,
            mood: Some(5),
            terminated,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_terminated_session_is_closed() {
        assert!(session(false).is_open());
        assert!(!session(true).is_open());
    }
}
