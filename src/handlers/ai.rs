// src/handlers/ai.rs
use crate::gemini_client::GeminiError;
use crate::intents;
use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::strict_rate_limit_middleware;
use crate::models::ai::*;
use crate::models::auth::{Claims, ErrorResponse};
use crate::services::{home_content, transcript};
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{get, post, Router},
};
use std::sync::Arc;
use uuid::Uuid;

pub fn ai_routes() -> Router {
    Router::new()
        .route("/api/ai/session/start", post(start_session))
        .route("/api/ai/session/end", post(end_session))
        .route("/api/ai/generate", post(generate))
        .route("/api/ai/home", get(home))
        .layer(axum::middleware::from_fn(auth_middleware))
        .layer(axum::middleware::from_fn(strict_rate_limit_middleware))
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.to_string(),
        }),
    )
}

fn internal_error(message: &str) -> ApiError {
    error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn caller_id(claims: &Claims) -> Result<i32, ApiError> {
    claims
        .user_id()
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid token subject"))
}

async fn start_session(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let user_id = caller_id(&claims)?;

    let mood = match payload.mood {
        Some(mood) if valid_mood(mood) => mood,
        _ => {
            return Err(error(
                StatusCode::BAD_REQUEST,
                "Mood (1-10) is required to start a session.",
            ));
        }
    };

    let session = sqlx::query_as::<_, TherapySession>(
        "INSERT INTO therapy_sessions (id, user_id, mood) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(mood)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error starting session: {}", e);
        internal_error("Failed to start session")
    })?;

    tracing::info!("Started therapy session {} for user {}", session.id, user_id);

    Ok(Json(StartSessionResponse {
        session_id: session.id,
    }))
}

async fn end_session(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<EndSessionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller_id(&claims)?;

    let updated = sqlx::query(
        "UPDATE therapy_sessions SET terminated = true WHERE id = $1 AND user_id = $2",
    )
    .bind(payload.session_id)
    .bind(user_id)
    .execute(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error ending session: {}", e);
        internal_error("Failed to end session")
    })?;

    if updated.rows_affected() == 0 {
        return Err(error(StatusCode::NOT_FOUND, "Session not found"));
    }

    Ok(Json(serde_json::json!({ "message": "Session terminated" })))
}

async fn generate(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let user_id = caller_id(&claims)?;

    // Implicitly open a session when the client didn't supply one
    let session_id = match payload.session_id {
        Some(id) => id,
        None => {
            let session = sqlx::query_as::<_, TherapySession>(
                "INSERT INTO therapy_sessions (id, user_id) VALUES ($1, $2) RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .fetch_one(&state.db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Error creating implicit session: {}", e);
                internal_error("Failed to generate content")
            })?;
            session.id
        }
    };

    let session = sqlx::query_as::<_, TherapySession>(
        "SELECT * FROM therapy_sessions WHERE id = $1 AND user_id = $2",
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading session: {}", e);
        internal_error("Failed to generate content")
    })?
    .ok_or_else(|| error(StatusCode::NOT_FOUND, "Session not found"))?;

    if !session.is_open() {
        return Err(error(StatusCode::BAD_REQUEST, "Session is terminated"));
    }

    let history = sqlx::query_as::<_, AiExchange>(
        "SELECT * FROM ai_exchanges WHERE session_id = $1 ORDER BY created_at ASC",
    )
    .bind(session_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading exchanges: {}", e);
        internal_error("Failed to generate content")
    })?;

    // Known phrases are answered from the intent table without touching the
    // model at all.
    if let Some(reply) = intents::match_intent(&payload.prompt) {
        tracing::debug!("Intent matched for session {}", session_id);
        persist_exchange(&state, session_id, &payload.prompt, &reply).await?;
        return Ok(Json(GenerateResponse {
            text: reply,
            session_id,
        }));
    }

    let prompt = transcript::build_transcript(&history, &payload.prompt);

    let gemini = state
        .gemini_client
        .as_ref()
        .ok_or_else(|| internal_error("AI assistant is not configured"))?;

    let text = match gemini.generate_text(&prompt).await {
        Ok(text) => text,
        Err(GeminiError::Empty) => {
            tracing::warn!("Gemini returned empty output for session {}", session_id);
            return Err(internal_error("AI response is empty"));
        }
        Err(e) => {
            tracing::error!("Error generating AI content: {}", e);
            return Err(internal_error("Failed to generate content"));
        }
    };

    persist_exchange(&state, session_id, &payload.prompt, &text).await?;

    Ok(Json(GenerateResponse { text, session_id }))
}

async fn persist_exchange(
    state: &Arc<AppState>,
    session_id: Uuid,
    prompt: &str,
    response: &str,
) -> Result<(), ApiError> {
    sqlx::query("INSERT INTO ai_exchanges (session_id, prompt, response) VALUES ($1, $2, $3)")
        .bind(session_id)
        .bind(prompt)
        .bind(response)
        .execute(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Error saving exchange: {}", e);
            internal_error("Failed to generate content")
        })?;
    Ok(())
}

async fn home(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<home_content::HomeContent>, ApiError> {
    let gemini = state
        .gemini_client
        .as_ref()
        .ok_or_else(|| internal_error("AI assistant is not configured"))?;

    let prompt = home_content::build_prompt(chrono::Utc::now());

    let text = gemini.generate_text(&prompt).await.map_err(|e| {
        tracing::error!("Error generating self-care home content: {}", e);
        internal_error("Failed to generate self-care home content")
    })?;

    let content = home_content::parse_home_content(&text).map_err(|e| {
        tracing::error!("Unusable self-care home content from model: {}", e);
        internal_error("Failed to generate self-care home content")
    })?;

    Ok(Json(content))
}
