// src/handlers/therapists.rs
use crate::middleware::auth::auth_middleware;
use crate::models::auth::ErrorResponse;
use crate::models::therapist::Therapist;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;

pub fn therapist_routes() -> Router {
    Router::new()
        .route("/api/therapists", get(list_therapists))
        .route("/api/therapists/:id", get(get_therapist))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn list_therapists(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Therapist>>, (StatusCode, Json<ErrorResponse>)> {
    let therapists = sqlx::query_as::<_, Therapist>("SELECT * FROM therapists ORDER BY name ASC")
        .fetch_all(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Error loading therapists: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    message: "Failed to load therapists".to_string(),
                }),
            )
        })?;

    Ok(Json(therapists))
}

async fn get_therapist(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Therapist>, (StatusCode, Json<ErrorResponse>)> {
    let therapist = sqlx::query_as::<_, Therapist>("SELECT * FROM therapists WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Error loading therapist {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    message: "Failed to load therapist".to_string(),
                }),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                success: false,
                message: "Therapist not found".to_string(),
            }),
        ))?;

    Ok(Json(therapist))
}
