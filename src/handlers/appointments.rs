// src/handlers/appointments.rs
use crate::middleware::admin::admin_middleware;
use crate::middleware::auth::auth_middleware;
use crate::models::appointment::*;
use crate::models::auth::{Claims, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

const DETAILS_QUERY: &str =
    "SELECT a.id, a.user_id, a.therapist_id, a.status, a.notes, a.requested_at,
            a.approved_at, a.admin_id, a.scheduled_for, a.meeting_link,
            u.username AS user_username, u.email AS user_email, t.name AS therapist_name
     FROM appointments a
     JOIN users u ON u.id = a.user_id
     JOIN therapists t ON t.id = a.therapist_id";

pub fn appointment_routes() -> Router {
    let user_routes = Router::new()
        .route("/api/appointments", post(book_appointment))
        .route("/api/appointments/my", get(my_appointments))
        .layer(axum::middleware::from_fn(auth_middleware));

    let admin_routes = Router::new()
        .route("/api/appointments/requests", get(pending_requests))
        .route("/api/appointments/:id/approve", put(approve_appointment))
        .route("/api/appointments/:id/decline", put(decline_appointment))
        .layer(axum::middleware::from_fn(admin_middleware))
        .layer(axum::middleware::from_fn(auth_middleware));

    user_routes.merge(admin_routes)
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

fn caller_id(claims: &Claims) -> Result<i32, ApiError> {
    claims
        .user_id()
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid token subject"))
}

async fn book_appointment(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let user_id = caller_id(&claims)?;

    let appointment = sqlx::query_as::<_, Appointment>(
        "INSERT INTO appointments (user_id, therapist_id, notes)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(user_id)
    .bind(payload.therapist_id)
    .bind(&payload.notes)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error booking appointment: {}", e);
        error(StatusCode::BAD_REQUEST, "Error booking appointment")
    })?;

    tracing::info!(
        "User {} requested appointment {} with therapist {}",
        user_id,
        appointment.id,
        payload.therapist_id
    );

    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn my_appointments(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<AppointmentDetails>>, ApiError> {
    let user_id = caller_id(&claims)?;

    let appointments = sqlx::query_as::<_, AppointmentDetails>(&format!(
        "{} WHERE a.user_id = $1 ORDER BY a.requested_at DESC",
        DETAILS_QUERY
    ))
    .bind(user_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading appointments: {}", e);
        error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    })?;

    Ok(Json(appointments))
}

async fn pending_requests(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<AppointmentDetails>>, ApiError> {
    let appointments = sqlx::query_as::<_, AppointmentDetails>(&format!(
        "{} WHERE a.status = $1 ORDER BY a.requested_at ASC",
        DETAILS_QUERY
    ))
    .bind(AppointmentStatus::Pending.as_str())
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading pending appointments: {}", e);
        error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    })?;

    Ok(Json(appointments))
}

async fn approve_appointment(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<ApproveAppointmentRequest>,
) -> Result<Json<AppointmentDetails>, ApiError> {
    let admin_id = caller_id(&claims)?;

    if payload.zoom_link.trim().is_empty() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "A meeting link is required to approve an appointment",
        ));
    }

    // Conditional transition: only a pending appointment can be approved, so
    // two racing approvals cannot both win.
    let updated = sqlx::query(
        "UPDATE appointments
         SET status = $2, approved_at = NOW(), admin_id = $3,
             scheduled_for = $4, meeting_link = $5
         WHERE id = $1 AND status = $6",
    )
    .bind(id)
    .bind(AppointmentStatus::Approved.as_str())
    .bind(admin_id)
    .bind(payload.date)
    .bind(&payload.zoom_link)
    .bind(AppointmentStatus::Pending.as_str())
    .execute(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error approving appointment {}: {}", id, e);
        error(StatusCode::INTERNAL_SERVER_ERROR, "Error approving appointment")
    })?;

    if updated.rows_affected() == 0 {
        return Err(transition_refused(&state, id).await);
    }

    let details = load_details(&state, id).await?;

    // Notification is best-effort and decoupled from the transition: a mail
    // failure is logged, never surfaced to the admin.
    if let Some(mailer) = state.mailer.clone() {
        let to = details.user_email.clone();
        let therapist_name = details.therapist_name.clone();
        let date = payload.date;
        let link = payload.zoom_link.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_appointment_approved(&to, &therapist_name, &date, &link)
                .await
            {
                tracing::error!("Failed to send approval email for appointment {}: {}", id, e);
            }
        });
    } else {
        tracing::warn!("Mailer not configured; approval email for appointment {} skipped", id);
    }

    Ok(Json(details))
}

async fn decline_appointment(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<AppointmentDetails>, ApiError> {
    let admin_id = caller_id(&claims)?;

    let updated = sqlx::query(
        "UPDATE appointments SET status = $2, admin_id = $3
         WHERE id = $1 AND status = $4",
    )
    .bind(id)
    .bind(AppointmentStatus::Declined.as_str())
    .bind(admin_id)
    .bind(AppointmentStatus::Pending.as_str())
    .execute(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error declining appointment {}: {}", id, e);
        error(StatusCode::INTERNAL_SERVER_ERROR, "Error declining appointment")
    })?;

    if updated.rows_affected() == 0 {
        return Err(transition_refused(&state, id).await);
    }

    let details = load_details(&state, id).await?;
    Ok(Json(details))
}

/// A conditional update matched nothing. Look the row up to tell the two
/// cases apart.
async fn transition_refused(state: &Arc<AppState>, id: i32) -> ApiError {
    let current: Result<Option<String>, _> =
        sqlx::query_scalar("SELECT status FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db_pool)
            .await;

    match current {
        Ok(Some(raw)) => match AppointmentStatus::parse(&raw) {
            Some(status) => refusal_for(Some(status)),
            None => {
                tracing::error!("Appointment {} has unrecognized status '{}'", id, raw);
                error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        },
        Ok(None) => refusal_for(None),
        Err(e) => {
            tracing::error!("Error inspecting appointment {}: {}", id, e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

/// The appointment is either absent (404) or already decided (409).
fn refusal_for(current: Option<AppointmentStatus>) -> ApiError {
    match current {
        Some(status) => error(
            StatusCode::CONFLICT,
            &format!(
                "Appointment is already {} and cannot be changed",
                status.as_str()
            ),
        ),
        None => error(StatusCode::NOT_FOUND, "Appointment not found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_transition_on_decided_appointment_is_conflict() {
        for status in [AppointmentStatus::Approved, AppointmentStatus::Declined] {
            let (code, body) = refusal_for(Some(status));
            assert_eq!(code, StatusCode::CONFLICT);
            assert!(body.0.message.contains(status.as_str()));
        }
    }

    #[test]
    fn test_refused_transition_on_missing_appointment_is_not_found() {
        let (code, body) = refusal_for(None);
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body.0.message, "Appointment not found");
    }
}

async fn load_details(state: &Arc<AppState>, id: i32) -> Result<AppointmentDetails, ApiError> {
    sqlx::query_as::<_, AppointmentDetails>(&format!("{} WHERE a.id = $1", DETAILS_QUERY))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Error loading appointment {}: {}", id, e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        })?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Appointment not found"))
}
