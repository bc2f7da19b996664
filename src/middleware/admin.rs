use crate::models::auth::{Claims, ErrorResponse};
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

/// Requires an `admin` role on top of a valid token. Must run after
/// `auth_middleware`, which inserts the claims.
pub async fn admin_middleware(
    request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let claims = request.extensions().get::<Claims>();

    match claims {
        Some(claims) => {
            if claims.is_admin() {
                Ok(next.run(request).await)
            } else {
                Err((
                    StatusCode::FORBIDDEN,
                    Json(ErrorResponse {
                        success: false,
                        message: "Admin access required.".to_string(),
                    }),
                ))
            }
        }
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                success: false,
                message: "Authentication required for admin access.".to_string(),
            }),
        )),
    }
}
