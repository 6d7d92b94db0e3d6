use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::errors::AppError;

// Converts AppError into a well-formed HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Authentication errors redirect to the login page
            AppError::Auth(msg) => {
                Redirect::to(&format!("/login?error={}", urlencoding::encode(&msg)))
                    .into_response()
            }

            // Database errors are internal server errors
            AppError::Database(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
                .into_response(),

            // Missing templates are internal server errors as well
            AppError::Template(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Template error: {}", e),
            )
                .into_response(),

            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
        }
    }
}
