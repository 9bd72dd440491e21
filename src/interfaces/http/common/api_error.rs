//! Mapping of `AuthError` onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::ApiResponse;
use crate::domain::AuthError;

/// Handler error type. Wraps the domain error so `?` works in handlers.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

/// Internal error text, attached to 500 responses as an extension.
/// Only rendered to clients in development mode.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

pub fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::InvalidOtpFormat => StatusCode::BAD_REQUEST,
        AuthError::DuplicateEmail => StatusCode::CONFLICT,
        AuthError::InvalidCredentials
        | AuthError::NoOtpPending
        | AuthError::OtpExpired
        | AuthError::OtpMismatch
        | AuthError::NoToken
        | AuthError::TokenExpired
        | AuthError::TokenInvalid
        | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AuthError::AccountDeactivated | AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::OtpDeliveryFailed => StatusCode::BAD_GATEWAY,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(&err);

        match err {
            AuthError::Internal(detail) => {
                error!(error = %detail, "Request failed with internal error");
                let body =
                    ApiResponse::<()>::error("Internal server error").with_code("internal_error");
                let mut response = (status, Json(body)).into_response();
                response.extensions_mut().insert(InternalErrorDetail(detail));
                response
            }
            AuthError::Validation(ref fields) => {
                let details = serde_json::to_value(fields).unwrap_or_default();
                let body = ApiResponse::<()>::error(err.to_string())
                    .with_code(err.code())
                    .with_details(details);
                (status, Json(body)).into_response()
            }
            other => {
                let body = ApiResponse::<()>::error(other.to_string()).with_code(other.code());
                (status, Json(body)).into_response()
            }
        }
    }
}
