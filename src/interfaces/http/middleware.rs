//! Authentication and error-rendering middleware for Axum

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::identity::{require_role, AuthContext, AuthService, RequestCredentials};
use crate::domain::UserRole;
use crate::interfaces::http::common::cookies::{read_cookie, SESSION_COOKIE};
use crate::interfaces::http::common::{ApiError, ApiResponse, InternalErrorDetail};

/// State for the authentication middleware
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
}

/// Whether 500 responses carry the internal error text
#[derive(Clone, Copy, Debug)]
pub struct ErrorDetailMode {
    pub expose: bool,
}

/// Roles accepted by the admin-only routes
pub const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim().to_string())
    } else {
        None
    }
}

/// Collect the bearer header and session cookie from a request.
pub fn credentials_from_headers(headers: &HeaderMap) -> RequestCredentials {
    RequestCredentials {
        bearer: bearer_token(headers),
        cookie: read_cookie(headers, SESSION_COOKIE),
    }
}

/// Reject the request unless it carries a valid session. On success the
/// [`AuthContext`] is stored in the request extensions.
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let credentials = credentials_from_headers(request.headers());

    match auth_state.service.verify_request(&credentials).await {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// Attach an [`AuthContext`] when the request carries a valid session;
/// otherwise proceed anonymously.
pub async fn optional_auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let credentials = credentials_from_headers(request.headers());

    if let Some(context) = auth_state.service.optional_verify(&credentials).await {
        request.extensions_mut().insert(context);
    }

    next.run(request).await
}

/// Role gate. Must run inside [`auth_middleware`].
pub async fn role_gate(
    State(allowed): State<&'static [UserRole]>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let context = request.extensions().get::<AuthContext>();
    match require_role(context, allowed) {
        Ok(()) => next.run(request).await,
        Err(e) => ApiError(e).into_response(),
    }
}

/// Swap generic 500 bodies for ones carrying the internal detail when
/// running in development mode.
pub async fn error_detail_middleware(
    State(mode): State<ErrorDetailMode>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !mode.expose || response.status() != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }

    match response.extensions().get::<InternalErrorDetail>() {
        Some(detail) => {
            let body = ApiResponse::<()>::error("Internal server error")
                .with_code("internal_error")
                .with_details(serde_json::Value::String(detail.0.clone()));
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_and_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=from-cookie"));

        let creds = credentials_from_headers(&headers);
        assert_eq!(creds.bearer.as_deref(), Some("abc.def"));
        assert_eq!(creds.cookie.as_deref(), Some("from-cookie"));
        assert_eq!(creds.token(), Some("abc.def"));
    }

    #[test]
    fn non_bearer_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(credentials_from_headers(&headers).bearer.is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer lower"));
        assert_eq!(credentials_from_headers(&headers).bearer.as_deref(), Some("lower"));
    }
}
