//! Authentication API handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};

use super::dto::{
    CheckEmailRequest, CheckEmailResponse, LoginRequest, LoginResponse, OtpResentResponse,
    OtpSentResponse, RegisterRequest, RegisteredUser, ResendOtpRequest, VerifyOtpRequest,
};
use crate::application::identity::{current_user, AuthContext, AuthService, RegisterInput};
use crate::interfaces::http::common::cookies::{expired_session_cookie, session_cookie, set_cookie};
use crate::interfaces::http::common::{ApiError, ApiResponse, EmptyData, ValidatedJson};
use crate::interfaces::http::modules::users::UserDto;

/// Auth state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub service: Arc<AuthService>,
    /// Adds `Secure` to the session cookie
    pub cookie_secure: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<RegisteredUser>),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredUser>>), ApiError> {
    let user = state
        .service
        .register(RegisterInput {
            full_name: request.full_name,
            email: request.email,
            password: request.password,
            role: request.role,
        })
        .await?;

    let response = RegisteredUser {
        id: user.id,
        full_name: user.full_name,
        email: user.email,
        role: user.role.to_string(),
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(response).with_message("User registered successfully")),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Password accepted, OTP mailed", body = ApiResponse<OtpSentResponse>),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Account deactivated"),
        (status = 502, description = "OTP email could not be delivered")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<OtpSentResponse>>, ApiError> {
    let dispatch = state
        .service
        .begin_login(&request.email, &request.password)
        .await?;

    let response = OtpSentResponse {
        email: dispatch.email,
        otp_sent: true,
        expires_in_seconds: dispatch.expires_in_seconds,
    };
    Ok(Json(
        ApiResponse::success(response).with_message("OTP sent to your email"),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/resend-otp",
    tag = "Authentication",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "New OTP mailed", body = ApiResponse<OtpResentResponse>),
        (status = 404, description = "User not found"),
        (status = 502, description = "OTP email could not be delivered")
    )
)]
pub async fn resend_otp(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<ResendOtpRequest>,
) -> Result<Json<ApiResponse<OtpResentResponse>>, ApiError> {
    let dispatch = state.service.resend_otp(&request.email).await?;

    let response = OtpResentResponse {
        email: dispatch.email,
        expires_in_seconds: dispatch.expires_in_seconds,
    };
    Ok(Json(
        ApiResponse::success(response).with_message("New OTP has been sent to your email"),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-otp",
    tag = "Authentication",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Login complete; token also set as `token` cookie", body = ApiResponse<LoginResponse>),
        (status = 400, description = "OTP is not six digits"),
        (status = 401, description = "No pending OTP, expired or wrong"),
        (status = 404, description = "User not found")
    )
)]
pub async fn verify_otp(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<VerifyOtpRequest>,
) -> Result<(HeaderMap, Json<ApiResponse<LoginResponse>>), ApiError> {
    let session = state
        .service
        .complete_login(&request.email, &request.otp)
        .await?;

    let mut headers = HeaderMap::new();
    set_cookie(
        &mut headers,
        &session_cookie(&session.token, session.expires_in, state.cookie_secure),
    );

    let response = LoginResponse {
        token: session.token,
        token_type: session.token_type,
        expires_in: session.expires_in,
        user: UserDto::from(session.user),
    };
    Ok((
        headers,
        Json(ApiResponse::success(response).with_message("Login successful")),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out; session cookie cleared", body = ApiResponse<EmptyData>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn logout(
    State(state): State<AuthHandlerState>,
    Extension(context): Extension<AuthContext>,
) -> (HeaderMap, Json<ApiResponse<EmptyData>>) {
    state.service.logout(&context);

    let mut headers = HeaderMap::new();
    set_cookie(&mut headers, &expired_session_cookie(state.cookie_secure));
    (
        headers,
        Json(ApiResponse::success(EmptyData {}).with_message("Logged out successfully")),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserDto>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    Extension(context): Extension<AuthContext>,
) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(current_user(&context))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/check-email",
    tag = "Authentication",
    request_body = CheckEmailRequest,
    responses(
        (status = 200, description = "Whether the email is registered", body = ApiResponse<CheckEmailResponse>),
        (status = 422, description = "Validation error")
    )
)]
pub async fn check_email(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<CheckEmailRequest>,
) -> Result<Json<ApiResponse<CheckEmailResponse>>, ApiError> {
    let exists = state.service.email_exists(&request.email).await?;
    Ok(Json(ApiResponse::success(CheckEmailResponse { exists })))
}
