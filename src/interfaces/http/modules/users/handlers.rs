//! User management API handlers
//!
//! Admin-only endpoints. Delegates to `AuthService`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::dto::{SetActiveRequest, UserDto};
use crate::application::identity::{AuthContext, AuthService};
use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};

#[derive(Clone)]
pub struct UserHandlerState {
    pub service: Arc<AuthService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users, newest first", body = ApiResponse<Vec<UserDto>>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    State(state): State<UserHandlerState>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state.service.list_users().await?;
    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/active",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<UserDto>),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Admin tried to deactivate own account")
    )
)]
pub async fn set_user_active(
    State(state): State<UserHandlerState>,
    Extension(actor): Extension<AuthContext>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<SetActiveRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .service
        .set_user_active(&actor, &id, request.is_active)
        .await?;
    let message = if user.is_active {
        "User activated"
    } else {
        "User deactivated"
    };
    Ok(Json(ApiResponse::success(UserDto::from(user)).with_message(message)))
}
