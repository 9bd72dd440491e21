use axum::{Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::identity::AuthContext;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::modules::users::UserDto;

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
    pub docs: String,
    /// Present when the request carried a valid session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<UserDto>,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses(
        (status = 200, description = "Service information", body = ApiResponse<ServiceInfo>)
    )
)]
pub async fn service_info(context: Option<Extension<AuthContext>>) -> Json<ApiResponse<ServiceInfo>> {
    let viewer = context.map(|Extension(ctx)| UserDto::from(ctx.user));
    Json(ApiResponse::success(ServiceInfo {
        name: "CareList Auth API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        docs: "/docs".to_string(),
        viewer,
    }))
}
