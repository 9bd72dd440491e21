//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::PublicUser;

/// User API representation. Never carries the password hash or OTP.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub full_name: String,
    pub email: String,
    /// `admin`, `clinician` or `patient`
    pub role: String,
    pub is_verified: bool,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<PublicUser> for UserDto {
    fn from(u: PublicUser) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            role: u.role.as_str().to_string(),
            is_verified: u.is_verified,
            is_active: u.is_active,
            last_login_at: u.last_login_at,
            created_at: u.created_at,
        }
    }
}

/// Activate / deactivate request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetActiveRequest {
    pub is_active: bool,
}
