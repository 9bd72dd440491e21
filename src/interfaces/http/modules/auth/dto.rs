//! Authentication DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::interfaces::http::modules::users::UserDto;
use crate::shared::validations::{validate_email_shape, validate_not_blank};

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub full_name: String,
    #[validate(custom(function = "validate_email_shape"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// `admin`, `clinician` (default) or `patient`
    pub role: Option<String>,
}

/// Summary of the account just created
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisteredUser {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(custom(function = "validate_email_shape"))]
    pub email: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OtpSentResponse {
    pub email: String,
    pub otp_sent: bool,
    pub expires_in_seconds: i64,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ResendOtpRequest {
    #[validate(custom(function = "validate_email_shape"))]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OtpResentResponse {
    pub email: String,
    pub expires_in_seconds: i64,
}

/// Only presence is checked here; the OTP format is judged by the service.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct VerifyOtpRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub email: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub otp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserDto,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct CheckEmailRequest {
    #[validate(custom(function = "validate_email_shape"))]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckEmailResponse {
    pub exists: bool,
}
