use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self
            .0
            .iter()
            .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{}: {}", field, m)))
            .collect();
        write!(f, "{}", joined.join("; "))
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            for e in errs {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                out.add(field.to_string(), msg);
            }
        }
        out
    }
}

/// Every failure the credential & session authority can report.
///
/// Messages are user-facing; `code()` is the stable machine-readable kind.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Your account has been deactivated. Please contact support.")]
    AccountDeactivated,

    #[error("Failed to send OTP email. Please try again.")]
    OtpDeliveryFailed,

    #[error("OTP must be a 6-digit number")]
    InvalidOtpFormat,

    #[error("User not found")]
    UserNotFound,

    #[error("No OTP found. Please request a new one.")]
    NoOtpPending,

    #[error("OTP has expired. Please request a new one.")]
    OtpExpired,

    #[error("Invalid OTP. Please try again.")]
    OtpMismatch,

    #[error("No token provided. Access denied.")]
    NoToken,

    #[error("Token expired. Please login again.")]
    TokenExpired,

    #[error("Invalid token. Please login again.")]
    TokenInvalid,

    #[error("Authentication required.")]
    Unauthenticated,

    #[error("Access denied. Required role(s): {required}. Your role: {actual}")]
    Forbidden { required: String, actual: String },

    /// Store, hashing or signing failure. The detail is never shown to
    /// clients outside development mode.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::DuplicateEmail => "duplicate_email",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountDeactivated => "account_deactivated",
            Self::OtpDeliveryFailed => "otp_delivery_failed",
            Self::InvalidOtpFormat => "invalid_otp_format",
            Self::UserNotFound => "user_not_found",
            Self::NoOtpPending => "no_otp_pending",
            Self::OtpExpired => "otp_expired",
            Self::OtpMismatch => "otp_mismatch",
            Self::NoToken => "no_token",
            Self::TokenExpired => "token_expired",
            Self::TokenInvalid => "token_invalid",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden { .. } => "forbidden",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type for domain and application operations
pub type DomainResult<T> = Result<T, AuthError>;
