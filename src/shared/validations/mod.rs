//! Input shape checks shared by the HTTP layer and the identity service

use std::sync::OnceLock;

use regex::Regex;
use validator::ValidationError;

/// Minimum accepted password length (characters)
pub const MIN_PASSWORD_LEN: usize = 6;

/// Number of digits in a one-time password
pub const OTP_LEN: usize = 6;

/// Canonical form used for every email lookup and write.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `local@domain.tld` with no whitespace anywhere.
pub const EMAIL_PATTERN: &str = r"^\S+@\S+\.\S+$";

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("EMAIL_PATTERN compiles"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Exactly six ASCII digits.
pub fn is_valid_otp_format(otp: &str) -> bool {
    otp.len() == OTP_LEN && otp.bytes().all(|b| b.is_ascii_digit())
}

pub fn validate_email_shape(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some("Please enter a valid email address".into());
        Err(err)
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("This field is required".into());
        Err(err)
    } else {
        Ok(())
    }
}
