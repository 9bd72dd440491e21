//! Values produced by the login flow and by request verification

use serde::Serialize;

use crate::domain::PublicUser;

/// Raw credentials lifted off an incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    /// Token from `Authorization: Bearer <token>`
    pub bearer: Option<String>,
    /// Token from the `token` cookie
    pub cookie: Option<String>,
}

impl RequestCredentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
            cookie: None,
        }
    }

    pub fn cookie(token: impl Into<String>) -> Self {
        Self {
            bearer: None,
            cookie: Some(token.into()),
        }
    }

    /// The token to verify. The header wins over the cookie.
    pub fn token(&self) -> Option<&str> {
        self.bearer
            .as_deref()
            .or(self.cookie.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Verified identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user: PublicUser,
    pub token: String,
}

/// Outcome of BeginLogin / ResendOtp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpDispatch {
    pub email: String,
    pub expires_in_seconds: i64,
}

/// Outcome of a completed login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSession {
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_wins_over_cookie() {
        let creds = RequestCredentials {
            bearer: Some("from-header".into()),
            cookie: Some("from-cookie".into()),
        };
        assert_eq!(creds.token(), Some("from-header"));
    }

    #[test]
    fn cookie_used_without_header() {
        assert_eq!(RequestCredentials::cookie("abc").token(), Some("abc"));
    }

    #[test]
    fn blank_is_no_token() {
        assert_eq!(RequestCredentials::default().token(), None);
        assert_eq!(RequestCredentials::bearer("  ").token(), None);
    }
}
