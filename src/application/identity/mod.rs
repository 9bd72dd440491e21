//! Identity module: credentials, OTP login and session verification
//!
//! `AuthService` orchestrates every authentication use-case; `access`
//! holds the role gate applied after a request is verified.

pub mod access;
pub mod service;
pub mod session;

pub use access::{current_user, require_role};
pub use service::{AuthService, AuthSettings, RegisterInput};
pub use session::{AuthContext, LoginSession, OtpDispatch, RequestCredentials};
