pub mod identity;
pub mod ports;

// Re-export key types for convenience
pub use identity::{
    require_role, AuthContext, AuthService, AuthSettings, LoginSession, OtpDispatch,
    RegisterInput, RequestCredentials,
};
pub use ports::{EmailError, EmailMessage, EmailTransport};
