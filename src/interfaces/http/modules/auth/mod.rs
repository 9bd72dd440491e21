//! Authentication module: signup, OTP login, session, logout

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
