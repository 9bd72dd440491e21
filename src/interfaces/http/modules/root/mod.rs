//! Service banner at `/`

pub mod handlers;

pub use handlers::*;
