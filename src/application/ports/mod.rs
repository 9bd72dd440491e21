//! Application ports (hexagonal architecture boundaries)
//!
//! The persistence port lives with its aggregate in `domain::user`.
//! Outbound ports that only the application layer drives live here.

pub mod outbound;

pub use outbound::{EmailError, EmailMessage, EmailTransport};
