//! # CareList Auth
//!
//! Credential & session authority for the CareList hospital management
//! system: account registration, two-step login (password, then an
//! emailed one-time code), JWT session tokens and role-based access.
//!
//! ## Architecture
//!
//! - **domain**: user model, roles, repository contract
//! - **application**: the auth service and access checks
//! - **infrastructure**: SQLite store (SeaORM), crypto, email transports
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: process lifecycle (startup, graceful shutdown)

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use application::identity::AuthService;
pub use infrastructure::{init_database, DatabaseConfig};
pub use interfaces::http::create_api_router;
