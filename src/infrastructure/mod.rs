//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod email;
pub mod storage;

pub use database::{init_database, DatabaseConfig, UserRepository};
pub use email::build_transport;
pub use storage::InMemoryUserRepository;
