//! User aggregate
//!
//! Contains the User entity, its public projection, and the repository interface.

pub mod model;
pub mod repository;

mod dto_create;

pub use model::{OtpChallenge, PublicUser, User, UserRole};

pub use dto_create::CreateUserDto;

pub use repository::UserRepositoryInterface;
