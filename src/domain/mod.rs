pub mod user;

pub use user::{
    CreateUserDto, OtpChallenge, PublicUser, User, UserRepositoryInterface, UserRole,
};

pub use crate::shared::{AuthError, DomainResult, FieldErrors};
