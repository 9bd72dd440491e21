use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CreateUserDto, OtpChallenge, User};
use crate::shared::DomainResult;

/// Persistence boundary for user records.
///
/// Emails passed in are already normalized. `create_user` must enforce email
/// uniqueness and report a clash as `AuthError::DuplicateEmail`.
#[async_trait]
pub trait UserRepositoryInterface: Send + Sync {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User>;

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>>;
    async fn email_exists(&self, email: &str) -> DomainResult<bool>;
    async fn list_users(&self) -> DomainResult<Vec<User>>;
    async fn count_users(&self) -> DomainResult<u64>;

    /// Replace any pending OTP with `challenge`.
    async fn set_otp(&self, id: &str, challenge: &OtpChallenge) -> DomainResult<()>;
    async fn clear_otp(&self, id: &str) -> DomainResult<()>;
    /// Consume the pending OTP if it still equals `code`: clear it, mark the
    /// user verified and stamp `last_login_at` in one step. Returns `false`
    /// and changes nothing when the code was already consumed or replaced.
    async fn record_login(&self, id: &str, code: &str, at: DateTime<Utc>) -> DomainResult<bool>;
    async fn set_active(&self, id: &str, is_active: bool) -> DomainResult<Option<User>>;

    /// Cheap liveness check for the health endpoint.
    async fn ping(&self) -> DomainResult<()>;
}
