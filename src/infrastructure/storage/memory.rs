//! In-memory user store for development and testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{
    AuthError, CreateUserDto, DomainResult, OtpChallenge, User, UserRepositoryInterface,
};

/// DashMap-backed user repository.
///
/// `by_email` maps a normalized email to the user id; claiming the entry
/// there is what makes email uniqueness atomic.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
    by_email: DashMap<String, String>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, id: &str, f: F) -> DomainResult<Option<User>>
    where
        F: FnOnce(&mut User),
    {
        match self.users.get_mut(id) {
            Some(mut user) => {
                f(&mut user);
                user.updated_at = Utc::now();
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepositoryInterface for InMemoryUserRepository {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            full_name: dto.full_name,
            email: dto.email,
            password_hash: dto.password_hash,
            role: dto.role,
            is_verified: false,
            is_active: true,
            otp: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(AuthError::DuplicateEmail),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let id = match self.by_email.get(email) {
            Some(id) => id.value().clone(),
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn email_exists(&self, email: &str) -> DomainResult<bool> {
        Ok(self.by_email.contains_key(email))
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn count_users(&self) -> DomainResult<u64> {
        Ok(self.users.len() as u64)
    }

    async fn set_otp(&self, id: &str, challenge: &OtpChallenge) -> DomainResult<()> {
        self.update(id, |u| u.otp = Some(challenge.clone()))?
            .map(|_| ())
            .ok_or(AuthError::UserNotFound)
    }

    async fn clear_otp(&self, id: &str) -> DomainResult<()> {
        self.update(id, |u| u.otp = None)?;
        Ok(())
    }

    async fn record_login(&self, id: &str, code: &str, at: DateTime<Utc>) -> DomainResult<bool> {
        // The shard guard makes the check and the clear atomic.
        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(false);
        };
        if !matches!(&user.otp, Some(pending) if pending.code == code) {
            return Ok(false);
        }
        user.otp = None;
        user.is_verified = true;
        user.last_login_at = Some(at);
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_active(&self, id: &str, is_active: bool) -> DomainResult<Option<User>> {
        self.update(id, |u| u.is_active = is_active)
    }

    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}
