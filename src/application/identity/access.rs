//! Role gating

use crate::domain::{AuthError, DomainResult, PublicUser, UserRole};

use super::session::AuthContext;

/// Allow the request only if it is authenticated with one of `allowed`.
pub fn require_role(context: Option<&AuthContext>, allowed: &[UserRole]) -> DomainResult<()> {
    let context = context.ok_or(AuthError::Unauthenticated)?;
    if allowed.contains(&context.user.role) {
        return Ok(());
    }

    let required: Vec<&str> = allowed.iter().map(UserRole::as_str).collect();
    Err(AuthError::Forbidden {
        required: required.join(", "),
        actual: context.user.role.to_string(),
    })
}

pub fn current_user(context: &AuthContext) -> PublicUser {
    context.user.clone()
}
