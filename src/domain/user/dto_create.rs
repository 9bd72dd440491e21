use super::UserRole;

/// Insert payload. The password is already hashed and the email normalized.
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}
