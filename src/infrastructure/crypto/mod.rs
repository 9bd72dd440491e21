//! Password hashing, OTP generation and JWT signing

pub mod jwt;
pub mod otp;
pub mod password;
