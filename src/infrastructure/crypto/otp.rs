//! One-time password generation and comparison

use rand::Rng;
use subtle::ConstantTimeEq;

/// Uniform draw over `000000..=999999` from the thread-local CSPRNG.
pub fn generate_otp() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", value)
}

/// Constant-time equality of a stored code and a candidate.
pub fn otp_matches(stored: &str, candidate: &str) -> bool {
    stored.as_bytes().ct_eq(candidate.as_bytes()).into()
}
