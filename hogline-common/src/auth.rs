//! Placeholder credential helpers.
//!
//! Users created by the order import never receive a usable password; they
//! go through a separate password-setup flow before first login. The import
//! stores a hash of a throwaway random secret so the account is unguessable
//! in the meantime.

use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

/// Length of generated throwaway passwords
const PLACEHOLDER_PASSWORD_LEN: usize = 40;

/// Generate a cryptographically random throwaway password.
pub fn generate_placeholder_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PLACEHOLDER_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Hash a password for storage (SHA-256 hex digest).
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    format!("{:x}", digest)
}
