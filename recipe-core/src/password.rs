//! Salted, iterated SHA-256 password hashes.
//!
//! Stored form: `sha256$<iterations>$<salt>$<hex digest>`.

use std::sync::OnceLock;

use sha2::{Digest, Sha256};
use uuid::Uuid;

const SCHEME: &str = "sha256";
pub const DEFAULT_ITERATIONS: u32 = 100_000;

fn digest(password: &str, salt: &str, iterations: u32) -> String {
    let mut hash = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..iterations {
        hash = Sha256::new()
            .chain_update(hash)
            .chain_update(password.as_bytes())
            .finalize();
    }
    hex::encode(hash)
}

pub fn hash_password(password: &str) -> String {
    hash_password_with(password, DEFAULT_ITERATIONS)
}

pub fn hash_password_with(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let salt = Uuid::new_v4().simple().to_string();
    format!("{SCHEME}${iterations}${salt}${}", digest(password, &salt, iterations))
}

/// A well-formed hash of a random password, checked when a login names no user
/// so the failure costs the same as a wrong password.
pub fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password(&Uuid::new_v4().simple().to_string()))
}

/// Checks a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    let actual = digest(password, salt, iterations);
    constant_time_eq(actual.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
