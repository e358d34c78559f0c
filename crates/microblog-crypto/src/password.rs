use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::debug;

/// Hash a plaintext password with Argon2id and a fresh random salt.
/// The returned PHC string embeds algorithm, params and salt.
pub fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();

    Ok(hash)
}

/// Check a plaintext password against a stored PHC hash.
/// A malformed hash never matches.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verify_roundtrip() {
        let hash = hash_password("password").unwrap();
        assert!(verify_password("password", &hash));
        assert!(!verify_password("beach", &hash));
    }

    #[test]
    fn hash_is_salted() {
        let a = hash_password("password").unwrap();
        let b = hash_password("password").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("password"));
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!verify_password("password", ""));
        assert!(!verify_password("password", "password"));
    }
}
