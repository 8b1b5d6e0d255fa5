use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::{Error, Result};

const ARGON2_MEMORY: u32 = 19 * 1024; // 19 MiB
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

/// Hashes and verifies account passwords with Argon2id.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .expect("invalid argon2 params");

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hashes a password into a PHC string with an embedded random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verifies a password against a stored hash
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Hashing(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Hashing(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_correct_password() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("Secret@123").unwrap();

        assert!(hasher.verify("Secret@123", &hash).unwrap());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("Secret@123").unwrap();

        assert!(!hasher.verify("Secret@124", &hash).unwrap());
        assert!(!hasher.verify("secret@123", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = PasswordHasher::new();
        let a = hasher.hash("Secret@123").unwrap();
        let b = hasher.hash("Secret@123").unwrap();

        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        let hasher = PasswordHasher::new();
        assert!(hasher.verify("Secret@123", "not-a-phc-string").is_err());
    }
}
