use argon2::{
    Argon2, PasswordHasher as _, PasswordVerifier as _,
    password_hash::{PasswordHash, SaltString},
};

use crate::error::Error;

/// PasswordHasher
///
/// The one-way credential transform. Stored credentials are salted hashes in
/// PHC string form; the raw password exists only for the duration of a login
/// or join call and is never logged or persisted.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a raw password with a fresh random salt.
    fn hash(&self, raw: &str) -> Result<String, Error>;
    /// Checks a raw password against a stored hash. `Ok(false)` is a mismatch;
    /// `Err` means the stored hash itself is unusable.
    fn verify(&self, raw: &str, hash: &str) -> Result<bool, Error>;
}

/// Argon2PasswordHasher
///
/// Argon2id with the library defaults. Each hash carries its own 16-byte
/// random salt, so identical passwords never produce identical hashes.
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, raw: &str) -> Result<String, Error> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|e| Error::Internal(format!("salt generation failed: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Internal(format!("salt encoding failed: {e}")))?;

        Argon2::default()
            .hash_password(raw.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Internal(format!("password hashing failed: {e}")))
    }

    fn verify(&self, raw: &str, hash: &str) -> Result<bool, Error> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| Error::Internal(format!("stored password hash is malformed: {e}")))?;

        match Argon2::default().verify_password(raw.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Internal(format!("password verification failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn identical_passwords_hash_differently() {
        let hasher = Argon2PasswordHasher;
        let first = hasher.hash("same").unwrap();
        let second = hasher.hash("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        let hasher = Argon2PasswordHasher;
        assert!(hasher.verify("anything", "not-a-phc-string").is_err());
    }
}
