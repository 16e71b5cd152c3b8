//! Argon2id password hashing.

use std::fmt;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::errors::{AuthError, AuthResult};

/// One-way password hasher with an optional server-side pepper.
///
/// Digests are PHC strings, so the salt and Argon2 parameters travel with
/// the hash and older digests keep verifying if the defaults change.
#[derive(Clone, Default)]
pub struct CredentialHasher {
    pepper: String,
}

impl CredentialHasher {
    /// Create a hasher. An empty pepper disables peppering.
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            pepper: pepper.into(),
        }
    }

    /// Hash password with Argon2id + pepper
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = self.peppered(password);
        let salt = SaltString::generate(&mut OsRng);

        Ok(Argon2::default()
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Check a password against a stored digest.
    ///
    /// A wrong password and an unreadable digest both yield `false`.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(digest) else {
            return false;
        };
        let peppered = self.peppered(password);

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .is_ok()
    }

    fn peppered(&self, password: &str) -> String {
        format!("{}{}", password, self.pepper)
    }
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("pepper", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = CredentialHasher::new("pepper_for_tests");
        let digest = hasher.hash("correct horse battery").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse battery", &digest));
        assert!(!hasher.verify("correct horse batterY", &digest));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = CredentialHasher::default();
        let a = hasher.hash("pw12345678").unwrap();
        let b = hasher.hash("pw12345678").unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify("pw12345678", &a));
        assert!(hasher.verify("pw12345678", &b));
    }

    #[test]
    fn test_pepper_is_part_of_the_secret() {
        let digest = CredentialHasher::new("one").hash("pw12345678").unwrap();
        assert!(!CredentialHasher::new("two").verify("pw12345678", &digest));
    }

    #[test]
    fn test_garbage_digest_does_not_verify() {
        let hasher = CredentialHasher::default();
        assert!(!hasher.verify("pw12345678", "not-a-phc-string"));
        assert!(!hasher.verify("pw12345678", ""));
    }

    #[test]
    fn test_debug_hides_pepper() {
        let rendered = format!("{:?}", CredentialHasher::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
