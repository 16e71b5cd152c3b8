//! Input checks applied before any account state is touched.

use super::errors::{AuthError, AuthResult};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_EMAIL_LEN: usize = 255;

/// Trim and lowercase an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate username format
pub fn validate_username(username: &str) -> AuthResult<()> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AuthError::InvalidUsername(
            "Username must be 3-50 characters".to_string(),
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AuthError::InvalidUsername(
            "Username can only contain letters, numbers, '_', '-' and '.'".to_string(),
        ));
    }

    Ok(())
}

/// Basic email shape check on already-normalized input
pub fn validate_email(email: &str) -> AuthResult<()> {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(AuthError::InvalidEmail(format!(
            "Email must be 1-{MAX_EMAIL_LEN} characters"
        )));
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && domain.split('.').all(|label| !label.is_empty())
        }
        None => false,
    };

    if !well_formed {
        return Err(AuthError::InvalidEmail(
            "Email must look like name@example.com".to_string(),
        ));
    }

    Ok(())
}

/// Validate the display name
pub fn validate_full_name(full_name: &str) -> AuthResult<()> {
    let len = full_name.trim().chars().count();
    if !(1..=100).contains(&len) {
        return Err(AuthError::InvalidFullName(
            "Full name must be 1-100 characters".to_string(),
        ));
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a_b-c.d").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("semi;colon").is_err());
    }

    #[test]
    fn test_normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_email_accepts_basic_format() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("name.surname@mail.example.co").is_ok());
    }

    #[test]
    fn test_email_rejects_missing_parts() {
        for email in [
            "",
            "not-an-email",
            "missing-domain@",
            "@example.com",
            "a@b",
            "a@b.",
            "a@.com",
            "a@@b.com",
            "a b@c.com",
            "a@b..com",
        ] {
            assert!(validate_email(email).is_err(), "{email:?} should be rejected");
        }
    }

    #[test]
    fn test_password_length_is_counted_in_chars() {
        assert!(validate_password("pw12345678").is_ok());
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("ääääääää").is_ok());
    }

    #[test]
    fn test_full_name() {
        assert!(validate_full_name("Alice Liddell").is_ok());
        assert!(validate_full_name("   ").is_err());
        assert!(validate_full_name(&"x".repeat(101)).is_err());
    }
}
