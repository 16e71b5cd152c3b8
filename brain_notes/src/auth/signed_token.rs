//! Stateless, purpose-scoped, time-limited link tokens.
//!
//! A token is three base64url segments joined by dots:
//!
//! ```text
//! payload . issued_at (u64, big endian) . HMAC-SHA256(purpose key, "payload.issued_at")
//! ```
//!
//! The purpose key is itself derived from the process secret and the purpose
//! string, so a password-reset link never verifies as an email-verification
//! link even when both carry the same address. Nothing is stored server side;
//! a token dies when it ages past the caller's max age or when the secret
//! rotates.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const KEY_CONTEXT: &str = "brain-notes.signed-token.";

/// Use-case a signed token is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
    EmailChange,
}

impl TokenPurpose {
    pub const fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email-verification",
            TokenPurpose::PasswordReset => "password-reset",
            TokenPurpose::EmailChange => "email-change",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed token failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignedTokenError {
    /// Token is older than the allowed max age
    #[error("Link has expired, please request a new one")]
    Expired,

    /// Token is malformed, tampered with, or signed for another purpose or secret
    #[error("Invalid or tampered link")]
    InvalidSignature,
}

/// Issues and reads signed link tokens
#[derive(Clone)]
pub struct SignedTokenCodec {
    secret: Vec<u8>,
}

impl SignedTokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Issue a token for `payload`, stamped with the current time
    pub fn issue(&self, payload: &str, purpose: TokenPurpose) -> String {
        self.issue_at(payload, purpose, Utc::now().timestamp())
    }

    /// Issue a token stamped with `issued_at` (unix seconds)
    pub fn issue_at(&self, payload: &str, purpose: TokenPurpose, issued_at: i64) -> String {
        let stamp = u64::try_from(issued_at).unwrap_or(0);
        let body = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(stamp.to_be_bytes())
        );
        let signature = self.sign(purpose, body.as_bytes());

        format!("{body}.{}", URL_SAFE_NO_PAD.encode(signature))
    }

    /// Read a token back, checking purpose and age against the current time
    pub fn read(
        &self,
        token: &str,
        purpose: TokenPurpose,
        max_age_secs: i64,
    ) -> Result<String, SignedTokenError> {
        self.read_at(token, purpose, max_age_secs, Utc::now().timestamp())
    }

    /// Read a token back as of `now` (unix seconds)
    pub fn read_at(
        &self,
        token: &str,
        purpose: TokenPurpose,
        max_age_secs: i64,
        now: i64,
    ) -> Result<String, SignedTokenError> {
        let token = token.trim();
        let (body, signature_b64) = token
            .rsplit_once('.')
            .ok_or(SignedTokenError::InvalidSignature)?;
        let (payload_b64, stamp_b64) = body
            .split_once('.')
            .ok_or(SignedTokenError::InvalidSignature)?;

        let signature = decode_segment(signature_b64)?;
        let expected = self.sign(purpose, body.as_bytes());
        if !bool::from(expected.as_slice().ct_eq(&signature)) {
            return Err(SignedTokenError::InvalidSignature);
        }

        // Only trusted bytes from here on.
        let stamp: [u8; 8] = decode_segment(stamp_b64)?
            .try_into()
            .map_err(|_| SignedTokenError::InvalidSignature)?;
        let issued_at = i64::try_from(u64::from_be_bytes(stamp))
            .map_err(|_| SignedTokenError::InvalidSignature)?;

        if now.saturating_sub(issued_at) > max_age_secs {
            return Err(SignedTokenError::Expired);
        }

        String::from_utf8(decode_segment(payload_b64)?)
            .map_err(|_| SignedTokenError::InvalidSignature)
    }

    fn sign(&self, purpose: TokenPurpose, message: &[u8]) -> Vec<u8> {
        let mut derive = keyed_mac(&self.secret);
        derive.update(KEY_CONTEXT.as_bytes());
        derive.update(purpose.as_str().as_bytes());
        let purpose_key = derive.finalize().into_bytes();

        let mut mac = keyed_mac(&purpose_key);
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }
}

impl fmt::Debug for SignedTokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTokenCodec")
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn keyed_mac(key: &[u8]) -> HmacSha256 {
    // HMAC pads or hashes keys of any length, so this cannot fail.
    HmacSha256::new_from_slice(key).unwrap_or_else(|_| unreachable!("HMAC accepts any key length"))
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, SignedTokenError> {
    URL_SAFE_NO_PAD
        .decode(segment.as_bytes())
        .map_err(|_| SignedTokenError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DAY: i64 = 24 * 3600;
    const NOW: i64 = 1_760_000_000;

    fn codec() -> SignedTokenCodec {
        SignedTokenCodec::new("test_secret_key_for_signed_tokens_only")
    }

    #[test]
    fn test_round_trip() {
        let token = codec().issue_at("a@x.com", TokenPurpose::EmailVerification, NOW);
        let payload = codec()
            .read_at(&token, TokenPurpose::EmailVerification, DAY, NOW + 60)
            .unwrap();
        assert_eq!(payload, "a@x.com");
    }

    #[test]
    fn test_reset_token_is_not_a_verification_token() {
        let token = codec().issue_at("a@x.com", TokenPurpose::PasswordReset, NOW);
        assert_eq!(
            codec().read_at(&token, TokenPurpose::EmailVerification, DAY, NOW),
            Err(SignedTokenError::InvalidSignature)
        );
        assert_eq!(
            codec().read_at(&token, TokenPurpose::EmailChange, DAY, NOW),
            Err(SignedTokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let token = codec().issue_at("a@x.com", TokenPurpose::PasswordReset, NOW);
        assert!(
            codec()
                .read_at(&token, TokenPurpose::PasswordReset, DAY, NOW + DAY)
                .is_ok()
        );
        assert_eq!(
            codec().read_at(&token, TokenPurpose::PasswordReset, DAY, NOW + DAY + 1),
            Err(SignedTokenError::Expired)
        );
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = codec().issue_at("a@x.com", TokenPurpose::EmailVerification, NOW);
        let other = SignedTokenCodec::new("a_completely_different_secret_value");
        assert_eq!(
            other.read_at(&token, TokenPurpose::EmailVerification, DAY, NOW),
            Err(SignedTokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_forged_old_token_reports_signature_not_expiry() {
        let token = codec().issue_at("a@x.com", TokenPurpose::EmailVerification, NOW);
        let mut forged = token.clone();
        forged.push('A');
        assert_eq!(
            codec().read_at(&forged, TokenPurpose::EmailVerification, DAY, NOW + 10 * DAY),
            Err(SignedTokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["", "abc", "a.b", "a.b.c", "...", "!!.??.**"] {
            assert_eq!(
                codec().read_at(token, TokenPurpose::EmailVerification, DAY, NOW),
                Err(SignedTokenError::InvalidSignature),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = codec().issue_at("ünïcode+/=@x.com", TokenPurpose::EmailChange, NOW);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    proptest! {
        #[test]
        fn prop_payload_survives_and_stays_scoped(payload in ".{0,64}", age in 0i64..DAY) {
            let token = codec().issue_at(&payload, TokenPurpose::PasswordReset, NOW);
            prop_assert_eq!(
                codec().read_at(&token, TokenPurpose::PasswordReset, DAY, NOW + age),
                Ok(payload)
            );
            prop_assert_eq!(
                codec().read_at(&token, TokenPurpose::EmailVerification, DAY, NOW + age),
                Err(SignedTokenError::InvalidSignature)
            );
        }

        #[test]
        fn prop_flipping_a_signature_byte_is_detected(index in 0usize..32) {
            let token = codec().issue_at("a@x.com", TokenPurpose::EmailChange, NOW);
            let (body, signature) = token.rsplit_once('.').unwrap();
            let mut raw = URL_SAFE_NO_PAD.decode(signature).unwrap();
            raw[index] ^= 0x01;
            let tampered = format!("{body}.{}", URL_SAFE_NO_PAD.encode(raw));
            prop_assert_eq!(
                codec().read_at(&tampered, TokenPurpose::EmailChange, DAY, NOW),
                Err(SignedTokenError::InvalidSignature)
            );
        }
    }
}
