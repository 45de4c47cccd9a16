use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// A freshly generated email-verification token.
///
/// `raw` goes into the verification link and is never stored; only `hash`
/// is persisted, so a database read alone cannot redeem a pending token.
pub struct VerificationToken {
    pub raw: String,
    pub hash: String,
}

/// Generate a 256-bit, URL-safe verification token together with its hash.
pub fn generate_verification_token() -> Result<VerificationToken> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate verification token")?;
    let raw = Base64UrlUnpadded::encode_string(&bytes);
    let hash = hash_token(&raw);
    Ok(VerificationToken { raw, hash })
}

/// Hex SHA-256 of a raw token; recomputed at verification time for lookup.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_token_is_url_safe_and_long_enough() {
        let token = generate_verification_token().expect("token generation");
        // 32 bytes, base64 without padding
        assert_eq!(token.raw.len(), 43);
        assert!(token
            .raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn hash_matches_recomputation() {
        let token = generate_verification_token().expect("token generation");
        assert_eq!(token.hash, hash_token(&token.raw));
        assert_eq!(token.hash.len(), 64);
        assert!(token.hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_stable_and_collision_free_for_distinct_inputs() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn consecutive_tokens_differ() {
        let first = generate_verification_token().expect("token generation");
        let second = generate_verification_token().expect("token generation");
        assert_ne!(first.raw, second.raw);
        assert_ne!(first.hash, second.hash);
    }
}
