use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::repo::Role, config::JwtConfig, state::AppState};

/// Session claims carried by the signed token; never persisted server-side.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Why a presented session token was rejected.
///
/// Kept distinct internally; the authorization gate collapses all three to
/// a single 401 for clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("session token expired")]
    Expired,
    #[error("session token signature mismatch")]
    InvalidSignature,
    #[error("session token malformed")]
    Malformed,
}

/// Holds signing and verification keys with the session config.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.max(0) as u64 * 60),
        }
    }

    /// Session lifetime in whole seconds, for the cookie Max-Age.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.as_secs() as i64
    }

    pub fn sign(&self, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => Err(match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn test_config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60,
        }
    }

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::from_config(&test_config(secret))
    }

    #[test]
    fn sign_and_verify_roundtrip_preserves_claims() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys
            .sign(user_id, "alice@x.com", Role::User)
            .expect("sign token");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "alice@x.com");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_wrong_secret_as_invalid_signature() {
        let token = make_keys("secret-a")
            .sign(Uuid::new_v4(), "a@x.com", Role::User)
            .expect("sign token");
        let err = make_keys("secret-b").verify(&token).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn verify_rejects_expired_token_as_expired() {
        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            role: Role::User,
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn verify_rejects_garbage_as_malformed() {
        let keys = make_keys("dev-secret");
        assert_eq!(
            keys.verify("definitely-not-a-jwt").unwrap_err(),
            TokenError::Malformed
        );
        assert_eq!(keys.verify("").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn admin_role_survives_the_roundtrip() {
        let keys = make_keys("dev-secret");
        let token = keys
            .sign(Uuid::new_v4(), "root@x.com", Role::Admin)
            .expect("sign token");
        assert_eq!(keys.verify(&token).expect("verify").role, Role::Admin);
    }

    #[test]
    fn ttl_seconds_matches_config() {
        assert_eq!(make_keys("s").ttl_seconds(), 3600);
    }
}
