use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::warn;

use crate::{
    auth::jwt::{Claims, JwtKeys},
    auth::repo::Role,
    error::AuthError,
};

/// Name of the session cookie set at login and cleared at logout.
pub const SESSION_COOKIE: &str = "token";

/// Authorization gate: extracts and verifies the session token, handing the
/// decoded claims to the handler as a typed value.
///
/// The token is taken from the `token` cookie first, then from the
/// `Authorization` header (with or without a `Bearer ` prefix). Any failure
/// (absent, expired, bad signature, malformed) is one opaque 401.
#[derive(Debug)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = bearer_or_cookie_token(parts).ok_or(AuthError::Unauthorized)?;
        match keys.verify(&token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(err) => {
                warn!(reason = %err, "session token rejected");
                Err(AuthError::Unauthorized)
            }
        }
    }
}

/// Role check, composed after extraction: claims come from `AuthUser`, so an
/// unauthenticated request can never reach this and get a 403.
pub fn authorize(claims: &Claims, required: &[Role]) -> Result<(), AuthError> {
    if required.contains(&claims.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

fn bearer_or_cookie_token(parts: &Parts) -> Option<String> {
    if let Some(cookies) = parts
        .headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(token) = session_cookie_value(cookies) {
            return Some(token);
        }
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|raw| raw.strip_prefix("Bearer ").unwrap_or(raw).trim().to_string())
        .filter(|token| !token.is_empty())
}

fn session_cookie_value(cookie_header: &str) -> Option<String> {
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|pair| {
            pair.strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .map(str::to_string)
        .filter(|token| !token.is_empty())
}
