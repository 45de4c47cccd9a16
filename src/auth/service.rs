use axum::extract::FromRef;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::{Claims, JwtKeys},
    auth::repo::{is_unique_violation, Role, User, UserChanges},
    auth::{extractors::authorize, password, token},
    error::AuthError,
    state::AppState,
};

/// Verification links die after one hour, same as the session TTL.
const VERIFICATION_TOKEN_TTL: TimeDuration = TimeDuration::hours(1);

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub struct RegisterInput {
    pub email: String,
    pub user_name: String,
    pub password: String,
}

/// Register a new user, or refresh a pending unverified registration for the
/// same email. A verified user already holding the email is a conflict.
///
/// The verification mail is sent on a detached task: a slow or failing mail
/// provider never rolls back the committed user row.
pub async fn register(state: &AppState, input: RegisterInput) -> Result<Uuid, AuthError> {
    let email = normalize_email(&input.email);
    if !is_valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".into()));
    }
    if input.password.len() < 8 {
        return Err(AuthError::Validation("Password too short".into()));
    }
    let user_name = input.user_name.trim().to_string();
    if user_name.is_empty() {
        return Err(AuthError::Validation("User name is required".into()));
    }

    let plain = input.password;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|err| anyhow::anyhow!("hash task failed: {err}"))??;

    let verification = token::generate_verification_token()?;
    let token_expiry = OffsetDateTime::now_utc() + VERIFICATION_TOKEN_TTL;

    let user_id = User::register_unverified(
        &state.db,
        &email,
        &user_name,
        &password_hash,
        &verification.hash,
        token_expiry,
    )
    .await?
    .ok_or(AuthError::Conflict)?;

    let verify_url = build_verify_url(&state.config.client_url, &verification.raw);
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer.send_verification(&email, &verify_url).await {
            // Best effort only; the registration itself already committed.
            warn!(error = %err, "failed to deliver verification email");
        }
    });

    info!(user_id = %user_id, "user registered, verification pending");
    Ok(user_id)
}

/// Redeem an emailed verification token. Single-use: the redeeming update
/// clears the stored hash, so a replay fails exactly like a bad token.
pub async fn verify_email(state: &AppState, raw_token: &str) -> Result<Uuid, AuthError> {
    let raw_token = raw_token.trim();
    if raw_token.is_empty() {
        return Err(AuthError::Validation("Invalid token".into()));
    }

    let token_hash = token::hash_token(raw_token);
    let user_id = User::consume_verification_token(&state.db, &token_hash)
        .await?
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    info!(user_id = %user_id, "email verified");
    Ok(user_id)
}

/// Check credentials and mint a session token.
///
/// Unknown email and wrong password are deliberately indistinguishable.
/// An unverified account is refused before the password check, so the
/// outcome does not depend on password correctness.
pub async fn login(state: &AppState, email: &str, password_plain: &str) -> Result<String, AuthError> {
    let email = normalize_email(email);
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !user.is_email_verified {
        return Err(AuthError::EmailNotVerified);
    }

    let plain = password_plain.to_string();
    let stored_hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored_hash))
        .await
        .map_err(|err| anyhow::anyhow!("verify task failed: {err}"))??;

    if !matches {
        return Err(AuthError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id, &user.email, user.role)?;
    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

pub async fn profile(state: &AppState, user_id: Uuid) -> Result<User, AuthError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthError::NotFound)
}

pub struct ImageUpload {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Default)]
pub struct ProfileUpdate {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub image: Option<ImageUpload>,
}

impl ProfileUpdate {
    fn is_empty(&self) -> bool {
        self.user_name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.role.is_none()
            && self.image.is_none()
    }
}

/// Apply a partial profile update on behalf of `actor`.
///
/// Policy: a user may edit their own profile; an admin may edit anyone's;
/// only admins may change roles. A replaced profile image has its old asset
/// deleted best-effort, and a failed upload aborts the update before any
/// database write.
pub async fn update_profile(
    state: &AppState,
    actor: &Claims,
    target_id: Uuid,
    update: ProfileUpdate,
) -> Result<User, AuthError> {
    if actor.role != Role::Admin && actor.sub != target_id {
        return Err(AuthError::Forbidden);
    }
    if update.role.is_some() {
        authorize(actor, &[Role::Admin])?;
    }
    if update.is_empty() {
        return Err(AuthError::Validation("No fields provided for update".into()));
    }

    let email = match update.email {
        Some(raw) => {
            let email = normalize_email(&raw);
            if !is_valid_email(&email) {
                return Err(AuthError::Validation("Invalid email".into()));
            }
            Some(email)
        }
        None => None,
    };

    let user = User::find_by_id(&state.db, target_id)
        .await?
        .ok_or(AuthError::NotFound)?;

    let password_hash = match update.password {
        Some(plain) => Some(
            tokio::task::spawn_blocking(move || password::hash_password(&plain))
                .await
                .map_err(|err| anyhow::anyhow!("hash task failed: {err}"))??,
        ),
        None => None,
    };

    let mut changes = UserChanges {
        user_name: update.user_name,
        email,
        password_hash,
        role: update.role,
        ..UserChanges::default()
    };

    if let Some(image) = update.image {
        let ext = ext_from_mime(&image.content_type).ok_or_else(|| {
            AuthError::Validation("Invalid file type. Only images are allowed.".into())
        })?;

        // Old asset first; losing it is tolerable, blocking the update is not.
        if let Some(old_id) = &user.profile_image_public_id {
            if let Err(err) = state.media.delete(old_id).await {
                warn!(error = %err, public_id = %old_id, "failed to delete old profile image");
            }
        }

        let key = format!("profiles/{}/{}.{}", user.id, Uuid::new_v4(), ext);
        let asset = state
            .media
            .upload(&key, image.bytes, &image.content_type)
            .await
            .map_err(|err| {
                error!(error = %err, key = %key, "profile image upload failed");
                AuthError::UploadFailed
            })?;
        changes.profile_image = Some(asset.url);
        changes.profile_image_public_id = Some(asset.public_id);
    }

    let updated = User::update_fields(&state.db, target_id, &changes)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AuthError::Conflict
            } else {
                AuthError::Internal(err.into())
            }
        })?
        .ok_or(AuthError::NotFound)?;

    info!(user_id = %updated.id, actor = %actor.sub, "profile updated");
    Ok(updated)
}

pub(crate) fn build_verify_url(client_url: &str, raw_token: &str) -> String {
    format!(
        "{}/verify-email?token={}",
        client_url.trim_end_matches('/'),
        raw_token
    )
}

fn ext_from_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn claims(role: Role) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            email: "actor@x.com".into(),
            role,
            iat: 0,
            exp: usize::MAX,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        }
    }

    #[test]
    fn email_validation_accepts_and_rejects() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("name.surname@example.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@domain"));
        assert!(!is_valid_email("@x.com"));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@X.COM "), "alice@x.com");
    }

    #[test]
    fn verify_url_joins_without_double_slash() {
        assert_eq!(
            build_verify_url("http://localhost:5173/", "tok"),
            "http://localhost:5173/verify-email?token=tok"
        );
    }

    #[test]
    fn ext_from_mime_allows_images_only() {
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/webp"), None);
        assert_eq!(ext_from_mime("application/pdf"), None);
    }

    #[tokio::test]
    async fn register_rejects_invalid_email_before_any_io() {
        let state = AppState::fake();
        let err = register(
            &state,
            RegisterInput {
                email: "nope".into(),
                user_name: "alice".into(),
                password: "pw123456".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let state = AppState::fake();
        let err = register(
            &state,
            RegisterInput {
                email: "alice@x.com".into(),
                user_name: "alice".into(),
                password: "short".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_blank_user_name() {
        let state = AppState::fake();
        let err = register(
            &state,
            RegisterInput {
                email: "alice@x.com".into(),
                user_name: "   ".into(),
                password: "pw123456".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn verify_email_rejects_blank_token() {
        let state = AppState::fake();
        let err = verify_email(&state, "  ").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn update_profile_forbids_editing_other_users() {
        let state = AppState::fake();
        let actor = claims(Role::User);
        let err = update_profile(
            &state,
            &actor,
            Uuid::new_v4(),
            ProfileUpdate {
                user_name: Some("mallory".into()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden));
    }

    #[tokio::test]
    async fn update_profile_forbids_role_change_for_non_admin() {
        let state = AppState::fake();
        let actor = claims(Role::User);
        let err = update_profile(
            &state,
            &actor,
            actor.sub,
            ProfileUpdate {
                role: Some(Role::Admin),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden));
    }

    #[tokio::test]
    async fn update_profile_rejects_empty_update() {
        let state = AppState::fake();
        let actor = claims(Role::User);
        let err = update_profile(&state, &actor, actor.sub, ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn update_profile_rejects_invalid_new_email() {
        let state = AppState::fake();
        let actor = claims(Role::User);
        let err = update_profile(
            &state,
            &actor,
            actor.sub,
            ProfileUpdate {
                email: Some("broken".into()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }
}
