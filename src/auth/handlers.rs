use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MessageResponse, ProfileResponse, PublicUser,
            RegisterRequest, RegisterResponse, UpdateProfileResponse, VerifyEmailQuery,
        },
        extractors::{AuthUser, SESSION_COOKIE},
        jwt::JwtKeys,
        repo::Role,
        service::{self, ImageUpload, ProfileUpdate, RegisterInput},
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-email", get(verify_email))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route(
            "/updateProfile/:id",
            patch(update_profile).layer(DefaultBodyLimit::max(5 * 1024 * 1024)),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user_id = service::register(
        &state,
        RegisterInput {
            email: payload.email,
            user_name: payload.user_name,
            password: payload.password,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered, follow the link in your inbox to verify your email".into(),
            user_id,
        }),
    ))
}

#[instrument(skip(state, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<MessageResponse>, AuthError> {
    let token = query
        .token
        .ok_or_else(|| AuthError::Validation("Invalid token".into()))?;
    service::verify_email(&state, &token).await?;
    Ok(Json(MessageResponse {
        message: "Email verified successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let token = service::login(&state, &payload.email, &payload.password).await?;

    // Dual delivery: http-only cookie for the browser, body token for API use.
    let keys = JwtKeys::from_ref(&state);
    let cookie = session_cookie(&token, keys.ttl_seconds());
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            message: "Login successful".into(),
            token,
        }),
    ))
}

/// Sessions are stateless; logout just expires the cookie client-side.
#[instrument]
pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        Json(MessageResponse {
            message: "Logout successful".into(),
        }),
    )
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ProfileResponse>, AuthError> {
    let user = service::profile(&state, claims.sub).await?;
    Ok(Json(ProfileResponse::from(user)))
}

#[instrument(skip(state, multipart))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<UpdateProfileResponse>, AuthError> {
    let update = collect_profile_update(multipart).await?;
    let user = service::update_profile(&state, &claims, id, update).await?;
    Ok(Json(UpdateProfileResponse {
        success: true,
        message: "Profile updated successfully".into(),
        data: PublicUser::from(user),
    }))
}

async fn collect_profile_update(mut multipart: Multipart) -> Result<ProfileUpdate, AuthError> {
    let mut update = ProfileUpdate::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AuthError::Validation(format!("Upload error: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "userName" => update.user_name = non_empty(text(field).await?),
            "email" => update.email = non_empty(text(field).await?),
            "password" => update.password = non_empty(text(field).await?),
            "role" => {
                if let Some(value) = non_empty(text(field).await?) {
                    let role = Role::parse(&value)
                        .ok_or_else(|| AuthError::Validation("Invalid role".into()))?;
                    update.role = Some(role);
                }
            }
            "profileImage" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AuthError::Validation(format!("Upload error: {err}")))?;
                if !bytes.is_empty() {
                    update.image = Some(ImageUpload {
                        bytes,
                        content_type,
                    });
                }
            }
            // Unknown parts are ignored rather than rejected.
            _ => {}
        }
    }

    Ok(update)
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String, AuthError> {
    field
        .text()
        .await
        .map_err(|err| AuthError::Validation(format!("Upload error: {err}")))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn session_cookie(token: &str, max_age: i64) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Max-Age={max_age}; Path=/")
}

fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Max-Age=0; Path=/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_carries_required_attributes() {
        let cookie = session_cookie("abc.def.ghi", 3600);
        assert!(cookie.starts_with("token=abc.def.ghi;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.contains("Path=/"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn non_empty_filters_blank_form_fields() {
        assert_eq!(non_empty("  alice  ".into()), Some("alice".to_string()));
        assert_eq!(non_empty("   ".into()), None);
        assert_eq!(non_empty(String::new()), None);
    }
}
