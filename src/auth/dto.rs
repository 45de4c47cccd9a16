use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::{Role, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "userName")]
    pub user_name: String,
}

/// Response for a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login returns the token in the body as well as in the session cookie.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

/// Plain `{message}` envelope (verify-email, logout).
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Query string of GET /verify-email.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

/// Safe fields of the logged-in user, as returned by GET /profile.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub role: Role,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            user_name: user.user_name,
            role: user.role,
        }
    }
}

/// Public part of a user returned from profile updates.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub role: Role,
    #[serde(rename = "profileImage")]
    pub profile_image: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            user_name: user.user_name,
            role: user.role,
            profile_image: user.profile_image,
        }
    }
}

/// Envelope of PATCH /updateProfile/:id.
#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub message: String,
    pub data: PublicUser,
}
