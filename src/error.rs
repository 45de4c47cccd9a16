use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Everything the auth surface can fail with, mapped to HTTP in one place.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Token expired or invalid")]
    InvalidOrExpiredToken,

    #[error("Failed to upload profile image")]
    UploadFailed,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Forbidden")]
    Forbidden,

    #[error("User not found")]
    NotFound,

    #[error("Email already registered")]
    Conflict,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::InvalidOrExpiredToken
            | AuthError::UploadFailed => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotVerified | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Internal detail stays in the logs, never in the response body.
            AuthError::Internal(err) => {
                error!(error = %err, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_exhaustive() {
        assert_eq!(
            AuthError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidOrExpiredToken.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::UploadFailed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::EmailNotVerified.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_body_is_generic() {
        let response = AuthError::Internal(anyhow::anyhow!("pool timed out")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unknown_email_and_wrong_password_share_a_message() {
        // Both collapse to the same response so emails cannot be enumerated.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
    }
}
