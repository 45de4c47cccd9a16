use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Coarse authorization tier. Stored as the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Parse a role submitted as a form field ("ADMIN" / "USER").
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_email_verified: bool,
    #[serde(skip_serializing)]
    pub token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub token_expiry: Option<OffsetDateTime>,
    pub profile_image: Option<String>,
    pub profile_image_public_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = r#"id, email, user_name, password_hash, role, is_email_verified,
       token_hash, token_expiry, profile_image, profile_image_public_id,
       created_at, updated_at"#;

/// Partial update for `User::update_fields`; `None` leaves the column as-is.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub profile_image: Option<String>,
    pub profile_image_public_id: Option<String>,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            "#
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create an unverified user, or refresh an existing *unverified* row for
    /// the same email (new credentials, rotated verification token).
    ///
    /// Returns `None` when the email belongs to an already-verified user:
    /// the `WHERE` guard on the upsert makes the conflict arm update zero
    /// rows in that case, so the whole registration stays one statement.
    pub async fn register_unverified(
        db: &PgPool,
        email: &str,
        user_name: &str,
        password_hash: &str,
        token_hash: &str,
        token_expiry: OffsetDateTime,
    ) -> anyhow::Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (email, user_name, password_hash, token_hash, token_expiry)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET user_name = EXCLUDED.user_name,
                password_hash = EXCLUDED.password_hash,
                token_hash = EXCLUDED.token_hash,
                token_expiry = EXCLUDED.token_expiry,
                updated_at = now()
            WHERE users.is_email_verified = FALSE
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(user_name)
        .bind(password_hash)
        .bind(token_hash)
        .bind(token_expiry)
        .fetch_optional(db)
        .await?;
        Ok(id)
    }

    /// Atomically redeem a verification token.
    ///
    /// The check and the clear are one conditional UPDATE, so of two
    /// concurrent attempts with the same token exactly one gets a row back;
    /// the other (and any replay of a spent token) gets `None`.
    pub async fn consume_verification_token(
        db: &PgPool,
        token_hash: &str,
    ) -> anyhow::Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users
            SET is_email_verified = TRUE,
                token_hash = NULL,
                token_expiry = NULL,
                updated_at = now()
            WHERE token_hash = $1
              AND token_expiry > now()
            RETURNING id
            "#,
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await?;
        Ok(id)
    }

    /// Apply a partial profile update in a single statement.
    ///
    /// Returns `None` when no row matches `id`. A unique violation on
    /// `email` surfaces as `sqlx::Error` for the caller to map.
    pub async fn update_fields(
        db: &PgPool,
        id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET user_name = COALESCE($2, user_name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role),
                profile_image = COALESCE($6, profile_image),
                profile_image_public_id = COALESCE($7, profile_image_public_id),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.user_name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.password_hash.as_deref())
        .bind(changes.role)
        .bind(changes.profile_image.as_deref())
        .bind(changes.profile_image_public_id.as_deref())
        .fetch_optional(db)
        .await
    }
}

/// Postgres unique-violation check (SQLSTATE 23505), used to turn an email
/// collision during profile update into a 409.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
