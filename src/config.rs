use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Frontend origin: CORS allow-origin and the base of verification links.
    pub client_url: String,
    pub jwt: JwtConfig,
    /// `None` when MAILER_MODE=log; verification mails are logged instead of sent.
    pub smtp: Option<SmtpConfig>,
    /// `None` when MEDIA_MODE=fake; profile images get stub URLs.
    pub media: Option<MediaConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let client_url =
            std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "staffhub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "staffhub-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        let smtp = if std::env::var("MAILER_MODE").is_ok_and(|v| v == "log") {
            None
        } else {
            Some(SmtpConfig {
                host: std::env::var("SMTP_HOST")?,
                username: std::env::var("SMTP_USER")?,
                password: std::env::var("SMTP_PASS")?,
                from: std::env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "Employee System <no-reply@staffhub.local>".into()),
            })
        };

        let media = if std::env::var("MEDIA_MODE").is_ok_and(|v| v == "fake") {
            None
        } else {
            Some(MediaConfig {
                endpoint: std::env::var("S3_ENDPOINT")?,
                bucket: std::env::var("S3_BUCKET")?,
                access_key: std::env::var("S3_ACCESS_KEY")?,
                secret_key: std::env::var("S3_SECRET_KEY")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            })
        };

        Ok(Self {
            database_url,
            client_url,
            jwt,
            smtp,
            media,
        })
    }
}
