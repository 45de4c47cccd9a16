use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound mail abstraction; registration only ever sends best-effort.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, verify_url: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let credentials = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .context("invalid SMTP host")?
            .credentials(credentials)
            .build();
        let from = cfg.from.parse().context("invalid SMTP_FROM address")?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &str, verify_url: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().context("invalid recipient address")?)
            .subject("Verify your email")
            .header(ContentType::TEXT_HTML)
            .body(verification_body(verify_url))
            .context("build verification email")?;
        self.transport
            .send(message)
            .await
            .context("smtp send failed")?;
        Ok(())
    }
}

/// Dev/test sender that logs the link instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, to: &str, verify_url: &str) -> anyhow::Result<()> {
        info!(to = %to, verify_url = %verify_url, "verification email (log mode)");
        Ok(())
    }
}

fn verification_body(verify_url: &str) -> String {
    format!(
        "<h2>Email Verification</h2>\
         <p>Click the link below to verify your email:</p>\
         <a href=\"{verify_url}\">{verify_url}</a>\
         <p>This link expires in 1 hour.</p>"
    )
}
