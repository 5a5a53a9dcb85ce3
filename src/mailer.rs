use axum::async_trait;
use tracing::info;

/// Outbound email boundary. The core only ever asks for a password reset
/// message; wiring a real SMTP sender means implementing this trait.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()>;
}

/// Logs the reset link instead of sending it. Good enough for development
/// and for deployments that scrape logs into a notification pipeline.
#[derive(Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()> {
        info!(%to, %reset_url, "password reset email");
        Ok(())
    }
}
