//! Outbound account notifications.
//!
//! Mail transport lives outside this service; the default notifier writes
//! the link to the log so a development setup can follow it.

use async_trait::async_trait;
use tracing::info;

use crate::shared::error::Result;
use crate::user::entity::User;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email_verification(&self, user: &User, link: &str) -> Result<()>;

    async fn send_password_reset(&self, user: &User, link: &str) -> Result<()>;
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email_verification(&self, user: &User, link: &str) -> Result<()> {
        info!(user_id = %user.id, email = %user.email, link = %link, "Email verification link issued");
        Ok(())
    }

    async fn send_password_reset(&self, user: &User, link: &str) -> Result<()> {
        info!(user_id = %user.id, email = %user.email, link = %link, "Password reset link issued");
        Ok(())
    }
}

/// `{base}/{path}?token={token}`
pub fn build_link(base_url: &str, path: &str, token: &str) -> String {
    format!(
        "{}/{}?token={}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/'),
        token
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_link() {
        assert_eq!(
            build_link("https://example.vn/", "/reset-password", "abc.def"),
            "https://example.vn/reset-password?token=abc.def"
        );
    }
}
