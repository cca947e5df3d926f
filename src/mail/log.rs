use async_trait::async_trait;

use super::{MailError, Mailer, OutgoingEmail};

/// Writes messages to the log instead of sending them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text,
            "Email written to log (not sent)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let email = OutgoingEmail {
            to: "user@example.com".to_string(),
            subject: "Subject".to_string(),
            text: "Body".to_string(),
            html: "<p>Body</p>".to_string(),
        };

        assert!(LogMailer.send(email).await.is_ok());
    }
}
