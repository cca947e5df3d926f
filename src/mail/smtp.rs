use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, Mailer, OutgoingEmail};
use crate::config::MailConfig;

/// Port on which the relay expects TLS from the first byte; other ports use STARTTLS
const IMPLICIT_TLS_PORT: u16 = 465;

/// Hands a built message to the wire
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<(), MailError>;
}

#[async_trait]
impl Transport for AsyncSmtpTransport<Tokio1Executor> {
    async fn deliver(&self, message: Message) -> Result<(), MailError> {
        AsyncTransport::send(self, message)
            .await
            .map(|_response| ())
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

/// Mailer backed by an authenticated SMTP relay
pub struct SmtpMailer {
    transport: Box<dyn Transport>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new_with_transport(transport: Box<dyn Transport>, from: &str) -> Result<Self, MailError> {
        let from = from
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {}", from, e)))?;
        Ok(Self { transport, from })
    }

    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone().unwrap_or_default(),
            config.smtp_password.clone().unwrap_or_default(),
        );

        let relay = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        };
        let builder = relay.map_err(|e| MailError::Transport(e.to_string()))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Self::new_with_transport(Box::new(transport), &config.from_address)
    }

    fn build_message(&self, email: OutgoingEmail) -> Result<Message, MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {}", email.to, e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to = email.to.clone();
        let message = self.build_message(email)?;

        self.transport.deliver(message).await.map_err(|e| {
            tracing::error!(to = %to, error = %e, "Failed to dispatch email");
            e
        })?;

        tracing::info!(to = %to, "Email dispatched");
        Ok(())
    }
}
