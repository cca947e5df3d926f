//! Outgoing email.
//!
//! Handlers never talk to a transport directly: they get an `Arc<dyn Mailer>`
//! from [`crate::AppState`], built once at startup by [`build_mailer`].

pub mod log;
pub mod smtp;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{MailConfig, MailTransport};

pub use self::log::LogMailer;
pub use self::smtp::SmtpMailer;
pub use self::templates::passcode_email;

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Delivers rendered messages; fails loudly when the transport does
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Construct the mailer selected by configuration
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.transport {
        MailTransport::Smtp => {
            let mailer = SmtpMailer::from_config(config)?;
            tracing::info!(
                host = %config.smtp_host,
                port = config.smtp_port,
                "SMTP mailer configured"
            );
            Ok(Arc::new(mailer))
        }
        MailTransport::Log => {
            tracing::warn!("MAIL_TRANSPORT=log: emails will be written to the log, not sent");
            Ok(Arc::new(LogMailer))
        }
    }
}
