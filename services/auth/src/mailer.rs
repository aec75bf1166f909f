//! Delivery of confirmation codes.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport. When `SMTP_HOST` is
//! not configured the service falls back to [`LogMailer`], which writes the
//! message to the log instead of sending it.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use tracing::info;

use crate::error::{AuthError, AuthResult};

/// Default SMTP port (STARTTLS)
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `MAIL_FROM` is not set
const DEFAULT_FROM_ADDRESS: &str = "confirmation_code@yamdb.local";

const SUBJECT: &str = "YaMDb confirmation code";

/// Sends confirmation codes to users
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_confirmation_code(&self, email: &str, username: &str, code: &str)
    -> AuthResult<()>;
}

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    /// Load SMTP settings from the environment.
    ///
    /// Returns `None` when `SMTP_HOST` is not set.
    ///
    /// # Environment Variables
    /// - `SMTP_HOST`: SMTP relay host
    /// - `SMTP_PORT`: relay port (default: 587)
    /// - `SMTP_USER` / `SMTP_PASSWORD`: optional credentials
    /// - `MAIL_FROM`: sender address (default: confirmation_code@yamdb.local)
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: sender_address(),
            user: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

fn sender_address() -> String {
    std::env::var("MAIL_FROM").unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string())
}

fn message_body(code: &str) -> String {
    format!("confirmation_code: {}", code)
}

/// Build the mailer selected by the environment
pub fn mailer_from_env() -> Arc<dyn Mailer> {
    match SmtpConfig::from_env() {
        Some(config) => {
            info!("Sending confirmation codes through SMTP relay {}", config.host);
            Arc::new(SmtpMailer::new(config))
        }
        None => {
            info!("SMTP_HOST not set, confirmation codes will be logged");
            Arc::new(LogMailer::new(sender_address()))
        }
    }
}

/// Sends confirmation codes through an SMTP relay
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_confirmation_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> AuthResult<()> {
        let from = self
            .config
            .from_address
            .parse()
            .map_err(|e| AuthError::Delivery(format!("invalid sender address: {}", e)))?;
        let to = email
            .parse()
            .map_err(|e| AuthError::Delivery(format!("invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(message_body(code))
            .map_err(|e| AuthError::Delivery(e.to_string()))?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .map_err(|e| AuthError::Delivery(e.to_string()))?
            .port(self.config.port);

        if let (Some(user), Some(password)) = (&self.config.user, &self.config.password) {
            transport = transport.credentials(Credentials::new(user.clone(), password.clone()));
        }

        transport
            .build()
            .send(message)
            .await
            .map_err(|e| AuthError::Delivery(e.to_string()))?;

        info!("Confirmation code sent to {} for {}", email, username);
        Ok(())
    }
}

/// Writes confirmation codes to the log (development backend)
pub struct LogMailer {
    from_address: String,
}

impl LogMailer {
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_confirmation_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> AuthResult<()> {
        info!(
            from = %self.from_address,
            to = %email,
            username = %username,
            subject = SUBJECT,
            "{}",
            message_body(code)
        );
        Ok(())
    }
}
