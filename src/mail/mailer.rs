//! Mailer trait and SMTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::{attachment_name, read_attachment, MailError, ReportEmail, XLSX_CONTENT_TYPE};
use crate::config::SmtpConfig;

/// SMTP session timeout.
const SMTP_TIMEOUT_SECS: u64 = 30;

/// Reply codes meaning the server refused the credentials.
const AUTH_FAILURE_CODES: [&str; 3] = ["530", "534", "535"];

/// Reply code for "service not available" at greeting time.
const SERVICE_UNAVAILABLE: &str = "421";

/// Async report sending trait.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one email. Never retries.
    async fn send(&self, email: &ReportEmail) -> Result<(), MailError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Security {
    /// Upgrade with STARTTLS before authenticating; refuse to continue
    /// without it.
    StartTls,
    #[cfg(test)]
    Plaintext,
}

/// SMTP mailer using lettre.
///
/// The transport is built per send, so every failure, including an unusable
/// host name, surfaces from [`Mailer::send`] as a [`MailError`].
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: SmtpConfig,
    security: Security,
}

impl SmtpMailer {
    /// Creates a mailer that sends through the configured server over
    /// STARTTLS.
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            config: config.clone(),
            security: Security::StartTls,
        }
    }

    #[cfg(test)]
    fn plaintext(config: &SmtpConfig) -> Self {
        Self {
            config: config.clone(),
            security: Security::Plaintext,
        }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let builder = match self.security {
            Security::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                    .map_err(|e| MailError::Connection(e.to_string()))?
            }
            #[cfg(test)]
            Security::Plaintext => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.host)
            }
        };

        Ok(builder
            .port(self.config.port)
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .credentials(Credentials::new(
                self.config.user.clone(),
                self.config.password.clone(),
            ))
            .build())
    }
}

/// Builds the multipart/mixed message: HTML part plus one attachment.
fn build_message(email: &ReportEmail, attachment: Vec<u8>) -> Result<Message, MailError> {
    let from: Mailbox = email
        .from
        .parse()
        .map_err(|_| MailError::InvalidAddress(email.from.clone()))?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|_| MailError::InvalidAddress(email.to.clone()))?;
    let content_type =
        ContentType::parse(XLSX_CONTENT_TYPE).map_err(|e| MailError::Build(e.to_string()))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(&email.subject)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(email.html_body.clone()))
                .singlepart(
                    Attachment::new(attachment_name(&email.attachment))
                        .body(attachment, content_type),
                ),
        )
        .map_err(|e| MailError::Build(e.to_string()))
}

/// Maps a lettre SMTP error onto a failure category.
fn classify_smtp_error(error: lettre::transport::smtp::Error) -> MailError {
    let status = error.status().map(|code| code.to_string());
    categorize(
        status.as_deref(),
        error.is_timeout() || error.is_tls(),
        error.is_response() || error.is_client(),
        error.to_string(),
    )
}

/// Categorizes an SMTP failure from its reply code and error kind.
///
/// `transport_failure` covers timeouts and TLS negotiation; `protocol_failure`
/// covers malformed replies and client-side errors. Failures with neither a
/// reply code nor a protocol cause never reached the server.
fn categorize(
    status: Option<&str>,
    transport_failure: bool,
    protocol_failure: bool,
    detail: String,
) -> MailError {
    match status {
        Some(code) if AUTH_FAILURE_CODES.contains(&code) => MailError::Authentication(detail),
        Some(SERVICE_UNAVAILABLE) => MailError::Connection(detail),
        Some(_) => MailError::Other(detail),
        None if transport_failure => MailError::Connection(detail),
        None if protocol_failure => MailError::Other(detail),
        None => MailError::Connection(detail),
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &ReportEmail) -> Result<(), MailError> {
        let attachment = read_attachment(&email.attachment).await?;
        let message = build_message(email, attachment)?;
        let transport = self.transport()?;

        debug!("Connecting to SMTP server {}", self.config.display_string());
        let response = transport
            .send(message)
            .await
            .map_err(classify_smtp_error)?;

        debug!("SMTP server accepted message: {}", response.code());
        Ok(())
    }
}
