//! Report email delivery.
//!
//! A thin layer over [lettre](https://lettre.rs): the [`Mailer`] trait sends a
//! [`ReportEmail`] and reports failures as a categorized [`MailError`] instead
//! of aborting the run.
//!
//! | Failure | Variant |
//! |---------|---------|
//! | Server rejected the credentials (530/534/535) | [`MailError::Authentication`] |
//! | Network, TLS, or timeout before the server answered | [`MailError::Connection`] |
//! | Attachment path does not exist | [`MailError::AttachmentNotFound`] |
//! | Anything else | [`MailError::Other`] |

mod mailer;
mod message;
mod mock;

pub use mailer::{Mailer, SmtpMailer};
pub use message::{attachment_name, read_attachment, ReportEmail, XLSX_CONTENT_TYPE};
pub use mock::RecordingMailer;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("SMTP authentication failed: {0}")]
    Authentication(String),

    #[error("failed to connect to the SMTP server: {0}")]
    Connection(String),

    #[error("attachment file not found: {}", .0.display())]
    AttachmentNotFound(PathBuf),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("failed to send email: {0}")]
    Other(String),
}

impl MailError {
    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "SMTP Authentication Error",
            Self::Connection(_) => "SMTP Connection Error",
            Self::AttachmentNotFound(_) => "Attachment Error",
            Self::InvalidAddress(_) | Self::Build(_) => "Message Error",
            Self::Other(_) => "Send Error",
        }
    }
}
