//! Recording mailer for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{read_attachment, MailError, Mailer, ReportEmail};

/// A mailer that records what it would have sent.
///
/// The attachment is still read, so a missing file fails the same way it
/// does with [`super::SmtpMailer`].
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<ReportEmail>>,
    failure: Option<MailError>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mailer whose every send fails with `error` after the
    /// attachment has been read.
    pub fn failing(error: MailError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    /// Returns the emails sent so far.
    pub fn sent(&self) -> Vec<ReportEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &ReportEmail) -> Result<(), MailError> {
        read_attachment(&email.attachment).await?;

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        self.sent
            .lock()
            .map_err(|_| MailError::Other("recording mailer lock poisoned".to_string()))?
            .push(email.clone());
        Ok(())
    }
}
