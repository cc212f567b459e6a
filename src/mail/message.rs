//! Report email message type and attachment helpers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::MailError;

/// MIME type of the spreadsheet attachment.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A report email: one HTML body and one file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEmail {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Email subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
    /// Path of the file to attach.
    pub attachment: PathBuf,
}

impl ReportEmail {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
        attachment: impl Into<PathBuf>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
            attachment: attachment.into(),
        }
    }
}

/// Returns the file name the attachment is sent under (the path's base name).
pub fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads an attachment fully into memory.
///
/// A missing file maps to [`MailError::AttachmentNotFound`]; any other read
/// failure to [`MailError::Other`].
pub async fn read_attachment(path: &Path) -> Result<Vec<u8>, MailError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => MailError::AttachmentNotFound(path.to_path_buf()),
        _ => MailError::Other(format!("failed to read {}: {e}", path.display())),
    })
}
