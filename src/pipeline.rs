//! The report run: fetch, export, compose, send.
//!
//! Each stage contains its own failure. A failed or empty fetch stops the
//! run before anything is written; a failed export stops it before anything
//! is sent; a failed send is logged and the run still finishes. Nothing is
//! retried.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::db::ReportSource;
use crate::error::ReportError;
use crate::mail::{MailError, Mailer, ReportEmail};
use crate::report::{report_path, write_report};
use crate::template::build_html_body;

/// Caller-supplied parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub business_date: String,
    pub sender: String,
    pub receiver: String,
    pub subject: String,
}

/// How a run ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The query succeeded but matched no rows. Nothing written or sent.
    NoData,
    /// Connecting or querying failed. Nothing written or sent.
    QueryFailed(ReportError),
    /// The spreadsheet could not be written. Nothing sent.
    ExportFailed(ReportError),
    /// The spreadsheet was written but the email was not sent.
    SendFailed {
        report: PathBuf,
        rows: usize,
        error: MailError,
    },
    /// The spreadsheet was written and sent.
    Sent { report: PathBuf, rows: usize },
}

impl PipelineOutcome {
    /// Returns true if the report was delivered.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    /// Returns the written report path, if the export stage succeeded.
    pub fn report_path(&self) -> Option<&Path> {
        match self {
            Self::SendFailed { report, .. } | Self::Sent { report, .. } => Some(report.as_path()),
            _ => None,
        }
    }
}

/// Runs one report for `request`, writing the spreadsheet into `output_dir`.
pub async fn run_report(
    source: &dyn ReportSource,
    mailer: &dyn Mailer,
    request: &ReportRequest,
    output_dir: &Path,
) -> PipelineOutcome {
    info!("Starting report generation for {}", request.business_date);

    let table = match source.fetch_sales(&request.business_date).await {
        Ok(table) => table,
        Err(e) => {
            error!("Database connection or query failed: {e}");
            return PipelineOutcome::QueryFailed(e);
        }
    };

    if table.is_empty() {
        warn!(
            "No data found for business date {}, no report sent",
            request.business_date
        );
        return PipelineOutcome::NoData;
    }
    let rows = table.row_count();
    info!("Data fetched successfully, rows retrieved: {rows}");

    let report = report_path(output_dir, &request.business_date);
    if let Err(e) = write_report(&table, &report) {
        error!("Failed to save Excel report: {e}");
        return PipelineOutcome::ExportFailed(e);
    }
    info!("Report saved to {}", report.display());

    let email = ReportEmail::new(
        &request.sender,
        &request.receiver,
        &request.subject,
        build_html_body(&request.business_date, rows),
        &report,
    );

    info!("Sending report to {}", request.receiver);
    let outcome = match mailer.send(&email).await {
        Ok(()) => {
            info!("Email sent successfully");
            PipelineOutcome::Sent { report, rows }
        }
        Err(e) => {
            error!("{}: {e}", e.category());
            PipelineOutcome::SendFailed {
                report,
                rows,
                error: e,
            }
        }
    };

    info!("Report run completed");
    outcome
}
