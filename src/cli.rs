//! Command-line argument parsing for the sales report job.

use crate::pipeline::ReportRequest;
use clap::Parser;
use std::path::PathBuf;

/// Export the day's sales to a spreadsheet and email it.
///
/// Database and SMTP settings are read from the environment (DB_NAME,
/// DB_USER, DB_PASSWORD, DB_HOST, DB_PORT, SMTP_HOST, SMTP_PORT, SMTP_USER,
/// SMTP_PASSWORD), optionally loaded from a .env file.
#[derive(Parser, Debug)]
#[command(name = "sales-report")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Business date to report on, matched exactly against transaction_date
    #[arg(short = 'd', long, alias = "business_date", value_name = "DATE")]
    pub business_date: String,

    /// Sender email address
    #[arg(short = 's', long, alias = "sender_email", value_name = "EMAIL")]
    pub sender_email: String,

    /// Recipient email address
    #[arg(short = 'r', long, alias = "receiver_email", value_name = "EMAIL")]
    pub receiver_email: String,

    /// Email subject line
    #[arg(long, visible_alias = "sub", value_name = "SUBJECT")]
    pub subject: String,

    /// Directory the spreadsheet is written to
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub output_dir: PathBuf,

    /// Load environment variables from this file instead of searching for .env
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Builds the run parameters from the parsed arguments.
    pub fn to_request(&self) -> ReportRequest {
        ReportRequest {
            business_date: self.business_date.clone(),
            sender: self.sender_email.clone(),
            receiver: self.receiver_email.clone(),
            subject: self.subject.clone(),
        }
    }
}
