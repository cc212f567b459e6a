//! End-to-end pipeline tests.
//!
//! Runs the full fetch → export → compose → send sequence with in-memory
//! sources and a recording mailer, then inspects the written workbook.

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use sales_report::db::{ColumnInfo, FailingSource, MockSource, ResultTable, Value};
use sales_report::mail::{MailError, Mailer, RecordingMailer, ReportEmail};
use sales_report::pipeline::{run_report, PipelineOutcome, ReportRequest};
use sales_report::template::build_html_body;
use std::path::Path;
use std::str::FromStr;

fn request(date: &str) -> ReportRequest {
    ReportRequest {
        business_date: date.to_string(),
        sender: "reports@example.com".to_string(),
        receiver: "sales-team@example.com".to_string(),
        subject: "Daily sales report".to_string(),
    }
}

fn sales_table(rows: usize) -> ResultTable {
    let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    ResultTable::with_data(
        vec![
            ColumnInfo::new("id", "INT4"),
            ColumnInfo::new("customer", "TEXT"),
            ColumnInfo::new("amount", "NUMERIC"),
            ColumnInfo::new("transaction_date", "DATE"),
        ],
        (0..rows)
            .map(|i| {
                vec![
                    Value::Int(i as i64 + 1),
                    Value::String(format!("customer-{i}")),
                    Value::Decimal(Decimal::from_str("10.50").unwrap()),
                    Value::Date(date),
                ]
            })
            .collect(),
    )
}

fn read_sheet(path: &Path) -> calamine::Range<Data> {
    let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
    workbook.worksheet_range("Sheet1").unwrap()
}

#[tokio::test]
async fn test_spreadsheet_rows_match_result_count() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockSource::with_table(sales_table(25));
    let mailer = RecordingMailer::new();

    let outcome = run_report(&source, &mailer, &request("2024-03-15"), dir.path()).await;

    let (report, rows) = match outcome {
        PipelineOutcome::Sent { report, rows } => (report, rows),
        other => panic!("expected Sent, got {other:?}"),
    };
    assert_eq!(rows, 25);
    assert_eq!(
        report.file_name().unwrap().to_str().unwrap(),
        "sales_report_2024-03-15.xlsx"
    );

    let sheet = read_sheet(&report);
    // Header plus one row per record.
    assert_eq!(sheet.height(), 26);
    assert_eq!(sheet.width(), 4);
    assert_eq!(sheet.get((0, 0)), Some(&Data::String("id".to_string())));
    assert_eq!(
        sheet.get((25, 1)),
        Some(&Data::String("customer-24".to_string()))
    );
    assert_eq!(sheet.get((1, 2)), Some(&Data::Float(10.5)));
}

#[tokio::test]
async fn test_exactly_one_email_with_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let mailer = RecordingMailer::new();

    run_report(
        &MockSource::with_table(sales_table(3)),
        &mailer,
        &request("2024-03-15"),
        dir.path(),
    )
    .await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);

    let email = &sent[0];
    assert_eq!(email.from, "reports@example.com");
    assert_eq!(email.to, "sales-team@example.com");
    assert_eq!(email.subject, "Daily sales report");
    assert_eq!(email.html_body, build_html_body("2024-03-15", 3));
    assert_eq!(
        email.attachment,
        dir.path().join("sales_report_2024-03-15.xlsx")
    );
    assert!(email.attachment.exists());
}

#[tokio::test]
async fn test_empty_result_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mailer = RecordingMailer::new();

    let outcome = run_report(
        &MockSource::new(),
        &mailer,
        &request("2024-03-16"),
        dir.path(),
    )
    .await;

    assert!(matches!(outcome, PipelineOutcome::NoData));
    assert!(mailer.sent().is_empty());
    assert!(!dir.path().join("sales_report_2024-03-16.xlsx").exists());
}

#[tokio::test]
async fn test_connection_failure_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mailer = RecordingMailer::new();

    let outcome = run_report(
        &FailingSource::new("Cannot connect to db.internal:5432"),
        &mailer,
        &request("2024-03-15"),
        dir.path(),
    )
    .await;

    assert!(matches!(outcome, PipelineOutcome::QueryFailed(_)));
    assert!(!outcome.is_success());
    assert!(mailer.sent().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_write_failure_halts_before_send() {
    let dir = tempfile::tempdir().unwrap();
    let mailer = RecordingMailer::new();

    let outcome = run_report(
        &MockSource::with_table(sales_table(2)),
        &mailer,
        &request("2024-03-15"),
        &dir.path().join("no").join("such").join("dir"),
    )
    .await;

    assert!(matches!(outcome, PipelineOutcome::ExportFailed(_)));
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_authentication_failure_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let mailer = RecordingMailer::failing(MailError::Authentication(
        "535 5.7.8 Authentication credentials invalid".to_string(),
    ));

    let outcome = run_report(
        &MockSource::with_table(sales_table(1)),
        &mailer,
        &request("2024-03-15"),
        dir.path(),
    )
    .await;

    match &outcome {
        PipelineOutcome::SendFailed { error, .. } => {
            assert_eq!(error.category(), "SMTP Authentication Error");
        }
        other => panic!("expected SendFailed, got {other:?}"),
    }
    assert!(outcome.report_path().is_some_and(Path::exists));
}

#[tokio::test]
async fn test_missing_attachment_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("sales_report_1999-01-01.xlsx");
    let mailer = RecordingMailer::new();

    let email = ReportEmail::new(
        "reports@example.com",
        "sales-team@example.com",
        "Daily sales report",
        build_html_body("1999-01-01", 0),
        &missing,
    );
    let err = mailer.send(&email).await.unwrap_err();

    assert!(matches!(err, MailError::AttachmentNotFound(ref p) if p == &missing));
    assert!(err.to_string().contains("attachment file not found"));
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_slash_separated_date_stays_in_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mailer = RecordingMailer::new();

    let outcome = run_report(
        &MockSource::with_table(sales_table(2)),
        &mailer,
        &request("03/15/2024"),
        dir.path(),
    )
    .await;

    assert!(outcome.is_success(), "{outcome:?}");
    let expected = dir.path().join("sales_report_03-15-2024.xlsx");
    assert_eq!(outcome.report_path(), Some(expected.as_path()));
    assert!(expected.exists());

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].html_body, build_html_body("03/15/2024", 2));
}
