//! Spreadsheet export for fetched sales rows.
//!
//! Writes a [`ResultTable`] to a single-sheet `.xlsx` workbook: one bold
//! header row followed by one row per record, in the order the table holds
//! them.

use crate::db::{ResultTable, Value};
use crate::error::{ReportError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maximum rows in an Excel worksheet, header included.
pub const MAX_SHEET_ROWS: usize = 1_048_576;

/// Maximum columns in an Excel worksheet.
pub const MAX_SHEET_COLUMNS: usize = 16_384;

/// Returns the report file name for a business date.
///
/// Path separators in the date (PostgreSQL accepts `03/15/2024`) are
/// replaced with `-` so the file always lands directly in the output
/// directory.
pub fn report_file_name(business_date: &str) -> String {
    let date = business_date.replace(['/', '\\'], "-");
    format!("sales_report_{date}.xlsx")
}

/// Returns the full report path inside `output_dir`.
pub fn report_path(output_dir: &Path, business_date: &str) -> PathBuf {
    output_dir.join(report_file_name(business_date))
}

/// Writes `table` to an xlsx file at `path`.
///
/// Fails with [`ReportError::Export`] if the table does not fit in a single
/// worksheet or the file cannot be written. Nothing is written when the size
/// check fails.
pub fn write_report(table: &ResultTable, path: &Path) -> Result<()> {
    if table.row_count() + 1 > MAX_SHEET_ROWS {
        return Err(ReportError::export(format!(
            "{} rows exceed the worksheet limit of {} rows",
            table.row_count(),
            MAX_SHEET_ROWS - 1
        )));
    }
    if table.columns.len() > MAX_SHEET_COLUMNS {
        return Err(ReportError::export(format!(
            "{} columns exceed the worksheet limit of {MAX_SHEET_COLUMNS} columns",
            table.columns.len()
        )));
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let formats = CellFormats::new();

    for (col, name) in table.column_names().enumerate() {
        worksheet.write_string_with_format(0, col as ColNum, name, &formats.header)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let row_num = (i + 1) as RowNum;
        for (col, value) in row.iter().enumerate() {
            write_cell(worksheet, row_num, col as ColNum, value, &formats)?;
        }
    }

    worksheet.autofit();

    workbook
        .save(path)
        .map_err(|e| ReportError::export(format!("Failed to write {}: {e}", path.display())))?;

    debug!("Wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

struct CellFormats {
    header: Format,
    date: Format,
    time: Format,
    datetime: Format,
}

impl CellFormats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format("yyyy-mm-dd"),
            time: Format::new().set_num_format("hh:mm:ss"),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        }
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    value: &Value,
    formats: &CellFormats,
) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Value::Int(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        Value::Float(f) if f.is_finite() => {
            worksheet.write_number(row, col, *f)?;
        }
        Value::Float(f) => {
            worksheet.write_string(row, col, f.to_string())?;
        }
        Value::Decimal(d) => match d.to_f64() {
            Some(f) => {
                worksheet.write_number(row, col, f)?;
            }
            None => {
                worksheet.write_string(row, col, d.to_string())?;
            }
        },
        Value::String(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Value::Date(d) => {
            worksheet.write_datetime_with_format(row, col, d, &formats.date)?;
        }
        Value::Time(t) => {
            worksheet.write_datetime_with_format(row, col, t, &formats.time)?;
        }
        Value::DateTime(dt) => {
            worksheet.write_datetime_with_format(row, col, dt, &formats.datetime)?;
        }
        Value::Bytes(_) => {
            worksheet.write_string(row, col, value.to_display_string())?;
        }
    }
    Ok(())
}
