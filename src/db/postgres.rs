//! PostgreSQL report source.
//!
//! Provides the `PostgresSource` struct that implements the `ReportSource`
//! trait for PostgreSQL databases using sqlx.

use crate::config::DatabaseConfig;
use crate::db::{ColumnInfo, ReportSource, ResultTable, Row, Value, SALES_QUERY};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::types::PgTimeTz;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgValueFormat};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use std::fmt::Write;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Seconds to wait for the connection before giving up.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Most significant digits a `Decimal` holds exactly.
const MAX_DECIMAL_DIGITS: usize = 28;

// Sign words of the binary NUMERIC format.
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_POS_INF: u16 = 0xD000;
const NUMERIC_NEG_INF: u16 = 0xF000;

/// PostgreSQL report source.
#[derive(Debug)]
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    /// Connects to the database described by `config`.
    ///
    /// A single connection is opened; the job issues exactly one query.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_with(options)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Connected to {}", config.display_string());
        Ok(Self { pool })
    }

    /// Creates a new PostgresSource from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportSource for PostgresSource {
    async fn fetch_sales(&self, business_date: &str) -> Result<ResultTable> {
        let start = Instant::now();

        let result = sqlx::query(SALES_QUERY)
            .bind(business_date)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ReportError::query(format_query_error(e)))?;

        debug!(
            "Sales query returned {} rows in {:?}",
            result.len(),
            start.elapsed()
        );

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let mut undecodable = vec![0usize; columns.len()];
        let rows: Vec<Row> = result
            .iter()
            .map(|row| convert_row(row, &mut undecodable))
            .collect();

        for (column, count) in columns.iter().zip(&undecodable) {
            if *count > 0 {
                warn!(
                    "Column '{}' of type {} could not be decoded, {} cell(s) left empty",
                    column.name, column.data_type, count
                );
            }
        }

        Ok(ResultTable { columns, rows })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx PgRow to our Row type.
///
/// Values that cannot be decoded become `Null` and are counted per column
/// in `undecodable`.
fn convert_row(row: &PgRow, undecodable: &mut [usize]) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            convert_value(row, i, col.type_info().name()).unwrap_or_else(|e| {
                debug!("Failed to decode column '{}': {e}", col.name());
                if let Some(count) = undecodable.get_mut(i) {
                    *count += 1;
                }
                Value::Null
            })
        })
        .collect()
}

/// Decodes a nullable column as `T` and maps it into a `Value`.
fn decode<'r, T, F>(row: &'r PgRow, index: usize, map: F) -> sqlx::Result<Value>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    F: FnOnce(T) -> Value,
{
    Ok(row
        .try_get::<Option<T>, _>(index)?
        .map(map)
        .unwrap_or(Value::Null))
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> sqlx::Result<Value> {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode::<bool, _>(row, index, Value::Bool),
        "INT2" | "SMALLINT" => decode::<i16, _>(row, index, |v| Value::Int(v as i64)),
        "INT4" | "INT" | "INTEGER" => decode::<i32, _>(row, index, |v| Value::Int(v as i64)),
        "INT8" | "BIGINT" => decode::<i64, _>(row, index, Value::Int),
        "FLOAT4" | "REAL" => decode::<f32, _>(row, index, |v| Value::Float(v as f64)),
        "FLOAT8" | "DOUBLE PRECISION" => decode::<f64, _>(row, index, Value::Float),
        "NUMERIC" => decode_numeric(row, index),
        "DATE" => decode::<NaiveDate, _>(row, index, Value::Date),
        "TIME" => decode::<NaiveTime, _>(row, index, Value::Time),
        "TIMETZ" => decode::<PgTimeTz<NaiveTime, FixedOffset>, _>(row, index, |v| {
            Value::String(format!("{}{}", v.time, v.offset))
        }),
        "TIMESTAMP" => decode::<NaiveDateTime, _>(row, index, Value::DateTime),
        "TIMESTAMPTZ" => decode::<DateTime<Utc>, _>(row, index, |v| {
            Value::DateTime(v.naive_utc())
        }),
        "UUID" => decode::<Uuid, _>(row, index, |v| Value::String(v.to_string())),
        "JSON" | "JSONB" => decode::<serde_json::Value, _>(row, index, |v| {
            Value::String(v.to_string())
        }),
        "BYTEA" => decode::<Vec<u8>, _>(row, index, Value::Bytes),

        // For all other types, try to get as string
        _ => decode::<String, _>(row, index, Value::String),
    }
}

/// Decodes a NUMERIC column from its wire form.
///
/// `rust_decimal`'s own decoder panics on values wider than a `Decimal`, so
/// the digits are read directly and only parsed when they fit.
fn decode_numeric(row: &PgRow, index: usize) -> sqlx::Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let text = match raw.format() {
        PgValueFormat::Binary => raw.as_bytes().ok().and_then(numeric_text),
        PgValueFormat::Text => raw.as_str().ok().map(str::to_string),
    };

    text.map(numeric_value)
        .ok_or_else(|| sqlx::Error::Decode("malformed NUMERIC value".into()))
}

/// Renders a binary NUMERIC as its canonical decimal text.
///
/// Layout: digit count, weight, sign and display scale as 16-bit words,
/// followed by base-10000 digits. The weight is the power of 10000 of the
/// first digit.
fn numeric_text(bytes: &[u8]) -> Option<String> {
    let word = |i: usize| {
        bytes
            .get(i * 2..i * 2 + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
    };

    let ndigits = usize::from(word(0)?);
    let weight = i32::from(word(1)? as i16);
    let sign = word(2)?;
    let dscale = usize::from(word(3)?);

    match sign {
        NUMERIC_NAN => return Some("NaN".to_string()),
        NUMERIC_POS_INF => return Some("Infinity".to_string()),
        NUMERIC_NEG_INF => return Some("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..ndigits)
        .map(|i| word(4 + i))
        .collect::<Option<Vec<u16>>>()?;
    let digit = |pos: i32| {
        usize::try_from(pos)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == NUMERIC_NEG {
        text.push('-');
    }

    if weight < 0 {
        text.push('0');
    } else {
        for pos in 0..=weight {
            if pos == 0 {
                let _ = write!(text, "{}", digit(pos));
            } else {
                let _ = write!(text, "{:04}", digit(pos));
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut pos = weight + 1;
        while fraction.len() < dscale {
            let _ = write!(fraction, "{:04}", digit(pos));
            pos += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }

    Some(text)
}

/// Parses NUMERIC text into a `Decimal`, keeping the text when it does not
/// fit (too many digits, NaN, infinities).
fn numeric_value(text: String) -> Value {
    let unsigned = text.trim_start_matches('-');
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let significant = integer.trim_start_matches('0').len() + fraction.len();

    if significant <= MAX_DECIMAL_DIGITS && fraction.len() <= MAX_DECIMAL_DIGITS {
        if let Ok(decimal) = Decimal::from_str(&text) {
            return Value::Decimal(decimal);
        }
    }
    Value::String(text)
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &DatabaseConfig) -> ReportError {
    let host = &config.host;
    let port = config.port;
    let user = &config.user;
    let database = &config.database;

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        ReportError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        ReportError::connection(format!(
            "Authentication failed for user '{user}'. Check DB_USER and DB_PASSWORD."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        ReportError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        ReportError::connection(format!("Server at {host}:{port} requires SSL: {error}"))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        ReportError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        ReportError::connection(error.to_string())
    }
}

/// Formats a query error with detail and hint if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
