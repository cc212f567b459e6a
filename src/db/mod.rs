//! Data fetching for the sales report.
//!
//! Provides a trait-based interface over the report's data source so the
//! pipeline can run against PostgreSQL in production and in-memory sources
//! in tests.

mod mock;
mod postgres;
mod types;

pub use mock::{FailingSource, MockSource};
pub use postgres::PostgresSource;
pub use types::{ColumnInfo, ResultTable, Row, Value};

use crate::error::Result;
use async_trait::async_trait;

/// The sales query. The business date is always bound as `$1`.
pub const SALES_QUERY: &str = "SELECT * FROM sales_data WHERE transaction_date = $1::date";

/// Trait defining a source of report rows.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetches all sales rows whose transaction date equals `business_date`.
    async fn fetch_sales(&self, business_date: &str) -> Result<ResultTable>;

    /// Closes the underlying connection, if any.
    async fn close(&self) -> Result<()>;
}
