//! In-memory report sources for testing.

use super::{ReportSource, ResultTable};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock source that returns a predefined table for any business date.
#[derive(Debug, Default)]
pub struct MockSource {
    table: ResultTable,
    requested: Mutex<Vec<String>>,
}

impl MockSource {
    /// Creates a mock source that returns no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock source that returns `table`.
    pub fn with_table(table: ResultTable) -> Self {
        Self {
            table,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Returns the business dates this source was queried with, in order.
    pub fn requested_dates(&self) -> Vec<String> {
        self.requested
            .lock()
            .map(|dates| dates.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReportSource for MockSource {
    async fn fetch_sales(&self, business_date: &str) -> Result<ResultTable> {
        self.requested
            .lock()
            .map_err(|_| ReportError::internal("mock source lock poisoned"))?
            .push(business_date.to_string());
        Ok(self.table.clone())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A source whose every fetch fails with a connection error.
#[derive(Debug, Clone)]
pub struct FailingSource {
    message: String,
}

impl FailingSource {
    /// Creates a failing source with the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingSource {
    fn default() -> Self {
        Self::new("Cannot connect to localhost:5432. Check that the server is running.")
    }
}

#[async_trait]
impl ReportSource for FailingSource {
    async fn fetch_sales(&self, _business_date: &str) -> Result<ResultTable> {
        Err(ReportError::connection(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
