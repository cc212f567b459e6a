//! Integration tests for the sales report job.

pub mod pipeline_test;
pub mod postgres_test;
