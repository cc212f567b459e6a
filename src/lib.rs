//! Sales report - export a business day's sales to xlsx and email it.
//!
//! This library exposes the pipeline stages for use by the binary and by
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod pipeline;
pub mod report;
pub mod template;
