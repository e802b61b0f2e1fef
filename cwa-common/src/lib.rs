//! # Check-Worthiness Annotator Common Library
//!
//! Shared code for the annotation service:
//! - Error type and result alias
//! - Bootstrap configuration loading
//! - Spreadsheet store contract (Google Sheets and in-memory backends)
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod sheets;
pub mod time;

pub use error::{Error, Result};
