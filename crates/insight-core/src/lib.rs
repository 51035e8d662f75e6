//! Core types for Ledger Insight: the error taxonomy, the in-memory table
//! model, ledger record types, date and number helpers, and CLI settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod table;
pub mod time_utils;

pub use error::{InsightError, Result};
pub use table::{Column, ColumnKind, Table, Value};
