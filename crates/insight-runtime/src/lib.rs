//! Runtime layer for Ledger Insight.
//!
//! Memoizes ledger loads and coordinates the data pipeline for the binary.

pub mod data_manager;
pub mod orchestrator;

pub use insight_core as core;
pub use insight_data as data;
