//! Presentation layer for Ledger Insight.
//!
//! Builds named report views from an analysis and renders them as
//! comfy-table text or line-delimited JSON.

pub mod dashboard;
pub mod render;
pub mod views;

pub use insight_core as core;
