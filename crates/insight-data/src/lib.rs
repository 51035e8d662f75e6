//! Data layer for Ledger Insight.
//!
//! Responsible for discovering and reading CSV ledgers, cleaning and
//! enriching them, aggregating per-period and per-category totals, ranking
//! categories and running the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod cleaner;
pub mod enricher;
pub mod ranker;
pub mod reader;

pub use insight_core as core;
