//! Report orchestrator.
//!
//! Couples the [`LedgerCache`] with the analysis pipeline so callers get a
//! [`LedgerAnalysis`] for a source path in one call, reading the file only
//! when it changed since the previous run.

use std::path::Path;
use std::time::Instant;

use insight_core::Result;
use insight_data::analysis::{analyze_table, LedgerAnalysis};

use crate::data_manager::LedgerCache;

// ── ReportOrchestrator ────────────────────────────────────────────────────────

/// Single-threaded coordinator: cached load, then the pure pipeline.
#[derive(Default)]
pub struct ReportOrchestrator {
    cache: LedgerCache,
}

impl ReportOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or reuse) `source` and run the full analysis on it.
    ///
    /// Loader failures are fatal and returned unchanged; a failed monthly
    /// summary shows up in [`LedgerAnalysis::warnings`] instead.
    pub fn analyze(&mut self, source: &Path) -> Result<LedgerAnalysis> {
        let load_start = Instant::now();
        let table = self.cache.load(source)?;
        let load_time = load_start.elapsed().as_secs_f64();

        let mut analysis = analyze_table(table)?;
        analysis.metadata.load_time_seconds = load_time;

        for warning in &analysis.warnings {
            tracing::warn!(source = %source.display(), "{}", warning);
        }
        tracing::debug!(
            rows = analysis.metadata.rows_after_cleaning,
            cache_hits = self.cache.hits(),
            cache_misses = self.cache.misses(),
            "analysis complete"
        );
        Ok(analysis)
    }

    pub fn cache(&self) -> &LedgerCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LedgerCache {
        &mut self.cache
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
