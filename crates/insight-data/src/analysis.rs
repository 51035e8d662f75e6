//! Main analysis pipeline.
//!
//! Orchestrates loading, cleaning, calendar enrichment and aggregation,
//! returning a [`LedgerAnalysis`] ready for the view layer.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use insight_core::models::{
    CategorySummary, MonthlySummary, TransactionKind, TypeIssue, CANONICAL_ORDER,
    TRANSACTION_DATE, TRANSACTION_TYPE,
};
use insight_core::table::Table;
use insight_core::Result;
use tracing::{debug, warn};

use crate::aggregator::LedgerAggregator;
use crate::cleaner::{clean, CleanReport};
use crate::enricher::{enrich, sort};
use crate::reader::{load_table, validate_schema};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    pub rows_loaded: usize,
    pub rows_after_cleaning: usize,
    pub duplicates_removed: usize,
    /// Cells that could not be coerced, across cleaning and enrichment.
    pub type_issues: usize,
    /// Wall-clock seconds spent reading the source (zero for in-memory tables).
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent cleaning, enriching and aggregating.
    pub transform_time_seconds: f64,
}

/// The complete output of [`analyze_table`].
#[derive(Debug, Clone)]
pub struct LedgerAnalysis {
    /// Cleaned, enriched table in (year, month, day) order.
    pub transactions: Table,
    pub clean_report: CleanReport,
    pub enrich_issues: Vec<TypeIssue>,
    /// `None` when the monthly precondition failed; the reason is in
    /// `warnings`.
    pub monthly_summary: Option<MonthlySummary>,
    pub expense_summary: CategorySummary,
    pub income_summary: CategorySummary,
    /// Distinct transaction types in the cleaned table, sorted.
    pub transaction_types: Vec<TransactionKind>,
    /// Stage failures that did not abort the run.
    pub warnings: Vec<String>,
    pub metadata: AnalysisMetadata,
}

impl LedgerAnalysis {
    /// Latest (year, month) holding any dated transaction.
    pub fn latest_period(&self) -> Option<(i32, u32)> {
        self.expense_summary
            .rows
            .iter()
            .chain(&self.income_summary.rows)
            .map(|r| (r.year, r.month))
            .chain(
                self.monthly_summary
                    .iter()
                    .flat_map(|m| m.rows.iter().map(|r| (r.year, r.month))),
            )
            .max()
    }

    pub fn summary_for(&self, kind: &TransactionKind) -> Option<&CategorySummary> {
        match kind {
            TransactionKind::Expense => Some(&self.expense_summary),
            TransactionKind::Income => Some(&self.income_summary),
            TransactionKind::Other(_) => None,
        }
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Load `source` (file or directory) and run the full pipeline on it.
pub fn analyze_ledger(source: &Path) -> Result<LedgerAnalysis> {
    let load_start = Instant::now();
    let table = load_table(source)?;
    let load_time = load_start.elapsed().as_secs_f64();

    let mut analysis = analyze_table(&table)?;
    analysis.metadata.load_time_seconds = load_time;
    Ok(analysis)
}

/// Run the pipeline on an already-loaded table.
///
/// 1. Check the required columns.
/// 2. Clean (dates, imputation, duplicates).
/// 3. Add calendar columns and sort chronologically.
/// 4. Build the monthly and per-category summaries.
///
/// Schema and key errors abort the run.  A failed monthly precondition only
/// drops that summary and is recorded in [`LedgerAnalysis::warnings`].
pub fn analyze_table(table: &Table) -> Result<LedgerAnalysis> {
    validate_schema(table)?;

    // ── Step 1: Clean ─────────────────────────────────────────────────────────
    let transform_start = Instant::now();
    let cleaned = clean(table);

    // ── Step 2: Enrich and order ──────────────────────────────────────────────
    let enriched = enrich(&cleaned.table, TRANSACTION_DATE)?;
    let transactions = sort(&enriched.table, CANONICAL_ORDER)?;

    // ── Step 3: Aggregate ─────────────────────────────────────────────────────
    let mut warnings = Vec::new();
    let monthly_summary = match LedgerAggregator::monthly_summary(&transactions) {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!("Monthly summary unavailable: {}", e);
            warnings.push(format!("Monthly summary unavailable: {e}"));
            None
        }
    };
    let expense_summary =
        LedgerAggregator::category_summary(&transactions, &TransactionKind::Expense)?;
    let income_summary =
        LedgerAggregator::category_summary(&transactions, &TransactionKind::Income)?;
    let transaction_types = distinct_types(&transactions)?;
    let transform_time = transform_start.elapsed().as_secs_f64();

    let type_issues = cleaned.report.type_issues.len() + enriched.type_issues.len();
    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        rows_loaded: table.row_count(),
        rows_after_cleaning: transactions.row_count(),
        duplicates_removed: cleaned.report.duplicates_removed,
        type_issues,
        load_time_seconds: 0.0,
        transform_time_seconds: transform_time,
    };
    debug!(
        "Analysis finished: {} rows, {} type issue(s), {:.3}s",
        metadata.rows_after_cleaning, metadata.type_issues, transform_time
    );

    Ok(LedgerAnalysis {
        transactions,
        clean_report: cleaned.report,
        enrich_issues: enriched.type_issues,
        monthly_summary,
        expense_summary,
        income_summary,
        transaction_types,
        warnings,
        metadata,
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn distinct_types(table: &Table) -> Result<Vec<TransactionKind>> {
    let idx = table.column_index(TRANSACTION_TYPE)?;
    let mut kinds: Vec<TransactionKind> = table
        .column_values(idx)
        .filter(|v| !v.is_missing())
        .map(|v| TransactionKind::from(v.to_string()))
        .collect();
    kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    kinds.dedup();
    Ok(kinds)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_table;
    use insight_core::table::ColumnKind;
    use insight_core::InsightError;
    use std::io::Write;

    const HEADER: &str =
        "transaction_date,transaction_type,category,subcategory,transaction_amount\n";

    fn table(body: &str) -> Table {
        read_table(format!("{HEADER}{body}").as_bytes()).unwrap()
    }

    #[test]
    fn test_analyze_table_full_pipeline() {
        let analysis = analyze_table(&table(
            "2023-02-10,Expense,Food,Groceries,30\n\
             2023-01-15,Expense,Food,Groceries,50\n\
             2023-01-20,Income,Job,Salary,1000\n\
             2023-01-20,Income,Job,Salary,1000\n",
        ))
        .unwrap();

        assert_eq!(analysis.metadata.rows_loaded, 4);
        assert_eq!(analysis.metadata.rows_after_cleaning, 3);
        assert_eq!(analysis.metadata.duplicates_removed, 1);
        assert!(analysis.warnings.is_empty());

        let monthly = analysis.monthly_summary.as_ref().unwrap();
        let balances: Vec<f64> = monthly.rows.iter().map(|r| r.total_balance).collect();
        assert_eq!(balances, vec![950.0, 920.0]);

        assert_eq!(analysis.expense_summary.rows.len(), 2);
        assert_eq!(analysis.income_summary.rows.len(), 1);
        assert_eq!(analysis.latest_period(), Some((2023, 2)));
        assert_eq!(
            analysis.transaction_types,
            vec![TransactionKind::Expense, TransactionKind::Income]
        );
    }

    #[test]
    fn test_analyze_table_transactions_are_chronological() {
        let analysis = analyze_table(&table(
            "2023-02-10,Expense,Food,Groceries,30\n\
             2022-05-01,Expense,Rent,Housing,400\n",
        ))
        .unwrap();
        let idx = analysis.transactions.column_index("year").unwrap();
        let years: Vec<i64> = analysis
            .transactions
            .column_values(idx)
            .filter_map(|v| v.as_i64())
            .collect();
        assert_eq!(years, vec![2022, 2023]);
    }

    #[test]
    fn test_missing_income_only_drops_monthly_summary() {
        let analysis = analyze_table(&table("2023-01-15,Expense,Food,Groceries,50\n")).unwrap();

        assert!(analysis.monthly_summary.is_none());
        assert_eq!(analysis.warnings.len(), 1);
        assert!(analysis.warnings[0].contains("Income"));
        assert_eq!(analysis.expense_summary.rows.len(), 1);
        assert!(analysis.income_summary.is_empty());
    }

    #[test]
    fn test_malformed_amount_does_not_poison_the_column() {
        let analysis = analyze_table(&table(
            "2023-01-15,Expense,Food,Groceries,50\n\
             2023-01-20,Income,Job,Salary,1000\n\
             2023-01-25,Expense,Food,Snacks,30x\n",
        ))
        .unwrap();

        let idx = analysis.transactions.column_index("transaction_amount").unwrap();
        assert_eq!(analysis.transactions.columns()[idx].kind, ColumnKind::Numeric);
        assert_eq!(analysis.metadata.type_issues, 1);
        assert_eq!(analysis.clean_report.type_issues[0].expected, "number");
        assert!(analysis.warnings.is_empty());

        let monthly = analysis.monthly_summary.as_ref().unwrap();
        assert_eq!(monthly.rows.len(), 1);
        assert_eq!(monthly.rows[0].expense(), 50.0 + 525.0);
        assert_eq!(analysis.expense_summary.rows.len(), 2);
    }

    #[test]
    fn test_missing_required_column_aborts() {
        let raw = read_table("transaction_date,transaction_type\n2023-01-01,Expense\n".as_bytes())
            .unwrap();
        let err = analyze_table(&raw).unwrap_err();
        assert!(matches!(err, InsightError::MissingColumn(_)));
    }

    #[test]
    fn test_analyze_ledger_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{HEADER}2023-01-15,Expense,Food,Groceries,50\n2023-01-20,Income,Job,Salary,1000\n"
        )
        .unwrap();

        let analysis = analyze_ledger(file.path()).unwrap();
        assert_eq!(analysis.metadata.rows_loaded, 2);
        assert!(analysis.metadata.load_time_seconds >= 0.0);
    }

    #[test]
    fn test_analyze_ledger_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyze_ledger(&dir.path().join("absent.csv")).unwrap_err();
        assert!(err.is_fatal());
    }
}
