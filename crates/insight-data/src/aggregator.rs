//! Monthly and per-category aggregation over an enriched ledger table.

use std::collections::{BTreeMap, BTreeSet};

use insight_core::models::{
    CategorySummary, CategorySummaryRow, MonthlySummary, MonthlySummaryRow, PeriodTotal,
    TransactionKind, CATEGORY, MONTH, SUBCATEGORY, TRANSACTION_AMOUNT, TRANSACTION_TYPE, YEAR,
};
use insight_core::table::{Table, Value};
use insight_core::{InsightError, Result};
use tracing::{debug, info, warn};

// ── Row access ────────────────────────────────────────────────────────────────

/// Column positions shared by every aggregation.
struct Layout {
    year: usize,
    month: usize,
    kind: usize,
    amount: usize,
}

impl Layout {
    fn resolve(table: &Table) -> Result<Self> {
        Ok(Self {
            year: table.column_index(YEAR)?,
            month: table.column_index(MONTH)?,
            kind: table.column_index(TRANSACTION_TYPE)?,
            amount: table.column_index(TRANSACTION_AMOUNT)?,
        })
    }

    fn period(&self, row: &[Value]) -> Option<(i32, u32)> {
        let year = i32::try_from(row[self.year].as_i64()?).ok()?;
        let month = u32::try_from(row[self.month].as_i64()?).ok()?;
        (1..=12).contains(&month).then_some((year, month))
    }
}

/// Text of a categorical cell; non-text cells use their display form.
fn label(value: &Value) -> Option<String> {
    match value {
        Value::Missing => None,
        Value::Text(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn warn_skipped(skipped: usize, view: &str) {
    if skipped > 0 {
        warn!(
            "{}: skipped {} row(s) without a usable period, type or amount",
            view, skipped
        );
    }
}

// ── LedgerAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that groups ledger rows by period and category.
pub struct LedgerAggregator;

impl LedgerAggregator {
    /// Pivot per-period totals by transaction type and derive balances.
    ///
    /// Every transaction type in the table becomes a key of
    /// [`MonthlySummaryRow::totals`], `0.0` where a period has none.
    /// `net_balance` is `Income − Expense`; other types are pivoted but do not
    /// count towards it.  `total_balance` is the running sum of `net_balance`
    /// in (year, month) order.
    ///
    /// Fails with [`InsightError::MissingTransactionType`] when `Income` or
    /// `Expense` never occurs, and with [`InsightError::MissingColumn`] when
    /// the table has not been enriched.
    pub fn monthly_summary(table: &Table) -> Result<MonthlySummary> {
        let layout = Layout::resolve(table)?;

        let mut groups: BTreeMap<(i32, u32), BTreeMap<String, f64>> = BTreeMap::new();
        let mut types: BTreeSet<String> = BTreeSet::new();
        let mut skipped = 0usize;

        for row in table.rows() {
            let (Some(period), Some(kind), Some(amount)) = (
                layout.period(row),
                label(&row[layout.kind]),
                row[layout.amount].as_f64(),
            ) else {
                skipped += 1;
                continue;
            };
            *groups.entry(period).or_default().entry(kind.clone()).or_insert(0.0) += amount;
            types.insert(kind);
        }
        warn_skipped(skipped, "monthly summary");

        for required in [TransactionKind::Income, TransactionKind::Expense] {
            if !types.contains(required.as_str()) {
                return Err(InsightError::MissingTransactionType(
                    required.as_str().to_string(),
                ));
            }
        }

        let mut running = 0.0;
        let rows: Vec<MonthlySummaryRow> = groups
            .into_iter()
            .map(|((year, month), by_type)| {
                let totals: BTreeMap<String, f64> = types
                    .iter()
                    .map(|t| (t.clone(), by_type.get(t).copied().unwrap_or(0.0)))
                    .collect();
                let net_balance = totals[TransactionKind::Income.as_str()]
                    - totals[TransactionKind::Expense.as_str()];
                running += net_balance;
                MonthlySummaryRow {
                    year,
                    month,
                    totals,
                    net_balance,
                    total_balance: running,
                }
            })
            .collect();

        debug!(
            "Monthly summary: {} period(s), {} transaction type(s)",
            rows.len(),
            types.len()
        );
        Ok(MonthlySummary {
            transaction_types: types.into_iter().collect(),
            rows,
        })
    }

    /// Totals per (year, month, category, subcategory) for one type.
    ///
    /// Rows come back in ascending key order.  When nothing matches `kind`
    /// the result is an empty summary, not an error.
    pub fn category_summary(table: &Table, kind: &TransactionKind) -> Result<CategorySummary> {
        let layout = Layout::resolve(table)?;
        let category_idx = table.column_index(CATEGORY)?;
        let subcategory_idx = table.column_index(SUBCATEGORY)?;

        let mut groups: BTreeMap<(i32, u32, String, String), f64> = BTreeMap::new();
        let mut skipped = 0usize;

        for row in table.rows() {
            if label(&row[layout.kind]).as_deref() != Some(kind.as_str()) {
                continue;
            }
            let (Some((year, month)), Some(category), Some(subcategory), Some(amount)) = (
                layout.period(row),
                label(&row[category_idx]),
                label(&row[subcategory_idx]),
                row[layout.amount].as_f64(),
            ) else {
                skipped += 1;
                continue;
            };
            *groups
                .entry((year, month, category, subcategory))
                .or_insert(0.0) += amount;
        }
        warn_skipped(skipped, "category summary");

        if groups.is_empty() {
            info!("No transactions found for transaction type '{}'.", kind);
            return Ok(CategorySummary::empty(kind.clone()));
        }

        let rows = groups
            .into_iter()
            .map(
                |((year, month, category, subcategory), total_amount)| CategorySummaryRow {
                    year,
                    month,
                    category,
                    subcategory,
                    total_amount,
                },
            )
            .collect();

        Ok(CategorySummary {
            transaction_type: kind.clone(),
            rows,
        })
    }

    /// Per-period totals of one transaction type, ascending by period.
    pub fn type_trend(table: &Table, kind: &TransactionKind) -> Result<Vec<PeriodTotal>> {
        let layout = Layout::resolve(table)?;

        let mut groups: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        for row in table.rows() {
            if label(&row[layout.kind]).as_deref() != Some(kind.as_str()) {
                continue;
            }
            if let (Some(period), Some(amount)) = (layout.period(row), row[layout.amount].as_f64())
            {
                *groups.entry(period).or_insert(0.0) += amount;
            }
        }

        Ok(groups
            .into_iter()
            .map(|((year, month), total_amount)| PeriodTotal {
                year,
                month,
                total_amount,
            })
            .collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
