use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Column names ──────────────────────────────────────────────────────────────

pub const TRANSACTION_DATE: &str = "transaction_date";
pub const TRANSACTION_TYPE: &str = "transaction_type";
pub const TRANSACTION_AMOUNT: &str = "transaction_amount";
pub const CATEGORY: &str = "category";
pub const SUBCATEGORY: &str = "subcategory";
pub const DAY: &str = "day";
pub const MONTH: &str = "month";
pub const YEAR: &str = "year";

/// Columns every ledger source must provide.
pub const REQUIRED_COLUMNS: &[&str] = &[
    TRANSACTION_DATE,
    TRANSACTION_TYPE,
    TRANSACTION_AMOUNT,
    CATEGORY,
    SUBCATEGORY,
];

/// Canonical sort key applied after enrichment.
pub const CANONICAL_ORDER: &[&str] = &[YEAR, MONTH, DAY];

// ── TransactionKind ───────────────────────────────────────────────────────────

/// Partition of a transaction.  Values other than `Income` / `Expense` are
/// carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TransactionKind {
    Income,
    Expense,
    Other(String),
}

impl TransactionKind {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
            TransactionKind::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for TransactionKind {
    fn from(s: &str) -> Self {
        match s {
            "Income" => TransactionKind::Income,
            "Expense" => TransactionKind::Expense,
            other => TransactionKind::Other(other.to_string()),
        }
    }
}

impl From<String> for TransactionKind {
    fn from(s: String) -> Self {
        TransactionKind::from(s.as_str())
    }
}

impl From<TransactionKind> for String {
    fn from(kind: TransactionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for TransactionKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TransactionKind::from(s))
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Scope ─────────────────────────────────────────────────────────────────────

/// Time filter applied to category summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    /// The entire series.
    All,
    /// One calendar year.
    Year { year: i32 },
    /// One month of one year.
    Month { year: i32, month: u32 },
}

impl Scope {
    pub fn year(year: i32) -> Self {
        Scope::Year { year }
    }

    pub fn month(year: i32, month: u32) -> Self {
        Scope::Month { year, month }
    }

    pub fn contains(&self, year: i32, month: u32) -> bool {
        match *self {
            Scope::All => true,
            Scope::Year { year: y } => y == year,
            Scope::Month { year: y, month: m } => y == year && m == month,
        }
    }
}

// ── Monthly summary ───────────────────────────────────────────────────────────

/// One (year, month) row of the monthly pivot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummaryRow {
    pub year: i32,
    pub month: u32,
    /// Total per transaction type; every type seen in the dataset has a key.
    pub totals: BTreeMap<String, f64>,
    /// `Income − Expense` for this period.
    pub net_balance: f64,
    /// Running sum of `net_balance` up to and including this period.
    pub total_balance: f64,
}

impl MonthlySummaryRow {
    /// Total for `kind`, `0.0` when the type never occurs.
    pub fn total(&self, kind: &TransactionKind) -> f64 {
        self.totals.get(kind.as_str()).copied().unwrap_or(0.0)
    }

    pub fn income(&self) -> f64 {
        self.total(&TransactionKind::Income)
    }

    pub fn expense(&self) -> f64 {
        self.total(&TransactionKind::Expense)
    }

    /// `"<year>-<month>"` label used on time-series axes.
    pub fn period_label(&self) -> String {
        format!("{}-{}", self.year, self.month)
    }
}

/// The monthly pivot, ordered by (year, month) ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// Distinct transaction types, sorted; one pivot column each.
    pub transaction_types: Vec<String>,
    pub rows: Vec<MonthlySummaryRow>,
}

// ── Category summary ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummaryRow {
    pub year: i32,
    pub month: u32,
    pub category: String,
    pub subcategory: String,
    pub total_amount: f64,
}

/// Per-(year, month, category, subcategory) totals for one transaction type.
///
/// An empty `rows` vector is a valid result meaning "no transactions of this
/// type", not a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub transaction_type: TransactionKind,
    pub rows: Vec<CategorySummaryRow>,
}

impl CategorySummary {
    pub fn empty(transaction_type: TransactionKind) -> Self {
        Self {
            transaction_type,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.rows.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

// ── Rankings and comparisons ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCategory {
    pub category: String,
    pub total_amount: f64,
}

/// Highest-total categories within a scope, descending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub transaction_type: TransactionKind,
    pub scope: Scope,
    pub entries: Vec<RankedCategory>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Totals of one category under two scopes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub category: String,
    pub scope_a: Scope,
    pub scope_b: Scope,
    pub total_a: f64,
    pub total_b: f64,
}

impl Comparison {
    pub fn totals(&self) -> (f64, f64) {
        (self.total_a, self.total_b)
    }
}

/// Total of one transaction type for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotal {
    pub year: i32,
    pub month: u32,
    pub total_amount: f64,
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// A cell that could not be coerced to its expected type.
///
/// Collected rather than raised: the row is kept and degraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeIssue {
    /// Zero-based row index in the table the stage received.
    pub row: usize,
    pub column: String,
    pub value: String,
    pub expected: &'static str,
}

impl fmt::Display for TypeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {}: cannot convert {:?} in column '{}' to {}",
            self.row, self.value, self.column, self.expected
        )
    }
}
