//! Named report views.
//!
//! A [`ReportView`] is the immutable handoff between aggregation and
//! rendering: a title, the kind of chart it represents and its data.  The
//! builders here produce the dashboard's fixed titles.

use insight_core::formatting::period_title;
use insight_core::models::{
    CategorySummary, Comparison, MonthlySummary, PeriodTotal, Ranking, Scope, TransactionKind,
};
use insight_core::table::{Table, Value};
use insight_core::time_utils::month_name_or_invalid;
use serde::Serialize;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Table,
    Line,
    Donut,
    GroupedBar,
}

/// One point of a chart.  `series` distinguishes the bars of a grouped chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    pub label: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            series: None,
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewPayload {
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Series(Vec<SeriesPoint>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub title: String,
    pub chart: ChartKind,
    pub payload: ViewPayload,
}

impl ReportView {
    pub fn points(&self) -> &[SeriesPoint] {
        match &self.payload {
            ViewPayload::Series(points) => points,
            ViewPayload::Table { .. } => &[],
        }
    }
}

// ── Tables ────────────────────────────────────────────────────────────────────

/// The cleaned, enriched transaction table.
pub fn transactions_view(table: &Table) -> ReportView {
    ReportView {
        title: "Transactions".to_string(),
        chart: ChartKind::Table,
        payload: ViewPayload::Table {
            columns: table.column_names().into_iter().map(String::from).collect(),
            rows: table.rows().to_vec(),
        },
    }
}

/// Monthly pivot: period, one column per type, net and running balance.
pub fn monthly_table_view(summary: &MonthlySummary) -> ReportView {
    let mut columns = vec!["year".to_string(), "month".to_string()];
    columns.extend(summary.transaction_types.iter().cloned());
    columns.push("net_balance".to_string());
    columns.push("total_balance".to_string());

    let rows = summary
        .rows
        .iter()
        .map(|r| {
            let mut row = vec![
                Value::Integer(i64::from(r.year)),
                Value::Integer(i64::from(r.month)),
            ];
            row.extend(
                summary
                    .transaction_types
                    .iter()
                    .map(|t| Value::Number(r.totals.get(t).copied().unwrap_or(0.0))),
            );
            row.push(Value::Number(r.net_balance));
            row.push(Value::Number(r.total_balance));
            row
        })
        .collect();

    ReportView {
        title: "Monthly Summary Table".to_string(),
        chart: ChartKind::Table,
        payload: ViewPayload::Table { columns, rows },
    }
}

/// Per-period category and subcategory totals of one transaction type.
pub fn category_summary_view(summary: &CategorySummary) -> ReportView {
    let columns = ["year", "month", "category", "subcategory", "total_amount"]
        .into_iter()
        .map(String::from)
        .collect();
    let rows = summary
        .rows
        .iter()
        .map(|r| {
            vec![
                Value::Integer(i64::from(r.year)),
                Value::Integer(i64::from(r.month)),
                Value::Text(r.category.clone()),
                Value::Text(r.subcategory.clone()),
                Value::Number(r.total_amount),
            ]
        })
        .collect();

    ReportView {
        title: format!("{} Category Summary", summary.transaction_type),
        chart: ChartKind::Table,
        payload: ViewPayload::Table { columns, rows },
    }
}

// ── Time series ───────────────────────────────────────────────────────────────

pub fn balance_over_time_view(summary: &MonthlySummary) -> ReportView {
    line(
        "Total Balance Pattern Over Time Series".to_string(),
        summary
            .rows
            .iter()
            .map(|r| SeriesPoint::new(r.period_label(), r.total_balance))
            .collect(),
    )
}

/// Monthly totals of `kind` taken from the pivot (zero-filled).
pub fn type_total_over_time_view(summary: &MonthlySummary, kind: &TransactionKind) -> ReportView {
    line(
        format!("Total {kind} Pattern Over Time Series"),
        summary
            .rows
            .iter()
            .map(|r| SeriesPoint::new(r.period_label(), r.total(kind)))
            .collect(),
    )
}

/// Totals of `kind` for the periods where it occurs.
pub fn type_trend_view(kind: &TransactionKind, trend: &[PeriodTotal]) -> ReportView {
    line(
        format!("{kind} Pattern over Time"),
        trend
            .iter()
            .map(|p| SeriesPoint::new(format!("{}-{}", p.year, p.month), p.total_amount))
            .collect(),
    )
}

fn line(title: String, points: Vec<SeriesPoint>) -> ReportView {
    ReportView {
        title,
        chart: ChartKind::Line,
        payload: ViewPayload::Series(points),
    }
}

// ── Rankings and comparisons ──────────────────────────────────────────────────

/// Donut of a ranking.  `year_range` labels an all-time scope.
pub fn top_categories_view(ranking: &Ranking, n: usize, year_range: Option<(i32, i32)>) -> ReportView {
    let suffix = match (ranking.scope, year_range) {
        (Scope::Year { year }, _) => format!("in {year}"),
        (Scope::Month { year, month }, _) => format!("in {}", period_title(year, month)),
        (Scope::All, Some((first, last))) => format!("from {first} to {last}"),
        (Scope::All, None) => "overall".to_string(),
    };
    ReportView {
        title: format!("Top {n} {} Categories {suffix}", ranking.transaction_type),
        chart: ChartKind::Donut,
        payload: ViewPayload::Series(
            ranking
                .entries
                .iter()
                .map(|e| SeriesPoint::new(e.category.clone(), e.total_amount))
                .collect(),
        ),
    }
}

/// Grouped bar of one category under two scopes.
pub fn comparison_view(comparison: &Comparison) -> ReportView {
    let title = match (comparison.scope_a, comparison.scope_b) {
        (Scope::Month { year, month: a }, Scope::Month { month: b, .. }) => format!(
            "Comparison of {} between {} and {} of {year}",
            comparison.category,
            month_name_or_invalid(a),
            month_name_or_invalid(b)
        ),
        (a, b) => format!(
            "Comparison of {} between {} and {}",
            comparison.category,
            scope_label(a),
            scope_label(b)
        ),
    };

    let points = [
        (comparison.scope_a, comparison.total_a),
        (comparison.scope_b, comparison.total_b),
    ]
    .into_iter()
    .map(|(scope, total)| SeriesPoint {
        series: Some(scope_label(scope)),
        label: comparison.category.clone(),
        value: total,
    })
    .collect();

    ReportView {
        title,
        chart: ChartKind::GroupedBar,
        payload: ViewPayload::Series(points),
    }
}

fn scope_label(scope: Scope) -> String {
    match scope {
        Scope::All => "all time".to_string(),
        Scope::Year { year } => year.to_string(),
        Scope::Month { month, .. } => month_name_or_invalid(month).to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
