//! Dashboard assembly: turns one [`LedgerAnalysis`] into the ordered list of
//! report views.

use insight_core::models::{CategorySummary, Scope, TransactionKind};
use insight_data::aggregator::LedgerAggregator;
use insight_data::analysis::LedgerAnalysis;
use insight_data::ranker::CategoryRanker;
use tracing::{debug, warn};

use crate::views::{
    balance_over_time_view, category_summary_view, comparison_view, monthly_table_view,
    top_categories_view, transactions_view, type_total_over_time_view, type_trend_view,
    ReportView,
};

/// Selection of periods and categories for the ranking and comparison views.
///
/// Unset fields default to what the data offers: the latest year and month,
/// the top expense category and the two latest years or months.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardOptions {
    pub top: usize,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub compare_category: Option<String>,
    pub compare_years: Option<(i32, i32)>,
    pub compare_months: Option<(u32, u32)>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top: 5,
            year: None,
            month: None,
            compare_category: None,
            compare_years: None,
            compare_months: None,
        }
    }
}

/// Build every view the analysis supports, in dashboard order.
///
/// Views whose inputs are unavailable (no monthly summary, no transactions of
/// a type, fewer than two periods to compare) are left out.
pub fn build_views(analysis: &LedgerAnalysis, options: &DashboardOptions) -> Vec<ReportView> {
    let mut views = vec![transactions_view(&analysis.transactions)];

    if let Some(monthly) = &analysis.monthly_summary {
        views.push(monthly_table_view(monthly));
        views.push(balance_over_time_view(monthly));
        views.push(type_total_over_time_view(monthly, &TransactionKind::Expense));
        views.push(type_total_over_time_view(monthly, &TransactionKind::Income));
    }

    for summary in [&analysis.expense_summary, &analysis.income_summary] {
        if !summary.is_empty() {
            views.push(category_summary_view(summary));
        }
    }

    for kind in &analysis.transaction_types {
        match LedgerAggregator::type_trend(&analysis.transactions, kind) {
            Ok(trend) if !trend.is_empty() => views.push(type_trend_view(kind, &trend)),
            Ok(_) => {}
            Err(e) => warn!("Skipping {} trend: {}", kind, e),
        }
    }

    let (year, month) = selected_period(analysis, options);
    for summary in [&analysis.expense_summary, &analysis.income_summary] {
        views.extend(ranking_views(summary, options.top, year, month));
    }

    views.extend(comparison_views(analysis, options, year));

    debug!("Built {} report view(s)", views.len());
    views
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Explicit year/month, else the latest period in the data.
fn selected_period(analysis: &LedgerAnalysis, options: &DashboardOptions) -> (Option<i32>, Option<u32>) {
    let latest = analysis.latest_period();
    let year = options.year.or(latest.map(|(y, _)| y));
    let month = options.month.or_else(|| {
        let (latest_year, latest_month) = latest?;
        match year {
            Some(y) if y != latest_year => latest_month_in(analysis, y),
            _ => Some(latest_month),
        }
    });
    (year, month)
}

fn latest_month_in(analysis: &LedgerAnalysis, year: i32) -> Option<u32> {
    analysis
        .expense_summary
        .rows
        .iter()
        .chain(&analysis.income_summary.rows)
        .filter(|r| r.year == year)
        .map(|r| r.month)
        .max()
}

fn ranking_views(
    summary: &CategorySummary,
    top: usize,
    year: Option<i32>,
    month: Option<u32>,
) -> Vec<ReportView> {
    if summary.is_empty() {
        return Vec::new();
    }

    let years = summary.years();
    let range = years.first().copied().zip(years.last().copied());

    let mut scopes = vec![Scope::All];
    if let Some(y) = year {
        scopes.push(Scope::year(y));
        if let Some(m) = month {
            scopes.push(Scope::month(y, m));
        }
    }

    scopes
        .into_iter()
        .map(|scope| CategoryRanker::top_n(summary, top, scope))
        .filter(|ranking| !ranking.is_empty())
        .map(|ranking| top_categories_view(&ranking, top, range))
        .collect()
}

fn comparison_views(
    analysis: &LedgerAnalysis,
    options: &DashboardOptions,
    year: Option<i32>,
) -> Vec<ReportView> {
    let category = match options.compare_category.clone().or_else(|| {
        CategoryRanker::top_n(&analysis.expense_summary, 1, Scope::All)
            .entries
            .into_iter()
            .next()
            .map(|e| e.category)
    }) {
        Some(c) => c,
        None => return Vec::new(),
    };
    let summary = summary_containing(analysis, &category);

    let mut views = Vec::new();

    let years = options.compare_years.or_else(|| {
        let years = summary.years();
        match years.as_slice() {
            [.., a, b] => Some((*a, *b)),
            _ => None,
        }
    });
    if let Some((a, b)) = years {
        views.push(comparison_view(&CategoryRanker::compare_years(
            summary, &category, a, b,
        )));
    }

    if let Some(y) = year {
        let months = options.compare_months.or_else(|| {
            let mut months: Vec<u32> = summary
                .rows
                .iter()
                .filter(|r| r.year == y)
                .map(|r| r.month)
                .collect();
            months.sort_unstable();
            months.dedup();
            match months.as_slice() {
                [.., a, b] => Some((*a, *b)),
                _ => None,
            }
        });
        if let Some((a, b)) = months {
            views.push(comparison_view(&CategoryRanker::compare_months(
                summary, &category, y, a, b,
            )));
        }
    }

    views
}

/// The summary holding `category`, falling back to expenses.
fn summary_containing<'a>(analysis: &'a LedgerAnalysis, category: &str) -> &'a CategorySummary {
    [&analysis.expense_summary, &analysis.income_summary]
        .into_iter()
        .find(|s| s.rows.iter().any(|r| r.category == category))
        .unwrap_or(&analysis.expense_summary)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
