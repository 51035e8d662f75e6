//! Top-N category ranking and two-scope comparisons.

use insight_core::models::{CategorySummary, Comparison, RankedCategory, Ranking, Scope};
use tracing::debug;

/// Stateless ranking and comparison over a [`CategorySummary`].
pub struct CategoryRanker;

impl CategoryRanker {
    /// The `n` categories with the highest totals inside `scope`.
    ///
    /// Categories are totalled across subcategories and periods, then sorted
    /// descending.  Equal totals keep the order in which the category first
    /// appears in the summary.  The result is empty only when no row falls in
    /// the scope (or `n` is zero).
    pub fn top_n(summary: &CategorySummary, n: usize, scope: Scope) -> Ranking {
        let mut entries: Vec<RankedCategory> = Vec::new();
        for row in summary
            .rows
            .iter()
            .filter(|r| scope.contains(r.year, r.month))
        {
            match entries.iter_mut().find(|e| e.category == row.category) {
                Some(entry) => entry.total_amount += row.total_amount,
                None => entries.push(RankedCategory {
                    category: row.category.clone(),
                    total_amount: row.total_amount,
                }),
            }
        }

        entries.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
        entries.truncate(n);

        debug!(
            "Top {} {} categories for {:?}: {} entries",
            n,
            summary.transaction_type,
            scope,
            entries.len()
        );
        Ranking {
            transaction_type: summary.transaction_type.clone(),
            scope,
            entries,
        }
    }

    /// Totals of `category` under two independent scopes, `0.0` when a scope
    /// has no matching rows.
    pub fn compare(
        summary: &CategorySummary,
        category: &str,
        scope_a: Scope,
        scope_b: Scope,
    ) -> Comparison {
        let total_in = |scope: Scope| -> f64 {
            summary
                .rows
                .iter()
                .filter(|r| r.category == category && scope.contains(r.year, r.month))
                .map(|r| r.total_amount)
                .sum()
        };

        Comparison {
            category: category.to_string(),
            scope_a,
            scope_b,
            total_a: total_in(scope_a),
            total_b: total_in(scope_b),
        }
    }

    pub fn compare_years(summary: &CategorySummary, category: &str, a: i32, b: i32) -> Comparison {
        Self::compare(summary, category, Scope::year(a), Scope::year(b))
    }

    /// Two months of the same year.
    pub fn compare_months(
        summary: &CategorySummary,
        category: &str,
        year: i32,
        a: u32,
        b: u32,
    ) -> Comparison {
        Self::compare(
            summary,
            category,
            Scope::month(year, a),
            Scope::month(year, b),
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
