//! Calendar enrichment and canonical ordering.

use chrono::{Datelike, NaiveDate};
use insight_core::models::{TypeIssue, DAY, MONTH, YEAR};
use insight_core::table::{Column, ColumnKind, Table, Value};
use insight_core::time_utils::parse_date;
use insight_core::Result;
use tracing::{debug, warn};

/// An enriched table plus the rows whose date could not be read.
#[derive(Debug, Clone)]
pub struct EnrichOutcome {
    pub table: Table,
    pub type_issues: Vec<TypeIssue>,
}

/// Add `day`, `month` and `year` integer columns derived from `date_field`.
///
/// Existing columns with those names are overwritten in place; otherwise
/// they are appended in that order.  The date column itself is normalized to
/// [`Value::Date`].  Rows whose date is missing or cannot be coerced keep
/// missing derived cells; only cells that fail coercion here are reported.
///
/// Fails with [`insight_core::InsightError::MissingColumn`] when `date_field`
/// is not in the schema.
pub fn enrich(table: &Table, date_field: &str) -> Result<EnrichOutcome> {
    let date_idx = table.column_index(date_field)?;

    let mut columns = table.columns().to_vec();
    columns[date_idx].kind = ColumnKind::Date;
    let targets: Vec<usize> = [DAY, MONTH, YEAR]
        .iter()
        .map(|name| match columns.iter().position(|c| c.name == *name) {
            Some(i) => {
                columns[i].kind = ColumnKind::Integer;
                i
            }
            None => {
                columns.push(Column::new(*name, ColumnKind::Integer));
                columns.len() - 1
            }
        })
        .collect();

    let mut type_issues = Vec::new();
    let mut out = Table::new(columns.clone());
    for (row_idx, row) in table.rows().iter().enumerate() {
        let mut new_row = row.clone();
        new_row.resize(columns.len(), Value::Missing);

        let parts = match coerce_date(&row[date_idx]) {
            Some(date) => {
                new_row[date_idx] = Value::Date(date);
                [
                    Value::Integer(i64::from(date.day())),
                    Value::Integer(i64::from(date.month())),
                    Value::Integer(i64::from(date.year())),
                ]
            }
            None => {
                // Already-missing cells were reported upstream (or were blank).
                if !row[date_idx].is_missing() {
                    warn!(
                        "row {}: failed to convert '{}' value {:?} to a date",
                        row_idx, date_field, row[date_idx]
                    );
                    type_issues.push(TypeIssue {
                        row: row_idx,
                        column: date_field.to_string(),
                        value: row[date_idx].to_string(),
                        expected: "date",
                    });
                }
                new_row[date_idx] = Value::Missing;
                [Value::Missing, Value::Missing, Value::Missing]
            }
        };
        for (target, value) in targets.iter().zip(parts) {
            new_row[*target] = value;
        }
        out.push_row(new_row)?;
    }

    debug!(
        "Enriched {} rows from '{}' ({} without a usable date)",
        out.row_count(),
        date_field,
        type_issues.len()
    );
    Ok(EnrichOutcome {
        table: out,
        type_issues,
    })
}

/// Stable ascending sort by the given key columns, missing values last.
///
/// Fails with [`insight_core::InsightError::MissingColumn`] if any key is not
/// in the schema.
pub fn sort(table: &Table, key_fields: &[&str]) -> Result<Table> {
    let keys = key_fields
        .iter()
        .map(|name| table.column_index(name))
        .collect::<Result<Vec<usize>>>()?;

    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| {
        keys.iter()
            .map(|&k| a[k].sort_cmp(&b[k]))
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!("Sorted {} rows by {:?}", rows.len(), key_fields);
    Table::from_rows(table.columns().to_vec(), rows)
}

fn coerce_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => parse_date(s).ok(),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
