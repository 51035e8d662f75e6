//! Ledger cleaning: date normalization, missing-value imputation and
//! duplicate removal.
//!
//! Each step borrows its input table and returns a fresh one, together with
//! what it changed so the caller can report it.

use std::collections::{HashMap, HashSet};

use insight_core::models::{TypeIssue, TRANSACTION_AMOUNT, TRANSACTION_DATE};
use insight_core::table::{parse_number, Column, ColumnKind, Table, Value};
use insight_core::time_utils::parse_date;
use serde::Serialize;
use tracing::{debug, info, warn};

// ── Report types ──────────────────────────────────────────────────────────────

/// One column's imputation: the fill value and how many cells received it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Imputation {
    pub column: String,
    pub fill: Value,
    pub cells: usize,
}

/// What [`clean`] did to the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates_removed: usize,
    pub imputations: Vec<Imputation>,
    pub type_issues: Vec<TypeIssue>,
}

/// A cleaned table and its report.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub table: Table,
    pub report: CleanReport,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Clean a ledger table, treating `transaction_date` as its date column and
/// `transaction_amount` as its numeric column.
pub fn clean(table: &Table) -> CleanOutcome {
    clean_with(table, &[TRANSACTION_DATE], &[TRANSACTION_AMOUNT])
}

/// Clean `table`, coercing every column named in `date_columns` to dates and
/// every column named in `numeric_columns` to numbers.
///
/// Steps run in order: type normalization, imputation, duplicate removal.
/// Cells that fail coercion become missing, are reported as type issues and
/// then receive the column's fill value.  Cleaning an already-clean table
/// returns an equal table.
pub fn clean_with(table: &Table, date_columns: &[&str], numeric_columns: &[&str]) -> CleanOutcome {
    let (dated, mut type_issues) = normalize_dates(table, date_columns);
    let (normalized, number_issues) = normalize_numbers(&dated, numeric_columns);
    type_issues.extend(number_issues);
    let (imputed, imputations) = impute_missing(&normalized);
    let (deduped, duplicates_removed) = drop_duplicates(&imputed);

    let report = CleanReport {
        rows_in: table.row_count(),
        rows_out: deduped.row_count(),
        duplicates_removed,
        imputations,
        type_issues,
    };
    debug!(
        "Cleaned table: {} rows in, {} rows out, {} type issue(s)",
        report.rows_in,
        report.rows_out,
        report.type_issues.len()
    );

    CleanOutcome {
        table: deduped,
        report,
    }
}

/// Parse each named date column into [`Value::Date`].
///
/// Unparseable cells become [`Value::Missing`] and are returned as issues.
/// Names absent from the schema are ignored.
pub fn normalize_dates(table: &Table, date_columns: &[&str]) -> (Table, Vec<TypeIssue>) {
    let targets: Vec<usize> = date_columns
        .iter()
        .filter_map(|name| table.column_index(name).ok())
        .collect();

    let columns: Vec<Column> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if targets.contains(&i) {
                Column::new(c.name.clone(), ColumnKind::Date)
            } else {
                c.clone()
            }
        })
        .collect();

    let mut issues = Vec::new();
    let mut rows = Vec::with_capacity(table.row_count());
    for (row_idx, row) in table.rows().iter().enumerate() {
        let mut new_row = row.clone();
        for &col in &targets {
            let coerced = match &row[col] {
                Value::Missing => Value::Missing,
                Value::Date(d) => Value::Date(*d),
                Value::Text(s) => match parse_date(s) {
                    Ok(d) => Value::Date(d),
                    Err(e) => {
                        warn!("row {}: {}", row_idx, e);
                        issues.push(type_issue(row_idx, &columns[col].name, &row[col], "date"));
                        Value::Missing
                    }
                },
                other => {
                    warn!("row {}: {:?} in a date column", row_idx, other);
                    issues.push(type_issue(row_idx, &columns[col].name, other, "date"));
                    Value::Missing
                }
            };
            new_row[col] = coerced;
        }
        rows.push(new_row);
    }

    (rebuild(columns, rows), issues)
}

/// Parse each named column into [`Value::Number`], cell by cell.
///
/// The column becomes [`ColumnKind::Numeric`] whatever the loader inferred.
/// Unparseable cells become [`Value::Missing`] and are returned as issues.
/// Names absent from the schema are ignored.
pub fn normalize_numbers(table: &Table, numeric_columns: &[&str]) -> (Table, Vec<TypeIssue>) {
    let targets: Vec<usize> = numeric_columns
        .iter()
        .filter_map(|name| table.column_index(name).ok())
        .collect();

    let mut columns = table.columns().to_vec();
    for &col in &targets {
        columns[col].kind = ColumnKind::Numeric;
    }

    let mut issues = Vec::new();
    let mut rows = Vec::with_capacity(table.row_count());
    for (row_idx, row) in table.rows().iter().enumerate() {
        let mut new_row = row.clone();
        for &col in &targets {
            let coerced = match &row[col] {
                Value::Missing => Value::Missing,
                Value::Number(n) => Value::Number(*n),
                Value::Integer(i) => Value::Number(*i as f64),
                Value::Text(s) => match parse_number(s) {
                    Some(n) => Value::Number(n),
                    None => {
                        warn!(
                            "row {}: cannot convert {:?} in '{}' to a number",
                            row_idx, s, columns[col].name
                        );
                        issues.push(type_issue(row_idx, &columns[col].name, &row[col], "number"));
                        Value::Missing
                    }
                },
                other => {
                    warn!("row {}: {:?} in a numeric column", row_idx, other);
                    issues.push(type_issue(row_idx, &columns[col].name, other, "number"));
                    Value::Missing
                }
            };
            new_row[col] = coerced;
        }
        rows.push(new_row);
    }

    (rebuild(columns, rows), issues)
}

/// Fill missing numeric cells with the column mean and missing text cells
/// with the column mode.
///
/// Fill values come from the original column distribution; columns with no
/// non-missing values, and date or integer columns, are left untouched.
pub fn impute_missing(table: &Table) -> (Table, Vec<Imputation>) {
    let fills: Vec<Option<Value>> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let missing = table.column_values(i).filter(|v| v.is_missing()).count();
            if missing == 0 {
                return None;
            }
            match col.kind {
                ColumnKind::Numeric => column_mean(table, i).map(Value::Number),
                ColumnKind::Text => column_mode(table, i).map(Value::Text),
                ColumnKind::Date | ColumnKind::Integer => None,
            }
        })
        .collect();

    let mut imputations = Vec::new();
    for (i, fill) in fills.iter().enumerate() {
        if let Some(fill) = fill {
            let cells = table.column_values(i).filter(|v| v.is_missing()).count();
            info!(
                "Filled {} missing value(s) in '{}' with {}",
                cells,
                table.columns()[i].name,
                fill
            );
            imputations.push(Imputation {
                column: table.columns()[i].name.clone(),
                fill: fill.clone(),
                cells,
            });
        }
    }

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&fills)
                .map(|(cell, fill)| match (cell, fill) {
                    (Value::Missing, Some(f)) => f.clone(),
                    _ => cell.clone(),
                })
                .collect()
        })
        .collect();

    (rebuild(table.columns().to_vec(), rows), imputations)
}

/// Remove rows equal in every field to an earlier row, keeping the first.
///
/// Returns the deduplicated table and the number of rows removed.
pub fn drop_duplicates(table: &Table) -> (Table, usize) {
    let mut seen: HashSet<&[Value]> = HashSet::with_capacity(table.row_count());
    let rows: Vec<Vec<Value>> = table
        .rows()
        .iter()
        .filter(|&row| seen.insert(row.as_slice()))
        .cloned()
        .collect();

    let removed = table.row_count() - rows.len();
    if removed > 0 {
        info!("Removed {} duplicated row(s).", removed);
    } else {
        info!("No duplicated rows found.");
    }

    (rebuild(table.columns().to_vec(), rows), removed)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn type_issue(row: usize, column: &str, value: &Value, expected: &'static str) -> TypeIssue {
    TypeIssue {
        row,
        column: column.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// Arithmetic mean of the non-missing cells, `None` when there are none.
fn column_mean(table: &Table, idx: usize) -> Option<f64> {
    let (sum, count) = table
        .column_values(idx)
        .filter_map(Value::as_f64)
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Most frequent non-missing text; ties go to the value seen first.
fn column_mode(table: &Table, idx: usize) -> Option<String> {
    // value -> (count, first row index)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (row, value) in table.column_values(idx).enumerate() {
        if let Some(s) = value.as_str() {
            counts.entry(s).or_insert((0, row)).0 += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
        .map(|(value, _)| value.to_string())
}

/// Reassemble a table from parts that already share one width.
fn rebuild(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Table {
    let mut table = Table::new(columns);
    for row in rows {
        // Every row was derived from a row of the same schema.
        if let Err(e) = table.push_row(row) {
            warn!("dropping malformed row: {}", e);
        }
    }
    table
}

// ── Tests ─────────────────────────────────────────────────────────────────────
