//! In-memory tabular model shared by every pipeline stage.
//!
//! A [`Table`] is a plain value: stages borrow one and hand back a new one.
//! Column kinds are fixed when the table is built, so re-running a stage on
//! its own output never re-infers types.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::error::{InsightError, Result};

// ── Missing markers ───────────────────────────────────────────────────────────

/// Raw cell spellings that are read as "no value".
pub const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
    "<NA>",
];

/// Returns `true` when the trimmed raw cell denotes a missing value.
pub fn is_missing_marker(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

fn amount_regex() -> &'static Regex {
    static AMOUNT_RE: OnceLock<Regex> = OnceLock::new();
    AMOUNT_RE.get_or_init(|| {
        Regex::new(r"^(?P<sign>[-+])?\s*[$€£]?\s*(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?|\.\d+)$")
            .expect("amount regex is valid")
    })
}

/// Parse a numeric cell such as `"50"`, `"-12.5"` or `"$1,234.50"`.
///
/// Returns `None` for anything that is not a plain decimal amount.
pub fn parse_number(raw: &str) -> Option<f64> {
    let caps = amount_regex().captures(raw.trim())?;
    let digits = caps["num"].replace(',', "");
    let value: f64 = digits.parse().ok()?;
    match caps.name("sign").map(|m| m.as_str()) {
        Some("-") => Some(-value),
        _ => Some(value),
    }
}

// ── Value ─────────────────────────────────────────────────────────────────────

/// A single table cell.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Number(f64),
    Integer(i64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the cell (integers widen to `f64`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer view of the cell; whole-valued numbers are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Ordering used by table sorts: numbers compare numerically, missing
    /// values sort after everything else.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Missing, Value::Missing) => Ordering::Equal,
            (Value::Missing, _) => Ordering::Greater,
            (_, Value::Missing) => Ordering::Less,
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.kind_rank().cmp(&b.kind_rank()),
            },
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Number(_) | Value::Integer(_) => 0,
            Value::Date(_) => 1,
            Value::Text(_) => 2,
            Value::Missing => 3,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Missing, Value::Missing) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => false,
        }
    }
}

// Cells never hold NaN: the loader maps NaN spellings to `Missing`.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Missing => {}
            // +0.0 and -0.0 compare equal, so they must hash equal.
            Value::Number(n) => (if *n == 0.0 { 0.0f64 } else { *n }).to_bits().hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

// ── Column ────────────────────────────────────────────────────────────────────

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Floating-point values; imputed with the column mean.
    Numeric,
    /// Whole numbers derived by the pipeline (day / month / year).
    Integer,
    /// Free text and categorical values; imputed with the column mode.
    Text,
    /// Calendar dates.
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Rows of typed cells under a fixed, ordered schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given schema.
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table, rejecting rows whose width differs from the schema.
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append one row.  The row must have exactly one cell per column.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(InsightError::Parse {
                line: self.rows.len() as u64 + 2,
                message: format!(
                    "expected {} fields, found {}",
                    self.columns.len(),
                    row.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Position of `name` in the schema, or [`InsightError::MissingColumn`].
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| InsightError::MissingColumn(name.to_string()))
    }

    /// Cell at (`row`, `column`), if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c.name == column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterate over every cell of column `idx`, in row order.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |r| &r[idx])
    }

    /// Consume the table, yielding its schema and rows.
    pub fn into_parts(self) -> (Vec<Column>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn two_column_table() -> Table {
        Table::from_rows(
            vec![
                Column::new("category", ColumnKind::Text),
                Column::new("amount", ColumnKind::Numeric),
            ],
            vec![
                vec![Value::Text("Food".into()), Value::Number(50.0)],
                vec![Value::Text("Rent".into()), Value::Missing],
            ],
        )
        .unwrap()
    }

    // ── parse_number ──────────────────────────────────────────────────────────

    #[test]
    fn test_parse_number_plain() {
        assert_eq!(parse_number("50"), Some(50.0));
        assert_eq!(parse_number(" 12.75 "), Some(12.75));
        assert_eq!(parse_number("-3.5"), Some(-3.5));
        assert_eq!(parse_number(".5"), Some(0.5));
    }

    #[test]
    fn test_parse_number_currency_and_separators() {
        assert_eq!(parse_number("$1,234.50"), Some(1234.5));
        assert_eq!(parse_number("-$20"), Some(-20.0));
        assert_eq!(parse_number("1,000"), Some(1000.0));
    }

    #[test]
    fn test_parse_number_rejects_text() {
        assert_eq!(parse_number("Food"), None);
        assert_eq!(parse_number("2023-01-15"), None);
        assert_eq!(parse_number("1,00"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_missing_markers() {
        assert!(is_missing_marker(""));
        assert!(is_missing_marker("  "));
        assert!(is_missing_marker("NaN"));
        assert!(is_missing_marker("N/A"));
        assert!(!is_missing_marker("0"));
        assert!(!is_missing_marker("Nancy"));
    }

    // ── Value ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_value_equality_and_hash_agree_on_signed_zero() {
        let mut set = HashSet::new();
        set.insert(Value::Number(0.0));
        assert!(set.contains(&Value::Number(-0.0)));
        assert_eq!(Value::Number(0.0), Value::Number(-0.0));
    }

    #[test]
    fn test_value_kinds_are_distinct() {
        assert_ne!(Value::Integer(1), Value::Number(1.0));
        assert_ne!(Value::Text("1".into()), Value::Integer(1));
    }

    #[test]
    fn test_sort_cmp_missing_last() {
        assert_eq!(Value::Missing.sort_cmp(&Value::Integer(1)), Ordering::Greater);
        assert_eq!(Value::Integer(1).sort_cmp(&Value::Missing), Ordering::Less);
        assert_eq!(Value::Missing.sort_cmp(&Value::Missing), Ordering::Equal);
    }

    #[test]
    fn test_sort_cmp_mixed_numbers() {
        assert_eq!(Value::Integer(2).sort_cmp(&Value::Number(2.5)), Ordering::Less);
        assert_eq!(Value::Number(3.0).sort_cmp(&Value::Integer(3)), Ordering::Equal);
    }

    #[test]
    fn test_value_display() {
        let d = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        assert_eq!(Value::Date(d).to_string(), "2023-01-15");
        assert_eq!(Value::Number(50.0).to_string(), "50");
        assert_eq!(Value::Missing.to_string(), "");
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Missing,
            Value::Number(1.5),
            Value::Text("x".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,1.5,"x"]"#);
    }

    // ── Table ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = two_column_table();
        let err = table.push_row(vec![Value::Missing]).unwrap_err();
        assert!(matches!(err, InsightError::Parse { .. }));
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_column_index_missing_is_key_error() {
        let table = two_column_table();
        assert_eq!(table.column_index("amount").unwrap(), 1);
        let err = table.column_index("year").unwrap_err();
        assert!(matches!(err, InsightError::MissingColumn(ref c) if c == "year"));
    }

    #[test]
    fn test_get_and_column_values() {
        let table = two_column_table();
        assert_eq!(table.get(0, "category"), Some(&Value::Text("Food".into())));
        assert_eq!(table.get(5, "category"), None);
        let amounts: Vec<&Value> = table.column_values(1).collect();
        assert_eq!(amounts, vec![&Value::Number(50.0), &Value::Missing]);
    }
}
