//! CSV discovery and loading.
//!
//! Reads a ledger file (or every `*.csv` beneath a directory) into a
//! [`Table`] whose column kinds are inferred from the cell text.

use std::io::Read;
use std::path::{Path, PathBuf};

use insight_core::models::REQUIRED_COLUMNS;
use insight_core::table::{is_missing_marker, parse_number, Column, ColumnKind, Table, Value};
use insight_core::{InsightError, Result};
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `dir`, sorted by path.
pub fn find_csv_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Data path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load a ledger source into a table.
///
/// `source` may be a single CSV file or a directory; a directory loads every
/// CSV file beneath it in path order, and all of them must share one header.
pub fn load_table(source: &Path) -> Result<Table> {
    let files = if source.is_dir() {
        let files = find_csv_files(source);
        if files.is_empty() {
            return Err(InsightError::NoDataFiles(source.to_path_buf()));
        }
        files
    } else {
        vec![source.to_path_buf()]
    };

    let mut combined: Option<RawRecords> = None;
    for path in &files {
        let file = std::fs::File::open(path).map_err(|e| InsightError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let raw = read_raw(file)?;
        debug!("File {}: {} records", path.display(), raw.records.len());

        match combined.as_mut() {
            None => combined = Some(raw),
            Some(acc) if acc.headers == raw.headers => acc.records.extend(raw.records),
            Some(acc) => {
                return Err(InsightError::Parse {
                    line: 1,
                    message: format!(
                        "header of {} ({}) does not match earlier files ({})",
                        path.display(),
                        raw.headers.join(","),
                        acc.headers.join(",")
                    ),
                })
            }
        }
    }

    // `files` is never empty here, so `combined` is always populated.
    let table = infer_table(combined.unwrap_or_default())?;
    debug!(
        "Loaded {} rows x {} columns from {} file(s)",
        table.row_count(),
        table.columns().len(),
        files.len()
    );
    Ok(table)
}

/// Read CSV text from any reader into a table.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    infer_table(read_raw(reader)?)
}

/// Check that every column the pipeline needs is present.
pub fn validate_schema(table: &Table) -> Result<()> {
    for name in REQUIRED_COLUMNS {
        table.column_index(name)?;
    }
    Ok(())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RawRecords {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

fn read_raw<R: Read>(reader: R) -> Result<RawRecords> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(InsightError::Parse {
            line: 1,
            message: "missing header row".to_string(),
        });
    }
    for (i, h) in headers.iter().enumerate() {
        if headers[..i].contains(h) {
            return Err(InsightError::Parse {
                line: 1,
                message: format!("duplicate column name {h:?}"),
            });
        }
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(ragged_row_error)?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawRecords { headers, records })
}

/// Turn the csv crate's unequal-length error into a [`InsightError::Parse`].
fn ragged_row_error(err: csv::Error) -> InsightError {
    if let csv::ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = err.kind()
    {
        return InsightError::Parse {
            line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
            message: format!("expected {} fields, found {}", expected_len, len),
        };
    }
    InsightError::Csv(err)
}

/// A column is numeric when every non-missing cell parses as a number.
fn infer_kind(raw: &RawRecords, idx: usize) -> ColumnKind {
    let numeric = raw
        .records
        .iter()
        .map(|r| r[idx].as_str())
        .filter(|cell| !is_missing_marker(cell))
        .all(|cell| parse_number(cell).is_some());
    if numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

fn infer_table(raw: RawRecords) -> Result<Table> {
    let kinds: Vec<ColumnKind> = (0..raw.headers.len())
        .map(|i| infer_kind(&raw, i))
        .collect();
    let columns: Vec<Column> = raw
        .headers
        .iter()
        .zip(&kinds)
        .map(|(name, kind)| Column::new(name.clone(), *kind))
        .collect();

    let mut table = Table::new(columns);
    for record in raw.records {
        let row = record
            .into_iter()
            .zip(&kinds)
            .map(|(cell, kind)| to_value(cell, *kind))
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

fn to_value(cell: String, kind: ColumnKind) -> Value {
    if is_missing_marker(&cell) {
        return Value::Missing;
    }
    match kind {
        ColumnKind::Numeric => parse_number(&cell).map(Value::Number).unwrap_or(Value::Missing),
        _ => Value::Text(cell),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "transaction_date,transaction_type,category,subcategory,transaction_amount";

    fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    // ── find_csv_files ────────────────────────────────────────────────────────

    #[test]
    fn test_find_csv_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "b.csv", &[HEADER]);
        write_csv(dir.path(), "nested/a.CSV", &[HEADER]);
        write_csv(dir.path(), "notes.txt", &["x"]);

        let files = find_csv_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b.csv"));
        assert!(files[1].ends_with("nested/a.CSV"));
    }

    #[test]
    fn test_find_csv_files_nonexistent_path() {
        assert!(find_csv_files(Path::new("/nonexistent/ledger/dir")).is_empty());
    }

    // ── read_table ────────────────────────────────────────────────────────────

    #[test]
    fn test_read_table_infers_kinds() {
        let csv = format!(
            "{HEADER}\n2023-01-15,Expense,Food,Groceries,50\n2023-01-20,Income,Job,Salary,\"1,000.00\"\n"
        );
        let table = read_table(csv.as_bytes()).unwrap();

        let kinds: Vec<ColumnKind> = table.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Text,
                ColumnKind::Text,
                ColumnKind::Text,
                ColumnKind::Text,
                ColumnKind::Numeric
            ]
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, "transaction_amount"), Some(&Value::Number(1000.0)));
    }

    #[test]
    fn test_read_table_missing_markers() {
        let csv = format!("{HEADER}\n2023-01-15,Expense,,NA,\n2023-01-16,Expense,Food,Snacks,4.5\n");
        let table = read_table(csv.as_bytes()).unwrap();

        assert_eq!(table.get(0, "category"), Some(&Value::Missing));
        assert_eq!(table.get(0, "subcategory"), Some(&Value::Missing));
        assert_eq!(table.get(0, "transaction_amount"), Some(&Value::Missing));
        assert_eq!(table.columns()[4].kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_read_table_trims_cells() {
        let csv = format!("{HEADER}\n 2023-01-15 , Expense ,Food,Groceries, 50 \n");
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.get(0, "transaction_type"), Some(&Value::Text("Expense".into())));
        assert_eq!(table.get(0, "transaction_amount"), Some(&Value::Number(50.0)));
    }

    #[test]
    fn test_read_table_mixed_column_is_text() {
        let csv = "amount\n10\nabc\n";
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.columns()[0].kind, ColumnKind::Text);
        assert_eq!(table.get(0, "amount"), Some(&Value::Text("10".into())));
    }

    #[test]
    fn test_read_table_passes_extra_columns() {
        let csv = format!("{HEADER},note\n2023-01-15,Expense,Food,Groceries,50,weekly shop\n");
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.get(0, "note"), Some(&Value::Text("weekly shop".into())));
    }

    #[test]
    fn test_read_table_ragged_row_is_parse_error() {
        let csv = format!("{HEADER}\n2023-01-15,Expense,Food\n");
        let err = read_table(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, InsightError::Parse { line: 2, .. }), "{err:?}");
    }

    #[test]
    fn test_read_table_empty_input_is_parse_error() {
        let err = read_table("".as_bytes()).unwrap_err();
        assert!(matches!(err, InsightError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_read_table_duplicate_header_is_parse_error() {
        let err = read_table("a,a\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, InsightError::Parse { .. }));
    }

    // ── load_table ────────────────────────────────────────────────────────────

    #[test]
    fn test_load_table_missing_file_is_file_read_error() {
        let err = load_table(Path::new("/nonexistent/ledger.csv")).unwrap_err();
        assert!(matches!(err, InsightError::FileRead { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_load_table_directory_concatenates_files() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "2022.csv", &[HEADER, "2022-05-01,Expense,Food,Groceries,20"]);
        write_csv(dir.path(), "2023.csv", &[HEADER, "2023-05-01,Expense,Food,Groceries,30"]);

        let table = load_table(dir.path()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(0, "transaction_amount"), Some(&Value::Number(20.0)));
        assert_eq!(table.get(1, "transaction_amount"), Some(&Value::Number(30.0)));
    }

    #[test]
    fn test_load_table_directory_header_mismatch() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "a.csv", &[HEADER]);
        write_csv(dir.path(), "b.csv", &["date,amount"]);
        let err = load_table(dir.path()).unwrap_err();
        assert!(matches!(err, InsightError::Parse { .. }));
    }

    #[test]
    fn test_load_table_empty_directory() {
        let dir = TempDir::new().unwrap();
        let err = load_table(dir.path()).unwrap_err();
        assert!(matches!(err, InsightError::NoDataFiles(_)));
    }

    // ── validate_schema ───────────────────────────────────────────────────────

    #[test]
    fn test_validate_schema() {
        let ok = read_table(format!("{HEADER}\n").as_bytes()).unwrap();
        assert!(validate_schema(&ok).is_ok());

        let missing = read_table("transaction_date,category\n".as_bytes()).unwrap();
        let err = validate_schema(&missing).unwrap_err();
        assert!(matches!(err, InsightError::MissingColumn(ref c) if c == "transaction_type"));
    }
}
