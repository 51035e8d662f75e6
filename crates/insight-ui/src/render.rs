//! Output sinks for report views.

use std::io::Write;

use comfy_table::{Cell, CellAlignment, Table};
use insight_core::formatting::{format_currency, format_number, percentage};
use insight_core::table::Value;
use insight_core::Result;

use crate::views::{ChartKind, ReportView, ViewPayload};

/// Anything that can present a [`ReportView`].
pub trait Renderer {
    fn render(&mut self, view: &ReportView) -> Result<()>;

    fn render_all(&mut self, views: &[ReportView]) -> Result<()> {
        for view in views {
            self.render(view)?;
        }
        Ok(())
    }
}

// ── Text ──────────────────────────────────────────────────────────────────────

/// Human-readable output: a title line followed by a comfy-table table.
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, view: &ReportView) -> Result<()> {
        writeln!(self.out, "{}", view.title)?;
        if is_empty(view) {
            writeln!(self.out, "  (no data)\n")?;
            return Ok(());
        }
        writeln!(self.out, "{}\n", text_table(view))?;
        Ok(())
    }
}

fn is_empty(view: &ReportView) -> bool {
    match &view.payload {
        ViewPayload::Table { rows, .. } => rows.is_empty(),
        ViewPayload::Series(points) => points.is_empty(),
    }
}

fn text_table(view: &ReportView) -> Table {
    let mut table = Table::new();
    match (&view.payload, view.chart) {
        (ViewPayload::Table { columns, rows }, _) => {
            table.set_header(columns.iter().map(Cell::new));
            for row in rows {
                table.add_row(row.iter().map(value_cell));
            }
        }
        (ViewPayload::Series(points), ChartKind::Donut) => {
            let whole: f64 = points.iter().map(|p| p.value).sum();
            table.set_header(vec!["Category", "Amount", "Share"]);
            for p in points {
                table.add_row(vec![
                    Cell::new(&p.label),
                    amount_cell(p.value),
                    Cell::new(format!("{:.1}%", percentage(p.value, whole, 1)))
                        .set_alignment(CellAlignment::Right),
                ]);
            }
        }
        (ViewPayload::Series(points), ChartKind::GroupedBar) => {
            table.set_header(vec!["Period", "Category", "Amount"]);
            for p in points {
                table.add_row(vec![
                    Cell::new(p.series.as_deref().unwrap_or("")),
                    Cell::new(&p.label),
                    amount_cell(p.value),
                ]);
            }
        }
        (ViewPayload::Series(points), _) => {
            table.set_header(vec!["Period", "Amount"]);
            for p in points {
                table.add_row(vec![Cell::new(&p.label), amount_cell(p.value)]);
            }
        }
    }
    table
}

fn amount_cell(value: f64) -> Cell {
    Cell::new(format_currency(value)).set_alignment(CellAlignment::Right)
}

fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Number(n) => Cell::new(format_number(*n, 2)).set_alignment(CellAlignment::Right),
        Value::Integer(i) => Cell::new(i).set_alignment(CellAlignment::Right),
        other => Cell::new(other),
    }
}

// ── JSON ──────────────────────────────────────────────────────────────────────

/// Machine-readable output: one JSON object per view, one per line.
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, view: &ReportView) -> Result<()> {
        serde_json::to_writer(&mut self.out, view)?;
        writeln!(self.out)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
