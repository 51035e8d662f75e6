mod bootstrap;

use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use insight_core::settings::Settings;
use insight_runtime::orchestrator::ReportOrchestrator;
use insight_ui::dashboard::{build_views, DashboardOptions};
use insight_ui::render::{JsonRenderer, Renderer, TextRenderer};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Ledger Insight v{} starting", env!("CARGO_PKG_VERSION"));

    let source = settings
        .source
        .clone()
        .or_else(bootstrap::discover_source_path)
        .context(
            "no ledger given and none found (tried ./transactions.csv, \
             ./transactions_v2.csv and ~/.ledger-insight/transactions.csv)",
        )?;
    tracing::info!("Source: {}, format: {}", source.display(), settings.format);

    let mut orchestrator = ReportOrchestrator::new();
    let analysis = orchestrator
        .analyze(&source)
        .with_context(|| format!("failed to analyse {}", source.display()))?;

    let options = DashboardOptions {
        top: usize::from(settings.top),
        year: settings.year,
        month: settings.month,
        compare_category: settings.compare_category.clone(),
        compare_years: settings.compare_years,
        compare_months: settings.compare_months,
    };
    let views = build_views(&analysis, &options);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if settings.json_output() {
        JsonRenderer::new(&mut out).render_all(&views)?;
    } else {
        TextRenderer::new(&mut out).render_all(&views)?;
    }
    out.flush()?;

    tracing::debug!(
        rows = analysis.metadata.rows_after_cleaning,
        views = views.len(),
        "report written"
    );
    Ok(())
}
