use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directory under `$HOME` holding saved settings, logs and the fallback ledger.
pub const APP_DIR: &str = ".ledger-insight";

/// Ledger file names probed in the working directory, in order.
const LOCAL_CANDIDATES: [&str; 2] = ["transactions.csv", "transactions_v2.csv"];

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.ledger-insight/` and `~/.ledger-insight/logs/` exist.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    ensure_directories_in(&home)
}

pub fn ensure_directories_in(home: &Path) -> anyhow::Result<PathBuf> {
    let app_dir = home.join(APP_DIR);
    std::fs::create_dir_all(app_dir.join("logs"))?;
    Ok(app_dir)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name to an [`EnvFilter`] directive.
fn filter_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Events go to stderr so report output on stdout stays clean.  When
/// `log_file` is given the same events are appended to it without ANSI
/// colouring.  `RUST_LOG`, when set, overrides `log_level`.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Source discovery ───────────────────────────────────────────────────────────

/// Locate a ledger when none was given on the command line.
///
/// Checks, in order, `./transactions.csv`, `./transactions_v2.csv` and
/// `~/.ledger-insight/transactions.csv`, returning the first that exists.
pub fn discover_source_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    discover_source_path_in(&cwd, dirs::home_dir().as_deref())
}

pub fn discover_source_path_in(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let local = LOCAL_CANDIDATES.iter().map(|name| cwd.join(name));
    let fallback = home.map(|h| h.join(APP_DIR).join("transactions.csv"));
    local.chain(fallback).find(|p| p.is_file())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── test_ensure_directories ───────────────────────────────────────────────

    #[test]
    fn test_ensure_directories_in() {
        let tmp = TempDir::new().expect("tempdir");
        let app_dir = ensure_directories_in(tmp.path()).expect("ensure_directories_in");

        assert_eq!(app_dir, tmp.path().join(".ledger-insight"));
        assert!(app_dir.is_dir(), ".ledger-insight dir must exist");
        assert!(app_dir.join("logs").is_dir(), "logs subdir must exist");

        // Idempotent.
        ensure_directories_in(tmp.path()).expect("second call");
    }

    // ── test_filter_directive ─────────────────────────────────────────────────

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("DEBUG"), "debug");
        assert_eq!(filter_directive("info"), "info");
        assert_eq!(filter_directive("WARNING"), "warn");
        assert_eq!(filter_directive("CRITICAL"), "error");
        assert_eq!(filter_directive("bogus"), "info");
    }

    // ── test_discover_source_path ─────────────────────────────────────────────

    #[test]
    fn test_discover_source_path_none_when_absent() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        assert!(discover_source_path_in(cwd.path(), Some(home.path())).is_none());
        assert!(discover_source_path_in(cwd.path(), None).is_none());
    }

    #[test]
    fn test_discover_source_path_prefers_local_file() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        let v2 = cwd.path().join("transactions_v2.csv");
        std::fs::write(&v2, "x").unwrap();
        let fallback = home.path().join(".ledger-insight").join("transactions.csv");
        std::fs::create_dir_all(fallback.parent().unwrap()).unwrap();
        std::fs::write(&fallback, "x").unwrap();

        assert_eq!(discover_source_path_in(cwd.path(), Some(home.path())), Some(v2.clone()));

        let primary = cwd.path().join("transactions.csv");
        std::fs::write(&primary, "x").unwrap();
        assert_eq!(discover_source_path_in(cwd.path(), Some(home.path())), Some(primary));
    }

    #[test]
    fn test_discover_source_path_falls_back_to_home() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        let fallback = home.path().join(".ledger-insight").join("transactions.csv");
        std::fs::create_dir_all(fallback.parent().unwrap()).unwrap();
        std::fs::write(&fallback, "x").unwrap();

        assert_eq!(discover_source_path_in(cwd.path(), Some(home.path())), Some(fallback));
    }
}
