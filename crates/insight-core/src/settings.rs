use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Cleaned, aggregated views of a personal finance ledger
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ledger-insight",
    about = "Cleaned, aggregated views of a personal finance ledger",
    version
)]
pub struct Settings {
    /// Ledger CSV file or directory of CSV files (defaults to the last one used)
    pub source: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Number of categories in top-N rankings (1-50)
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u16).range(1..=50))]
    pub top: u16,

    /// Year for yearly and monthly rankings (defaults to the latest year in the data)
    #[arg(long)]
    pub year: Option<i32>,

    /// Month for the monthly ranking (defaults to the latest month of --year)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Category to compare across periods
    #[arg(long)]
    pub compare_category: Option<String>,

    /// Two years to compare, e.g. 2019,2022
    #[arg(long, value_parser = parse_pair::<i32>)]
    pub compare_years: Option<(i32, i32)>,

    /// Two months of --year to compare, e.g. 1,2
    #[arg(long, value_parser = parse_pair::<u32>)]
    pub compare_months: Option<(u32, u32)>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

/// Parse `"a,b"` into a pair.
fn parse_pair<T: FromStr>(s: &str) -> Result<(T, T), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected two comma-separated values, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<T>()
            .map_err(|_| format!("invalid value {:?} in {s:?}", v.trim()))
    };
    Ok((parse(a)?, parse(b)?))
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.ledger-insight/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl LastUsedParams {
    /// Default path of the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".ledger-insight").join("last_used.json")
    }

    /// Load persisted params; `Default` when the file is absent or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("ignoring unreadable settings file {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at `path` if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments, merge last-used params and persist.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit arguments and
    /// config path, so tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("could not clear {}: {}", config_path.display(), e);
            }
            return Self::resolve(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        match settings.source.take() {
            Some(source) => settings.source = Some(absolute_source(&source)),
            None => settings.source = last.source,
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top") {
            if let Some(v) = last.top {
                settings.top = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "log_level") {
            if let Some(v) = last.log_level {
                settings.log_level = v;
            }
        }

        let params = LastUsedParams::from(&settings);
        settings = Self::resolve(settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!("could not persist settings: {}", e);
        }

        settings
    }

    /// Apply the `--debug` override.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    pub fn json_output(&self) -> bool {
        self.format == "json"
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            source: s.source.clone(),
            format: Some(s.format.clone()),
            top: Some(s.top),
            log_level: Some(s.log_level.clone()),
        }
    }
}

/// Anchor a CLI source to the working directory so the persisted path stays
/// valid from anywhere.  Existing paths are canonicalized.
fn absolute_source(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            tracing::warn!("could not resolve {}: {}", path.display(), e);
            path.to_path_buf()
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
