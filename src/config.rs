/// Configuration resolution module
///
/// This module handles:
/// - Loading the optional TOML configuration file
/// - Merging it with CLI arguments (flags win)
/// - Resolving the schema, mapper and result-file labels
/// - Producing an immutable ScanConfig for the scan
use crate::cli::CliArgs;
use crate::condense::Retention;
use crate::mapper::{self, JUNIT_RESULT_FILE, JUnitMapper, MapperOptions, ResultMapper};
use crate::paths::WORKSPACE_MARKER;
use crate::scanner::{DEFAULT_WORKERS, ScanSource, sources_for};
use crate::schema::{Format, FormatMask, Schema};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings accepted in `config.toml`; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub history: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub format: Option<String>,
    pub junit: Option<bool>,
    pub results: Option<Vec<String>>,
    pub workspace_marker: Option<String>,
    pub case_sensitive: Option<bool>,
    pub workers: Option<usize>,
    pub truncate_strings: Option<usize>,
    pub window: Option<usize>,
    pub reset_interval: Option<u64>,
    pub output_json: Option<PathBuf>,
    pub output_csv: Option<PathBuf>,
}

/// How result files are mapped.
#[derive(Debug, Clone, PartialEq)]
pub enum MapperChoice {
    Schema { schema: Schema, format: Format },
    JUnit,
}

/// Fully resolved scan settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub history_dir: PathBuf,
    pub mapper: MapperChoice,
    pub sources: Vec<ScanSource>,
    pub start_build: Option<u64>,
    pub end_build: Option<u64>,
    pub workers: usize,
    pub options: MapperOptions,
    pub retention: Retention,
    pub reset_interval: Option<Duration>,
    pub output_json: Option<PathBuf>,
    pub output_csv: Option<PathBuf>,
    pub load_snapshot: Option<PathBuf>,
    pub quiet: bool,
}

impl ScanConfig {
    /// Build the mapper for this configuration.
    ///
    /// Configuration errors (format bit not set, unreadable or invalid schema)
    /// surface here, before any result file is read.
    pub fn build_mapper(&self) -> Result<Box<dyn ResultMapper>, String> {
        match &self.mapper {
            MapperChoice::JUnit => Ok(Box::new(JUnitMapper::new())),
            MapperChoice::Schema { schema, format } => {
                mapper::build_mapper(schema, *format, self.options).map_err(|e| e.to_string())
            }
        }
    }
}

/// Load a config file. A missing file at the default location is not an error.
pub fn load_file_config(path: &Path, explicit: bool) -> Result<FileConfig, String> {
    if !path.exists() && !explicit {
        debug!("no config file at {}", path.display());
        return Ok(FileConfig::default());
    }
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&text).map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
}

/// Build a complete ScanConfig from CLI arguments and the config file
pub fn build_scan_config(args: &CliArgs) -> Result<ScanConfig, String> {
    let path = args.get_config_path();
    let file = load_file_config(&path, args.config.is_some())?;
    resolve(args, file)
}

/// Merge CLI arguments over file settings.
pub fn resolve(args: &CliArgs, file: FileConfig) -> Result<ScanConfig, String> {
    let history_dir = args
        .history
        .clone()
        .or(file.history)
        .ok_or_else(|| "No build history given; use --history or set `history` in the config file".to_string())?;

    let junit = args.junit || file.junit.unwrap_or(false);
    let mapper = if junit {
        MapperChoice::JUnit
    } else {
        let schema_path = args
            .schema
            .clone()
            .or(file.schema)
            .ok_or_else(|| "No schema given; use --schema, or --junit for JUnit reports".to_string())?;
        let format = match args.format.clone().or(file.format) {
            Some(name) => name.parse::<Format>()?,
            None => Format::from_path(&schema_path).ok_or_else(|| {
                format!("Cannot infer the format of {}; use --format json|xml", schema_path.display())
            })?,
        };
        let name = schema_path.file_stem().and_then(|s| s.to_str()).unwrap_or("schema").to_string();
        MapperChoice::Schema { schema: Schema::new(name, schema_path, None, FormatMask::of(&[format])), format }
    };

    let mut results = if args.results.is_empty() { file.results.unwrap_or_default() } else { args.results.clone() };
    if results.is_empty() {
        if !junit {
            return Err("No result files given; use --results".to_string());
        }
        results.push(JUNIT_RESULT_FILE.to_string());
    }

    let marker = args.workspace_marker.clone().or(file.workspace_marker).unwrap_or_else(|| WORKSPACE_MARKER.to_string());
    let case_sensitive = args.case_sensitive || file.case_sensitive.unwrap_or(false);
    let sources = sources_for(&results, &marker, case_sensitive);

    let workers = args.workers.or(file.workers).unwrap_or(DEFAULT_WORKERS);
    if workers == 0 {
        return Err("workers must be at least 1".to_string());
    }

    let retention = match args.window.or(file.window) {
        Some(0) => return Err("window must be at least 1".to_string()),
        Some(n) => Retention::Window(n),
        None => Retention::Unbounded,
    };

    let config = ScanConfig {
        history_dir,
        mapper,
        sources,
        start_build: args.start_build,
        end_build: args.end_build,
        workers,
        options: MapperOptions { truncate_strings: args.truncate_strings.or(file.truncate_strings) },
        retention,
        reset_interval: args.reset_interval.or(file.reset_interval).filter(|s| *s > 0).map(Duration::from_secs),
        output_json: args.output_json.clone().or(file.output_json),
        output_csv: args.output_csv.clone().or(file.output_csv),
        load_snapshot: args.load_snapshot.clone(),
        quiet: args.quiet,
    };
    debug!("resolved scan config: {:?}", config);
    Ok(config)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
