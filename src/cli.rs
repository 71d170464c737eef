use clap::Parser;
use std::path::PathBuf;

/// Get the default configuration file for bench-history
/// Uses platform-specific config directories:
/// - Linux: ~/.config/bench-history/config.toml
/// - macOS: ~/Library/Application Support/bench-history/config.toml
/// - Windows: %APPDATA%/bench-history/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("bench-history"))
        .unwrap_or_else(|| PathBuf::from(".bench-history"))
        .join("config.toml")
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "bench-history")]
#[command(about = "Map build/test result files through a schema and condense them across build history")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding one sub-directory per build number
    #[arg(long, value_name = "DIR")]
    pub history: Option<PathBuf>,

    /// Schema document describing the result files (.json, or .xml/.xsd)
    #[arg(long, short = 's', value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Schema format; inferred from the schema file extension when omitted
    #[arg(long, value_name = "json|xml")]
    pub format: Option<String>,

    /// Map JUnit reports with the built-in mapping instead of a schema
    #[arg(long, conflicts_with = "schema")]
    pub junit: bool,

    /// Result files relative to each build directory
    /// Can specify multiple: --results out/a.json out/b.json
    #[arg(long, value_name = "PATH", num_args = 1..)]
    pub results: Vec<String>,

    /// Path segment anchoring absolute result paths (default: workspace)
    #[arg(long, value_name = "SEGMENT")]
    pub workspace_marker: Option<String>,

    /// Compare path segments case-sensitively when labelling result files
    #[arg(long)]
    pub case_sensitive: bool,

    /// Newest build to scan (default: latest)
    #[arg(long, value_name = "BUILD")]
    pub start_build: Option<u64>,

    /// Oldest build, not itself scanned (default: start of history)
    #[arg(long, value_name = "BUILD")]
    pub end_build: Option<u64>,

    /// Number of parallel scan workers (default: 4)
    #[arg(long, short = 'j', value_name = "N")]
    pub workers: Option<usize>,

    /// Cut string values to this many characters
    #[arg(long, value_name = "CHARS")]
    pub truncate_strings: Option<usize>,

    /// Keep only the N newest builds per metric (default: unbounded)
    #[arg(long, value_name = "N")]
    pub window: Option<usize>,

    /// Clear in-memory results every N seconds while running
    #[arg(long, value_name = "SECONDS")]
    pub reset_interval: Option<u64>,

    /// Write the condensed snapshot here (BenchmarkResult.json)
    #[arg(long = "output-json", value_name = "PATH")]
    pub output_json: Option<PathBuf>,

    /// Write condensed metrics as CSV here
    #[arg(long = "output-csv", value_name = "PATH")]
    pub output_csv: Option<PathBuf>,

    /// Seed condensed state from an earlier snapshot before scanning
    #[arg(long, value_name = "PATH")]
    pub load_snapshot: Option<PathBuf>,

    /// Configuration file (default: platform config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not print the console table
    #[arg(long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        let mut args = CliArgs::parse();

        // Split results on whitespace to support quoted lists like 'a.json b.json'
        args.results = args.results.iter().flat_map(|s| s.split_whitespace().map(|v| v.to_string())).collect();

        args
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if let Some(format) = &self.format
            && !matches!(format.to_ascii_lowercase().as_str(), "json" | "xml")
        {
            return Err(format!("Unknown --format '{}', expected json or xml", format));
        }

        if self.junit && self.format.is_some() {
            return Err("Cannot specify --format together with --junit".to_string());
        }

        if let (Some(start), Some(end)) = (self.start_build, self.end_build)
            && end >= start
        {
            return Err(format!("--end-build ({}) must be older than --start-build ({})", end, start));
        }

        if self.workers == Some(0) {
            return Err("--workers must be at least 1".to_string());
        }

        if self.window == Some(0) {
            return Err("--window must be at least 1".to_string());
        }

        if self.reset_interval == Some(0) {
            return Err("--reset-interval must be at least 1 second".to_string());
        }

        Ok(())
    }

    /// Get the config file path, using the default location if not specified
    pub fn get_config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }
}
