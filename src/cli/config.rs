// CLI configuration
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tagstream::DecodeOptions;

/// Tagstream - audio metadata CLI tool
#[derive(Parser, Debug)]
#[command(name = "tagstream")]
#[command(about = "Read tags and stream information from ID3, FLAC, OGG Vorbis and OPUS files", long_about = None)]
#[command(version)]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging; RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read buffer size in bytes
    #[arg(long, global = true)]
    pub buffer_size: Option<usize>,

    /// JSON file with decoder options
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
    /// Table format
    Table,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read metadata from audio file(s)
    Read {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Metadata fields to display (comma-separated)
        #[arg(long)]
        fields: Option<String>,

        /// Output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Detect file format
    Detect {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Show file information
    Info {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Show stream properties and tag statistics
        #[arg(short, long)]
        detailed: bool,
    },

    /// Export cover art
    ExportCover {
        /// Audio file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory for cover images
        #[arg(short, long)]
        output: PathBuf,

        /// Picture index (for files with multiple pictures)
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Read every file matching a pattern in a directory
    Batch {
        /// Directory path
        #[arg(short, long)]
        directory: PathBuf,

        /// File pattern (e.g., "*.mp3", "*.flac")
        #[arg(short, long)]
        pattern: String,
    },
}

impl Config {
    /// Decoder options from `--config`, then `--buffer-size`.
    pub fn decode_options(&self) -> anyhow::Result<DecodeOptions> {
        let mut options = match &self.config {
            Some(path) => DecodeOptions::from_json_file(path)
                .with_context(|| format!("cannot load options from {}", path.display()))?,
            None => DecodeOptions::default(),
        };
        if let Some(size) = self.buffer_size {
            anyhow::ensure!(size > 0, "--buffer-size must be positive");
            options.buffer_capacity = size;
        }
        Ok(options)
    }

    /// Default log filter for env_logger.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Parse a comma-separated field list.
pub fn parse_fields(fields: &str) -> anyhow::Result<Vec<tagstream::StandardField>> {
    fields
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.parse().map_err(anyhow::Error::msg))
        .collect()
}
